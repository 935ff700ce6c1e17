/*!
 # x86
 ## About
 Code generation for the i386 in GNU `as` AT&T syntax, using the cdecl
 calling convention: arguments are pushed right to left and popped by the
 caller, the result is returned in `%eax` and every function has an `%ebp`
 based frame.

 `assembly` models the instructions, operands and directives and renders
 them as text.  `frame` lays out the stack frame of a function.  `codegen`
 walks the MIR of a unit and emits the listing.

 ## The `assembly!` macro
 Listings are written with a small DSL that reads like AT&T assembly:

 ```no_run
 # use mat_lang::assembly;
 # let mut code = mat_lang::compiler::x86::assembly::AssemblyCode::new();
 assembly!{(code){
     push %ebp;
     mov %esp, %ebp;
     mov [%ebp + {8}], %eax;
     jmp @{".L3"};
 }}
 ```

 ## Syntax
 1. `%<register>` - a 32 bit register.  `%{reg}` uses the register `reg`,
    which may be a view of any width.
 2. `{expression}` - an integer immediate.
 3. `(operand)` - any expression which evaluates to an `Operand`.
 4. `[%reg + {offset}]` - a memory reference based on a register.
 5. `@label` and `@{label}` - a jump or call target; followed by `:` it
    places the label.
 6. `;"comment"` - a comment line in the listing.
 7. `{{iterable of instructions}}` - splices another listing in.
 */

pub mod assembly;
mod codegen;
mod frame;

pub use codegen::{generate_assembly, generate_assembly_with, CodegenOptions};
pub use frame::FrameLayout;
