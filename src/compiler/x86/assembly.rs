use std::fmt::*;

use serde::Serialize;

use crate::compiler::arch::registers::RegSize;

/*
Assembly DSL
Registers are prefixed with %
Memory locations are within []
Each instruction is followed by a ;
Expressions to evaluate are in {} and become immediates
Any expression that already is an Operand goes in ()
Jump and call targets are prefixed with @
Operands are written source first, as in AT&T syntax
```
let frame = 8;
assembly!(
    (buffer) {
        push %ebp;
        mov %esp, %ebp;
        sub {frame}, %esp;
        mov [%ebp + {8}], %eax;
        jmp @{".L3"};
    @{".L3"}:
        mov %ebp, %esp;
        pop %ebp;
        ret;
    }
)
```

would translate to:
```
    pushl %ebp
    movl %esp, %ebp
    subl $8, %esp
    movl 8(%ebp), %eax
    jmp .L3
.L3:
    movl %ebp, %esp
    popl %ebp
    ret
```

operand combinations:
binary:
%_, %_
%_, _
_, %_
_, _
 there are no x86 instructions that take two explicit memory operands, so
 one side of a binary operation is always a register or an immediate

unary:
%_
@_
_
*/

/// The general purpose registers of the i386.  A class is a register
/// independent of how many of its bits are in use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RegClass {
    Ax,
    Bx,
    Cx,
    Dx,
    Si,
    Di,
    Sp,
    Bp,
}

impl RegClass {
    /// Returns the view of this register that holds a value of `width`.
    pub fn for_type(self, width: RegSize) -> Reg {
        Reg::new(self, width)
    }

    fn has_byte_view(self) -> bool {
        matches!(self, RegClass::Ax | RegClass::Bx | RegClass::Cx | RegClass::Dx)
    }

    fn base_name(self) -> &'static str {
        match self {
            RegClass::Ax => "ax",
            RegClass::Bx => "bx",
            RegClass::Cx => "cx",
            RegClass::Dx => "dx",
            RegClass::Si => "si",
            RegClass::Di => "di",
            RegClass::Sp => "sp",
            RegClass::Bp => "bp",
        }
    }
}

/// A register of a given width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Reg {
    class: RegClass,
    size: RegSize,
}

impl Reg {
    /// # Panics
    /// If the register has no view of the given width on the i386: only
    /// `%eax`, `%ebx`, `%ecx` and `%edx` have byte registers, and no
    /// register has a 64 bit view.
    pub fn new(class: RegClass, size: RegSize) -> Reg {
        if size == RegSize::R64 || (size == RegSize::R8 && !class.has_byte_view()) {
            panic!("No {} view of {:?} on this target", size, class)
        }
        Reg { class, size }
    }

    pub fn class(&self) -> RegClass {
        self.class
    }

    pub fn size(&self) -> RegSize {
        self.size
    }

    pub fn name(&self) -> String {
        let base = self.class.base_name();
        match self.size {
            RegSize::R8 => format!("{}l", &base[..1]),
            RegSize::R16 => base.into(),
            RegSize::R32 => format!("e{}", base),
            RegSize::R64 => format!("r{}", base),
        }
    }
}

impl Display for Reg {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("%{}", self.name()))
    }
}

/// A constant operand: either a number or the address of a symbol.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Immediate {
    Int(i64),
    Symbol(String),
}

impl Display for Immediate {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Immediate::Int(i) => f.write_fmt(format_args!("{}", i)),
            Immediate::Symbol(s) => f.write_str(s),
        }
    }
}

/// A memory reference `symbol+offset(base,index,scale)`.  Every part is
/// optional but at least one of `base` and `symbol` is present.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemRef {
    pub base: Option<Reg>,
    pub index: Option<(Reg, u8)>,
    pub offset: i64,
    pub symbol: Option<String>,
}

impl MemRef {
    /// `offset(%base)`
    pub fn based(base: Reg, offset: i64) -> MemRef {
        MemRef {
            base: Some(base),
            index: None,
            offset,
            symbol: None,
        }
    }

    /// The memory labelled `symbol`.
    pub fn symbol(symbol: &str) -> MemRef {
        MemRef {
            base: None,
            index: None,
            offset: 0,
            symbol: Some(symbol.into()),
        }
    }

    /// The same reference moved by `delta` bytes.
    pub fn offset_by(&self, delta: i64) -> MemRef {
        MemRef {
            offset: self.offset + delta,
            ..self.clone()
        }
    }
}

impl Display for MemRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match (&self.symbol, self.offset) {
            (Some(sym), 0) => f.write_str(sym)?,
            (Some(sym), off) if off > 0 => f.write_fmt(format_args!("{}+{}", sym, off))?,
            (Some(sym), off) => f.write_fmt(format_args!("{}{}", sym, off))?,
            (None, 0) if self.base.is_some() => (),
            (None, off) => f.write_fmt(format_args!("{}", off))?,
        }

        match (&self.base, &self.index) {
            (Some(base), Some((idx, scale))) => {
                f.write_fmt(format_args!("({},{},{})", base, idx, scale))
            }
            (Some(base), None) => f.write_fmt(format_args!("({})", base)),
            (None, Some((idx, scale))) => f.write_fmt(format_args!("(,{},{})", idx, scale)),
            (None, None) => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Operand {
    Immediate(Immediate),
    Register(Reg),
    Memory(MemRef),
    /// A branch or call target.
    Symbol(String),
}

impl Operand {
    pub fn int(i: i64) -> Operand {
        Operand::Immediate(Immediate::Int(i))
    }

    pub fn reg(&self) -> Option<Reg> {
        match self {
            Operand::Register(r) => Some(*r),
            _ => None,
        }
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Operand::Immediate(imm) => f.write_fmt(format_args!("${}", imm)),
            Operand::Register(reg) => f.write_fmt(format_args!("{}", reg)),
            Operand::Memory(mem) => f.write_fmt(format_args!("{}", mem)),
            Operand::Symbol(sym) => f.write_str(sym),
        }
    }
}

/// The condition codes used by `set<cc>` and `j<cc>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Cond {
    E,
    Ne,
    L,
    Le,
    G,
    Ge,
    B,
    Be,
    A,
    Ae,
}

impl Display for Cond {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        use Cond::*;
        f.write_str(match self {
            E => "e",
            Ne => "ne",
            L => "l",
            Le => "le",
            G => "g",
            Ge => "ge",
            B => "b",
            Be => "be",
            A => "a",
            Ae => "ae",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SymbolType {
    Function,
    Object,
}

/// Assembler directives.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Directive {
    File(String),
    Text,
    Data,
    Section(String),
    Globl(String),
    Local(String),
    Type(String, SymbolType),
    /// `.size sym, expr`; functions use `.-sym`.
    Size(String, String),
    Align(u64),
    Comm(String, u64, u64),
    Byte(i64),
    Value(i64),
    Long(Immediate),
    Quad(Immediate),
    String(String),
}

impl Display for Directive {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        use Directive::*;
        match self {
            File(name) => f.write_fmt(format_args!(".file\t\"{}\"", escape(name))),
            Text => f.write_str(".text"),
            Data => f.write_str(".data"),
            Section(name) => f.write_fmt(format_args!(".section\t{}", name)),
            Globl(sym) => f.write_fmt(format_args!(".globl\t{}", sym)),
            Local(sym) => f.write_fmt(format_args!(".local\t{}", sym)),
            Type(sym, SymbolType::Function) => {
                f.write_fmt(format_args!(".type\t{},@function", sym))
            }
            Type(sym, SymbolType::Object) => f.write_fmt(format_args!(".type\t{},@object", sym)),
            Size(sym, size) => f.write_fmt(format_args!(".size\t{}, {}", sym, size)),
            Align(n) => f.write_fmt(format_args!(".align\t{}", n)),
            Comm(sym, size, align) => {
                f.write_fmt(format_args!(".comm\t{},{},{}", sym, size, align))
            }
            Byte(v) => f.write_fmt(format_args!(".byte\t{}", v)),
            Value(v) => f.write_fmt(format_args!(".value\t{}", v)),
            Long(v) => f.write_fmt(format_args!(".long\t{}", v)),
            Quad(v) => f.write_fmt(format_args!(".quad\t{}", v)),
            String(s) => f.write_fmt(format_args!(".string\t\"{}\"", escape(s))),
        }
    }
}

/// Escapes a string for use inside a GNU as string literal.
pub fn escape(s: &str) -> std::string::String {
    let mut out = std::string::String::new();
    for b in s.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out
}

/// One item of an assembly listing.  Operands of two operand instructions
/// are stored source first, destination second.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Inst {
    Comment(String),
    Label(String),
    Directive(Directive),

    Jmp(Operand),
    J(Cond, Operand),
    Call(Operand),
    Ret,
    Cltd,

    Push(Operand),
    Pop(Operand),
    Mov(Operand, Operand),
    /// Sign extending move from a value of the given width.
    Movs(RegSize, Operand, Operand),
    /// Zero extending move from a value of the given width.
    Movz(RegSize, Operand, Operand),
    Lea(Operand, Operand),

    Add(Operand, Operand),
    Sub(Operand, Operand),
    Imul(Operand, Operand),
    Idiv(Operand),
    Div(Operand),
    Neg(Operand),
    Not(Operand),

    And(Operand, Operand),
    Or(Operand, Operand),
    Xor(Operand, Operand),
    Sal(Operand, Operand),
    Sar(Operand, Operand),
    Shr(Operand, Operand),

    Cmp(Operand, Operand),
    Test(Operand, Operand),
    Set(Cond, Operand),
}

impl Inst {
    pub fn is_instruction(&self) -> bool {
        !matches!(self, Inst::Comment(_) | Inst::Label(_) | Inst::Directive(_))
    }

    pub fn operands(&self) -> Vec<&Operand> {
        use Inst::*;
        match self {
            Comment(_) | Label(_) | Directive(_) | Ret | Cltd => vec![],
            Jmp(a) | J(_, a) | Call(a) | Push(a) | Pop(a) | Idiv(a) | Div(a) | Neg(a)
            | Not(a) | Set(_, a) => vec![a],
            Mov(a, b) | Movs(_, a, b) | Movz(_, a, b) | Lea(a, b) | Add(a, b) | Sub(a, b)
            | Imul(a, b) | And(a, b) | Or(a, b) | Xor(a, b) | Sal(a, b) | Sar(a, b)
            | Shr(a, b) | Cmp(a, b) | Test(a, b) => vec![a, b],
        }
    }

    /// The width suffix: taken from the last register operand, which is the
    /// destination whenever the destination is a register.
    fn suffix(&self) -> char {
        self.operands()
            .iter()
            .rev()
            .find_map(|o| o.reg())
            .map(|r| r.size().suffix())
            .unwrap_or('l')
    }

    /// The mnemonic including its width suffix.
    pub fn mnemonic(&self) -> std::string::String {
        use Inst::*;
        let base = match self {
            Comment(_) | Label(_) | Directive(_) => return "".into(),
            Jmp(_) => return "jmp".into(),
            J(cc, _) => return format!("j{}", cc),
            Call(_) => return "call".into(),
            Ret => return "ret".into(),
            Cltd => return "cltd".into(),
            Set(cc, _) => return format!("set{}", cc),
            Push(_) => return "pushl".into(),
            Pop(_) => return "popl".into(),
            Lea(..) => return "leal".into(),
            Movs(from, ..) => return format!("movs{}{}", from.suffix(), self.suffix()),
            Movz(from, ..) => return format!("movz{}{}", from.suffix(), self.suffix()),
            Mov(..) => "mov",
            Add(..) => "add",
            Sub(..) => "sub",
            Imul(..) => "imul",
            Idiv(_) => "idiv",
            Div(_) => "div",
            Neg(_) => "neg",
            Not(_) => "not",
            And(..) => "and",
            Or(..) => "or",
            Xor(..) => "xor",
            Sal(..) => "sal",
            Sar(..) => "sar",
            Shr(..) => "shr",
            Cmp(..) => "cmp",
            Test(..) => "test",
        };
        format!("{}{}", base, self.suffix())
    }
}

impl Display for Inst {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Inst::Comment(comment) => f.write_fmt(format_args!("\t# {}", comment)),
            Inst::Label(lbl) => f.write_fmt(format_args!("{}:", lbl)),
            Inst::Directive(d) => f.write_fmt(format_args!("\t{}", d)),
            Inst::Jmp(Operand::Register(r)) | Inst::Call(Operand::Register(r)) => {
                f.write_fmt(format_args!("\t{}\t*{}", self.mnemonic(), r))
            }
            _ => {
                f.write_fmt(format_args!("\t{}", self.mnemonic()))?;
                let operands: Vec<std::string::String> =
                    self.operands().iter().map(|o| o.to_string()).collect();
                if !operands.is_empty() {
                    f.write_fmt(format_args!("\t{}", operands.join(", ")))?;
                }
                Ok(())
            }
        }
    }
}

/// An ordered listing of assembly items.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AssemblyCode {
    items: Vec<Inst>,
}

impl AssemblyCode {
    pub fn new() -> AssemblyCode {
        AssemblyCode { items: vec![] }
    }

    pub fn push(&mut self, inst: Inst) {
        self.items.push(inst)
    }

    pub fn append(&mut self, other: AssemblyCode) {
        self.items.extend(other.items)
    }

    pub fn items(&self) -> &[Inst] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<Inst> {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Inst> {
        self.items.iter()
    }

    /// Number of real instructions, not counting labels, comments and
    /// directives.
    pub fn instruction_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_instruction()).count()
    }
}

impl Display for AssemblyCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for item in &self.items {
            f.write_fmt(format_args!("{}\n", item))?;
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! unit_op {
    (ret) => {
        $crate::compiler::x86::assembly::Inst::Ret
    };
    (cltd) => {
        $crate::compiler::x86::assembly::Inst::Cltd
    };
}

#[macro_export]
macro_rules! unary_op {
    (jmp) => {
        $crate::compiler::x86::assembly::Inst::Jmp
    };
    (call) => {
        $crate::compiler::x86::assembly::Inst::Call
    };
    (push) => {
        $crate::compiler::x86::assembly::Inst::Push
    };
    (pop) => {
        $crate::compiler::x86::assembly::Inst::Pop
    };
    (idiv) => {
        $crate::compiler::x86::assembly::Inst::Idiv
    };
    (div) => {
        $crate::compiler::x86::assembly::Inst::Div
    };
    (neg) => {
        $crate::compiler::x86::assembly::Inst::Neg
    };
    (not) => {
        $crate::compiler::x86::assembly::Inst::Not
    };
    (je) => {
        |o| $crate::compiler::x86::assembly::Inst::J($crate::compiler::x86::assembly::Cond::E, o)
    };
    (jne) => {
        |o| $crate::compiler::x86::assembly::Inst::J($crate::compiler::x86::assembly::Cond::Ne, o)
    };
}

#[macro_export]
macro_rules! binary_op {
    (mov) => {
        $crate::compiler::x86::assembly::Inst::Mov
    };
    (lea) => {
        $crate::compiler::x86::assembly::Inst::Lea
    };
    (add) => {
        $crate::compiler::x86::assembly::Inst::Add
    };
    (sub) => {
        $crate::compiler::x86::assembly::Inst::Sub
    };
    (imul) => {
        $crate::compiler::x86::assembly::Inst::Imul
    };
    (and) => {
        $crate::compiler::x86::assembly::Inst::And
    };
    (or) => {
        $crate::compiler::x86::assembly::Inst::Or
    };
    (xor) => {
        $crate::compiler::x86::assembly::Inst::Xor
    };
    (sal) => {
        $crate::compiler::x86::assembly::Inst::Sal
    };
    (sar) => {
        $crate::compiler::x86::assembly::Inst::Sar
    };
    (shr) => {
        $crate::compiler::x86::assembly::Inst::Shr
    };
    (cmp) => {
        $crate::compiler::x86::assembly::Inst::Cmp
    };
    (test) => {
        $crate::compiler::x86::assembly::Inst::Test
    };
}

#[macro_export]
macro_rules! register {
    (eax) => {
        $crate::compiler::x86::assembly::RegClass::Ax.for_type($crate::compiler::arch::registers::RegSize::R32)
    };
    (ebx) => {
        $crate::compiler::x86::assembly::RegClass::Bx.for_type($crate::compiler::arch::registers::RegSize::R32)
    };
    (ecx) => {
        $crate::compiler::x86::assembly::RegClass::Cx.for_type($crate::compiler::arch::registers::RegSize::R32)
    };
    (edx) => {
        $crate::compiler::x86::assembly::RegClass::Dx.for_type($crate::compiler::arch::registers::RegSize::R32)
    };
    (esi) => {
        $crate::compiler::x86::assembly::RegClass::Si.for_type($crate::compiler::arch::registers::RegSize::R32)
    };
    (edi) => {
        $crate::compiler::x86::assembly::RegClass::Di.for_type($crate::compiler::arch::registers::RegSize::R32)
    };
    (esp) => {
        $crate::compiler::x86::assembly::RegClass::Sp.for_type($crate::compiler::arch::registers::RegSize::R32)
    };
    (ebp) => {
        $crate::compiler::x86::assembly::RegClass::Bp.for_type($crate::compiler::arch::registers::RegSize::R32)
    };
    (al) => {
        $crate::compiler::x86::assembly::RegClass::Ax.for_type($crate::compiler::arch::registers::RegSize::R8)
    };
    (cl) => {
        $crate::compiler::x86::assembly::RegClass::Cx.for_type($crate::compiler::arch::registers::RegSize::R8)
    };
}

#[macro_export]
macro_rules! operand {
    // memory
    ([%{$reg:expr} + {$e:expr}]) => {
        $crate::compiler::x86::assembly::Operand::Memory(
            $crate::compiler::x86::assembly::MemRef::based($reg, ($e) as i64),
        )
    };
    ([%{$reg:expr}]) => {
        $crate::compiler::x86::assembly::Operand::Memory(
            $crate::compiler::x86::assembly::MemRef::based($reg, 0),
        )
    };
    ([%$reg:tt + {$e:expr}]) => {
        $crate::compiler::x86::assembly::Operand::Memory(
            $crate::compiler::x86::assembly::MemRef::based($crate::register!($reg), ($e) as i64),
        )
    };
    ([%$reg:tt - {$e:expr}]) => {
        $crate::compiler::x86::assembly::Operand::Memory(
            $crate::compiler::x86::assembly::MemRef::based($crate::register!($reg), -(($e) as i64)),
        )
    };
    ([%$reg:tt]) => {
        $crate::compiler::x86::assembly::Operand::Memory(
            $crate::compiler::x86::assembly::MemRef::based($crate::register!($reg), 0),
        )
    };

    // immediate
    ({$e:expr}) => {
        $crate::compiler::x86::assembly::Operand::int(($e) as i64)
    };

    // operand expression
    (($e:expr)) => {
        $e
    };

    // register
    (%{$reg:expr}) => {
        $crate::compiler::x86::assembly::Operand::Register($reg)
    };
    (%$reg:tt) => {
        $crate::compiler::x86::assembly::Operand::Register($crate::register!($reg))
    };

    // branch target
    (@{$e:expr}) => {
        $crate::compiler::x86::assembly::Operand::Symbol(($e).to_string())
    };
    (@$e:tt) => {
        $crate::compiler::x86::assembly::Operand::Symbol(stringify!($e).into())
    };

    ($e:literal) => {
        $crate::compiler::x86::assembly::Operand::int($e)
    };
}

#[macro_export]
macro_rules! assembly {
    (($buf:expr) {}) => {
    };

    /********************/
    /*  MACRO OPERATIONS */
    /********************/
    // Append another listing
    (($buf:expr) {{{$is:expr}} $($tail:tt)*}) => {
        for inst in $is.iter() {
            $buf.push(inst.clone());
        }
        $crate::assembly!(($buf) {$($tail)*})
    };

    /********************/
    /*     COMMENTS       */
    /********************/
    (($buf:expr) {;$comment:literal $($tail:tt)*}) => {
        $buf.push($crate::compiler::x86::assembly::Inst::Comment($comment.into()));
        $crate::assembly!(($buf) {$($tail)*})
    };
    (($buf:expr) {;{$comment:expr} $($tail:tt)*}) => {
        $buf.push($crate::compiler::x86::assembly::Inst::Comment(($comment).to_string()));
        $crate::assembly!(($buf) {$($tail)*})
    };

    /********************/
    /*     LABELS       */
    /********************/
    (($buf:expr) {@{$label:expr}: $($tail:tt)*}) => {
        $buf.push($crate::compiler::x86::assembly::Inst::Label(($label).to_string()));
        $crate::assembly!(($buf) {$($tail)*})
    };
    (($buf:expr) {@$label:tt: $($tail:tt)*}) => {
        $buf.push($crate::compiler::x86::assembly::Inst::Label(stringify!($label).into()));
        $crate::assembly!(($buf) {$($tail)*})
    };

    /********************/
    /* UNIT OPERATORS */
    /********************/
    (($buf:expr) {$inst:tt; $($tail:tt)*}) => {
        $buf.push($crate::unit_op!($inst));
        $crate::assembly!(($buf) {$($tail)*})
    };

    /********************/
    /* UNARY OPERATORS */
    /********************/
    (($buf:expr) {$inst:tt % $a:tt; $($tail:tt)*}) => {
        $buf.push($crate::unary_op!($inst)($crate::operand!(% $a)));
        $crate::assembly!(($buf) {$($tail)*})
    };
    (($buf:expr) {$inst:tt @ $a:tt; $($tail:tt)*}) => {
        $buf.push($crate::unary_op!($inst)($crate::operand!(@ $a)));
        $crate::assembly!(($buf) {$($tail)*})
    };
    (($buf:expr) {$inst:tt $a:tt; $($tail:tt)*}) => {
        $buf.push($crate::unary_op!($inst)($crate::operand!($a)));
        $crate::assembly!(($buf) {$($tail)*})
    };

    /********************/
    /* BINARY OPERATORS */
    /********************/
    // reg, reg
    (($buf:expr) {$inst:tt % $a:tt, % $b:tt; $($tail:tt)*}) => {
        $buf.push($crate::binary_op!($inst)($crate::operand!(% $a), $crate::operand!(% $b)));
        $crate::assembly!(($buf) {$($tail)*})
    };
    // reg, any
    (($buf:expr) {$inst:tt % $a:tt, $b:tt; $($tail:tt)*}) => {
        $buf.push($crate::binary_op!($inst)($crate::operand!(% $a), $crate::operand!($b)));
        $crate::assembly!(($buf) {$($tail)*})
    };
    // any, reg
    (($buf:expr) {$inst:tt $a:tt, % $b:tt; $($tail:tt)*}) => {
        $buf.push($crate::binary_op!($inst)($crate::operand!($a), $crate::operand!(% $b)));
        $crate::assembly!(($buf) {$($tail)*})
    };
    // any, any
    (($buf:expr) {$inst:tt $a:tt, $b:tt; $($tail:tt)*}) => {
        $buf.push($crate::binary_op!($inst)($crate::operand!($a), $crate::operand!($b)));
        $crate::assembly!(($buf) {$($tail)*})
    };
}
