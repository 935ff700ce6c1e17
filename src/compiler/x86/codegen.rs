use log::{debug, info, trace};
use stdext::function_name;

use crate::{
    assembly,
    compiler::{
        arch::registers::RegSize,
        entity::{EntityId, EntityTable, Storage},
        mir::{
            ir::{Expr, ExprKind, Function, Label, Mir, StaticVariable, Stmt, StmtKind},
            validate::check_labels,
            Op,
        },
        stringtable::ConstantTable,
        types::TypeTable,
        Location,
    },
};

use super::{
    assembly::{
        AssemblyCode, Cond, Directive, Immediate, Inst, MemRef, Operand, RegClass, SymbolType,
    },
    frame::{FrameLayout, STACK_WORD},
};

/// Settings of the code generator which do not change the meaning of the
/// program.
#[derive(Debug, Clone, Default)]
pub struct CodegenOptions {
    /// Emitted as the `.file` directive.
    pub file_name: Option<String>,
    /// Comment every MIR statement with its source location.
    pub verbose_asm: bool,
}

/// Generates i386 assembly for `mir`.
///
/// # Panics
/// If the type table is not for the ILP32 profile, or the MIR breaks one of
/// its invariants.
pub fn generate_assembly(mir: Mir, types: &TypeTable) -> AssemblyCode {
    generate_assembly_with(mir, types, &CodegenOptions::default())
}

pub fn generate_assembly_with(mut mir: Mir, types: &TypeTable, options: &CodegenOptions) -> AssemblyCode {
    if types.pointer_size() != STACK_WORD {
        panic!(
            "The x86 target needs 4 byte pointers but profile {} has {} byte pointers",
            types.profile().name,
            types.pointer_size()
        )
    }
    debug!(
        "Generate assembly for {} variables and {} functions",
        mir.variables.len(),
        mir.functions.len()
    );

    locate_symbols(&mut mir);

    let mut code = AssemblyCode::new();
    if let Some(name) = &options.file_name {
        code.push(Inst::Directive(Directive::File(name.clone())));
    }
    emit_variables(&mir, types, &mut code);
    emit_strings(&mir.constants, &mut code);

    let Mir {
        mut entities,
        constants,
        functions,
        mut labels,
        ..
    } = mir;
    for func in &functions {
        let epilogue = labels.new_label();
        let gen = FunctionGenerator::new(func, &mut entities, &constants, types, options, epilogue);
        code.append(gen.generate());
    }

    debug!("Generated {} instructions", code.instruction_count());
    code
}

/// Places everything with static storage: string literals, static
/// variables, functions and named constants.
fn locate_symbols(mir: &mut Mir) {
    for id in mir.constants.ids() {
        mir.constants.get_mut(id).symbol = Some(format!(".LC{}", id.index()));
    }

    for var in &mir.variables {
        let entity = mir.entities.get_mut(var.entity);
        let symbol = entity.symbol();
        entity.set_storage(Storage::Memory(MemRef::symbol(&symbol)));
    }

    let functions = mir.functions.iter().map(|f| f.entity);
    for id in mir.undefined.iter().copied().chain(functions) {
        let entity = mir.entities.get_mut(id);
        let symbol = entity.symbol();
        let storage = if entity.is_function() {
            Storage::Immediate(Immediate::Symbol(symbol))
        } else {
            Storage::Memory(MemRef::symbol(&symbol))
        };
        entity.set_storage(storage);
    }

    for constant in &mir.named_constants {
        let imm = match constant.value.as_ref().map(|v| &v.kind) {
            Some(ExprKind::Int(i)) => Immediate::Int(*i),
            Some(ExprKind::Str(s)) => Immediate::Symbol(mir.constants.get(*s).memref().to_string()),
            Some(ExprKind::Addr(e)) => Immediate::Symbol(mir.entities.get(*e).symbol()),
            _ => panic!(
                "Constant {} has no assembler value",
                mir.entities.get(constant.entity).name
            ),
        };
        mir.entities
            .get_mut(constant.entity)
            .set_storage(Storage::Immediate(imm));
    }
}

fn emit_variables(mir: &Mir, types: &TypeTable, code: &mut AssemblyCode) {
    let (initialized, zeroed): (Vec<&StaticVariable>, Vec<&StaticVariable>) =
        mir.variables.iter().partition(|v| v.init.is_some());

    if !initialized.is_empty() {
        code.push(Inst::Directive(Directive::Data));
    }
    for var in initialized {
        let entity = mir.entities.get(var.entity);
        let symbol = entity.symbol();
        let ty = entity.ty();
        let size = types.size(ty);
        if !entity.private {
            code.push(Inst::Directive(Directive::Globl(symbol.clone())));
        }
        code.push(Inst::Directive(Directive::Align(types.alignment(ty))));
        code.push(Inst::Directive(Directive::Type(symbol.clone(), SymbolType::Object)));
        code.push(Inst::Directive(Directive::Size(symbol.clone(), size.to_string())));
        code.push(Inst::Label(symbol));
        if let Some(init) = &var.init {
            code.push(Inst::Directive(data_directive(mir, init, size)));
        }
    }

    for var in zeroed {
        let entity = mir.entities.get(var.entity);
        let symbol = entity.symbol();
        let ty = entity.ty();
        if entity.private {
            code.push(Inst::Directive(Directive::Local(symbol.clone())));
        }
        code.push(Inst::Directive(Directive::Comm(
            symbol,
            types.size(ty),
            types.alignment(ty),
        )));
    }
}

/// The directive which stores the constant `init` in `size` bytes.
fn data_directive(mir: &Mir, init: &Expr, size: u64) -> Directive {
    match (&init.kind, size) {
        (ExprKind::Int(i), 1) => Directive::Byte(*i),
        (ExprKind::Int(i), 2) => Directive::Value(*i),
        (ExprKind::Int(i), 4) => Directive::Long(Immediate::Int(*i)),
        (ExprKind::Int(i), 8) => Directive::Quad(Immediate::Int(*i)),
        (ExprKind::Str(s), 4) => {
            Directive::Long(Immediate::Symbol(mir.constants.get(*s).memref().to_string()))
        }
        (ExprKind::Addr(e), 4) => Directive::Long(Immediate::Symbol(mir.entities.get(*e).symbol())),
        _ => panic!("Cannot store {} in {} bytes of static data", init, size),
    }
}

fn emit_strings(constants: &ConstantTable, code: &mut AssemblyCode) {
    if constants.is_empty() {
        return;
    }
    code.push(Inst::Directive(Directive::Section(".rodata".into())));
    for (_, entry) in constants.iter() {
        code.push(Inst::Label(entry.memref().to_string()));
        code.push(Inst::Directive(Directive::String(entry.value.clone())));
    }
}

/// The stages of generating one function, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    FrameLayoutAssigned,
    InstructionsEmitted,
    EpiloguesNormalized,
    Done,
}

/// Generates the code of one function.  Expressions are evaluated into
/// `%eax`, using the view of the register that matches the width of the
/// value; `%ecx` holds the second operand of binary operations and
/// intermediate results are saved on the stack.
struct FunctionGenerator<'a> {
    func: &'a Function,
    entities: &'a mut EntityTable,
    constants: &'a ConstantTable,
    types: &'a TypeTable,
    options: &'a CodegenOptions,
    name: String,
    epilogue: Label,
    phase: Phase,
    frame_size: u64,
    body: AssemblyCode,
}

impl<'a> FunctionGenerator<'a> {
    fn new(
        func: &'a Function,
        entities: &'a mut EntityTable,
        constants: &'a ConstantTable,
        types: &'a TypeTable,
        options: &'a CodegenOptions,
        epilogue: Label,
    ) -> FunctionGenerator<'a> {
        let name = entities.get(func.entity).symbol();
        FunctionGenerator {
            func,
            entities,
            constants,
            types,
            options,
            name,
            epilogue,
            phase: Phase::Start,
            frame_size: 0,
            body: AssemblyCode::new(),
        }
    }

    fn generate(mut self) -> AssemblyCode {
        if let Err(msg) = check_labels(self.func) {
            panic!("{}: {}", self.name, msg)
        }
        self.assign_frame();
        self.emit_body();
        self.normalize_epilogues();
        self.finish()
    }

    fn advance(&mut self, from: Phase, to: Phase) {
        if self.phase != from {
            panic!(
                "{}: cannot move to {:?} from {:?}, expected {:?}",
                self.name, to, self.phase, from
            )
        }
        trace!("{}: {:?} -> {:?}", self.name, from, to);
        self.phase = to;
    }

    fn assign_frame(&mut self) {
        self.advance(Phase::Start, Phase::FrameLayoutAssigned);
        let frame = FrameLayout::compute(self.func, self.entities, self.types);
        frame.assign(self.entities);
        self.frame_size = frame.size;
    }

    fn emit_body(&mut self) {
        self.advance(Phase::FrameLayoutAssigned, Phase::InstructionsEmitted);
        let func = self.func;
        for stmt in &func.body {
            self.compile_stmt(stmt);
        }
    }

    /// Removes jumps to the label which immediately follows them.  Every
    /// return is a jump to the epilogue, so a return at the end of the body
    /// falls through instead.
    fn normalize_epilogues(&mut self) {
        self.advance(Phase::InstructionsEmitted, Phase::EpiloguesNormalized);
        let epilogue = self.epilogue.to_string();
        let items = std::mem::take(self.body.items_mut());
        let mut kept = Vec::with_capacity(items.len());
        for (idx, inst) in items.iter().enumerate() {
            if let Inst::Jmp(Operand::Symbol(target)) = inst {
                let next = match items.get(idx + 1) {
                    Some(Inst::Label(label)) => Some(label),
                    Some(_) => None,
                    None => Some(&epilogue),
                };
                if next == Some(target) {
                    trace!("{}: drop jump to {}", self.name, target);
                    continue;
                }
            }
            kept.push(inst.clone());
        }
        *self.body.items_mut() = kept;
    }

    /// Wraps the body in the prologue and the single epilogue.
    fn finish(mut self) -> AssemblyCode {
        self.advance(Phase::EpiloguesNormalized, Phase::Done);
        let name = self.name.clone();
        let frame = self.frame_size;
        let epilogue = self.epilogue;
        let body = std::mem::take(&mut self.body);
        info!(
            "{}: {} byte frame, {} instructions",
            name,
            frame,
            body.instruction_count()
        );

        let mut code = AssemblyCode::new();
        code.push(Inst::Directive(Directive::Text));
        if !self.entities.get(self.func.entity).private {
            code.push(Inst::Directive(Directive::Globl(name.clone())));
        }
        code.push(Inst::Directive(Directive::Type(name.clone(), SymbolType::Function)));
        assembly! {(code) {
        @{name}:
            push %ebp;
            mov %esp, %ebp;
        }}
        if frame > 0 {
            assembly! {(code) {
                sub {frame}, %esp;
            }}
        }
        code.append(body);
        assembly! {(code) {
        @{epilogue}:
            mov %ebp, %esp;
            pop %ebp;
            ret;
        }}
        code.push(Inst::Directive(Directive::Size(name.clone(), format!(".-{}", name))));
        code
    }

    fn compile_stmt(&mut self, stmt: &Stmt) {
        trace!("{}: {}", function_name!(), stmt);
        if self.options.verbose_asm && !matches!(stmt.kind, StmtKind::LabelStmt(_)) {
            if let Some(loc) = stmt.location {
                self.comment(loc, stmt);
            }
        }

        match &stmt.kind {
            StmtKind::ExprStmt(e) => self.compile_expr(e),
            StmtKind::Assign { lhs, rhs } => self.store(lhs, rhs),
            StmtKind::Jump(label) => {
                assembly! {(self.body) {
                    jmp @{label};
                }}
            }
            StmtKind::CJump { cond, then, els } => self.branch(cond, *then, *els),
            StmtKind::LabelStmt(label) => {
                assembly! {(self.body) {
                @{label}:
                }}
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.compile_expr(value);
                }
                let epilogue = self.epilogue;
                assembly! {(self.body) {
                    jmp @{epilogue};
                }}
            }
        }
    }

    fn comment(&mut self, loc: Location, stmt: &Stmt) {
        self.body.push(Inst::Comment(format!("{}: {}", loc, stmt)));
    }

    /// Leaves the value of `e` in `%eax`.
    fn compile_expr(&mut self, e: &Expr) {
        trace!("{}: {}", function_name!(), e);
        let ax = RegClass::Ax.for_type(e.width);
        match &e.kind {
            ExprKind::Int(i) => {
                assembly! {(self.body) {
                    mov {*i}, %eax;
                }}
            }
            ExprKind::Str(s) => {
                let label = Operand::Immediate(Immediate::Symbol(self.constants.get(*s).memref().to_string()));
                assembly! {(self.body) {
                    mov (label), %eax;
                }}
            }
            ExprKind::Var(v) => {
                let src = self.storage_operand(*v);
                assembly! {(self.body) {
                    mov (src), %{ax};
                }}
            }
            ExprKind::Addr(v) => self.compile_address(*v),
            ExprKind::Mem(addr) => {
                let src = self.address_operand(addr);
                assembly! {(self.body) {
                    mov (Operand::Memory(src)), %{ax};
                }}
            }
            ExprKind::Uni(op, operand) => self.unary(e.width, *op, operand),
            ExprKind::Bin(op, l, r) => self.binary(e.width, *op, l, r),
            ExprKind::Call { callee, args } => self.call(e, callee, args),
        }
    }

    fn compile_address(&mut self, v: EntityId) {
        let entity = self.entities.get(v);
        match (entity.storage(), entity.address()) {
            (_, Some(addr)) => {
                assembly! {(self.body) {
                    mov (addr), %eax;
                }}
            }
            (Storage::Memory(mem), None) => {
                let mem = Operand::Memory(mem.clone());
                assembly! {(self.body) {
                    lea (mem), %eax;
                }}
            }
            (storage, None) => panic!("{} at {:?} has no address", entity.name, storage),
        }
    }

    fn storage_operand(&self, v: EntityId) -> Operand {
        match self.entities.get(v).storage() {
            Storage::Memory(mem) => Operand::Memory(mem.clone()),
            Storage::Register(reg) => Operand::Register(*reg),
            Storage::Immediate(imm) => Operand::Immediate(imm.clone()),
        }
    }

    /// The memory `addr` points to, if an addressing mode can reach it
    /// without computing the address first.
    fn direct_memory(&self, addr: &Expr) -> Option<MemRef> {
        match &addr.kind {
            ExprKind::Addr(v) => match self.entities.get(*v).storage() {
                Storage::Memory(mem) => Some(mem.clone()),
                _ => None,
            },
            ExprKind::Str(s) => Some(self.constants.get(*s).memref()),
            ExprKind::Bin(op, base, offset) => match (op, &offset.kind) {
                (Op::Add, ExprKind::Int(k)) => self.direct_memory(base).map(|m| m.offset_by(*k)),
                (Op::Sub, ExprKind::Int(k)) => self.direct_memory(base).map(|m| m.offset_by(-*k)),
                _ => None,
            },
            _ => None,
        }
    }

    /// The memory `addr` points to.  A computed address is left in `%eax`
    /// and the reference is based on it.
    fn address_operand(&mut self, addr: &Expr) -> MemRef {
        if let Some(mem) = self.direct_memory(addr) {
            return mem;
        }
        if let ExprKind::Bin(Op::Add, base, offset) = &addr.kind {
            if let ExprKind::Int(k) = offset.kind {
                return self.address_operand(base).offset_by(k);
            }
        }
        self.compile_expr(addr);
        MemRef::based(RegClass::Ax.for_type(RegSize::R32), 0)
    }

    fn store(&mut self, lhs: &Expr, rhs: &Expr) {
        let width = rhs.width;
        match self.direct_memory(lhs) {
            Some(dst) => {
                self.compile_expr(rhs);
                let ax = RegClass::Ax.for_type(width);
                assembly! {(self.body) {
                    mov %{ax}, (Operand::Memory(dst));
                }}
            }
            None => {
                self.compile_expr(rhs);
                assembly! {(self.body) {
                    push %eax;
                }}
                let dst = self.address_operand(lhs);
                let cx = RegClass::Cx.for_type(width);
                assembly! {(self.body) {
                    pop %ecx;
                    mov %{cx}, (Operand::Memory(dst));
                }}
            }
        }
    }

    /// Widens the value of `class` from `from` to `to` bits.  Narrowing
    /// needs no code: the narrower view of the register is used.
    fn extend(&mut self, class: RegClass, from: RegSize, to: RegSize, signed: bool) {
        if from >= to {
            return;
        }
        let src = Operand::Register(class.for_type(from));
        let dst = Operand::Register(class.for_type(to));
        self.body.push(if signed {
            Inst::Movs(from, src, dst)
        } else {
            Inst::Movz(from, src, dst)
        });
    }

    fn unary(&mut self, width: RegSize, op: Op, operand: &Expr) {
        self.compile_expr(operand);
        let ax = RegClass::Ax.for_type(width);
        match op {
            Op::UMinus => {
                assembly! {(self.body) {
                    neg %{ax};
                }}
            }
            Op::BitNot => {
                assembly! {(self.body) {
                    not %{ax};
                }}
            }
            Op::Not => {
                let src = RegClass::Ax.for_type(operand.width);
                assembly! {(self.body) {
                    cmp {0}, %{src};
                }}
                self.set_flag(Cond::E, width);
            }
            Op::SCast => self.extend(RegClass::Ax, operand.width, width, true),
            Op::UCast => self.extend(RegClass::Ax, operand.width, width, false),
            _ => panic!("{} is not a unary operator", op),
        }
    }

    /// `%al = cond`, widened to `width`.
    fn set_flag(&mut self, cond: Cond, width: RegSize) {
        let al = RegClass::Ax.for_type(RegSize::R8);
        self.body.push(Inst::Set(cond, Operand::Register(al)));
        self.extend(RegClass::Ax, RegSize::R8, width, false);
    }

    /// Evaluates `r` and then `l`, both widened to `width`.  The left value
    /// is left in `%eax`; the returned operand is the right value, either
    /// an immediate or `%ecx`.
    fn operands(&mut self, l: &Expr, r: &Expr, width: RegSize, signed: bool) -> Operand {
        if let ExprKind::Int(i) = r.kind {
            self.compile_expr(l);
            self.extend(RegClass::Ax, l.width, width, signed);
            return Operand::int(i);
        }

        self.compile_expr(r);
        self.extend(RegClass::Ax, r.width, width, signed);
        assembly! {(self.body) {
            push %eax;
        }}
        self.compile_expr(l);
        self.extend(RegClass::Ax, l.width, width, signed);
        assembly! {(self.body) {
            pop %ecx;
        }}
        Operand::Register(RegClass::Cx.for_type(width))
    }

    fn binary(&mut self, width: RegSize, op: Op, l: &Expr, r: &Expr) {
        if op.is_compare() {
            let w = l.width;
            let rhs = self.operands(l, r, w, is_signed(op));
            let ax = RegClass::Ax.for_type(w);
            assembly! {(self.body) {
                cmp (rhs), %{ax};
            }}
            self.set_flag(condition(op), width);
            return;
        }

        let rhs = self.operands(l, r, width, is_signed(op));
        let ax = RegClass::Ax.for_type(width);
        match op {
            Op::Add => self.body.push(Inst::Add(rhs, Operand::Register(ax))),
            Op::Sub => self.body.push(Inst::Sub(rhs, Operand::Register(ax))),
            Op::BitAnd => self.body.push(Inst::And(rhs, Operand::Register(ax))),
            Op::BitOr => self.body.push(Inst::Or(rhs, Operand::Register(ax))),
            Op::BitXor => self.body.push(Inst::Xor(rhs, Operand::Register(ax))),
            Op::Mul => {
                // imul has no byte form; the low bits of the 32 bit product
                // are the same
                let rhs = match rhs {
                    Operand::Register(_) => Operand::Register(RegClass::Cx.for_type(RegSize::R32)),
                    imm => imm,
                };
                assembly! {(self.body) {
                    imul (rhs), %eax;
                }}
            }
            Op::SDiv | Op::SMod | Op::UDiv | Op::UMod => self.divide(width, op, rhs),
            Op::BitLShift | Op::BitRShift | Op::ArithRShift => {
                let count = match rhs {
                    Operand::Register(_) => Operand::Register(RegClass::Cx.for_type(RegSize::R8)),
                    imm => imm,
                };
                let dst = Operand::Register(ax);
                self.body.push(match op {
                    Op::BitLShift => Inst::Sal(count, dst),
                    Op::BitRShift => Inst::Shr(count, dst),
                    _ => Inst::Sar(count, dst),
                });
            }
            _ => panic!("{} is not a binary operator", op),
        }
    }

    /// `%eax / rhs` or `%eax % rhs` computed on 32 bit values.
    fn divide(&mut self, width: RegSize, op: Op, rhs: Operand) {
        let signed = is_signed(op);
        if let Operand::Immediate(_) = rhs {
            assembly! {(self.body) {
                mov (rhs), %ecx;
            }}
        }
        self.extend(RegClass::Ax, width, RegSize::R32, signed);
        self.extend(RegClass::Cx, width, RegSize::R32, signed);
        if signed {
            assembly! {(self.body) {
                cltd;
                idiv %ecx;
            }}
        } else {
            assembly! {(self.body) {
                xor %edx, %edx;
                div %ecx;
            }}
        }
        if matches!(op, Op::SMod | Op::UMod) {
            assembly! {(self.body) {
                mov %edx, %eax;
            }}
        }
    }

    /// Arguments are pushed right to left and popped by the caller.
    fn call(&mut self, call: &Expr, callee: &Expr, args: &[Expr]) {
        for arg in args.iter().rev() {
            self.compile_expr(arg);
            assembly! {(self.body) {
                push %eax;
            }}
        }

        match call.static_callee(self.entities) {
            Some(f) => {
                let target = self.entities.get(f).symbol();
                assembly! {(self.body) {
                    call @{target};
                }}
            }
            None => {
                self.compile_expr(callee);
                self.body.push(Inst::Call(Operand::Register(
                    RegClass::Ax.for_type(RegSize::R32),
                )));
            }
        }

        if !args.is_empty() {
            let size = args.len() as u64 * STACK_WORD;
            assembly! {(self.body) {
                add {size}, %esp;
            }}
        }
    }

    fn branch(&mut self, cond: &Expr, then: Label, els: Label) {
        match &cond.kind {
            ExprKind::Bin(op, l, r) if op.is_compare() => {
                let w = l.width;
                let rhs = self.operands(l, r, w, is_signed(*op));
                let ax = RegClass::Ax.for_type(w);
                assembly! {(self.body) {
                    cmp (rhs), %{ax};
                }}
                self.body
                    .push(Inst::J(condition(*op), Operand::Symbol(then.to_string())));
            }
            _ => {
                self.compile_expr(cond);
                let ax = RegClass::Ax.for_type(cond.width);
                assembly! {(self.body) {
                    test %{ax}, %{ax};
                    jne @{then};
                }}
            }
        }
        assembly! {(self.body) {
            jmp @{els};
        }}
    }
}

fn is_signed(op: Op) -> bool {
    matches!(
        op,
        Op::SDiv | Op::SMod | Op::ArithRShift | Op::SGt | Op::SGteq | Op::SLt | Op::SLteq
    )
}

fn condition(op: Op) -> Cond {
    match op {
        Op::Eq => Cond::E,
        Op::Neq => Cond::Ne,
        Op::SGt => Cond::G,
        Op::SGteq => Cond::Ge,
        Op::SLt => Cond::L,
        Op::SLteq => Cond::Le,
        Op::UGt => Cond::A,
        Op::UGteq => Cond::Ae,
        Op::ULt => Cond::B,
        Op::ULteq => Cond::Be,
        _ => panic!("{} is not a comparison", op),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{
        ast::Block,
        entity::{Entity, EntityKind, LocalScope},
        mir::ir::LabelAllocator,
        types::TypeRef,
    };

    const R8: RegSize = RegSize::R8;
    const R32: RegSize = RegSize::R32;

    struct Unit {
        types: TypeTable,
        entities: EntityTable,
        constants: ConstantTable,
        variables: Vec<StaticVariable>,
        undefined: Vec<EntityId>,
        labels: LabelAllocator,
        functions: Vec<Function>,
    }

    impl Unit {
        fn new() -> Unit {
            Unit {
                types: TypeTable::ilp32(),
                entities: EntityTable::new(),
                constants: ConstantTable::new(),
                variables: vec![],
                undefined: vec![],
                labels: LabelAllocator::new(),
                functions: vec![],
            }
        }

        fn add(&mut self, entity: Entity) -> EntityId {
            let ty = self.types.get(&entity.type_ref);
            let mut entity = entity;
            entity.set_type(ty);
            self.entities.add(entity)
        }

        fn param(&mut self, name: &str, ty: TypeRef) -> EntityId {
            self.add(Entity::new(name, ty, EntityKind::Parameter))
        }

        fn local(&mut self, name: &str, ty: TypeRef) -> EntityId {
            self.add(Entity::new(name, ty, EntityKind::DefinedVariable { initializer: None }))
        }

        fn global(&mut self, name: &str, ty: TypeRef, init: Option<Expr>) -> EntityId {
            let id = self.local(name, ty);
            self.variables.push(StaticVariable { entity: id, init });
            id
        }

        fn extern_fn(&mut self, name: &str) -> EntityId {
            let ty = TypeRef::function(TypeRef::int(), vec![], true);
            let id = self.add(Entity::new(name, ty, EntityKind::UndefinedFunction));
            self.undefined.push(id);
            id
        }

        fn function(&mut self, name: &str, params: Vec<EntityId>, locals: Vec<EntityId>, body: Vec<Stmt>) {
            let ty = TypeRef::function(TypeRef::int(), vec![], false);
            let kind = EntityKind::DefinedFunction {
                params: params.clone(),
                body: Block::default(),
            };
            let entity = self.add(Entity::new(name, ty, kind));
            self.functions.push(Function {
                entity,
                params,
                scope: LocalScope {
                    variables: locals,
                    children: vec![],
                },
                body,
            });
        }

        fn generate_with(self, options: &CodegenOptions) -> String {
            let mir = Mir {
                entities: self.entities,
                constants: self.constants,
                variables: self.variables,
                functions: self.functions,
                named_constants: vec![],
                undefined: self.undefined,
                labels: self.labels,
            };
            generate_assembly_with(mir, &self.types, options).to_string()
        }

        fn generate(self) -> String {
            self.generate_with(&CodegenOptions::default())
        }
    }

    fn stmt(kind: StmtKind) -> Stmt {
        Stmt::new(kind, None)
    }

    fn ret(e: Expr) -> Stmt {
        stmt(StmtKind::Return(Some(e)))
    }

    fn assign(lhs: Expr, rhs: Expr) -> Stmt {
        stmt(StmtKind::Assign { lhs, rhs })
    }

    fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::new(
            R32,
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
        )
    }

    #[test]
    fn sum_of_two_parameters() {
        let mut unit = Unit::new();
        let a = unit.param("a", TypeRef::int());
        let b = unit.param("b", TypeRef::int());
        let sum = Expr::bin(R32, Op::Add, Expr::var(R32, a), Expr::var(R32, b));
        unit.function("add", vec![a, b], vec![], vec![ret(sum)]);

        let expected = "\t.text
\t.globl\tadd
\t.type\tadd,@function
add:
\tpushl\t%ebp
\tmovl\t%esp, %ebp
\tmovl\t12(%ebp), %eax
\tpushl\t%eax
\tmovl\t8(%ebp), %eax
\tpopl\t%ecx
\taddl\t%ecx, %eax
.L0:
\tmovl\t%ebp, %esp
\tpopl\t%ebp
\tret
\t.size\tadd, .-add
";
        assert_eq!(unit.generate(), expected);
    }

    #[test]
    fn narrow_locals_use_narrow_registers() {
        let mut unit = Unit::new();
        let c = unit.local("c", TypeRef::char());
        let i = unit.local("i", TypeRef::int());
        let body = vec![
            assign(Expr::addr(R32, c), Expr::int(R8, 1)),
            assign(
                Expr::addr(R32, i),
                Expr::uni(R32, Op::SCast, Expr::var(R8, c)),
            ),
            ret(Expr::var(R32, i)),
        ];
        unit.function("f", vec![], vec![c, i], body);

        let asm = unit.generate();
        assert!(asm.contains("\tsubl\t$8, %esp\n"));
        assert!(asm.contains("\tmovl\t$1, %eax\n\tmovb\t%al, -1(%ebp)\n"));
        assert!(asm.contains("\tmovb\t-1(%ebp), %al\n\tmovsbl\t%al, %eax\n\tmovl\t%eax, -8(%ebp)\n"));
        assert!(asm.contains("\tmovl\t-8(%ebp), %eax\n.L0:\n"));
    }

    #[test]
    fn string_literals_and_static_calls() {
        let mut unit = Unit::new();
        let puts = unit.extern_fn("puts");
        let hi = unit.constants.intern("hi");
        let body = vec![stmt(StmtKind::ExprStmt(call(
            Expr::addr(R32, puts),
            vec![Expr::new(R32, ExprKind::Str(hi))],
        )))];
        unit.function("main", vec![], vec![], body);

        let asm = unit.generate();
        assert!(asm.contains("\t.section\t.rodata\n.LC0:\n\t.string\t\"hi\"\n"));
        assert!(asm.contains("\tmovl\t$.LC0, %eax\n\tpushl\t%eax\n\tcall\tputs\n\taddl\t$4, %esp\n"));
        assert!(!asm.contains(".globl\tputs"));
        assert!(!asm.contains("\tsubl"));
    }

    #[test]
    fn calls_through_pointers_are_indirect() {
        let mut unit = Unit::new();
        let fp = unit.param(
            "fp",
            TypeRef::pointer_to(TypeRef::function(TypeRef::int(), vec![], false)),
        );
        let body = vec![stmt(StmtKind::ExprStmt(call(Expr::var(R32, fp), vec![])))];
        unit.function("f", vec![fp], vec![], body);

        let asm = unit.generate();
        assert!(asm.contains("\tmovl\t8(%ebp), %eax\n\tcall\t*%eax\n"));
        assert!(!asm.contains("addl"));
    }

    #[test]
    fn static_data() {
        let mut unit = Unit::new();
        let x = unit.global("x", TypeRef::int(), Some(Expr::int(R32, 6)));
        let hi = unit.constants.intern("hi");
        unit.global(
            "s",
            TypeRef::pointer_to(TypeRef::char()),
            Some(Expr::new(R32, ExprKind::Str(hi))),
        );
        unit.global("flag", TypeRef::char(), Some(Expr::int(R8, -1)));
        let count = unit.global("count", TypeRef::int(), None);
        unit.entities.get_mut(count).private = true;
        unit.entities.get_mut(count).set_sequence(0);
        unit.global("buf", TypeRef::array_of(TypeRef::int(), 4), None);
        unit.function("f", vec![], vec![], vec![ret(Expr::var(R32, x))]);

        let asm = unit.generate();
        assert!(asm.starts_with(
            "\t.data\n\t.globl\tx\n\t.align\t4\n\t.type\tx,@object\n\t.size\tx, 4\nx:\n\t.long\t6\n"
        ));
        assert!(asm.contains("s:\n\t.long\t.LC0\n"));
        assert!(asm.contains("flag:\n\t.byte\t-1\n"));
        assert!(asm.contains("\t.local\tcount.0\n\t.comm\tcount.0,4,4\n"));
        assert!(asm.contains("\t.comm\tbuf,16,4\n"));
        assert!(asm.contains("\tmovl\tx, %eax\n"));
    }

    #[test]
    fn branches_and_a_single_epilogue() {
        let mut unit = Unit::new();
        let a = unit.param("a", TypeRef::int());
        let then = unit.labels.new_label();
        let els = unit.labels.new_label();
        let cond = Expr::bin(R32, Op::SLt, Expr::var(R32, a), Expr::int(R32, 10));
        let body = vec![
            stmt(StmtKind::CJump { cond, then, els }),
            stmt(StmtKind::LabelStmt(then)),
            ret(Expr::int(R32, 1)),
            stmt(StmtKind::LabelStmt(els)),
            ret(Expr::int(R32, 0)),
        ];
        unit.function("f", vec![a], vec![], body);

        let asm = unit.generate();
        assert!(asm.contains(
            "\tmovl\t8(%ebp), %eax\n\tcmpl\t$10, %eax\n\tjl\t.L0\n\tjmp\t.L1\n.L0:\n\tmovl\t$1, %eax\n\tjmp\t.L2\n.L1:\n\tmovl\t$0, %eax\n.L2:\n"
        ));
        assert_eq!(asm.matches("\tret\n").count(), 1);
    }

    #[test]
    fn conditions_which_are_not_comparisons_are_tested() {
        let mut unit = Unit::new();
        let c = unit.param("c", TypeRef::char());
        let then = unit.labels.new_label();
        let els = unit.labels.new_label();
        let body = vec![
            stmt(StmtKind::CJump {
                cond: Expr::var(R8, c),
                then,
                els,
            }),
            stmt(StmtKind::LabelStmt(els)),
            stmt(StmtKind::LabelStmt(then)),
        ];
        unit.function("f", vec![c], vec![], body);

        let asm = unit.generate();
        assert!(asm.contains("\tmovb\t8(%ebp), %al\n\ttestb\t%al, %al\n\tjne\t.L0\n.L1:\n.L0:\n"));
    }

    #[test]
    fn unsigned_byte_comparison() {
        let mut unit = Unit::new();
        let c = unit.local("c", TypeRef::uchar());
        let d = unit.local("d", TypeRef::uchar());
        let lt = Expr::bin(R32, Op::ULt, Expr::var(R8, c), Expr::var(R8, d));
        unit.function("f", vec![], vec![c, d], vec![ret(lt)]);

        let asm = unit.generate();
        assert!(asm.contains(
            "\tmovb\t-2(%ebp), %al\n\tpushl\t%eax\n\tmovb\t-1(%ebp), %al\n\tpopl\t%ecx\n\tcmpb\t%cl, %al\n\tsetb\t%al\n\tmovzbl\t%al, %eax\n"
        ));
    }

    #[test]
    fn division_and_remainder() {
        let mut unit = Unit::new();
        let a = unit.param("a", TypeRef::int());
        let b = unit.param("b", TypeRef::int());
        let body = vec![
            stmt(StmtKind::ExprStmt(Expr::bin(
                R32,
                Op::UDiv,
                Expr::var(R32, a),
                Expr::int(R32, 3),
            ))),
            ret(Expr::bin(R32, Op::SMod, Expr::var(R32, a), Expr::var(R32, b))),
        ];
        unit.function("f", vec![a, b], vec![], body);

        let asm = unit.generate();
        assert!(asm.contains("\tmovl\t8(%ebp), %eax\n\tmovl\t$3, %ecx\n\txorl\t%edx, %edx\n\tdivl\t%ecx\n"));
        assert!(asm.contains("\tpopl\t%ecx\n\tcltd\n\tidivl\t%ecx\n\tmovl\t%edx, %eax\n"));
    }

    #[test]
    fn shifts_take_their_count_in_cl() {
        let mut unit = Unit::new();
        let a = unit.param("a", TypeRef::int());
        let b = unit.param("b", TypeRef::int());
        let body = vec![
            stmt(StmtKind::ExprStmt(Expr::bin(
                R32,
                Op::BitLShift,
                Expr::var(R32, a),
                Expr::var(R32, b),
            ))),
            ret(Expr::bin(R32, Op::ArithRShift, Expr::var(R32, a), Expr::int(R32, 2))),
        ];
        unit.function("f", vec![a, b], vec![], body);

        let asm = unit.generate();
        assert!(asm.contains("\tpopl\t%ecx\n\tsall\t%cl, %eax\n"));
        assert!(asm.contains("\tsarl\t$2, %eax\n"));
    }

    #[test]
    fn stores_through_pointers() {
        let mut unit = Unit::new();
        let p = unit.param("p", TypeRef::pointer_to(TypeRef::int()));
        let field = Expr::bin(R32, Op::Add, Expr::var(R32, p), Expr::int(R32, 4));
        let body = vec![
            assign(Expr::var(R32, p), Expr::int(R32, 3)),
            assign(field, Expr::int(R32, 5)),
        ];
        unit.function("f", vec![p], vec![], body);

        let asm = unit.generate();
        assert!(asm.contains(
            "\tmovl\t$3, %eax\n\tpushl\t%eax\n\tmovl\t8(%ebp), %eax\n\tpopl\t%ecx\n\tmovl\t%ecx, (%eax)\n"
        ));
        assert!(asm.contains(
            "\tmovl\t$5, %eax\n\tpushl\t%eax\n\tmovl\t8(%ebp), %eax\n\tpopl\t%ecx\n\tmovl\t%ecx, 4(%eax)\n"
        ));
    }

    #[test]
    fn elements_of_local_arrays_are_addressed_directly() {
        let mut unit = Unit::new();
        let arr = unit.local("arr", TypeRef::array_of(TypeRef::int(), 2));
        let second = Expr::bin(R32, Op::Add, Expr::addr(R32, arr), Expr::int(R32, 4));
        let body = vec![
            stmt(StmtKind::ExprStmt(Expr::addr(R32, arr))),
            ret(Expr::mem(R32, second)),
        ];
        unit.function("f", vec![], vec![arr], body);

        let asm = unit.generate();
        assert!(asm.contains("\tleal\t-8(%ebp), %eax\n"));
        assert!(asm.contains("\tmovl\t-4(%ebp), %eax\n"));
    }

    #[test]
    fn verbose_assembly() {
        let mut unit = Unit::new();
        let body = vec![Stmt::new(
            StmtKind::Return(Some(Expr::int(R32, 0))),
            Some(Location::new(3, 5)),
        )];
        unit.function("main", vec![], vec![], body);

        let asm = unit.generate_with(&CodegenOptions {
            file_name: Some("main.mat".into()),
            verbose_asm: true,
        });
        assert!(asm.starts_with("\t.file\t\"main.mat\"\n"));
        assert!(asm.contains("\t# L3:5: return 0i32\n\tmovl\t$0, %eax\n"));
    }

    #[test]
    #[should_panic]
    fn only_four_byte_pointers() {
        let unit = Unit::new();
        let mir = Mir {
            entities: unit.entities,
            constants: unit.constants,
            variables: vec![],
            functions: vec![],
            named_constants: vec![],
            undefined: vec![],
            labels: unit.labels,
        };
        generate_assembly(mir, &TypeTable::lp64());
    }

    #[test]
    #[should_panic(expected = "undefined label")]
    fn jump_to_a_missing_label() {
        let mut unit = Unit::new();
        let nowhere = unit.labels.new_label();
        unit.function("f", vec![], vec![], vec![stmt(StmtKind::Jump(nowhere))]);
        unit.generate();
    }

    #[test]
    #[should_panic(expected = "cannot move")]
    fn phases_run_in_order() {
        let mut unit = Unit::new();
        unit.function("f", vec![], vec![], vec![]);
        let func = unit.functions.pop().unwrap();
        let options = CodegenOptions::default();
        let mut gen = FunctionGenerator::new(
            &func,
            &mut unit.entities,
            &unit.constants,
            &unit.types,
            &options,
            Label(0),
        );
        gen.normalize_epilogues();
    }
}
