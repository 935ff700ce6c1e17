//! Transforms the AST of a single function into MIR.  Every entity the
//! body refers to must already be in the entity table with its type
//! resolved.
//!
//! Expressions are lowered in one of two contexts.  At statement level
//! (`expr_nest == 0`) the value of the expression is not needed, so
//! assignments, calls and the like become plain statements.  Nested inside
//! another expression their value is needed, and side effects are moved to
//! statements ahead of the expression that uses the value, which then reads
//! a temporary.
//!
//! Values of struct, union and array type are never held in an expression.
//! Lowering such an expression yields its address instead.

use log::{debug, info};

use crate::compiler::{
    arch::registers::RegSize,
    ast::{self, BinaryOp, Block, ExprKind as AstExpr, IncDec, LogicalOp, StmtKind as AstStmt},
    entity::{EntityId, EntityKind, LocalScope},
    mir::{
        builder::MirFunctionBuilder,
        fold::fold_constant,
        ir::{Expr, ExprKind, Function, Label},
        Op,
    },
    types::TypeId,
    CompilerError, Location,
};

use super::{module::UnitContext, TransformError};

struct JumpEntry {
    label: Label,
    defined: bool,
    location: Option<Location>,
}

/// Transform a single function to the MIR form
pub(super) struct FuncTransformer<'u, 'a> {
    unit: &'u mut UnitContext<'a>,
    mir: MirFunctionBuilder,
    name: String,
    body: Block,
    break_stack: Vec<Label>,
    continue_stack: Vec<Label>,
    /// User labels in the order they were first seen
    jump_map: Vec<(String, JumpEntry)>,
    expr_nest: u32,
}

impl<'u, 'a> FuncTransformer<'u, 'a> {
    pub fn new(unit: &'u mut UnitContext<'a>, id: EntityId) -> FuncTransformer<'u, 'a> {
        let entity = unit.entities.get(id);
        let (params, body) = match &entity.kind {
            EntityKind::DefinedFunction { params, body } => (params.clone(), body.clone()),
            _ => panic!("{} is not a defined function", entity.name),
        };
        let name = entity.name.clone();
        let scope = LocalScope::of_block(&body);

        FuncTransformer {
            unit,
            mir: MirFunctionBuilder::new(id, params, scope),
            name,
            body,
            break_stack: vec![],
            continue_stack: vec![],
            jump_map: vec![],
            expr_nest: 0,
        }
    }

    pub fn transform(mut self) -> Function {
        debug!("Transform function: {}", self.name);

        let body = std::mem::take(&mut self.body);
        self.block(&body);
        self.check_jump_links();

        let func = self.mir.complete();
        info!(
            "{}: {} MIR statements, {} local variables",
            self.name,
            func.body.len(),
            func.scope.all_local_variables(&self.unit.entities).len()
        );
        func
    }

    /// Lowers the initializer `init` of the static variable or constant
    /// `id` and reduces it to a value the assembler knows.  Returns `None`
    /// if that is not possible.
    pub fn constant(unit: &'u mut UnitContext<'a>, id: EntityId, init: &ast::Expr) -> Option<Expr> {
        let name = unit.entities.get(id).name.clone();
        let mut t = FuncTransformer {
            unit,
            mir: MirFunctionBuilder::new(id, vec![], LocalScope::default()),
            name,
            body: Block::default(),
            break_stack: vec![],
            continue_stack: vec![],
            jump_map: vec![],
            expr_nest: 0,
        };

        let value = t.transform_expr(init)?;
        if !t.mir.is_empty() {
            return None;
        }
        let value = fold_constant(value);
        if value.is_constant() {
            Some(value)
        } else {
            None
        }
    }

    fn error(&mut self, location: Option<Location>, err: TransformError) {
        self.unit
            .handler
            .report_error(CompilerError::new(location, err))
    }

    fn ty(&mut self, e: &ast::Expr) -> TypeId {
        self.unit.types.get(&e.ty)
    }

    fn ptr(&self) -> RegSize {
        RegSize::for_size(self.unit.types.pointer_size())
    }

    /// The width of a value of type `ty`.  Aggregates and functions are
    /// represented by their address.
    fn width(&self, ty: TypeId) -> RegSize {
        if self.by_address(ty) || self.unit.types.is_void(ty) {
            self.ptr()
        } else {
            RegSize::for_size(self.unit.types.size(ty))
        }
    }

    fn by_address(&self, ty: TypeId) -> bool {
        self.unit.types.is_aggregate(ty) || self.unit.types.is_function(ty)
    }

    fn temp(&mut self, ty: TypeId) -> EntityId {
        self.mir.temp(&mut self.unit.entities, &*self.unit.types, ty)
    }

    fn new_label(&mut self) -> Label {
        self.unit.labels.new_label()
    }

    fn is_statement(&self) -> bool {
        self.expr_nest == 0
    }

    /*
     * Statements
     */

    fn block(&mut self, block: &Block) {
        for var in &block.variables {
            let entity = self.unit.entities.get(*var);
            // Static locals are data, initialized by the assembler
            if entity.private {
                continue;
            }
            if let Some(init) = entity.initializer().cloned() {
                let location = init.location.or(entity.location);
                let ty = entity.ty();
                let addr = Expr::addr(self.ptr(), *var);
                self.initialize(location, ty, addr, &init);
            }
        }

        for stmt in &block.stmts {
            self.statement(stmt);
        }
    }

    fn initialize(&mut self, location: Option<Location>, ty: TypeId, addr: Expr, init: &ast::Expr) {
        if let AstExpr::Str { value } = &init.kind {
            if self.unit.types.is_array(ty) {
                self.initialize_chars(location, ty, addr, init, value.len() as u64);
                return;
            }
        }
        if self.unit.types.is_aggregate(ty) {
            let src = self.value(init);
            self.copy_aggregate(location, ty, addr, src);
        } else {
            let value = self.value(init);
            self.mir.assign(location, addr, value);
        }
    }

    fn statement(&mut self, stmt: &ast::Stmt) {
        let loc = stmt.location;
        match &stmt.kind {
            AstStmt::Expr { expr } => self.expr_statement(expr),
            AstStmt::Block { block } => self.block(block),
            AstStmt::If { cond, then, els } => {
                let then_label = self.new_label();
                let end_label = self.new_label();
                let cond = self.value(cond);
                match els {
                    None => {
                        self.mir.cjump(loc, cond, then_label, end_label);
                        self.mir.label(then_label);
                        self.statement(then);
                        self.mir.label(end_label);
                    }
                    Some(els) => {
                        let else_label = self.new_label();
                        self.mir.cjump(loc, cond, then_label, else_label);
                        self.mir.label(then_label);
                        self.statement(then);
                        self.mir.jump(None, end_label);
                        self.mir.label(else_label);
                        self.statement(els);
                        self.mir.label(end_label);
                    }
                }
            }
            AstStmt::While { cond, body } => {
                let beg_label = self.new_label();
                let body_label = self.new_label();
                let end_label = self.new_label();

                self.mir.label(beg_label);
                let cond = self.value(cond);
                self.mir.cjump(loc, cond, body_label, end_label);
                self.mir.label(body_label);
                self.loop_body(beg_label, end_label, body);
                self.mir.jump(None, beg_label);
                self.mir.label(end_label);
            }
            AstStmt::DoWhile { body, cond } => {
                let beg_label = self.new_label();
                let cont_label = self.new_label();
                let end_label = self.new_label();

                self.mir.label(beg_label);
                self.loop_body(cont_label, end_label, body);
                self.mir.label(cont_label);
                let cond = self.value(cond);
                self.mir.cjump(loc, cond, beg_label, end_label);
                self.mir.label(end_label);
            }
            AstStmt::For {
                init,
                cond,
                incr,
                body,
            } => {
                let beg_label = self.new_label();
                let body_label = self.new_label();
                let cont_label = self.new_label();
                let end_label = self.new_label();

                if let Some(init) = init {
                    self.expr_statement(init);
                }
                self.mir.label(beg_label);
                if let Some(cond) = cond {
                    let cond = self.value(cond);
                    self.mir.cjump(loc, cond, body_label, end_label);
                }
                self.mir.label(body_label);
                self.loop_body(cont_label, end_label, body);
                self.mir.label(cont_label);
                if let Some(incr) = incr {
                    self.expr_statement(incr);
                }
                self.mir.jump(None, beg_label);
                self.mir.label(end_label);
            }
            AstStmt::Switch { cond, cases } => self.switch(loc, cond, cases),
            AstStmt::Break => match self.break_stack.last() {
                Some(target) => {
                    let target = *target;
                    self.mir.jump(loc, target)
                }
                None => self.error(loc, TransformError::BreakOutsideLoop),
            },
            AstStmt::Continue => match self.continue_stack.last() {
                Some(target) => {
                    let target = *target;
                    self.mir.jump(loc, target)
                }
                None => self.error(loc, TransformError::ContinueOutsideLoop),
            },
            AstStmt::Goto { target } => {
                let label = self.refer_label(target, loc);
                self.mir.jump(loc, label)
            }
            AstStmt::Label { name, stmt } => {
                let label = self.define_label(name, loc);
                self.mir.label(label);
                self.statement(stmt)
            }
            AstStmt::Return { expr } => {
                let value = match expr {
                    Some(e) => {
                        let ty = self.ty(e);
                        if self.unit.types.is_composite(ty) {
                            panic!("{}: returning a struct or union by value is not supported", self.name)
                        }
                        Some(self.value(e))
                    }
                    None => None,
                };
                self.mir.ret(loc, value)
            }
        }
    }

    fn loop_body(&mut self, continue_label: Label, break_label: Label, body: &ast::Stmt) {
        self.continue_stack.push(continue_label);
        self.break_stack.push(break_label);
        self.statement(body);
        self.break_stack.pop();
        self.continue_stack.pop();
    }

    /// Lowers a switch to a chain of comparisons, one per case value, that
    /// jump into the case bodies.  Bodies are laid out in source order so
    /// control falls through from one case to the next.
    fn switch(&mut self, loc: Option<Location>, cond: &ast::Expr, cases: &[ast::Case]) {
        let cond_ty = self.ty(cond);
        let value = self.value(cond);
        let value = match value.kind {
            ExprKind::Int(_) | ExprKind::Var(_) => value,
            _ => {
                let tmp = self.temp(cond_ty);
                let width = value.width;
                let ptr = self.ptr();
                self.mir.assign(loc, Expr::addr(ptr, tmp), value);
                Expr::var(width, tmp)
            }
        };

        let end_label = self.new_label();
        let mut default_label = None;
        let mut case_labels = vec![];
        for case in cases {
            let case_label = self.new_label();
            case_labels.push(case_label);
            if case.is_default() {
                default_label = Some(case_label);
            }
            for v in &case.values {
                let case_value = self.value(v);
                let next_label = self.new_label();
                let width = self.width(self.unit.types.int());
                let test = Expr::bin(width, Op::Eq, value.clone(), case_value);
                self.mir.cjump(v.location.or(loc), test, case_label, next_label);
                self.mir.label(next_label);
            }
        }
        self.mir.jump(loc, default_label.unwrap_or(end_label));

        self.break_stack.push(end_label);
        for (case, label) in cases.iter().zip(case_labels) {
            self.mir.label(label);
            self.block(&case.body);
        }
        self.break_stack.pop();
        self.mir.label(end_label);
    }

    fn jump_entry(&mut self, name: &str, location: Option<Location>) -> &mut JumpEntry {
        match self.jump_map.iter().position(|(n, _)| n == name) {
            Some(idx) => &mut self.jump_map[idx].1,
            None => {
                let label = self.unit.labels.new_label();
                self.jump_map.push((
                    name.into(),
                    JumpEntry {
                        label,
                        defined: false,
                        location,
                    },
                ));
                let last = self.jump_map.len() - 1;
                &mut self.jump_map[last].1
            }
        }
    }

    fn define_label(&mut self, name: &str, location: Option<Location>) -> Label {
        let entry = self.jump_entry(name, location);
        if entry.defined {
            let err = TransformError::DuplicatedLabel(self.name.clone(), name.into());
            self.error(location, err);
            // Keep the MIR well formed: the duplicate gets its own label
            return self.new_label();
        }
        entry.defined = true;
        entry.location = location;
        entry.label
    }

    fn refer_label(&mut self, name: &str, location: Option<Location>) -> Label {
        self.jump_entry(name, location).label
    }

    fn check_jump_links(&mut self) {
        let undefined: Vec<_> = self
            .jump_map
            .iter()
            .filter(|(_, e)| !e.defined)
            .map(|(name, e)| (name.clone(), e.location))
            .collect();
        for (name, location) in undefined {
            self.error(location, TransformError::UndefinedLabel(name));
        }
    }

    /*
     * Expressions
     */

    /// Lowers an expression whose value is not used.
    fn expr_statement(&mut self, e: &ast::Expr) {
        if let Some(value) = self.visit(e) {
            self.mir.expr_stmt(e.location, value)
        }
    }

    /// Lowers an expression nested inside another expression or statement.
    fn transform_expr(&mut self, e: &ast::Expr) -> Option<Expr> {
        self.expr_nest += 1;
        let value = self.visit(e);
        self.expr_nest -= 1;
        value
    }

    /// Lowers an expression whose value is used.
    fn value(&mut self, e: &ast::Expr) -> Expr {
        self.transform_expr(e)
            .unwrap_or_else(|| panic!("Void expression used as a value at {:?}", e.location))
    }

    fn visit(&mut self, e: &ast::Expr) -> Option<Expr> {
        let ty = self.ty(e);
        let loc = e.location;
        match &e.kind {
            AstExpr::Int { value } => Some(Expr::int(self.width(ty), *value)),
            AstExpr::Str { value } => {
                let id = self.unit.constants.intern(value);
                Some(Expr::new(self.ptr(), ExprKind::Str(id)))
            }
            AstExpr::Var { entity } => Some(self.reference(*entity)),
            AstExpr::SizeofType { of } => {
                let of = self.unit.types.get(of);
                Some(Expr::int(self.width(ty), self.unit.types.size(of) as i64))
            }
            AstExpr::SizeofExpr { expr } => {
                let of = self.ty(expr);
                Some(Expr::int(self.width(ty), self.unit.types.size(of) as i64))
            }
            AstExpr::Unary { op, expr } => match op {
                ast::UnaryOp::Plus => self.visit_nested(expr),
                _ => {
                    let operand = self.value(expr);
                    Some(Expr::uni(self.width(ty), Op::intern_unary(*op), operand))
                }
            },
            AstExpr::Binary { op, lhs, rhs } => Some(self.binary(ty, *op, lhs, rhs)),
            AstExpr::Logical { op, lhs, rhs } => self.logical(loc, ty, *op, lhs, rhs),
            AstExpr::Assign { lhs, rhs } => self.assign(loc, lhs, rhs),
            AstExpr::OpAssign { op, lhs, rhs } => {
                // Evaluate rhs before lhs
                let lhs_ty = self.ty(lhs);
                let rhs = self.value(rhs);
                let lhs = self.value(lhs);
                let op = Op::intern_binary(*op, self.unit.types.is_signed(lhs_ty));
                self.op_assign(loc, op, lhs_ty, lhs, rhs)
            }
            AstExpr::Prefix { op, expr } => {
                let expr_ty = self.ty(expr);
                let one = Expr::int(self.width(expr_ty), 1);
                let lhs = self.value(expr);
                self.op_assign(loc, inc_dec(*op), expr_ty, lhs, one)
            }
            AstExpr::Suffix { op, expr } => self.suffix(loc, *op, expr),
            AstExpr::Cond { cond, then, els } => self.conditional(loc, ty, cond, then, els),
            AstExpr::Cast { expr } => self.cast(ty, expr),
            AstExpr::Addr { expr } => Some(self.address_of(expr)),
            AstExpr::Deref { expr } => {
                let ptr = self.value(expr);
                Some(self.load(ty, ptr))
            }
            AstExpr::Member { expr, name } => {
                let composite = self.ty(expr);
                let base = self.value(expr);
                Some(self.member(ty, composite, base, name))
            }
            AstExpr::PtrMember { expr, name } => {
                let ptr_ty = self.ty(expr);
                let composite = self.unit.types.base_type(ptr_ty);
                let base = self.value(expr);
                Some(self.member(ty, composite, base, name))
            }
            AstExpr::Index { expr, index } => {
                let base_ty = self.ty(expr);
                let elem_size = self.unit.types.size(self.unit.types.base_type(base_ty));
                let index = self.value(index);
                let base = self.value(expr);
                let offset = self.scale(index, elem_size);
                let addr = Expr::bin(self.ptr(), Op::Add, base, offset);
                Some(self.load(ty, addr))
            }
            AstExpr::Call { callee, args } => self.call(loc, ty, callee, args),
        }
    }

    /// Lowers `e` in the current context: the value of `e` is needed
    /// exactly when the value of its parent is.
    fn visit_nested(&mut self, e: &ast::Expr) -> Option<Expr> {
        if self.is_statement() {
            self.visit(e)
        } else {
            self.transform_expr(e)
        }
    }

    fn reference(&mut self, id: EntityId) -> Expr {
        let entity = self.unit.entities.get(id);
        if let Some(value) = entity.constant_value().cloned() {
            return self.value(&value);
        }

        let ty = entity.ty();
        if self.by_address(ty) {
            Expr::addr(self.ptr(), id)
        } else {
            Expr::var(self.width(ty), id)
        }
    }

    /// Reads a value of type `ty` from `addr`.
    fn load(&self, ty: TypeId, addr: Expr) -> Expr {
        if self.by_address(ty) {
            addr
        } else {
            Expr::mem(self.width(ty), addr)
        }
    }

    /// The address of the object `e` designates.
    fn address_of(&mut self, e: &ast::Expr) -> Expr {
        let ty = self.ty(e);
        let value = self.value(e);
        if self.by_address(ty) {
            return value;
        }
        let ptr = self.ptr();
        value
            .address_of(ptr)
            .unwrap_or_else(|| panic!("Expression at {:?} has no address", e.location))
    }

    fn member(&mut self, ty: TypeId, composite: TypeId, base: Expr, name: &str) -> Expr {
        let types = &*self.unit.types;
        let (_, offset) = types
            .member(composite, name)
            .unwrap_or_else(|| panic!("{} has no member {}", types.name_of(composite), name));
        let addr = self.offset_address(base, offset);
        self.load(ty, addr)
    }

    fn offset_address(&self, base: Expr, offset: u64) -> Expr {
        if offset == 0 {
            base
        } else {
            Expr::bin(self.ptr(), Op::Add, base, Expr::int(self.ptr(), offset as i64))
        }
    }

    /// `index * size`, as a pointer sized offset.
    fn scale(&self, index: Expr, size: u64) -> Expr {
        if size == 1 {
            index
        } else {
            Expr::bin(self.ptr(), Op::Mul, index, Expr::int(self.ptr(), size as i64))
        }
    }

    fn element_size(&self, ty: TypeId) -> u64 {
        self.unit.types.size(self.unit.types.base_type(ty))
    }

    fn binary(&mut self, ty: TypeId, op: BinaryOp, lhs: &ast::Expr, rhs: &ast::Expr) -> Expr {
        let lhs_ty = self.ty(lhs);
        let rhs_ty = self.ty(rhs);
        let right = self.value(rhs);
        let left = self.value(lhs);

        // Comparisons take their signedness from the operands, everything
        // else from the result
        let signed = match op {
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.unit.types.is_signed(lhs_ty)
            }
            _ => self.unit.types.is_signed(ty),
        };
        let mop = Op::intern_binary(op, signed);
        let width = self.width(ty);
        let types = &*self.unit.types;

        if op == BinaryOp::Sub && types.is_pointer_like(lhs_ty) && types.is_pointer_like(rhs_ty) {
            // ptr - ptr -> (ptr - ptr) / size
            let size = self.element_size(lhs_ty);
            let diff = Expr::bin(width, Op::Sub, left, right);
            if size == 1 {
                diff
            } else {
                Expr::bin(width, Op::SDiv, diff, Expr::int(width, size as i64))
            }
        } else if matches!(op, BinaryOp::Add | BinaryOp::Sub) && types.is_pointer_like(lhs_ty) {
            // ptr + int -> ptr + int * size
            let right = self.scale(right, self.element_size(lhs_ty));
            Expr::bin(width, mop, left, right)
        } else if op == BinaryOp::Add && types.is_pointer_like(rhs_ty) {
            // int + ptr -> int * size + ptr
            let left = self.scale(left, self.element_size(rhs_ty));
            Expr::bin(width, mop, left, right)
        } else {
            Expr::bin(width, mop, left, right)
        }
    }

    /// `lhs op rhs` where `lhs` has type `lhs_ty`, scaling `rhs` for pointer
    /// arithmetic.
    fn arith(&self, op: Op, lhs_ty: TypeId, lhs: Expr, rhs: Expr) -> Expr {
        let width = lhs.width;
        if matches!(op, Op::Add | Op::Sub) && self.unit.types.is_pointer_like(lhs_ty) {
            let rhs = self.scale(rhs, self.element_size(lhs_ty));
            Expr::bin(width, op, lhs, rhs)
        } else {
            Expr::bin(width, op, lhs, rhs)
        }
    }

    fn logical(
        &mut self,
        loc: Option<Location>,
        ty: TypeId,
        op: LogicalOp,
        lhs: &ast::Expr,
        rhs: &ast::Expr,
    ) -> Option<Expr> {
        let right_label = self.new_label();
        let end_label = self.new_label();
        let width = self.width(ty);
        let ptr = self.ptr();
        let tmp = self.temp(ty);

        let left = self.value(lhs);
        self.mir.assign(lhs.location, Expr::addr(ptr, tmp), truth(width, left));
        let cond = Expr::var(width, tmp);
        match op {
            LogicalOp::And => self.mir.cjump(loc, cond, right_label, end_label),
            LogicalOp::Or => self.mir.cjump(loc, cond, end_label, right_label),
        }
        self.mir.label(right_label);
        let right = self.value(rhs);
        self.mir.assign(rhs.location, Expr::addr(ptr, tmp), truth(width, right));
        self.mir.label(end_label);

        if self.is_statement() {
            None
        } else {
            Some(Expr::var(width, tmp))
        }
    }

    fn assign(&mut self, loc: Option<Location>, lhs: &ast::Expr, rhs: &ast::Expr) -> Option<Expr> {
        let ty = self.ty(lhs);
        if self.unit.types.is_aggregate(ty) {
            let src = self.value(rhs);
            let dst = self.value(lhs);
            let dst = self.copy_aggregate(loc, ty, dst, src);
            return if self.is_statement() { None } else { Some(dst) };
        }

        if self.is_statement() {
            // Evaluate rhs before lhs
            let value = self.value(rhs);
            let addr = self.address_of(lhs);
            self.mir.assign(loc, addr, value);
            None
        } else {
            // cont(lhs = rhs) -> tmp = rhs; lhs = tmp; cont(tmp)
            let width = self.width(ty);
            let ptr = self.ptr();
            let tmp = self.temp(ty);
            let value = self.value(rhs);
            self.mir.assign(rhs.location, Expr::addr(ptr, tmp), value);
            let addr = self.address_of(lhs);
            self.mir.assign(lhs.location, addr, Expr::var(width, tmp));
            Some(Expr::var(width, tmp))
        }
    }

    fn op_assign(
        &mut self,
        loc: Option<Location>,
        op: Op,
        lhs_ty: TypeId,
        lhs: Expr,
        rhs: Expr,
    ) -> Option<Expr> {
        let ptr = self.ptr();
        if let ExprKind::Var(v) = lhs.kind {
            // cont(lhs += rhs) -> lhs = lhs + rhs; cont(lhs)
            let value = self.arith(op, lhs_ty, lhs.clone(), rhs);
            self.mir.assign(loc, Expr::addr(ptr, v), value);
            if self.is_statement() {
                None
            } else {
                Some(lhs)
            }
        } else {
            // cont(lhs += rhs) -> a = &lhs; *a = *a + rhs; cont(*a)
            let width = lhs.width;
            let addr = lhs
                .address_of(ptr)
                .unwrap_or_else(|| panic!("Assignment at {:?} has no target", loc));
            let ptr_ty = self.unit.types.pointer_to(lhs_ty);
            let a = self.temp(ptr_ty);
            self.mir.assign(loc, Expr::addr(ptr, a), addr);
            let target = Expr::mem(width, Expr::var(ptr, a));
            let value = self.arith(op, lhs_ty, target.clone(), rhs);
            self.mir.assign(loc, Expr::var(ptr, a), value);
            if self.is_statement() {
                None
            } else {
                Some(target)
            }
        }
    }

    fn suffix(&mut self, loc: Option<Location>, op: IncDec, expr: &ast::Expr) -> Option<Expr> {
        let ty = self.ty(expr);
        let width = self.width(ty);
        let ptr = self.ptr();
        let op = inc_dec(op);
        let one = Expr::int(width, 1);
        let value = self.value(expr);

        if self.is_statement() {
            // expr++; -> expr += 1;
            self.op_assign(loc, op, ty, value, one)
        } else if let ExprKind::Var(var) = value.kind {
            // cont(expr++) -> v = expr; expr = v + 1; cont(v)
            let v = self.temp(ty);
            self.mir.assign(loc, Expr::addr(ptr, v), value);
            let next = self.arith(op, ty, Expr::var(width, v), one);
            self.mir.assign(loc, Expr::addr(ptr, var), next);
            Some(Expr::var(width, v))
        } else {
            // cont(expr++) -> a = &expr; v = *a; *a = *a + 1; cont(v)
            let addr = value
                .address_of(ptr)
                .unwrap_or_else(|| panic!("Increment at {:?} has no target", loc));
            let ptr_ty = self.unit.types.pointer_to(ty);
            let a = self.temp(ptr_ty);
            let v = self.temp(ty);
            self.mir.assign(loc, Expr::addr(ptr, a), addr);
            let target = Expr::mem(width, Expr::var(ptr, a));
            self.mir.assign(loc, Expr::addr(ptr, v), target.clone());
            let next = self.arith(op, ty, target, one);
            self.mir.assign(loc, Expr::var(ptr, a), next);
            Some(Expr::var(width, v))
        }
    }

    fn conditional(
        &mut self,
        loc: Option<Location>,
        ty: TypeId,
        cond: &ast::Expr,
        then: &ast::Expr,
        els: &ast::Expr,
    ) -> Option<Expr> {
        let then_label = self.new_label();
        let else_label = self.new_label();
        let end_label = self.new_label();

        let cond = self.value(cond);
        self.mir.cjump(loc, cond, then_label, else_label);

        if self.unit.types.is_void(ty) {
            self.mir.label(then_label);
            self.expr_statement(then);
            self.mir.jump(None, end_label);
            self.mir.label(else_label);
            self.expr_statement(els);
            self.mir.label(end_label);
            return None;
        }

        // Aggregate results are carried as addresses
        let tmp_ty = if self.by_address(ty) {
            self.unit.types.pointer_to(ty)
        } else {
            ty
        };
        let width = self.width(ty);
        let ptr = self.ptr();
        let tmp = self.temp(tmp_ty);

        self.mir.label(then_label);
        let value = self.value(then);
        self.mir.assign(then.location, Expr::addr(ptr, tmp), value);
        self.mir.jump(None, end_label);
        self.mir.label(else_label);
        let value = self.value(els);
        self.mir.assign(els.location, Expr::addr(ptr, tmp), value);
        self.mir.label(end_label);

        if self.is_statement() {
            None
        } else {
            Some(Expr::var(width, tmp))
        }
    }

    fn cast(&mut self, ty: TypeId, expr: &ast::Expr) -> Option<Expr> {
        if self.unit.types.is_void(ty) {
            if self.is_statement() {
                self.expr_statement(expr);
            } else {
                self.transform_expr(expr);
            }
            return None;
        }

        let from = self.ty(expr);
        let types = &*self.unit.types;
        let effective = types.is_scalar(from) && types.is_scalar(ty) && types.size(from) != types.size(ty);
        if effective {
            let op = if types.is_signed(from) {
                Op::SCast
            } else {
                Op::UCast
            };
            let width = self.width(ty);
            let value = self.value(expr);
            Some(Expr::uni(width, op, value))
        } else {
            self.visit_nested(expr)
        }
    }

    fn call(
        &mut self,
        loc: Option<Location>,
        ty: TypeId,
        callee: &ast::Expr,
        args: &[ast::Expr],
    ) -> Option<Expr> {
        if self.unit.types.is_composite(ty) {
            panic!("{}: returning a struct or union by value is not supported", self.name)
        }

        // Arguments are evaluated right to left
        let mut values = Vec::with_capacity(args.len());
        for arg in args.iter().rev() {
            let arg_ty = self.ty(arg);
            if self.unit.types.is_composite(arg_ty) {
                panic!("{}: passing a struct or union by value is not supported", self.name)
            }
            values.push(self.value(arg));
        }
        values.reverse();

        let callee = self.value(callee);
        let call = Expr::new(
            self.width(ty),
            ExprKind::Call {
                callee: Box::new(callee),
                args: values,
            },
        );

        if self.is_statement() || self.unit.types.is_void(ty) {
            self.mir.expr_stmt(loc, call);
            None
        } else {
            let width = self.width(ty);
            let ptr = self.ptr();
            let tmp = self.temp(ty);
            self.mir.assign(loc, Expr::addr(ptr, tmp), call);
            Some(Expr::var(width, tmp))
        }
    }

    /// Copies the object of type `ty` at `src` to `dst`, one aligned chunk
    /// at a time, and returns an address of the destination.
    fn copy_aggregate(&mut self, loc: Option<Location>, ty: TypeId, dst: Expr, src: Expr) -> Expr {
        let dst = self.stable(loc, dst);
        let src = self.stable(loc, src);
        let size = self.unit.types.size(ty);
        let unit = match self.unit.types.alignment(ty) {
            a if a >= 4 => 4,
            2 => 2,
            _ => 1,
        };
        let width = RegSize::for_size(unit);

        let mut offset = 0;
        while offset < size {
            let to = self.offset_address(dst.clone(), offset);
            let from = self.offset_address(src.clone(), offset);
            self.mir.assign(loc, to, Expr::mem(width, from));
            offset += unit;
        }
        dst
    }

    /// `char buf[n] = "..."`: copies the literal and its terminator, as much
    /// of it as fits, and zeroes the rest of the array.
    fn initialize_chars(&mut self, loc: Option<Location>, ty: TypeId, dst: Expr, init: &ast::Expr, len: u64) {
        let size = self.unit.types.size(ty);
        if len > size {
            self.error(loc, TransformError::InitializerTooLong(size));
            return;
        }
        let dst = self.stable(loc, dst);
        let src = self.value(init);
        let copied = size.min(len + 1);
        for offset in 0..size {
            let to = self.offset_address(dst.clone(), offset);
            let byte = if offset < copied {
                Expr::mem(RegSize::R8, self.offset_address(src.clone(), offset))
            } else {
                Expr::int(RegSize::R8, 0)
            };
            self.mir.assign(loc, to, byte);
        }
    }

    /// An address expression which can be evaluated repeatedly.  Computed
    /// addresses are stored in a temporary first.
    fn stable(&mut self, loc: Option<Location>, addr: Expr) -> Expr {
        match addr.kind {
            ExprKind::Addr(_) | ExprKind::Str(_) | ExprKind::Var(_) => addr,
            _ => {
                let ptr = self.ptr();
                let void = self.unit.types.void();
                let ptr_ty = self.unit.types.pointer_to(void);
                let tmp = self.temp(ptr_ty);
                self.mir.assign(loc, Expr::addr(ptr, tmp), addr);
                Expr::var(ptr, tmp)
            }
        }
    }
}

fn inc_dec(op: IncDec) -> Op {
    match op {
        IncDec::Inc => Op::Add,
        IncDec::Dec => Op::Sub,
    }
}

/// `e != 0`
fn truth(width: RegSize, e: Expr) -> Expr {
    let zero = Expr::int(e.width, 0);
    Expr::bin(width, Op::Neq, e, zero)
}
