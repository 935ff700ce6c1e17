use crate::{
    compiler::{
        arch::registers::RegSize,
        ast::{
            self, BinaryOp, Block, Case, ExprKind as AstExpr, IncDec, LogicalOp, Program,
            StmtKind as AstStmt,
        },
        entity::{Entity, EntityId, EntityKind, EntityTable},
        mir::{
            ir::{Expr, ExprKind, Label, Mir, Stmt, StmtKind},
            validate::check_labels,
            Op,
        },
        types::{MemberDecl, TypeDefinition, TypeRef, TypeTable},
        Location,
    },
    diagnostics::ErrorHandler,
};

use super::build_mir;

const W: RegSize = RegSize::R32;

struct Unit {
    types: TypeTable,
    entities: EntityTable,
    declarations: Vec<EntityId>,
}

impl Unit {
    fn new() -> Unit {
        Unit {
            types: TypeTable::ilp32(),
            entities: EntityTable::new(),
            declarations: vec![],
        }
    }

    fn with_struct(mut self, name: &str, members: Vec<(&str, TypeRef)>) -> Unit {
        self.types.define(&TypeDefinition::Struct {
            name: name.into(),
            members: members
                .into_iter()
                .map(|(n, t)| MemberDecl::new(n, t))
                .collect(),
            location: None,
        });
        self
    }

    fn param(&mut self, name: &str, ty: TypeRef) -> EntityId {
        self.entities
            .add(Entity::new(name, ty, EntityKind::Parameter))
    }

    fn local(&mut self, name: &str, ty: TypeRef) -> EntityId {
        self.entities.add(Entity::new(
            name,
            ty,
            EntityKind::DefinedVariable { initializer: None },
        ))
    }

    fn global(&mut self, name: &str, ty: TypeRef, init: Option<ast::Expr>) -> EntityId {
        let id = self.entities.add(Entity::new(
            name,
            ty,
            EntityKind::DefinedVariable { initializer: init },
        ));
        self.declarations.push(id);
        id
    }

    fn extern_fn(&mut self, name: &str, ret: TypeRef, params: Vec<TypeRef>) -> EntityId {
        let id = self.entities.add(Entity::new(
            name,
            TypeRef::function(ret, params, false),
            EntityKind::UndefinedFunction,
        ));
        self.declarations.push(id);
        id
    }

    fn function(&mut self, name: &str, ret: TypeRef, params: Vec<EntityId>, body: Block) -> EntityId {
        let param_types = params
            .iter()
            .map(|p| self.entities.get(*p).type_ref.clone())
            .collect();
        let id = self.entities.add(Entity::new(
            name,
            TypeRef::function(ret, param_types, false),
            EntityKind::DefinedFunction { params, body },
        ));
        self.declarations.push(id);
        id
    }

    fn build(mut self) -> (Mir, ErrorHandler) {
        self.types.resolve_definitions();
        self.entities.resolve_types(&mut self.types);
        let mut handler = ErrorHandler::new();
        let program = Program::new(self.entities, self.declarations);
        let mir = build_mir(program, &mut self.types, &mut handler);
        (mir, handler)
    }
}

fn int(v: i64) -> ast::Expr {
    ast::Expr::new(AstExpr::Int { value: v }, TypeRef::int())
}

fn var(id: EntityId, ty: TypeRef) -> ast::Expr {
    ast::Expr::new(AstExpr::Var { entity: id }, ty)
}

fn binary(op: BinaryOp, lhs: ast::Expr, rhs: ast::Expr, ty: TypeRef) -> ast::Expr {
    ast::Expr::new(
        AstExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
    )
}

fn assign(lhs: ast::Expr, rhs: ast::Expr) -> ast::Expr {
    let ty = lhs.ty.clone();
    ast::Expr::new(
        AstExpr::Assign {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
    )
}

fn call(callee: ast::Expr, args: Vec<ast::Expr>, ty: TypeRef) -> ast::Expr {
    ast::Expr::new(
        AstExpr::Call {
            callee: Box::new(callee),
            args,
        },
        ty,
    )
}

fn stmt(kind: AstStmt) -> ast::Stmt {
    ast::Stmt::new(kind)
}

fn expr_stmt(expr: ast::Expr) -> ast::Stmt {
    stmt(AstStmt::Expr { expr })
}

fn ret(expr: Option<ast::Expr>) -> ast::Stmt {
    stmt(AstStmt::Return { expr })
}

fn body(mir: &Mir) -> Vec<StmtKind> {
    mir.functions[0]
        .body
        .iter()
        .map(|s| s.kind.clone())
        .collect()
}

#[test]
fn while_loop() {
    let mut unit = Unit::new();
    let n = unit.param("n", TypeRef::int());
    let decrement = assign(
        var(n, TypeRef::int()),
        binary(BinaryOp::Sub, var(n, TypeRef::int()), int(1), TypeRef::int()),
    );
    let block = Block::new(
        vec![],
        vec![
            stmt(AstStmt::While {
                cond: var(n, TypeRef::int()),
                body: Box::new(expr_stmt(decrement)),
            }),
            ret(Some(var(n, TypeRef::int()))),
        ],
    );
    unit.function("f", TypeRef::int(), vec![n], block);

    let (mir, handler) = unit.build();
    assert!(!handler.error_occurred());
    assert_eq!(check_labels(&mir.functions[0]), Ok(()));

    let (beg, bdy, end) = (Label(0), Label(1), Label(2));
    assert_eq!(
        body(&mir),
        vec![
            StmtKind::LabelStmt(beg),
            StmtKind::CJump {
                cond: Expr::var(W, n),
                then: bdy,
                els: end
            },
            StmtKind::LabelStmt(bdy),
            StmtKind::Assign {
                lhs: Expr::addr(W, n),
                rhs: Expr::bin(W, Op::Sub, Expr::var(W, n), Expr::int(W, 1)),
            },
            StmtKind::Jump(beg),
            StmtKind::LabelStmt(end),
            StmtKind::Return(Some(Expr::var(W, n))),
        ]
    );
}

#[test]
fn pointer_arithmetic_is_scaled() {
    let mut unit = Unit::new();
    let int_ptr = TypeRef::pointer_to(TypeRef::int());
    let p = unit.param("p", int_ptr.clone());
    let q = unit.param("q", int_ptr.clone());
    let block = Block::new(
        vec![],
        vec![
            expr_stmt(binary(BinaryOp::Add, var(p, int_ptr.clone()), int(3), int_ptr.clone())),
            expr_stmt(binary(BinaryOp::Sub, var(p, int_ptr.clone()), var(q, int_ptr.clone()), TypeRef::int())),
        ],
    );
    unit.function("f", TypeRef::Void, vec![p, q], block);

    let (mir, _) = unit.build();
    let stmts = body(&mir);
    assert_eq!(
        stmts[0],
        StmtKind::ExprStmt(Expr::bin(
            W,
            Op::Add,
            Expr::var(W, p),
            Expr::bin(W, Op::Mul, Expr::int(W, 3), Expr::int(W, 4))
        ))
    );
    assert_eq!(
        stmts[1],
        StmtKind::ExprStmt(Expr::bin(
            W,
            Op::SDiv,
            Expr::bin(W, Op::Sub, Expr::var(W, p), Expr::var(W, q)),
            Expr::int(W, 4)
        ))
    );
}

#[test]
fn unsigned_comparison() {
    let mut unit = Unit::new();
    let a = unit.param("a", TypeRef::uint());
    let b = unit.param("b", TypeRef::uint());
    let block = Block::new(
        vec![],
        vec![ret(Some(binary(
            BinaryOp::Lt,
            var(a, TypeRef::uint()),
            var(b, TypeRef::uint()),
            TypeRef::int(),
        )))],
    );
    unit.function("lt", TypeRef::int(), vec![a, b], block);

    let (mir, _) = unit.build();
    assert_eq!(
        body(&mir)[0],
        StmtKind::Return(Some(Expr::bin(
            W,
            Op::ULt,
            Expr::var(W, a),
            Expr::var(W, b)
        )))
    );
}

#[test]
fn calls_of_named_functions_are_static() {
    let mut unit = Unit::new();
    let puts = unit.extern_fn("puts", TypeRef::int(), vec![TypeRef::pointer_to(TypeRef::char())]);
    let fn_ty = TypeRef::function(TypeRef::int(), vec![TypeRef::pointer_to(TypeRef::char())], false);
    let hello = ast::Expr::new(
        AstExpr::Str {
            value: "hello".into(),
        },
        TypeRef::pointer_to(TypeRef::char()),
    );
    let block = Block::new(vec![], vec![expr_stmt(call(var(puts, fn_ty), vec![hello], TypeRef::int()))]);
    unit.function("main", TypeRef::int(), vec![], block);

    let (mir, _) = unit.build();
    match &body(&mir)[0] {
        StmtKind::ExprStmt(call) => {
            assert!(call.is_static_call(&mir.entities));
            assert_eq!(call.static_callee(&mir.entities), Some(puts));
        }
        s => panic!("Expected a call statement, got {:?}", s),
    }
    assert_eq!(mir.constants.len(), 1);
    assert_eq!(mir.undefined, vec![puts]);
}

#[test]
fn call_value_goes_through_a_temporary() {
    let mut unit = Unit::new();
    let get = unit.extern_fn("get", TypeRef::int(), vec![]);
    let fn_ty = TypeRef::function(TypeRef::int(), vec![], false);
    let x = unit.local("x", TypeRef::int());
    let block = Block::new(
        vec![x],
        vec![expr_stmt(assign(
            var(x, TypeRef::int()),
            binary(
                BinaryOp::Add,
                call(var(get, fn_ty), vec![], TypeRef::int()),
                int(1),
                TypeRef::int(),
            ),
        ))],
    );
    unit.function("f", TypeRef::Void, vec![], block);

    let (mir, _) = unit.build();
    let func = &mir.functions[0];
    let tmp = *func.scope.variables.last().unwrap();
    assert!(mir.entities.get(tmp).is_temporary());

    let stmts = body(&mir);
    assert_eq!(stmts.len(), 2);
    assert!(matches!(
        &stmts[0],
        StmtKind::Assign { lhs, rhs: Expr { kind: ExprKind::Call { .. }, .. } } if *lhs == Expr::addr(W, tmp)
    ));
    assert_eq!(
        stmts[1],
        StmtKind::Assign {
            lhs: Expr::addr(W, x),
            rhs: Expr::bin(W, Op::Add, Expr::var(W, tmp), Expr::int(W, 1)),
        }
    );
}

#[test]
fn member_access_goes_through_the_address() {
    let mut unit = Unit::new().with_struct(
        "s",
        vec![("a", TypeRef::char()), ("b", TypeRef::int())],
    );
    let s_ty = TypeRef::Struct("s".into());
    let s = unit.local("s", s_ty.clone());
    let member = ast::Expr::new(
        AstExpr::Member {
            expr: Box::new(var(s, s_ty.clone())),
            name: "b".into(),
        },
        TypeRef::int(),
    );
    let block = Block::new(vec![s], vec![ret(Some(member))]);
    unit.function("f", TypeRef::int(), vec![], block);

    let (mir, _) = unit.build();
    assert_eq!(
        body(&mir)[0],
        StmtKind::Return(Some(Expr::mem(
            W,
            Expr::bin(W, Op::Add, Expr::addr(W, s), Expr::int(W, 4))
        )))
    );
}

#[test]
fn struct_assignment_is_a_copy() {
    let mut unit = Unit::new().with_struct(
        "s",
        vec![("a", TypeRef::char()), ("b", TypeRef::int())],
    );
    let s_ty = TypeRef::Struct("s".into());
    let a = unit.local("a", s_ty.clone());
    let b = unit.local("b", s_ty.clone());
    let block = Block::new(
        vec![a, b],
        vec![expr_stmt(assign(var(a, s_ty.clone()), var(b, s_ty.clone())))],
    );
    unit.function("f", TypeRef::Void, vec![], block);

    let (mir, _) = unit.build();
    assert_eq!(
        body(&mir),
        vec![
            StmtKind::Assign {
                lhs: Expr::addr(W, a),
                rhs: Expr::mem(W, Expr::addr(W, b)),
            },
            StmtKind::Assign {
                lhs: Expr::bin(W, Op::Add, Expr::addr(W, a), Expr::int(W, 4)),
                rhs: Expr::mem(
                    W,
                    Expr::bin(W, Op::Add, Expr::addr(W, b), Expr::int(W, 4))
                ),
            },
        ]
    );
}

#[test]
#[should_panic]
fn struct_arguments_are_not_supported() {
    let mut unit = Unit::new().with_struct("s", vec![("a", TypeRef::int())]);
    let s_ty = TypeRef::Struct("s".into());
    let g = unit.extern_fn("g", TypeRef::Void, vec![s_ty.clone()]);
    let fn_ty = TypeRef::function(TypeRef::Void, vec![s_ty.clone()], false);
    let s = unit.local("s", s_ty.clone());
    let block = Block::new(
        vec![s],
        vec![expr_stmt(call(var(g, fn_ty), vec![var(s, s_ty)], TypeRef::Void))],
    );
    unit.function("f", TypeRef::Void, vec![], block);
    unit.build();
}

#[test]
fn nested_assignment_uses_a_temporary() {
    let mut unit = Unit::new();
    let a = unit.local("a", TypeRef::int());
    let b = unit.local("b", TypeRef::int());
    let block = Block::new(
        vec![a, b],
        vec![expr_stmt(assign(
            var(a, TypeRef::int()),
            assign(var(b, TypeRef::int()), int(1)),
        ))],
    );
    unit.function("f", TypeRef::Void, vec![], block);

    let (mir, _) = unit.build();
    let tmp = *mir.functions[0].scope.variables.last().unwrap();
    assert_eq!(
        body(&mir),
        vec![
            StmtKind::Assign {
                lhs: Expr::addr(W, tmp),
                rhs: Expr::int(W, 1)
            },
            StmtKind::Assign {
                lhs: Expr::addr(W, b),
                rhs: Expr::var(W, tmp)
            },
            StmtKind::Assign {
                lhs: Expr::addr(W, a),
                rhs: Expr::var(W, tmp)
            },
        ]
    );
}

#[test]
fn postfix_increment_as_value() {
    let mut unit = Unit::new();
    let a = unit.local("a", TypeRef::int());
    let b = unit.local("b", TypeRef::int());
    let incr = ast::Expr::new(
        AstExpr::Suffix {
            op: IncDec::Inc,
            expr: Box::new(var(a, TypeRef::int())),
        },
        TypeRef::int(),
    );
    let block = Block::new(vec![a, b], vec![expr_stmt(assign(var(b, TypeRef::int()), incr))]);
    unit.function("f", TypeRef::Void, vec![], block);

    let (mir, _) = unit.build();
    let tmp = *mir.functions[0].scope.variables.last().unwrap();
    assert_eq!(
        body(&mir),
        vec![
            StmtKind::Assign {
                lhs: Expr::addr(W, tmp),
                rhs: Expr::var(W, a)
            },
            StmtKind::Assign {
                lhs: Expr::addr(W, a),
                rhs: Expr::bin(W, Op::Add, Expr::var(W, tmp), Expr::int(W, 1))
            },
            StmtKind::Assign {
                lhs: Expr::addr(W, b),
                rhs: Expr::var(W, tmp)
            },
        ]
    );
}

#[test]
fn logical_and_short_circuits() {
    let mut unit = Unit::new();
    let a = unit.param("a", TypeRef::int());
    let b = unit.param("b", TypeRef::int());
    let and = ast::Expr::new(
        AstExpr::Logical {
            op: LogicalOp::And,
            lhs: Box::new(var(a, TypeRef::int())),
            rhs: Box::new(var(b, TypeRef::int())),
        },
        TypeRef::int(),
    );
    unit.function("f", TypeRef::int(), vec![a, b], Block::new(vec![], vec![ret(Some(and))]));

    let (mir, _) = unit.build();
    let func = &mir.functions[0];
    assert_eq!(check_labels(func), Ok(()));
    let stmts = body(&mir);
    assert!(matches!(stmts[1], StmtKind::CJump { then: Label(0), els: Label(1), .. }));
    assert!(matches!(stmts.last(), Some(StmtKind::Return(Some(_)))));
}

#[test]
fn switch_falls_through_to_default() {
    let mut unit = Unit::new();
    let x = unit.param("x", TypeRef::int());
    let y = unit.local("y", TypeRef::int());
    let cases = vec![
        Case {
            values: vec![int(1), int(2)],
            body: Block::new(vec![], vec![expr_stmt(assign(var(y, TypeRef::int()), int(10)))]),
        },
        Case {
            values: vec![],
            body: Block::new(vec![], vec![stmt(AstStmt::Break)]),
        },
    ];
    let block = Block::new(
        vec![y],
        vec![stmt(AstStmt::Switch {
            cond: var(x, TypeRef::int()),
            cases,
        })],
    );
    unit.function("f", TypeRef::Void, vec![x], block);

    let (mir, handler) = unit.build();
    assert!(!handler.error_occurred());
    let func = &mir.functions[0];
    assert_eq!(check_labels(func), Ok(()));

    let compares = func
        .body
        .iter()
        .filter(|s| matches!(&s.kind, StmtKind::CJump { cond: Expr { kind: ExprKind::Bin(Op::Eq, _, _), .. }, .. }))
        .count();
    assert_eq!(compares, 2);
}

#[test]
fn break_outside_loop_is_an_error() {
    let mut unit = Unit::new();
    let block = Block::new(vec![], vec![stmt(AstStmt::Break).at(Location::new(4, 5))]);
    unit.function("f", TypeRef::Void, vec![], block);

    let (_, handler) = unit.build();
    assert_eq!(handler.num_errors(), 1);
    let err = handler.errors().next().unwrap();
    assert_eq!(err.message, "break from out of loop");
    assert_eq!(err.location, Some(Location::new(4, 5)));
}

#[test]
fn goto_and_labels() {
    let mut unit = Unit::new();
    let block = Block::new(
        vec![],
        vec![
            stmt(AstStmt::Goto {
                target: "done".into(),
            }),
            stmt(AstStmt::Label {
                name: "done".into(),
                stmt: Box::new(ret(None)),
            }),
        ],
    );
    unit.function("f", TypeRef::Void, vec![], block);

    let (mir, handler) = unit.build();
    assert!(!handler.error_occurred());
    assert_eq!(
        body(&mir),
        vec![
            StmtKind::Jump(Label(0)),
            StmtKind::LabelStmt(Label(0)),
            StmtKind::Return(None)
        ]
    );
}

#[test]
fn undefined_and_duplicated_labels() {
    let mut unit = Unit::new();
    let labelled = || {
        stmt(AstStmt::Label {
            name: "again".into(),
            stmt: Box::new(ret(None)),
        })
    };
    let block = Block::new(
        vec![],
        vec![
            stmt(AstStmt::Goto {
                target: "missing".into(),
            }),
            labelled(),
            labelled(),
        ],
    );
    unit.function("f", TypeRef::Void, vec![], block);

    let (_, handler) = unit.build();
    let messages: Vec<_> = handler.errors().map(|d| d.message.clone()).collect();
    assert_eq!(
        messages,
        vec![
            "duplicated jump labels in f(): again".to_string(),
            "undefined label: missing".to_string(),
        ]
    );
}

#[test]
fn static_locals_are_numbered() {
    let mut unit = Unit::new();
    for name in ["f", "g"] {
        let count = unit.local("count", TypeRef::int());
        unit.entities.get_mut(count).private = true;
        if let EntityKind::DefinedVariable { initializer } = &mut unit.entities.get_mut(count).kind {
            *initializer = Some(int(5));
        }
        unit.function(name, TypeRef::Void, vec![], Block::new(vec![count], vec![]));
    }

    let (mir, _) = unit.build();
    let symbols: Vec<_> = mir
        .variables
        .iter()
        .map(|v| mir.entities.get(v.entity).symbol())
        .collect();
    assert_eq!(symbols, vec!["count.0", "count.1"]);
    assert_eq!(mir.variables[0].init, Some(Expr::int(W, 5)));
    // Static locals are initialized by the assembler, not by code
    assert!(mir.functions[0].body.is_empty());
}

#[test]
fn global_initializers_are_folded() {
    let mut unit = Unit::new();
    unit.global(
        "x",
        TypeRef::int(),
        Some(binary(BinaryOp::Mul, int(2), int(3), TypeRef::int())),
    );
    let (mir, handler) = unit.build();
    assert!(!handler.error_occurred());
    assert_eq!(mir.variables[0].init, Some(Expr::int(W, 6)));
}

#[test]
fn non_constant_global_initializer() {
    let mut unit = Unit::new();
    let get = unit.extern_fn("get", TypeRef::int(), vec![]);
    let fn_ty = TypeRef::function(TypeRef::int(), vec![], false);
    unit.global("y", TypeRef::int(), Some(call(var(get, fn_ty), vec![], TypeRef::int())));

    let (mir, handler) = unit.build();
    assert_eq!(handler.num_errors(), 1);
    assert_eq!(
        handler.errors().next().unwrap().message,
        "initializer of y is not a constant"
    );
    assert_eq!(mir.variables[0].init, None);
}

#[test]
fn constants_are_inlined() {
    let mut unit = Unit::new();
    let size = unit.entities.add(Entity::new(
        "SIZE",
        TypeRef::int(),
        EntityKind::Constant { value: int(16) },
    ));
    unit.declarations.push(size);
    let block = Block::new(vec![], vec![ret(Some(var(size, TypeRef::int())))]);
    unit.function("f", TypeRef::int(), vec![], block);

    let (mir, _) = unit.build();
    assert_eq!(body(&mir)[0], StmtKind::Return(Some(Expr::int(W, 16))));
    assert_eq!(mir.named_constants[0].value, Some(Expr::int(W, 16)));
}

#[test]
fn sizeof_is_folded() {
    let mut unit = Unit::new().with_struct(
        "s",
        vec![("a", TypeRef::char()), ("b", TypeRef::int())],
    );
    let sizeof = ast::Expr::new(
        AstExpr::SizeofType {
            of: TypeRef::Struct("s".into()),
        },
        TypeRef::uint(),
    );
    unit.function("f", TypeRef::uint(), vec![], Block::new(vec![], vec![ret(Some(sizeof))]));

    let (mir, _) = unit.build();
    assert_eq!(body(&mir)[0], StmtKind::Return(Some(Expr::int(W, 8))));
}

#[test]
fn narrowing_cast() {
    let mut unit = Unit::new();
    let x = unit.param("x", TypeRef::int());
    let cast = ast::Expr::new(
        AstExpr::Cast {
            expr: Box::new(var(x, TypeRef::int())),
        },
        TypeRef::char(),
    );
    unit.function("f", TypeRef::char(), vec![x], Block::new(vec![], vec![ret(Some(cast))]));

    let (mir, _) = unit.build();
    assert_eq!(
        body(&mir)[0],
        StmtKind::Return(Some(Expr::uni(RegSize::R8, Op::SCast, Expr::var(W, x))))
    );
}

#[test]
fn every_function_has_well_formed_labels() {
    let mut unit = Unit::new();
    let n = unit.param("n", TypeRef::int());
    let i = unit.local("i", TypeRef::int());
    let for_loop = stmt(AstStmt::For {
        init: Some(assign(var(i, TypeRef::int()), int(0))),
        cond: Some(binary(BinaryOp::Lt, var(i, TypeRef::int()), var(n, TypeRef::int()), TypeRef::int())),
        incr: Some(ast::Expr::new(
            AstExpr::Prefix {
                op: IncDec::Inc,
                expr: Box::new(var(i, TypeRef::int())),
            },
            TypeRef::int(),
        )),
        body: Box::new(stmt(AstStmt::If {
            cond: var(i, TypeRef::int()),
            then: Box::new(stmt(AstStmt::Continue)),
            els: Some(Box::new(stmt(AstStmt::Break))),
        })),
    });
    let do_while = stmt(AstStmt::DoWhile {
        body: Box::new(expr_stmt(assign(var(i, TypeRef::int()), int(1)))),
        cond: int(0),
    });
    unit.function("f", TypeRef::Void, vec![n], Block::new(vec![i], vec![for_loop, do_while]));

    let (mir, handler) = unit.build();
    assert!(!handler.error_occurred());
    for func in &mir.functions {
        assert_eq!(check_labels(func), Ok(()));
    }
    assert!(mir.functions[0]
        .body
        .iter()
        .all(|s: &Stmt| !matches!(s.kind, StmtKind::Return(_))));
}

fn char_array_with(unit: &mut Unit, len: u64, literal: &str) -> EntityId {
    let init = ast::Expr::new(
        AstExpr::Str {
            value: literal.into(),
        },
        TypeRef::pointer_to(TypeRef::char()),
    );
    let buf = unit.entities.add(Entity::new(
        "buf",
        TypeRef::array_of(TypeRef::char(), len),
        EntityKind::DefinedVariable {
            initializer: Some(init),
        },
    ));
    let block = Block::new(vec![buf], vec![ret(None)]);
    unit.function("f", TypeRef::Void, vec![], block);
    buf
}

#[test]
fn string_initializer_zero_fills_the_array() {
    let mut unit = Unit::new();
    let buf = char_array_with(&mut unit, 6, "hi");
    let (mir, handler) = unit.build();
    assert!(!handler.error_occurred());

    let hi = mir.constants.find("hi").unwrap();
    let at = |base: Expr, k: i64| {
        if k == 0 {
            base
        } else {
            Expr::bin(W, Op::Add, base, Expr::int(W, k))
        }
    };
    let src = Expr::new(W, ExprKind::Str(hi));
    let body = body(&mir);
    assert!(body.len() > 6);
    for k in 0..6 {
        let rhs = if k < 3 {
            Expr::mem(RegSize::R8, at(src.clone(), k))
        } else {
            Expr::int(RegSize::R8, 0)
        };
        assert_eq!(
            body[k as usize],
            StmtKind::Assign {
                lhs: at(Expr::addr(W, buf), k),
                rhs,
            }
        );
    }
}

#[test]
fn string_filling_the_array_exactly_drops_the_terminator() {
    let mut unit = Unit::new();
    char_array_with(&mut unit, 2, "hi");
    let (mir, handler) = unit.build();
    assert!(!handler.error_occurred());
    let stores = body(&mir)
        .iter()
        .filter(|s| matches!(s, StmtKind::Assign { .. }))
        .count();
    assert_eq!(stores, 2);
}

#[test]
fn string_longer_than_the_array() {
    let mut unit = Unit::new();
    char_array_with(&mut unit, 2, "hello");
    let (_, handler) = unit.build();
    assert_eq!(handler.num_errors(), 1);
    assert_eq!(
        handler.errors().next().unwrap().message,
        "string initializer is too long for an array of 2 bytes"
    );
}
