//! Evaluates operations whose operands are integer literals.  Static
//! variables are emitted as data, so their initializers must be reduced to
//! a value the assembler knows.

use crate::compiler::arch::registers::RegSize;

use super::{
    ir::{Expr, ExprKind},
    Op,
};

/// Replaces every unary or binary operation on integer literals in `expr`
/// with its value.  Operations which cannot be evaluated, such as a
/// division by zero, are left in place.
pub fn fold_constant(expr: Expr) -> Expr {
    let width = expr.width;
    match expr.kind {
        ExprKind::Uni(op, e) => {
            let e = fold_constant(*e);
            match (op, &e.kind) {
                (Op::UMinus, ExprKind::Int(v)) => Expr::int(width, truncate(v.wrapping_neg(), width)),
                (Op::BitNot, ExprKind::Int(v)) => Expr::int(width, truncate(!v, width)),
                (Op::Not, ExprKind::Int(v)) => Expr::int(width, (*v == 0) as i64),
                (Op::SCast, ExprKind::Int(v)) => Expr::int(width, truncate(*v, width)),
                (Op::UCast, ExprKind::Int(v)) => {
                    Expr::int(width, truncate(zero_extend(*v, e.width), width))
                }
                _ => Expr::uni(width, op, e),
            }
        }
        ExprKind::Bin(op, l, r) => {
            let l = fold_constant(*l);
            let r = fold_constant(*r);
            match (&l.kind, &r.kind) {
                (ExprKind::Int(a), ExprKind::Int(b)) => match evaluate(op, *a, *b, l.width) {
                    Some(v) => Expr::int(width, truncate(v, width)),
                    None => Expr::bin(width, op, l, r),
                },
                _ => Expr::bin(width, op, l, r),
            }
        }
        kind => Expr::new(width, kind),
    }
}

fn evaluate(op: Op, a: i64, b: i64, width: RegSize) -> Option<i64> {
    let (ua, ub) = (zero_extend(a, width) as u64, zero_extend(b, width) as u64);
    let shift = u32::try_from(b).ok();
    Some(match op {
        Op::Add => a.wrapping_add(b),
        Op::Sub => a.wrapping_sub(b),
        Op::Mul => a.wrapping_mul(b),
        Op::SDiv => a.checked_div(b)?,
        Op::UDiv => ua.checked_div(ub)? as i64,
        Op::SMod => a.checked_rem(b)?,
        Op::UMod => ua.checked_rem(ub)? as i64,
        Op::BitAnd => a & b,
        Op::BitOr => a | b,
        Op::BitXor => a ^ b,
        Op::BitLShift => a.checked_shl(shift?)?,
        Op::ArithRShift => a.checked_shr(shift?)?,
        Op::BitRShift => ua.checked_shr(shift?)? as i64,
        Op::Eq => (a == b) as i64,
        Op::Neq => (a != b) as i64,
        Op::SGt => (a > b) as i64,
        Op::SGteq => (a >= b) as i64,
        Op::SLt => (a < b) as i64,
        Op::SLteq => (a <= b) as i64,
        Op::UGt => (ua > ub) as i64,
        Op::UGteq => (ua >= ub) as i64,
        Op::ULt => (ua < ub) as i64,
        Op::ULteq => (ua <= ub) as i64,
        Op::UMinus | Op::BitNot | Op::Not | Op::SCast | Op::UCast => return None,
    })
}

/// Sign extends the low `width` bits of `v`.
fn truncate(v: i64, width: RegSize) -> i64 {
    match width {
        RegSize::R8 => v as i8 as i64,
        RegSize::R16 => v as i16 as i64,
        RegSize::R32 => v as i32 as i64,
        RegSize::R64 => v,
    }
}

/// Zero extends the low `width` bits of `v`.
fn zero_extend(v: i64, width: RegSize) -> i64 {
    match width {
        RegSize::R8 => v as u8 as i64,
        RegSize::R16 => v as u16 as i64,
        RegSize::R32 => v as u32 as i64,
        RegSize::R64 => v,
    }
}
