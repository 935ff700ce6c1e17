use serde::Serialize;

use crate::compiler::ast::{BinaryOp, UnaryOp};

/// The operations available to MIR expressions.  Operations whose result
/// depends on the signedness of their operands come in a signed and an
/// unsigned flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Op {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SMod,
    UMod,
    BitAnd,
    BitOr,
    BitXor,
    BitLShift,
    /// Logical right shift: fills with zero bits.
    BitRShift,
    /// Arithmetic right shift: fills with the sign bit.
    ArithRShift,

    Eq,
    Neq,
    SGt,
    SGteq,
    SLt,
    SLteq,
    UGt,
    UGteq,
    ULt,
    ULteq,

    UMinus,
    BitNot,
    Not,

    SCast,
    UCast,
}

impl Op {
    pub fn intern_binary(op: BinaryOp, signed: bool) -> Op {
        match op {
            BinaryOp::Add => Op::Add,
            BinaryOp::Sub => Op::Sub,
            BinaryOp::Mul => Op::Mul,
            BinaryOp::Div if signed => Op::SDiv,
            BinaryOp::Div => Op::UDiv,
            BinaryOp::Mod if signed => Op::SMod,
            BinaryOp::Mod => Op::UMod,
            BinaryOp::BitAnd => Op::BitAnd,
            BinaryOp::BitOr => Op::BitOr,
            BinaryOp::BitXor => Op::BitXor,
            BinaryOp::Shl => Op::BitLShift,
            BinaryOp::Shr if signed => Op::ArithRShift,
            BinaryOp::Shr => Op::BitRShift,
            BinaryOp::Eq => Op::Eq,
            BinaryOp::Ne => Op::Neq,
            BinaryOp::Lt if signed => Op::SLt,
            BinaryOp::Lt => Op::ULt,
            BinaryOp::Le if signed => Op::SLteq,
            BinaryOp::Le => Op::ULteq,
            BinaryOp::Gt if signed => Op::SGt,
            BinaryOp::Gt => Op::UGt,
            BinaryOp::Ge if signed => Op::SGteq,
            BinaryOp::Ge => Op::UGteq,
        }
    }

    /// # Panics
    /// For unary plus, which is not an operation and never reaches MIR.
    pub fn intern_unary(op: UnaryOp) -> Op {
        match op {
            UnaryOp::Plus => panic!("Unary plus should not be in MIR"),
            UnaryOp::Minus => Op::UMinus,
            UnaryOp::BitNot => Op::BitNot,
            UnaryOp::Not => Op::Not,
        }
    }

    pub fn is_compare(&self) -> bool {
        use Op::*;
        matches!(
            self,
            Eq | Neq | SGt | SGteq | SLt | SLteq | UGt | UGteq | ULt | ULteq
        )
    }

    pub fn is_unary(&self) -> bool {
        matches!(self, Op::UMinus | Op::BitNot | Op::Not | Op::SCast | Op::UCast)
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Op::*;
        f.write_str(match self {
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            SDiv => "S_DIV",
            UDiv => "U_DIV",
            SMod => "S_MOD",
            UMod => "U_MOD",
            BitAnd => "BIT_AND",
            BitOr => "BIT_OR",
            BitXor => "BIT_XOR",
            BitLShift => "BIT_LSHIFT",
            BitRShift => "BIT_RSHIFT",
            ArithRShift => "ARITH_RSHIFT",
            Eq => "EQ",
            Neq => "NEQ",
            SGt => "S_GT",
            SGteq => "S_GTEQ",
            SLt => "S_LT",
            SLteq => "S_LTEQ",
            UGt => "U_GT",
            UGteq => "U_GTEQ",
            ULt => "U_LT",
            ULteq => "U_LTEQ",
            UMinus => "UMINUS",
            BitNot => "BIT_NOT",
            Not => "NOT",
            SCast => "S_CAST",
            UCast => "U_CAST",
        })
    }
}
