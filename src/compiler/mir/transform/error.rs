//! Defines the error types which are reported while lowering a program to
//! MIR.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum TransformError {
    #[error("break from out of loop")]
    BreakOutsideLoop,
    #[error("continue from out of loop")]
    ContinueOutsideLoop,
    #[error("duplicated jump labels in {0}(): {1}")]
    DuplicatedLabel(String, String),
    #[error("undefined label: {0}")]
    UndefinedLabel(String),
    #[error("initializer of {0} is not a constant")]
    NonConstantInitializer(String),
    #[error("string initializer is too long for an array of {0} bytes")]
    InitializerTooLong(u64),
}
