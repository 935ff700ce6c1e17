use thiserror::Error;

/// User facing problems found when validating the type table.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TypeError {
    #[error("recursive type definition: {0}")]
    RecursiveDefinition(String),
    #[error("{0} has duplicated member: {1}")]
    DuplicatedMember(String, String),
    #[error("{0} cannot contain void")]
    VoidMember(String),
    #[error("array cannot contain void")]
    VoidArrayElement,
}
