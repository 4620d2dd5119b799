use thiserror::Error;

/// Reason a type identifier did not produce an instance.
///
/// [`TypeRegistry::create_instance`](super::TypeRegistry::create_instance)
/// collapses every variant into `None`; the variants only surface through
/// [`TypeRegistry::build`](super::TypeRegistry::build) and in logs.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BuildError {
    #[error("Build error, unknown type identifier (name: {0:?})")]
    UnknownType(String),

    #[error("Build error, type has no default constructor (name: {0})")]
    NoDefaultConstructor(String),

    #[error("Build error, default constructor failed (name: {name}, reason: {reason})")]
    ConstructionFailed { name: String, reason: String },

    #[error("Build error, default constructor panicked (name: {0})")]
    ConstructorPanicked(String),
}
