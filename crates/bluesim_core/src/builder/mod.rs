//! Name to instance construction.
//!
//! Types are made constructible by name through explicit registration on a
//! [`TypeRegistry`]. [`ObjectBuilder`] is the process-wide entry point: it
//! resolves a type identifier against the global registry and returns a fresh
//! default instance, or `None` when the name is unknown or the type cannot be
//! built without arguments. Absence is an expected outcome, callers usually
//! skip the feature the name stood for.
//!
//! ```ignore
//! ObjectBuilder::registry().register_default::<BasicHandler>("BasicHandler");
//!
//! let handler = ObjectBuilder::create_instance_of::<BasicHandler>("BasicHandler");
//! assert!(handler.is_some());
//! assert!(ObjectBuilder::create_instance("NoSuchType").is_none());
//! ```
mod error;
mod registry;

use std::any::Any;

use once_cell::sync::Lazy;

pub use error::BuildError;
pub use registry::{Factory, TypeRegistry};

static GLOBAL_REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// Stateless front end over the global [`TypeRegistry`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectBuilder;

impl ObjectBuilder {
    /// The process-wide registry consulted by [`create_instance`](Self::create_instance).
    pub fn registry() -> &'static TypeRegistry {
        &GLOBAL_REGISTRY
    }

    /// Creates a new default instance of the type registered under `name`.
    ///
    /// Returns `None` if no type is registered under `name`, if the type has
    /// no default constructor, or if its constructor fails. Every call builds
    /// an independent instance owned by the caller.
    pub fn create_instance(name: &str) -> Option<Box<dyn Any + Send>> {
        GLOBAL_REGISTRY.create_instance(name)
    }

    /// Same as [`create_instance`](Self::create_instance), downcast to `U`.
    pub fn create_instance_of<U: Any>(name: &str) -> Option<Box<U>> {
        GLOBAL_REGISTRY.create_instance_of::<U>(name)
    }
}
