//! Explicit name to factory table.
//!
//! Each concrete type registers itself under a textual identifier together
//! with a zero-argument constructor. Lookups are exact and case-sensitive.
//! The registry never retains the instances it builds: every successful
//! lookup runs the constructor again and hands the new `Box` to the caller.

use std::{
    any::{Any, type_name},
    fmt::{self, Debug, Display},
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use dashmap::DashMap;
use tracing::{debug, warn};

use super::error::BuildError;

/// Zero-argument constructor stored for a type identifier.
pub type Factory<T> = Arc<dyn Fn() -> Result<Box<T>, BuildError> + Send + Sync>;

struct Entry<T: ?Sized> {
    type_name: &'static str,
    /// `None` for types known by name that cannot be built without arguments.
    constructor: Option<Factory<T>>,
}

/// Concurrent table mapping type identifiers to constructors of `Box<T>`.
///
/// `T` defaults to `dyn Any + Send`, the type-erased registry used by
/// [`ObjectBuilder`](super::ObjectBuilder). Registries of a narrower trait
/// object (for instance sensor services) share the same machinery.
///
/// Cloning is cheap and clones share the same underlying table.
pub struct TypeRegistry<T: ?Sized + 'static = dyn Any + Send> {
    entries: Arc<DashMap<String, Entry<T>>>,
}

impl<T: ?Sized + 'static> Clone for TypeRegistry<T> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries) }
    }
}

impl<T: ?Sized + 'static> Default for TypeRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry").field("names", &self.names()).finish()
    }
}

impl<T: ?Sized + 'static> TypeRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { entries: Arc::new(DashMap::new()) }
    }

    /// Registers `factory` as the default constructor for `name`.
    ///
    /// `type_name` is the concrete type produced, kept for diagnostics.
    /// Registering a name twice replaces the previous entry.
    pub fn register_with<F>(&self, name: impl Into<String>, type_name: &'static str, factory: F)
    where
        F: Fn() -> Result<Box<T>, BuildError> + Send + Sync + 'static,
    {
        let constructor: Factory<T> = Arc::new(factory);
        self.insert(name.into(), Entry { type_name, constructor: Some(constructor) });
    }

    /// Registers `U` under `name` without a default constructor.
    ///
    /// The name is known to the registry but every lookup of it yields no
    /// instance, which mirrors a type whose only initializers take arguments.
    pub fn register_without_default<U: ?Sized + 'static>(&self, name: impl Into<String>) {
        self.insert(name.into(), Entry { type_name: type_name::<U>(), constructor: None });
    }

    fn insert(&self, name: String, entry: Entry<T>) {
        let new_type = entry.type_name;
        if let Some(previous) = self.entries.insert(name.clone(), entry) {
            warn!(
                name = %name,
                previous = previous.type_name,
                replacement = new_type,
                "type identifier registered twice, previous entry replaced"
            );
        }
    }

    /// Removes `name` from the registry. Returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every registered identifier, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Identifiers for which [`create_instance`](Self::create_instance) can
    /// succeed, sorted.
    pub fn constructible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().constructor.is_some())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Concrete Rust type registered under `name`.
    pub fn type_name_of(&self, name: &str) -> Option<&'static str> {
        self.entries.get(name).map(|entry| entry.type_name)
    }

    /// Builds a new instance for `name`, keeping the cause of failure.
    ///
    /// The constructor runs outside of the table lock, so a constructor may
    /// itself look up other names. A panicking constructor is contained and
    /// reported as [`BuildError::ConstructorPanicked`]. The process panic
    /// hook still runs first, so with the default hook the panic message is
    /// printed to stderr.
    pub fn build(&self, name: &str) -> Result<Box<T>, BuildError> {
        let constructor = {
            let entry =
                self.entries.get(name).ok_or_else(|| BuildError::UnknownType(name.to_string()))?;
            entry
                .constructor
                .clone()
                .ok_or_else(|| BuildError::NoDefaultConstructor(name.to_string()))?
        };

        catch_unwind(AssertUnwindSafe(|| constructor()))
            .map_err(|_| BuildError::ConstructorPanicked(name.to_string()))?
    }

    /// Builds a new instance for `name`, or `None` when the name is unknown
    /// or its type cannot be default-constructed.
    ///
    /// Failures are only logged at `debug`, except that a panicking
    /// constructor still goes through the panic hook (see [`build`](Self::build)).
    pub fn create_instance(&self, name: &str) -> Option<Box<T>> {
        match self.build(name) {
            Ok(instance) => Some(instance),
            Err(error) => {
                debug!(name, %error, "no instance produced");
                None
            }
        }
    }
}

impl TypeRegistry<dyn Any + Send> {
    /// Registers `U::default()` as the constructor for `name`.
    pub fn register_default<U>(&self, name: impl Into<String>)
    where
        U: Default + Send + 'static,
    {
        self.register_with(name, type_name::<U>(), || {
            Ok(Box::new(U::default()) as Box<dyn Any + Send>)
        });
    }

    /// Registers a zero-argument constructor that may fail.
    ///
    /// The error is recorded as [`BuildError::ConstructionFailed`].
    pub fn register_fallible<U, E, F>(&self, name: impl Into<String>, factory: F)
    where
        U: Send + 'static,
        E: Display,
        F: Fn() -> Result<U, E> + Send + Sync + 'static,
    {
        let name = name.into();
        let failed_name = name.clone();
        self.register_with(name, type_name::<U>(), move || {
            factory().map(|value| Box::new(value) as Box<dyn Any + Send>).map_err(|error| {
                BuildError::ConstructionFailed {
                    name: failed_name.clone(),
                    reason: error.to_string(),
                }
            })
        });
    }

    /// Builds `name` and downcasts it to `U`.
    ///
    /// A name registered with a different type yields `None`.
    pub fn create_instance_of<U: Any>(&self, name: &str) -> Option<Box<U>> {
        match self.create_instance(name)?.downcast::<U>() {
            Ok(instance) => Some(instance),
            Err(_) => {
                debug!(
                    name,
                    registered = ?self.type_name_of(name),
                    requested = type_name::<U>(),
                    "instance type mismatch"
                );
                None
            }
        }
    }
}

/// Registers several `Default` types on a type-erased registry.
///
/// ```ignore
/// register_defaults!(registry, {
///     "BasicHandler" => BasicHandler,
///     "OtherHandler" => OtherHandler,
/// });
/// ```
#[macro_export]
macro_rules! register_defaults {
    ($registry:expr, { $($name:expr => $ty:ty),+ $(,)? }) => {{
        let registry = &$registry;
        $( registry.register_default::<$ty>($name); )+
    }};
}
