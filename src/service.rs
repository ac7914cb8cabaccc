//! Typed handles to container registrations.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::container::Container;
use crate::error::Error;
use crate::scope::Scope;

/// Names a dependency of type `T` and, optionally, the scope to resolve it in.
///
/// A handler can hold these as fields instead of repeating names and scope
/// ids at every call site:
///
/// ```rust
/// # use gantry::{Container, Service};
/// # use std::time::Duration;
/// struct Users {
///     db: Service<String>,
/// }
///
/// let container = Container::new();
/// container
///     .add_singleton_with_name("db", || Ok::<_, std::io::Error>("db://".to_owned()))
///     .unwrap();
///
/// let users = Users { db: Service::named("db") };
/// assert_eq!(*users.db.resolve(&container).unwrap(), "db://");
/// ```
pub struct Service<T> {
    name: Cow<'static, str>,
    scope: Option<Scope>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Service<T> {
    /// A handle keyed by `T`'s type name, matching the type-keyed
    /// registration methods on [`Container`].
    pub fn new() -> Self {
        Self::named(type_name::<T>())
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into(), scope: None, _marker: PhantomData }
    }

    /// A copy of this handle bound to scope `id` with the given TTL.
    pub fn scoped(&self, id: u64, ttl: Duration) -> Self {
        Self { name: self.name.clone(), scope: Some(Scope::new(id, ttl)), _marker: PhantomData }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> Option<Scope> {
        self.scope
    }

    pub fn resolve(&self, container: &Container) -> Result<Arc<T>, Error> {
        container.resolve_with_name(&self.name, self.scope.as_ref())
    }
}

impl<T: Send + Sync + 'static> Default for Service<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Clone for Service<T> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), scope: self.scope, _marker: PhantomData }
    }
}

impl<T> fmt::Debug for Service<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .finish()
    }
}
