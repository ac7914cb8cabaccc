//! Dependency container.
//!
//! Maps a logical name to a factory and a [`Lifecycle`]:
//!
//! | Lifecycle | Factory runs | Cached |
//! |---|---|---|
//! | Singleton | once, on first resolve | forever, errors included, until refreshed |
//! | Transient | on every resolve | never |
//! | Scoped | once per scope id | until the scope's TTL elapses or it is closed |
//!
//! A container is an ordinary value. Build one at startup, wrap it in an
//! `Arc`, and hand it to whatever resolves dependencies; the server passes
//! it to every request.
//!
//! ```rust
//! use std::time::Duration;
//! use gantry::{Container, Scope};
//!
//! struct Config { url: String }
//! struct Session { user: u64 }
//!
//! let container = Container::new();
//! container.add_singleton(|| Ok::<_, std::io::Error>(Config { url: "db://".into() })).unwrap();
//! container
//!     .add_scoped_with_name("session", || Ok::<_, std::io::Error>(Session { user: 1 }))
//!     .unwrap();
//!
//! let config = container.resolve::<Config>(None).unwrap();
//! let scope = Scope::new(42, Duration::from_secs(30));
//! let session = container.resolve_with_name::<Session>("session", Some(&scope)).unwrap();
//! # let _ = (config, session);
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::debug;

use crate::cell::OnceCell;
use crate::error::{Error, SharedError};
use crate::scope::{Reaper, Scope, ScopeStore};

/// Error type factories may return; anything convertible into it works.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

/// A type-erased factory and the type it produces.
#[derive(Clone)]
struct Factory {
    build: Arc<dyn Fn() -> Result<Instance, SharedError> + Send + Sync>,
    produces: TypeId,
}

impl Factory {
    fn call(&self) -> Result<Instance, SharedError> {
        (self.build)()
    }
}

type RefreshCallback = Arc<dyn Fn(RefreshEvent) + Send + Sync>;

/// How long a resolved instance lives.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Lifecycle {
    Singleton,
    Transient,
    Scoped,
}

/// Delivered to [`Container::on_refresh_with_name`] subscribers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefreshEvent {
    Refreshed,
}

struct Singleton {
    cell: OnceCell<Instance, SharedError>,
    factory: Factory,
}

#[derive(Clone)]
enum Registration {
    Singleton(Arc<Singleton>),
    Transient(Factory),
    Scoped(Factory),
}

impl Registration {
    fn singleton(factory: Factory) -> Self {
        Self::Singleton(Arc::new(Singleton { cell: OnceCell::new(), factory }))
    }

    fn produces(&self) -> TypeId {
        match self {
            Self::Singleton(singleton) => singleton.factory.produces,
            Self::Transient(factory) | Self::Scoped(factory) => factory.produces,
        }
    }

    fn lifecycle(&self) -> Lifecycle {
        match self {
            Self::Singleton(_) => Lifecycle::Singleton,
            Self::Transient(_) => Lifecycle::Transient,
            Self::Scoped(_) => Lifecycle::Scoped,
        }
    }
}

/// Concurrent registry of named factories.
pub struct Container {
    entries: DashMap<String, Registration>,
    subscribers: DashMap<String, Vec<RefreshCallback>>,
    scopes: Arc<ScopeStore>,
    refresh: Mutex<()>,
    reaper: Reaper,
}

impl Container {
    /// Creates an empty container and starts its scope-eviction thread.
    /// The thread stops when the container is dropped.
    pub fn new() -> Self {
        let scopes = Arc::new(ScopeStore::default());
        Self {
            entries: DashMap::new(),
            subscribers: DashMap::new(),
            reaper: Reaper::spawn(Arc::clone(&scopes)),
            scopes,
            refresh: Mutex::new(()),
        }
    }

    // ── Registration ─────────────────────────────────────────────────────────

    pub fn add_singleton<T, E, F>(&self, factory: F) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.add_singleton_with_name(type_name::<T>(), factory)
    }

    /// Registers a factory that runs at most once; every resolver shares
    /// its result.
    pub fn add_singleton_with_name<T, E, F>(&self, name: &str, factory: F) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.insert(name, Registration::singleton(erase(factory)))
    }

    pub fn add_transient<T, E, F>(&self, factory: F) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.add_transient_with_name(type_name::<T>(), factory)
    }

    /// Registers a factory that runs on every resolve.
    pub fn add_transient_with_name<T, E, F>(&self, name: &str, factory: F) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.insert(name, Registration::Transient(erase(factory)))
    }

    pub fn add_scoped<T, E, F>(&self, factory: F) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.add_scoped_with_name(type_name::<T>(), factory)
    }

    /// Registers a factory that runs once per [`Scope`] id.
    pub fn add_scoped_with_name<T, E, F>(&self, name: &str, factory: F) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.insert(name, Registration::Scoped(erase(factory)))
    }

    fn insert(&self, name: &str, registration: Registration) -> Result<(), Error> {
        match self.entries.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(Error::ObjectAlreadyExists(name.to_owned())),
            Entry::Vacant(vacant) => {
                debug!(name, lifecycle = ?registration.lifecycle(), "dependency registered");
                vacant.insert(registration);
                Ok(())
            }
        }
    }

    // ── Resolution ───────────────────────────────────────────────────────────

    pub fn resolve<T: Send + Sync + 'static>(
        &self,
        scope: Option<&Scope>,
    ) -> Result<Arc<T>, Error> {
        self.resolve_with_name(type_name::<T>(), scope)
    }

    /// Resolves `name` as a `T` under its registered lifecycle.
    ///
    /// `scope` is required for scoped registrations and ignored otherwise.
    /// A singleton's first resolution blocks concurrent resolvers until its
    /// factory returns.
    pub fn resolve_with_name<T: Send + Sync + 'static>(
        &self,
        name: &str,
        scope: Option<&Scope>,
    ) -> Result<Arc<T>, Error> {
        // Clone out of the map so no shard lock is held while a factory runs.
        let registration = self
            .entries
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::ObjectNotFound(name.to_owned()))?;

        // Nothing runs or gets stored for a resolve that could never succeed.
        if registration.produces() != TypeId::of::<T>() {
            return Err(Error::InvalidCast(name.to_owned()));
        }

        let instance = match registration {
            Registration::Singleton(singleton) => singleton
                .cell
                .get_or_init(|| singleton.factory.call())
                .map_err(|source| factory_error(name, source))?,
            Registration::Transient(factory) => {
                factory.call().map_err(|source| factory_error(name, source))?
            }
            Registration::Scoped(factory) => {
                let scope = scope.ok_or(Error::MissingRequiredParameter("scope"))?;
                self.resolve_scoped(name, &factory, *scope)?
            }
        };

        downcast(name, instance)
    }

    fn resolve_scoped(
        &self,
        name: &str,
        factory: &Factory,
        scope: Scope,
    ) -> Result<Instance, Error> {
        if let Some(instance) = self.scopes.get(scope.id(), name) {
            return Ok(instance);
        }

        let created = factory.call().map_err(|source| factory_error(name, source))?;
        let (instance, eviction) = self.scopes.insert_if_absent(scope, name, Arc::clone(&created));
        if Arc::ptr_eq(&instance, &created) {
            debug!(name, scope = scope.id(), ttl = ?scope.ttl(), "scoped instance created");
        }
        if let Some(eviction) = eviction {
            self.reaper.schedule(eviction);
        }
        Ok(instance)
    }

    /// Like [`resolve_with_name`](Self::resolve_with_name), discarding the error.
    pub fn try_resolve_with_name<T: Send + Sync + 'static>(
        &self,
        name: &str,
        scope: Option<&Scope>,
    ) -> Option<Arc<T>> {
        self.resolve_with_name(name, scope).ok()
    }

    pub fn try_resolve<T: Send + Sync + 'static>(&self, scope: Option<&Scope>) -> Option<Arc<T>> {
        self.try_resolve_with_name(type_name::<T>(), scope)
    }

    /// Like [`resolve_with_name`](Self::resolve_with_name), but panics on
    /// failure. For call sites where a missing dependency is a startup bug.
    ///
    /// # Panics
    ///
    /// Panics with the resolution error.
    pub fn require_with_name<T: Send + Sync + 'static>(
        &self,
        name: &str,
        scope: Option<&Scope>,
    ) -> Arc<T> {
        match self.resolve_with_name(name, scope) {
            Ok(instance) => instance,
            Err(e) => panic!("failed to resolve `{name}`: {e}"),
        }
    }

    pub fn require<T: Send + Sync + 'static>(&self, scope: Option<&Scope>) -> Arc<T> {
        self.require_with_name(type_name::<T>(), scope)
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.contains_with_name(type_name::<T>())
    }

    pub fn contains_with_name(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn lifecycle(&self, name: &str) -> Option<Lifecycle> {
        self.entries.get(name).map(|entry| entry.lifecycle())
    }

    /// Drops every scoped instance held for `id`, whatever its TTL.
    pub fn close_scope(&self, id: u64) {
        let closed = self.scopes.close(id);
        debug!(scope = id, closed, "scope closed");
    }

    // ── Refresh ──────────────────────────────────────────────────────────────

    pub fn refresh_singleton<T, E, F>(&self, transform: F) -> Result<Arc<T>, Error>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: FnOnce(Arc<T>) -> Result<T, E>,
    {
        self.refresh_singleton_with_name(type_name::<T>(), transform)
    }

    /// Replaces a singleton with `transform(current)` and returns the
    /// instance that was current before.
    ///
    /// Fails without changing anything if the current instance cannot be
    /// resolved. A failing `transform` is installed like a failing factory:
    /// resolvers get its error until the next refresh.
    pub fn refresh_singleton_with_name<T, E, F>(
        &self,
        name: &str,
        transform: F,
    ) -> Result<Arc<T>, Error>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: FnOnce(Arc<T>) -> Result<T, E>,
    {
        let _serialized = self.refresh.lock();
        let current = self.resolve_with_name::<T>(name, None)?;

        let next = transform(Arc::clone(&current))
            .map(|value| Arc::new(value) as Instance)
            .map_err(shared);
        let factory = Factory {
            build: Arc::new(move || next.clone()),
            produces: TypeId::of::<T>(),
        };
        self.entries.insert(name.to_owned(), Registration::singleton(factory));

        debug!(name, "singleton refreshed");
        self.notify(name);
        Ok(current)
    }

    pub fn refresh_transient<T, E, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.refresh_transient_with_name(type_name::<T>(), factory);
    }

    /// Installs `factory` as the transient registration for `name`,
    /// replacing whatever was there.
    pub fn refresh_transient_with_name<T, E, F>(&self, name: &str, factory: F)
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let _serialized = self.refresh.lock();
        self.entries.insert(name.to_owned(), Registration::Transient(erase(factory)));
        debug!(name, "transient refreshed");
        self.notify(name);
    }

    pub fn refresh_scoped<T, E, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.refresh_scoped_with_name(type_name::<T>(), factory);
    }

    /// Installs `factory` as the scoped registration for `name`.
    ///
    /// Instances already living in open scopes are kept until they expire
    /// or their scope is closed; only new scopes see the new factory.
    pub fn refresh_scoped_with_name<T, E, F>(&self, name: &str, factory: F)
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let _serialized = self.refresh.lock();
        self.entries.insert(name.to_owned(), Registration::Scoped(erase(factory)));
        debug!(name, "scoped refreshed");
        self.notify(name);
    }

    pub fn on_refresh<T: 'static>(&self, callback: impl Fn(RefreshEvent) + Send + Sync + 'static) {
        self.on_refresh_with_name(type_name::<T>(), callback);
    }

    /// Subscribes `callback` to refreshes of `name`.
    ///
    /// Callbacks run synchronously, in subscription order, on the refreshing
    /// thread while the refresh lock is held. They must not refresh.
    pub fn on_refresh_with_name(
        &self,
        name: &str,
        callback: impl Fn(RefreshEvent) + Send + Sync + 'static,
    ) {
        self.subscribers.entry(name.to_owned()).or_default().push(Arc::new(callback));
    }

    fn notify(&self, name: &str) {
        let callbacks = self
            .subscribers
            .get(name)
            .map(|callbacks| callbacks.value().clone())
            .unwrap_or_default();
        for callback in callbacks {
            callback(RefreshEvent::Refreshed);
        }
    }
}

impl Default for Container {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("entries", &self.entries.len())
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

fn erase<T, E, F>(factory: F) -> Factory
where
    T: Send + Sync + 'static,
    E: Into<BoxError>,
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
{
    Factory {
        build: Arc::new(move || factory().map(|value| Arc::new(value) as Instance).map_err(shared)),
        produces: TypeId::of::<T>(),
    }
}

fn shared<E: Into<BoxError>>(error: E) -> SharedError {
    let boxed: BoxError = error.into();
    SharedError::from(boxed)
}

fn factory_error(name: &str, source: SharedError) -> Error {
    Error::Factory { name: name.to_owned(), source }
}

fn downcast<T: Send + Sync + 'static>(name: &str, instance: Instance) -> Result<Arc<T>, Error> {
    instance.downcast::<T>().map_err(|_| Error::InvalidCast(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn ok<T>(value: T) -> Result<T, io::Error> {
        Ok(value)
    }

    #[test]
    fn unregistered_name_is_not_found() {
        let container = Container::new();
        let err = container.resolve_with_name::<u32>("missing", None).unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound(name) if name == "missing"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let container = Container::new();
        container.add_singleton_with_name("n", || ok(1u32)).unwrap();
        let err = container.add_transient_with_name("n", || ok(2u32)).unwrap_err();
        assert!(matches!(err, Error::ObjectAlreadyExists(_)));
        assert_eq!(container.lifecycle("n"), Some(Lifecycle::Singleton));
    }

    #[test]
    fn type_keyed_registration() {
        let container = Container::new();
        container.add_singleton(|| ok(String::from("hello"))).unwrap();
        assert!(container.contains::<String>());
        assert_eq!(*container.resolve::<String>(None).unwrap(), "hello");
    }

    #[test]
    fn singleton_is_constructed_once_under_contention() {
        let container = Arc::new(Container::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&counter);
        container
            .add_singleton_with_name("counter", move || {
                thread::sleep(Duration::from_millis(20));
                ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .unwrap();

        let barrier = Arc::new(Barrier::new(16));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let (container, barrier) = (Arc::clone(&container), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    container.resolve_with_name::<usize>("counter", None).unwrap()
                })
            })
            .collect();

        let resolved: Vec<Arc<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(resolved.iter().all(|v| **v == 1 && Arc::ptr_eq(v, &resolved[0])));
    }

    #[test]
    fn singleton_errors_are_cached_until_refresh() {
        let container = Container::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&attempts);
        container
            .add_singleton_with_name("flaky", move || {
                counted.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(io::Error::other("down"))
            })
            .unwrap();

        for _ in 0..3 {
            let err = container.resolve_with_name::<u32>("flaky", None).unwrap_err();
            assert!(matches!(err, Error::Factory { ref name, .. } if name == "flaky"));
            assert!(err.to_string().contains("down"));
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        // The current instance is an error, so there is nothing to transform.
        let err = container
            .refresh_singleton_with_name::<u32, io::Error, _>("flaky", |old| Ok(*old + 1));
        assert!(err.is_err());
    }

    #[test]
    fn singleton_refresh_transforms_and_notifies() {
        let container = Container::new();
        container.add_singleton_with_name("version", || ok(1u32)).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            container.on_refresh_with_name("version", move |event| seen.lock().push((tag, event)));
        }

        let old = container
            .refresh_singleton_with_name("version", |current: Arc<u32>| ok(*current + 1))
            .unwrap();
        assert_eq!(*old, 1);
        assert_eq!(*container.resolve_with_name::<u32>("version", None).unwrap(), 2);
        assert_eq!(
            *seen.lock(),
            vec![("first", RefreshEvent::Refreshed), ("second", RefreshEvent::Refreshed)]
        );
    }

    #[test]
    fn failed_transform_is_cached() {
        let container = Container::new();
        container.add_singleton_with_name("v", || ok(1u32)).unwrap();
        container
            .refresh_singleton_with_name("v", |_: Arc<u32>| Err::<u32, _>(io::Error::other("bad")))
            .unwrap();
        assert!(matches!(
            container.resolve_with_name::<u32>("v", None),
            Err(Error::Factory { .. })
        ));
    }

    #[test]
    fn transient_runs_every_time() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&counter);
        container
            .add_transient_with_name("tick", move || ok(calls.fetch_add(1, Ordering::SeqCst)))
            .unwrap();

        assert_eq!(*container.resolve_with_name::<usize>("tick", None).unwrap(), 0);
        assert_eq!(*container.resolve_with_name::<usize>("tick", None).unwrap(), 1);

        let notified = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&notified);
        container.on_refresh_with_name("tick", move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        container.refresh_transient_with_name("tick", || ok(100usize));
        assert_eq!(*container.resolve_with_name::<usize>("tick", None).unwrap(), 100);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transient_errors_are_not_cached() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&counter);
        container
            .add_transient_with_name("odd", move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n % 2 == 0 { Err(io::Error::other("even")) } else { Ok(n) }
            })
            .unwrap();

        assert!(container.resolve_with_name::<usize>("odd", None).is_err());
        assert_eq!(*container.resolve_with_name::<usize>("odd", None).unwrap(), 1);
    }

    #[test]
    fn wrong_type_is_invalid_cast() {
        let container = Container::new();
        container.add_singleton_with_name("n", || ok(1u32)).unwrap();
        assert!(matches!(
            container.resolve_with_name::<String>("n", None),
            Err(Error::InvalidCast(_))
        ));
    }

    #[test]
    fn wrong_type_runs_no_factory() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let (single, each) = (Arc::clone(&counter), Arc::clone(&counter));
        container
            .add_singleton_with_name("single", move || {
                ok(single.fetch_add(1, Ordering::SeqCst) as u32)
            })
            .unwrap();
        container
            .add_transient_with_name("each", move || ok(each.fetch_add(1, Ordering::SeqCst) as u32))
            .unwrap();

        for name in ["single", "each"] {
            assert!(matches!(
                container.resolve_with_name::<String>(name, None),
                Err(Error::InvalidCast(_))
            ));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        // The singleton was never built, so the right type still runs its factory.
        assert_eq!(*container.resolve_with_name::<u32>("single", None).unwrap(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scoped_wrong_type_is_invalid_cast_without_side_effects() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&counter);
        container
            .add_scoped_with_name("s", move || ok(calls.fetch_add(1, Ordering::SeqCst) as u32))
            .unwrap();

        let fresh = Scope::new(10, Duration::from_secs(60));
        assert!(matches!(
            container.resolve_with_name::<String>("s", Some(&fresh)),
            Err(Error::InvalidCast(_))
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(container.scopes.get(10, "s").is_none());

        let scope = Scope::new(11, Duration::from_secs(60));
        let first = container.resolve_with_name::<u32>("s", Some(&scope)).unwrap();
        assert!(matches!(
            container.resolve_with_name::<String>("s", Some(&scope)),
            Err(Error::InvalidCast(_))
        ));
        let again = container.resolve_with_name::<u32>("s", Some(&scope)).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn instance_cached_before_a_type_change_is_invalid_cast() {
        let container = Container::new();
        container.add_scoped_with_name("s", || ok(1u32)).unwrap();

        let scope = Scope::new(12, Duration::from_secs(60));
        container.resolve_with_name::<u32>("s", Some(&scope)).unwrap();
        container.refresh_scoped_with_name("s", || ok(String::from("two")));

        assert!(matches!(
            container.resolve_with_name::<String>("s", Some(&scope)),
            Err(Error::InvalidCast(_))
        ));
        let other = Scope::new(13, Duration::from_secs(60));
        assert_eq!(*container.resolve_with_name::<String>("s", Some(&other)).unwrap(), "two");
    }

    #[test]
    fn unbounded_ttl_never_expires() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&counter);
        container
            .add_scoped_with_name("s", move || ok(calls.fetch_add(1, Ordering::SeqCst) as u8))
            .unwrap();

        let forever = Scope::new(1, Duration::MAX);
        let first = container.resolve_with_name::<u8>("s", Some(&forever)).unwrap();
        let again = container.resolve_with_name::<u8>("s", Some(&forever)).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        container.close_scope(1);
        assert_eq!(*container.resolve_with_name::<u8>("s", Some(&forever)).unwrap(), 1);
    }

    #[test]
    fn scoped_requires_a_scope() {
        let container = Container::new();
        container.add_scoped_with_name("s", || ok(1u32)).unwrap();
        assert!(matches!(
            container.resolve_with_name::<u32>("s", None),
            Err(Error::MissingRequiredParameter("scope"))
        ));
    }

    #[test]
    fn scoped_instances_are_per_scope_and_expire() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&counter);
        container
            .add_scoped_with_name("s", move || ok(calls.fetch_add(1, Ordering::SeqCst)))
            .unwrap();

        let scope = Scope::new(1, Duration::from_millis(100));
        let first = container.resolve_with_name::<usize>("s", Some(&scope)).unwrap();
        let again = container.resolve_with_name::<usize>("s", Some(&scope)).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let other = Scope::new(2, Duration::from_millis(100));
        let elsewhere = container.resolve_with_name::<usize>("s", Some(&other)).unwrap();
        assert!(!Arc::ptr_eq(&first, &elsewhere));

        thread::sleep(Duration::from_millis(250));
        let renewed = container.resolve_with_name::<usize>("s", Some(&scope)).unwrap();
        assert!(!Arc::ptr_eq(&first, &renewed));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn close_scope_drops_instances_immediately() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&counter);
        container
            .add_scoped_with_name("s", move || ok(calls.fetch_add(1, Ordering::SeqCst)))
            .unwrap();

        let scope = Scope::new(5, Duration::from_secs(60));
        let first = container.resolve_with_name::<usize>("s", Some(&scope)).unwrap();
        container.close_scope(5);
        let second = container.resolve_with_name::<usize>("s", Some(&scope)).unwrap();
        assert_eq!((*first, *second), (0, 1));
    }

    #[test]
    fn stale_timer_does_not_evict_repopulated_scope() {
        let container = Container::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&counter);
        container
            .add_scoped_with_name("s", move || ok(calls.fetch_add(1, Ordering::SeqCst)))
            .unwrap();

        container
            .resolve_with_name::<usize>("s", Some(&Scope::new(8, Duration::from_millis(50))))
            .unwrap();
        container.close_scope(8);

        let long = Scope::new(8, Duration::from_secs(60));
        let fresh = container.resolve_with_name::<usize>("s", Some(&long)).unwrap();
        thread::sleep(Duration::from_millis(200));

        let still = container.resolve_with_name::<usize>("s", Some(&long)).unwrap();
        assert!(Arc::ptr_eq(&fresh, &still));
    }

    #[test]
    fn scoped_refresh_keeps_open_scopes() {
        let container = Container::new();
        container.add_scoped_with_name("s", || ok(1u32)).unwrap();

        let notified = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&notified);
        container.on_refresh_with_name("s", move |event| seen.lock().push(event));

        let scope = Scope::new(3, Duration::from_secs(60));
        container.resolve_with_name::<u32>("s", Some(&scope)).unwrap();
        container.refresh_scoped_with_name("s", || ok(2u32));
        assert_eq!(*notified.lock(), vec![RefreshEvent::Refreshed]);

        assert_eq!(*container.resolve_with_name::<u32>("s", Some(&scope)).unwrap(), 1);
        let fresh = Scope::new(4, Duration::from_secs(60));
        assert_eq!(*container.resolve_with_name::<u32>("s", Some(&fresh)).unwrap(), 2);
    }

    #[test]
    fn try_resolve_and_require() {
        let container = Container::new();
        container.add_singleton_with_name("n", || ok(5u8)).unwrap();
        assert_eq!(container.try_resolve_with_name::<u8>("missing", None), None);
        assert_eq!(container.try_resolve::<u16>(None), None);
        assert_eq!(*container.require_with_name::<u8>("n", None), 5);
    }

    #[test]
    #[should_panic(expected = "failed to resolve `missing`")]
    fn require_panics_on_failure() {
        Container::new().require_with_name::<u8>("missing", None);
    }
}
