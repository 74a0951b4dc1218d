//! Service locator keyed by string.
//!
//! Values are stored type-erased and handed back as clones, so callers
//! register cheap handles (`Arc<T>`, `Arc<dyn Trait>`, plain `Copy` data).
//! A singleton handle is cloned from the same cached value on every lookup,
//! which keeps `Arc::ptr_eq` true across calls.

pub mod bootstrap;

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::errors::{AssistantError, Result};

type Instance = Arc<dyn Any + Send + Sync>;
type Builder = Box<dyn Fn(&Resolver<'_>) -> Result<Instance> + Send + Sync>;

enum Registration {
    Singleton(Instance),
    LazySingleton {
        builder: Builder,
        cell: OnceCell<Instance>,
    },
    Factory(Builder),
}

impl Registration {
    fn kind(&self) -> &'static str {
        match self {
            Self::Singleton(_) => "singleton",
            Self::LazySingleton { .. } => "lazy singleton",
            Self::Factory(_) => "factory",
        }
    }
}

#[derive(Default)]
pub struct Container {
    entries: HashMap<String, Registration>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pre-built instance. Replaces any earlier registration of `key`.
    pub fn register_singleton<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        let key = key.into();
        tracing::debug!("Registering singleton '{}'", key);
        self.entries
            .insert(key, Registration::Singleton(Arc::new(value)));
    }

    /// Store a builder run on first lookup; its result is cached for the
    /// lifetime of the container.
    pub fn register_lazy_singleton<T, F>(&mut self, key: impl Into<String>, builder: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let key = key.into();
        tracing::debug!("Registering lazy singleton '{}'", key);
        self.entries.insert(
            key,
            Registration::LazySingleton {
                builder: erase(builder),
                cell: OnceCell::new(),
            },
        );
    }

    /// Store a constructor invoked on every lookup.
    pub fn register_factory<T, F>(&mut self, key: impl Into<String>, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let key = key.into();
        tracing::debug!("Registering factory '{}'", key);
        self.entries
            .insert(key, Registration::Factory(erase(factory)));
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        Resolver::root(self).get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Drop every registration and cached singleton.
    pub fn reset(&mut self) {
        tracing::debug!("Resetting container ({} registrations)", self.entries.len());
        self.entries.clear();
    }

    /// Resolve every registered key once so that cycles and construction
    /// errors surface up front instead of on first use.
    pub fn verify(&self) -> Result<()> {
        for key in self.keys() {
            Resolver::root(self).resolve(key)?;
        }
        Ok(())
    }

    fn instance(&self, key: &str, resolver: &Resolver<'_>) -> Result<Instance> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| AssistantError::NotRegistered(key.to_string()))?;

        match entry {
            Registration::Singleton(value) => Ok(value.clone()),
            Registration::LazySingleton { builder, cell } => {
                cell.get_or_try_init(|| builder(resolver)).cloned()
            }
            Registration::Factory(factory) => factory(resolver),
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in self.keys() {
            map.entry(&key, &self.entries[key].kind());
        }
        map.finish()
    }
}

fn erase<T, F>(builder: F) -> Builder
where
    T: Send + Sync + 'static,
    F: Fn(&Resolver<'_>) -> Result<T> + Send + Sync + 'static,
{
    Box::new(move |resolver| builder(resolver).map(|value| Arc::new(value) as Instance))
}

/// Handle given to builders and factories for resolving their own
/// dependencies. It carries the chain of keys currently being constructed.
pub struct Resolver<'a> {
    container: &'a Container,
    chain: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn root(container: &'a Container) -> Self {
        Self {
            container,
            chain: Vec::new(),
        }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let instance = self.resolve(key)?;
        instance
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| AssistantError::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })
    }

    fn resolve(&self, key: &str) -> Result<Instance> {
        if self.chain.iter().any(|k| k == key) {
            let mut cycle = self.chain.clone();
            cycle.push(key.to_string());
            return Err(AssistantError::CircularDependency(cycle));
        }

        let mut chain = self.chain.clone();
        chain.push(key.to_string());
        let child = Resolver {
            container: self.container,
            chain,
        };
        self.container.instance(key, &child)
    }
}
