//! Options instances: construction-time validation and per-accessor
//! resolution with caching.
//!
//! Each accessor is resolved at most once per instance, from the first source
//! that answers:
//! 1. the override bound to it, called with the instance itself;
//! 2. the lookup, if one was supplied and it returns a value;
//! 3. the contract's built-in default, also called with the instance.
//!
//! Overrides and defaults may read other accessors of the same instance;
//! those resolve through their own chain. A resolution that reenters itself
//! on the same thread fails with [`ResolveError::Cycle`].

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, trace};

use crate::contract::{AccessorInfo, Compute, Contract, OptionValue, Value};
use crate::error::{OptionsError, ResolveError};
use crate::identify::{identify, is_option_name, Override};
use crate::lookup::Lookup;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Which source produced a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Override,
    Lookup,
    Default,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => write!(f, "override"),
            Self::Lookup => write!(f, "lookup"),
            Self::Default => write!(f, "default"),
        }
    }
}

struct Resolved {
    value: Value,
    tier: Tier,
}

/// Resolution state of one accessor.
#[derive(Debug, Clone)]
pub struct Explained<'a> {
    pub info: &'a AccessorInfo,
    /// `None` until the accessor has been resolved.
    pub tier: Option<Tier>,
    /// Debug rendering of the cached value.
    pub value: Option<String>,
}

/// A runtime instance of contract `C`.
///
/// Equality, hashing and `Debug` are based on the instance's identity, not
/// on option values.
pub struct Options<C> {
    id: u64,
    contract: Arc<Contract<C>>,
    overrides: Vec<Option<Compute<C>>>,
    lookup: Option<Arc<dyn Lookup>>,
    cache: RwLock<Vec<Option<Resolved>>>,
    resolving: Mutex<Vec<(ThreadId, usize)>>,
}

impl<C: 'static> Options<C> {
    /// Build an instance without a lookup. Every accessor lacking a
    /// built-in default must be overridden.
    pub fn build(
        contract: impl Into<Arc<Contract<C>>>,
        overrides: impl IntoIterator<Item = Override<C>>,
    ) -> Result<Self, OptionsError> {
        Self::construct(contract.into(), None, overrides)
    }

    /// Build an instance that asks `lookup` for accessors without an
    /// override before falling back to their default.
    pub fn build_with_lookup(
        contract: impl Into<Arc<Contract<C>>>,
        lookup: impl Lookup + 'static,
        overrides: impl IntoIterator<Item = Override<C>>,
    ) -> Result<Self, OptionsError> {
        Self::construct(contract.into(), Some(Arc::new(lookup)), overrides)
    }

    /// Like [`build_with_lookup`](Self::build_with_lookup) with a lookup the
    /// caller keeps a handle to.
    pub fn build_with_shared_lookup(
        contract: impl Into<Arc<Contract<C>>>,
        lookup: Arc<dyn Lookup>,
        overrides: impl IntoIterator<Item = Override<C>>,
    ) -> Result<Self, OptionsError> {
        Self::construct(contract.into(), Some(lookup), overrides)
    }

    fn construct(
        contract: Arc<Contract<C>>,
        lookup: Option<Arc<dyn Lookup>>,
        overrides: impl IntoIterator<Item = Override<C>>,
    ) -> Result<Self, OptionsError> {
        let result = Self::validate(&contract, lookup.is_some(), overrides);
        let slots = match result {
            Ok(slots) => slots,
            Err(e) => {
                debug!(target: "dynopts::build", contract = contract.name(), error = %e, "Options construction rejected");
                return Err(e);
            }
        };

        let overridden = slots.iter().filter(|s| s.is_some()).count();
        let deferred = contract
            .accessors()
            .iter()
            .zip(&slots)
            .filter(|(a, s)| s.is_none() && !a.info().has_default())
            .count();
        let id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            target: "dynopts::build",
            contract = contract.name(),
            id,
            accessors = contract.len(),
            overridden,
            deferred,
            "Options built"
        );

        let cache = (0..contract.len()).map(|_| None).collect();
        Ok(Self {
            id,
            contract,
            overrides: slots,
            lookup,
            cache: RwLock::new(cache),
            resolving: Mutex::new(Vec::new()),
        })
    }

    /// Check contract shape and override coverage, returning the overrides
    /// indexed by accessor slot.
    ///
    /// Errors are reported in this order: malformed contract, unidentifiable
    /// or duplicate override, missing required option (only without a
    /// lookup), unknown option name, override type mismatch.
    fn validate(
        contract: &Contract<C>,
        has_lookup: bool,
        overrides: impl IntoIterator<Item = Override<C>>,
    ) -> Result<Vec<Option<Compute<C>>>, OptionsError> {
        let mut names = HashSet::new();
        for accessor in contract.accessors() {
            let info = accessor.info();
            if !info.params().is_empty() {
                return Err(OptionsError::MalformedContract {
                    contract: contract.name().to_string(),
                    accessor: info.name().to_string(),
                    reason: format!("declares parameters ({})", info.params().join(", ")),
                });
            }
            if !is_option_name(info.name()) {
                return Err(OptionsError::MalformedContract {
                    contract: contract.name().to_string(),
                    accessor: info.name().to_string(),
                    reason: "is not a valid option name".to_string(),
                });
            }
            if !names.insert(info.name()) {
                return Err(OptionsError::MalformedContract {
                    contract: contract.name().to_string(),
                    accessor: info.name().to_string(),
                    reason: "is declared more than once".to_string(),
                });
            }
        }

        let mut bound: Vec<(String, Override<C>)> = Vec::new();
        for option in overrides {
            let name = identify(&option)?.to_string();
            if bound.iter().any(|(n, _)| *n == name) {
                return Err(OptionsError::DuplicateOption { name });
            }
            bound.push((name, option));
        }

        if !has_lookup {
            let missing: Vec<String> = contract
                .accessors()
                .iter()
                .filter(|a| !a.info().has_default() && !bound.iter().any(|(n, _)| n == a.name()))
                .map(|a| a.name().to_string())
                .collect();
            if !missing.is_empty() {
                return Err(OptionsError::MissingOption {
                    contract: contract.name().to_string(),
                    names: missing,
                });
            }
        }

        let mut slots: Vec<Option<Compute<C>>> = (0..contract.len()).map(|_| None).collect();
        for (name, option) in bound {
            let index = contract
                .index_of(&name)
                .ok_or_else(|| OptionsError::UnknownOption {
                    contract: contract.name().to_string(),
                    name: name.clone(),
                })?;

            let info = contract.accessors()[index].info();
            let (type_id, found) = option.value_type();
            if type_id != info.type_id() {
                return Err(OptionsError::TypeMismatch {
                    name,
                    expected: info.type_name(),
                    found,
                });
            }
            slots[index] = Some(option.into_compute());
        }

        Ok(slots)
    }

    /// Resolve `name` and return a clone of its value.
    pub fn get<T: OptionValue + Clone>(&self, name: &str) -> Result<T, ResolveError> {
        self.get_shared::<T>(name).map(|v| (*v).clone())
    }

    /// Resolve `name` and return the cached value itself.
    pub fn get_shared<T: OptionValue>(&self, name: &str) -> Result<Arc<T>, ResolveError> {
        let index = self.index(name)?;
        self.resolve(index)?
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                accessor: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Resolve `name` without committing to a type.
    pub fn get_value(&self, name: &str) -> Result<Value, ResolveError> {
        let index = self.index(name)?;
        self.resolve(index)
    }

    /// Resolve every accessor in declaration order, stopping at the first
    /// failure.
    pub fn resolve_all(&self) -> Result<(), ResolveError> {
        for index in 0..self.contract.len() {
            self.resolve(index)?;
        }
        Ok(())
    }

    fn index(&self, name: &str) -> Result<usize, ResolveError> {
        self.contract
            .index_of(name)
            .ok_or_else(|| ResolveError::NoSuchAccessor {
                contract: self.contract.name().to_string(),
                name: name.to_string(),
            })
    }

    fn resolve(&self, index: usize) -> Result<Value, ResolveError> {
        if let Some(resolved) = &self.cache.read()[index] {
            return Ok(resolved.value.clone());
        }

        let _guard = self.enter(index)?;
        let info = self.contract.accessors()[index].info();
        let (value, tier) = self.compute(index)?;
        if !info.accepts(&value) {
            return Err(ResolveError::TypeMismatch {
                accessor: info.name().to_string(),
                expected: info.type_name(),
            });
        }
        trace!(target: "dynopts::resolve", id = self.id, option = info.name(), %tier, "Option resolved");

        let mut cache = self.cache.write();
        let resolved = cache[index].get_or_insert(Resolved { value, tier });
        Ok(resolved.value.clone())
    }

    fn compute(&self, index: usize) -> Result<(Value, Tier), ResolveError> {
        if let Some(compute) = &self.overrides[index] {
            return Ok((compute(self)?, Tier::Override));
        }

        let accessor = &self.contract.accessors()[index];
        if let Some(lookup) = &self.lookup {
            if let Some(value) = lookup.lookup(accessor.info())? {
                return Ok((value, Tier::Lookup));
            }
        }

        match accessor.default_fn() {
            Some(default) => Ok((default(self)?, Tier::Default)),
            None => Err(ResolveError::Missing {
                accessor: accessor.name().to_string(),
            }),
        }
    }

    /// Mark `index` as being resolved on this thread.
    fn enter(&self, index: usize) -> Result<ResolvingGuard<'_>, ResolveError> {
        let key = (thread::current().id(), index);
        let mut active = self.resolving.lock();
        if let Some(start) = active.iter().position(|k| *k == key) {
            let mut chain: Vec<String> = active[start..]
                .iter()
                .filter(|(thread, _)| *thread == key.0)
                .map(|(_, i)| self.contract.accessors()[*i].name().to_string())
                .collect();
            chain.push(self.contract.accessors()[index].name().to_string());
            return Err(ResolveError::Cycle { chain });
        }
        active.push(key);
        Ok(ResolvingGuard {
            active: &self.resolving,
            key,
        })
    }
}

impl<C> Options<C> {
    pub fn contract(&self) -> &Contract<C> {
        &self.contract
    }

    /// Process-unique identity of this instance.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn has_lookup(&self) -> bool {
        self.lookup.is_some()
    }

    /// Whether `name` is bound to an override.
    pub fn is_overridden(&self, name: &str) -> bool {
        self.contract
            .index_of(name)
            .map(|i| self.overrides[i].is_some())
            .unwrap_or(false)
    }

    /// Tier that produced `name`, if it has been resolved.
    pub fn tier_of(&self, name: &str) -> Option<Tier> {
        let index = self.contract.index_of(name)?;
        self.cache.read()[index].as_ref().map(|r| r.tier)
    }

    /// Resolution state of every accessor, in declaration order. Does not
    /// trigger resolution.
    pub fn explain(&self) -> Vec<Explained<'_>> {
        let cache = self.cache.read();
        self.contract
            .accessors()
            .iter()
            .zip(cache.iter())
            .map(|(accessor, resolved)| Explained {
                info: accessor.info(),
                tier: resolved.as_ref().map(|r| r.tier),
                value: resolved.as_ref().map(|r| accessor.info().describe(&r.value)),
            })
            .collect()
    }
}

impl<C> PartialEq for Options<C> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<C> Eq for Options<C> {}

impl<C> Hash for Options<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<C> fmt::Debug for Options<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Options<{}>#{}", self.contract.name(), self.id)
    }
}

struct ResolvingGuard<'a> {
    active: &'a Mutex<Vec<(ThreadId, usize)>>,
    key: (ThreadId, usize),
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        if let Some(pos) = active.iter().rposition(|k| *k == self.key) {
            active.remove(pos);
        }
    }
}
