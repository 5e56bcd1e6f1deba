//! Second-tier value sources.

use std::collections::HashMap;

use crate::contract::{AccessorInfo, Value};
use crate::error::ResolveError;

/// Dynamic value source consulted for accessors without an override.
///
/// `Ok(None)` means "no opinion": resolution falls through to the built-in
/// default.
pub trait Lookup: Send + Sync {
    fn lookup(&self, accessor: &AccessorInfo) -> Result<Option<Value>, ResolveError>;
}

impl<F> Lookup for F
where
    F: Fn(&AccessorInfo) -> Result<Option<Value>, ResolveError> + Send + Sync,
{
    fn lookup(&self, accessor: &AccessorInfo) -> Result<Option<Value>, ResolveError> {
        self(accessor)
    }
}

/// Values keyed by accessor name.
impl Lookup for HashMap<String, Value> {
    fn lookup(&self, accessor: &AccessorInfo) -> Result<Option<Value>, ResolveError> {
        Ok(self.get(accessor.name()).cloned())
    }
}

/// A lookup that never has an opinion.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl Lookup for NoLookup {
    fn lookup(&self, _accessor: &AccessorInfo) -> Result<Option<Value>, ResolveError> {
        Ok(None)
    }
}

/// Pin a closure's signature to the one [`Lookup`] expects, so its argument
/// and error types need no annotations.
pub fn lookup_fn<F>(f: F) -> F
where
    F: Fn(&AccessorInfo) -> Result<Option<Value>, ResolveError> + Send + Sync,
{
    f
}
