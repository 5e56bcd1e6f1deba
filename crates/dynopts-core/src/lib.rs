//! Options contracts resolved at runtime.
//!
//! A contract is a set of named, zero-argument accessors, some with built-in
//! defaults. An [`Options`] instance answers each accessor from the first of
//! three sources that has a value: an override bound to it, a dynamic
//! lookup, or the built-in default. Values are resolved lazily and cached
//! per instance.

mod contract;
mod error;
mod identify;
mod lookup;
mod macros;
mod resolver;

pub use contract::{
    into_value, Accessor, AccessorInfo, Contract, ContractBuilder, OptionValue, OptionsContract,
    Value,
};
pub use error::{OptionsError, ResolveError};
pub use identify::{identify, Override};
pub use lookup::{lookup_fn, Lookup, NoLookup};
pub use resolver::{Explained, Options, Tier};
