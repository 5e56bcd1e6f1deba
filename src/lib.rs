//! dynopts - options contracts resolved at runtime
//!
//! Re-exports the core resolver and adds layered config files as a lookup
//! source, explain reports, and the grammar output options served by the
//! `dynopts` binary.

pub mod config;
pub mod explain;
pub mod output;

pub use config::{ConfigError, ConfigOrigin, ConfigSource, LayeredLookup};
pub use dynopts_core::*;
pub use explain::{ExplainReport, ExplainedOption};
pub use output::{Output, OutputOptions};
