//! Layered configuration as an option lookup source
//!
//! Config files and CLI assignments are merged (objects deep-merge, arrays
//! and scalars are replaced) and then read per accessor, decoding each raw
//! value into the accessor's declared type.

mod decode;
mod layered;
mod merge;

pub use decode::decode;
pub use layered::{ConfigError, ConfigOrigin, ConfigSource, LayeredLookup};
pub use merge::{deep_merge, get_path, merge_layers, set_path};
