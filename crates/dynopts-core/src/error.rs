//! Error types for contract construction and accessor resolution.

/// Errors raised while building an options instance.
///
/// All of these abort construction; no partial instance is returned.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// An accessor takes parameters, or its name is declared twice.
    #[error("options contract {contract} is malformed: accessor `{accessor}` {reason}")]
    MalformedContract {
        contract: String,
        accessor: String,
        reason: String,
    },

    /// Accessors with no override, no default and no lookup to fall back on.
    #[error("missing required option: {}", names.join(", "))]
    MissingOption { contract: String, names: Vec<String> },

    /// An override is bound to a name the contract does not declare.
    #[error("no such option: {name} (contract {contract})")]
    UnknownOption { contract: String, name: String },

    /// Two overrides are bound to the same accessor.
    #[error("option `{name}` is overridden more than once")]
    DuplicateOption { name: String },

    /// The accessor an override is bound to cannot be determined.
    #[error("cannot identify override: {reason}")]
    Identification { reason: String },

    /// An override produces a different type than its accessor declares.
    #[error("override for `{name}` produces {found}, but the accessor returns {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl OptionsError {
    /// Name of the accessor this error is about, if it concerns a single one.
    pub fn option_name(&self) -> Option<&str> {
        match self {
            Self::MalformedContract { accessor, .. } => Some(accessor.as_str()),
            Self::MissingOption { names, .. } => names.first().map(String::as_str),
            Self::UnknownOption { name, .. }
            | Self::DuplicateOption { name }
            | Self::TypeMismatch { name, .. } => Some(name.as_str()),
            Self::Identification { .. } => None,
        }
    }
}

/// Errors raised while resolving an accessor value.
///
/// Failures are never cached: the next access to the same accessor runs
/// resolution again.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Failure raised by an override, lookup or default.
    #[error(transparent)]
    Source(#[from] anyhow::Error),

    /// The lookup had no value and the contract declares no default.
    #[error("option `{accessor}` has no value: lookup returned nothing and no default is declared")]
    Missing { accessor: String },

    /// A value source produced something other than the declared type.
    #[error("option `{accessor}` is not of type {expected}")]
    TypeMismatch {
        accessor: String,
        expected: &'static str,
    },

    /// Untyped access by a name the contract does not declare.
    #[error("contract {contract} has no option named `{name}`")]
    NoSuchAccessor { contract: String, name: String },

    /// An accessor's resolution reentered itself.
    #[error("cyclic option dependency: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    /// A looked-up value has the wrong shape for the accessor type.
    #[error("option `{accessor}`: cannot decode {found} as {expected}")]
    Decode {
        accessor: String,
        expected: &'static str,
        found: String,
    },
}

impl ResolveError {
    /// Wrap an arbitrary error raised by a value source.
    pub fn other(error: impl Into<anyhow::Error>) -> Self {
        Self::Source(error.into())
    }

    /// Create a source failure from a message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Source(anyhow::Error::msg(message))
    }

    /// Whether this is a detected dependency cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }
}
