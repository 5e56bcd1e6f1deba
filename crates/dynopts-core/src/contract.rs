//! Options contracts: named, typed, zero-argument accessors with optional
//! built-in defaults.

use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::resolver::Options;

/// A resolved option value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Types an accessor may return.
pub trait OptionValue: Any + Send + Sync + fmt::Debug {}

impl<T: Any + Send + Sync + fmt::Debug> OptionValue for T {}

/// Erase a typed value.
pub fn into_value<T: OptionValue>(value: T) -> Value {
    Arc::new(value)
}

/// Erased value computation taking the instance being resolved.
pub(crate) type Compute<C> =
    Arc<dyn Fn(&Options<C>) -> Result<Value, ResolveError> + Send + Sync>;

pub(crate) fn erase<C, T, F>(f: F) -> Compute<C>
where
    C: 'static,
    T: OptionValue,
    F: Fn(&Options<C>) -> Result<T, ResolveError> + Send + Sync + 'static,
{
    Arc::new(move |options: &Options<C>| f(options).map(|value| Arc::new(value) as Value))
}

pub(crate) fn constant<C: 'static>(value: Value) -> Compute<C> {
    Arc::new(move |_: &Options<C>| Ok::<_, ResolveError>(value.clone()))
}

fn accepts<T: OptionValue>(value: &(dyn Any + Send + Sync)) -> bool {
    value.is::<T>()
}

fn describe<T: OptionValue>(value: &(dyn Any + Send + Sync)) -> String {
    match value.downcast_ref::<T>() {
        Some(v) => format!("{:?}", v),
        None => format!("<not a {}>", type_name::<T>()),
    }
}

/// Identity of an accessor, as seen by lookup functions.
#[derive(Clone)]
pub struct AccessorInfo {
    name: Cow<'static, str>,
    params: Vec<String>,
    type_id: TypeId,
    type_name: &'static str,
    has_default: bool,
    accepts: fn(&(dyn Any + Send + Sync)) -> bool,
    describe: fn(&(dyn Any + Send + Sync)) -> String,
}

impl AccessorInfo {
    fn of<T: OptionValue>(name: Cow<'static, str>) -> Self {
        Self {
            name,
            params: Vec::new(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            has_default: false,
            accepts: accepts::<T>,
            describe: describe::<T>,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters. A valid contract has none.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    /// Whether the accessor returns `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Whether `value` has the accessor's declared type.
    pub fn accepts(&self, value: &Value) -> bool {
        (self.accepts)(&**value)
    }

    /// Debug rendering of a value of this accessor's type.
    pub fn describe(&self, value: &Value) -> String {
        (self.describe)(&**value)
    }
}

impl fmt::Debug for AccessorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorInfo")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("type", &self.type_name)
            .field("has_default", &self.has_default)
            .finish()
    }
}

/// One accessor declaration of a contract.
pub struct Accessor<C> {
    info: AccessorInfo,
    default: Option<Compute<C>>,
}

impl<C: 'static> Accessor<C> {
    /// An accessor with no built-in default.
    pub fn new<T: OptionValue>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            info: AccessorInfo::of::<T>(name.into()),
            default: None,
        }
    }

    /// An accessor with a built-in default computed from the instance.
    pub fn with_default<T, F>(name: impl Into<Cow<'static, str>>, default: F) -> Self
    where
        T: OptionValue,
        F: Fn(&Options<C>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        let mut info = AccessorInfo::of::<T>(name.into());
        info.has_default = true;
        Self {
            info,
            default: Some(erase(default)),
        }
    }

    /// Declare a parameter. Contracts with parameterized accessors are
    /// rejected at construction.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.info.params.push(name.into());
        self
    }
}

impl<C> Accessor<C> {
    pub fn info(&self) -> &AccessorInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub(crate) fn default_fn(&self) -> Option<&Compute<C>> {
        self.default.as_ref()
    }
}

/// Declaration-ordered set of accessors.
///
/// `C` is the marker type the contract is written for; overrides and
/// defaults receive an `Options<C>`.
pub struct Contract<C> {
    name: String,
    accessors: Vec<Accessor<C>>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: 'static> Contract<C> {
    pub fn builder(name: impl Into<String>) -> ContractBuilder<C> {
        ContractBuilder {
            name: name.into(),
            accessors: Vec::new(),
        }
    }
}

impl<C> Contract<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accessors(&self) -> &[Accessor<C>] {
        &self.accessors
    }

    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }

    /// Slot of the first accessor called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.accessors.iter().position(|a| a.name() == name)
    }

    pub fn accessor(&self, name: &str) -> Option<&Accessor<C>> {
        self.index_of(name).map(|i| &self.accessors[i])
    }
}

impl<C> fmt::Debug for Contract<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("name", &self.name)
            .field(
                "accessors",
                &self.accessors.iter().map(|a| &a.info).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`Contract`].
pub struct ContractBuilder<C> {
    name: String,
    accessors: Vec<Accessor<C>>,
}

impl<C: 'static> ContractBuilder<C> {
    /// Add an accessor without a default.
    pub fn required<T: OptionValue>(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.accessor(Accessor::new::<T>(name))
    }

    /// Add an accessor with a built-in default.
    pub fn with_default<T, F>(self, name: impl Into<Cow<'static, str>>, default: F) -> Self
    where
        T: OptionValue,
        F: Fn(&Options<C>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.accessor(Accessor::with_default(name, default))
    }

    pub fn accessor(mut self, accessor: Accessor<C>) -> Self {
        self.accessors.push(accessor);
        self
    }

    pub fn build(self) -> Contract<C> {
        Contract {
            name: self.name,
            accessors: self.accessors,
            _marker: PhantomData,
        }
    }
}

/// A marker type with a statically known contract.
///
/// Implemented by [`options_contract!`](crate::options_contract).
pub trait OptionsContract: Sized + 'static {
    /// Describe the contract.
    fn contract() -> Contract<Self>;

    /// The contract shared by every instance.
    fn shared() -> Arc<Contract<Self>> {
        Arc::new(Self::contract())
    }

    /// Build an instance from overrides and built-in defaults only.
    fn options(
        overrides: impl IntoIterator<Item = crate::Override<Self>>,
    ) -> Result<Options<Self>, crate::OptionsError> {
        Options::build(Self::shared(), overrides)
    }

    /// Build an instance that consults `lookup` for options not overridden.
    fn dynamic_options(
        lookup: impl crate::Lookup + 'static,
        overrides: impl IntoIterator<Item = crate::Override<Self>>,
    ) -> Result<Options<Self>, crate::OptionsError> {
        Options::build_with_lookup(Self::shared(), lookup, overrides)
    }
}
