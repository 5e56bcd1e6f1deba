//! Overrides and the accessor names they are bound to.
//!
//! Closures carry no parameter names at runtime, so the name is captured at
//! compile time by [`option!`](crate::option): the closure's single parameter
//! identifier becomes the bound accessor name, and inside the body that same
//! identifier refers to the instance being built.
//!
//! ```
//! use dynopts_core::{option, Contract, Options};
//!
//! struct Font;
//!
//! let contract = Contract::<Font>::builder("Font")
//!     .with_default("font_size", |_| Ok(11u32))
//!     .with_default("font_name", |_| Ok("Verdana".to_string()))
//!     .build();
//! let font_name = option!(|font_name| Ok("Times New Roman".to_string()));
//! let options = Options::build(contract, [font_name]).unwrap();
//! assert_eq!(options.get::<String>("font_name").unwrap(), "Times New Roman");
//! ```

use std::any::{type_name, TypeId};
use std::borrow::Cow;
use std::fmt;

use crate::contract::{constant, erase, into_value, Compute, OptionValue};
use crate::error::{OptionsError, ResolveError};
use crate::resolver::Options;

/// A caller-supplied value source bound to one accessor.
pub struct Override<C> {
    name: Option<Cow<'static, str>>,
    type_id: TypeId,
    type_name: &'static str,
    compute: Compute<C>,
}

impl<C: 'static> Override<C> {
    /// Bind `f` to the accessor called `name`.
    pub fn named<T, F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        T: OptionValue,
        F: Fn(&Options<C>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self {
            name: Some(name.into()),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            compute: erase(f),
        }
    }

    /// An override whose accessor cannot be determined. Rejected by
    /// [`identify`].
    pub fn unnamed<T, F>(f: F) -> Self
    where
        T: OptionValue,
        F: Fn(&Options<C>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self {
            name: None,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            compute: erase(f),
        }
    }

    /// Bind a fixed value to `name`. Every resolution returns the same
    /// shared value.
    pub fn value<T: OptionValue>(name: impl Into<Cow<'static, str>>, value: T) -> Self {
        Self {
            name: Some(name.into()),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            compute: constant(into_value(value)),
        }
    }
}

impl<C> Override<C> {
    pub(crate) fn value_type(&self) -> (TypeId, &'static str) {
        (self.type_id, self.type_name)
    }

    pub(crate) fn into_compute(self) -> Compute<C> {
        self.compute
    }
}

impl<C> fmt::Debug for Override<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Override")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .finish()
    }
}

/// Determine the accessor name an override is bound to.
pub fn identify<C>(option: &Override<C>) -> Result<&str, OptionsError> {
    let name = option
        .name
        .as_deref()
        .ok_or_else(|| OptionsError::Identification {
            reason: format!(
                "override producing {} has no parameter name to bind it to an option",
                option.type_name
            ),
        })?;

    if !is_option_name(name) {
        return Err(OptionsError::Identification {
            reason: format!("`{}` is not a valid option name", name),
        });
    }

    Ok(name)
}

/// Identifier rule for option names: `[A-Za-z_][A-Za-z0-9_]*`, excluding a
/// lone underscore.
pub(crate) fn is_option_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name != "_" && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build an [`Override`] from a one-parameter closure whose parameter name
/// is the accessor it overrides.
///
/// The body sees the parameter as `&Options<C>` and must evaluate to
/// `Result<T, ResolveError>`, where `T` is the accessor's type.
#[macro_export]
macro_rules! option {
    (|_| $body:expr) => {
        $crate::Override::unnamed(move |_| $body)
    };
    (|$name:ident| $body:expr) => {
        $crate::Override::named(::std::stringify!($name), move |$name| {
            let _ = &$name;
            $body
        })
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    #[test]
    fn test_identify_named() {
        let option = Override::<Marker>::named("font_size", |_| Ok(22u32));
        assert_eq!(identify(&option).unwrap(), "font_size");
    }

    #[test]
    fn test_identify_from_parameter_name() {
        let option: Override<Marker> = option!(|target_date| Ok("1963-11-22".to_string()));
        assert_eq!(identify(&option).unwrap(), "target_date");
    }

    #[test]
    fn test_identify_wildcard_parameter_fails() {
        let option: Override<Marker> = option!(|_| Ok(1u8));
        let err = identify(&option).unwrap_err();
        assert!(matches!(err, OptionsError::Identification { .. }));
        assert!(err.to_string().contains("u8"));
    }

    #[test]
    fn test_identify_rejects_invalid_names() {
        for bad in ["", "_", "font size", "9lives", "a-b"] {
            let option = Override::<Marker>::value(bad, 1u8);
            assert!(
                matches!(identify(&option), Err(OptionsError::Identification { .. })),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_identify_accepts_identifiers() {
        for good in ["a", "_private", "fontSize", "line_width2"] {
            let option = Override::<Marker>::value(good, 1u8);
            assert_eq!(identify(&option).unwrap(), good);
        }
    }

    #[test]
    fn test_value_type_recorded() {
        let option = Override::<Marker>::value("size", 3u64);
        let (id, name) = option.value_type();
        assert_eq!(id, TypeId::of::<u64>());
        assert_eq!(name, "u64");
    }
}
