//! Typed options contracts.

/// Declare an options contract as a trait of zero-argument accessors.
///
/// Generates:
/// - the trait, with one `fn name(&self) -> Result<T, ResolveError>` per
///   accessor, implemented for `Options<Marker>`;
/// - the marker type, implementing [`OptionsContract`](crate::OptionsContract)
///   so instances are built with `Marker::options(..)` or
///   `Marker::dynamic_options(..)`;
/// - one associated function per accessor on the marker, returning a typed
///   [`Override`](crate::Override) for it.
///
/// An accessor followed by `= closure` has a built-in default; the closure
/// receives the instance and may call other accessors on it.
///
/// ```
/// use dynopts_core::{option, options_contract, OptionsContract};
///
/// options_contract! {
///     pub trait FontOptions for Font {
///         fn font_name() -> String = |_| Ok("Verdana".to_string());
///         fn font_size() -> u32 = |_| Ok(11);
///         fn label() -> String = |o| Ok(format!("{} {}pt", o.font_name()?, o.font_size()?));
///     }
/// }
///
/// let options = Font::options([Font::font_size(|_| Ok(22))]).unwrap();
/// assert_eq!(options.label().unwrap(), "Verdana 22pt");
///
/// let options = Font::options([option!(|font_name| Ok("Arial".to_string()))]).unwrap();
/// assert_eq!(options.label().unwrap(), "Arial 11pt");
/// ```
#[macro_export]
macro_rules! options_contract {
    (
        $(#[$meta:meta])*
        $vis:vis trait $Trait:ident for $Marker:ident {
            $(
                $(#[$ameta:meta])*
                fn $name:ident() -> $ty:ty $(= $default:expr)?;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis trait $Trait {
            $(
                $(#[$ameta])*
                fn $name(&self) -> ::std::result::Result<$ty, $crate::ResolveError>;
            )*
        }

        #[doc = ::std::concat!("Contract marker for [`", ::std::stringify!($Trait), "`].")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis struct $Marker;

        impl $crate::OptionsContract for $Marker {
            fn contract() -> $crate::Contract<Self> {
                let builder = $crate::Contract::<$Marker>::builder(::std::stringify!($Trait));
                $(
                    let builder = $crate::options_contract!(@accessor builder, $name, $ty $(, $default)?);
                )*
                builder.build()
            }

            fn shared() -> ::std::sync::Arc<$crate::Contract<Self>> {
                static CONTRACT: ::std::sync::OnceLock<::std::sync::Arc<$crate::Contract<$Marker>>> =
                    ::std::sync::OnceLock::new();
                CONTRACT
                    .get_or_init(|| ::std::sync::Arc::new(<Self as $crate::OptionsContract>::contract()))
                    .clone()
            }
        }

        impl $Trait for $crate::Options<$Marker> {
            $(
                fn $name(&self) -> ::std::result::Result<$ty, $crate::ResolveError> {
                    self.get::<$ty>(::std::stringify!($name))
                }
            )*
        }

        #[allow(dead_code)]
        impl $Marker {
            $(
                #[doc = ::std::concat!("Override `", ::std::stringify!($name), "`.")]
                $vis fn $name<F>(f: F) -> $crate::Override<$Marker>
                where
                    F: Fn(&$crate::Options<$Marker>) -> ::std::result::Result<$ty, $crate::ResolveError>
                        + Send
                        + Sync
                        + 'static,
                {
                    $crate::Override::named(::std::stringify!($name), f)
                }
            )*
        }
    };

    (@accessor $builder:ident, $name:ident, $ty:ty) => {
        $builder.required::<$ty>(::std::stringify!($name))
    };

    (@accessor $builder:ident, $name:ident, $ty:ty, $default:expr) => {
        $builder.with_default::<$ty, _>(::std::stringify!($name), $default)
    };
}

#[cfg(test)]
mod tests {
    use crate::{option, OptionsContract, OptionsError, Override, ResolveError, Tier};

    options_contract! {
        /// Settings for rendering a document.
        trait PageOptions for Page {
            /// Title shown in the header.
            fn title() -> String;
            fn width() -> u32 = |_| Ok(80);
            fn margin() -> u32 = |o| Ok(o.width()? / 10);
            fn header() -> String = |o| Ok(format!("{} ({} cols)", o.title()?, o.width()?));
        }
    }

    #[test]
    fn test_contract_shape() {
        let contract = Page::contract();
        assert_eq!(contract.name(), "PageOptions");
        let names: Vec<&str> = contract.accessors().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["title", "width", "margin", "header"]);
        assert!(!contract.accessors()[0].info().has_default());
        assert!(contract.accessors()[1].info().is::<u32>());
    }

    #[test]
    fn test_shared_contract_is_reused() {
        assert!(std::sync::Arc::ptr_eq(&Page::shared(), &Page::shared()));
    }

    #[test]
    fn test_required_accessor_fails_fast() {
        let err = Page::options([]).unwrap_err();
        assert!(matches!(err, OptionsError::MissingOption { ref names, .. } if names == &["title"]));
    }

    #[test]
    fn test_typed_setters_and_dependent_defaults() {
        let options = Page::options([
            Page::title(|_| Ok("Report".to_string())),
            Page::width(|_| Ok(120)),
        ])
        .unwrap();
        assert_eq!(options.margin().unwrap(), 12);
        assert_eq!(options.header().unwrap(), "Report (120 cols)");
        assert_eq!(options.contract().accessors().len(), 4);
    }

    #[test]
    fn test_override_reads_other_accessor() {
        let options = Page::options([
            option!(|title| Ok("Notes".to_string())),
            option!(|header| Ok(format!("== {} ==", header.title()?))),
        ])
        .unwrap();
        assert_eq!(options.header().unwrap(), "== Notes ==");
        assert_eq!(options.width().unwrap(), 80);
    }

    #[test]
    fn test_dynamic_options_lookup_tier() {
        let lookup = crate::lookup_fn(|info| {
            if info.name() == "width" {
                Ok(Some(crate::into_value(40u32)))
            } else {
                Ok(None)
            }
        });
        let options = Page::dynamic_options(lookup, [Override::value("title", "T".to_string())]).unwrap();
        assert_eq!(options.margin().unwrap(), 4);
        assert_eq!(options.tier_of("width"), Some(Tier::Lookup));
        assert_eq!(options.tier_of("margin"), Some(Tier::Default));
        assert_eq!(options.tier_of("title"), None);

        assert_eq!(options.title().unwrap(), "T");
        assert_eq!(options.tier_of("title"), Some(Tier::Override));
    }

    #[test]
    fn test_lookup_without_title_fails_on_access() {
        let options = Page::dynamic_options(crate::NoLookup, []).unwrap();
        assert_eq!(options.width().unwrap(), 80);
        assert!(matches!(options.title(), Err(ResolveError::Missing { .. })));
        assert!(matches!(options.header(), Err(ResolveError::Missing { .. })));
    }
}
