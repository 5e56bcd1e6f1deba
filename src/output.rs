//! Grammar rendering options
//!
//! The options contract consumed by grammar output tooling and exposed by
//! the `dynopts` binary.

use dynopts_core::{options_contract, ResolveError};

/// Output formats a grammar can be rendered in.
pub const OUTPUT_FORMATS: &[&str] = &["ebnf", "iso14977", "xml"];

options_contract! {
    /// How a grammar is rendered.
    pub trait OutputOptions for Output {
        /// Name of the grammar being rendered.
        fn grammar_name() -> String;

        /// One of [`OUTPUT_FORMATS`].
        fn output_format() -> String = |_| Ok("ebnf".to_string());

        /// Maximum line width; 0 disables wrapping.
        fn line_width() -> u32 = |_| Ok(80);

        fn indent_width() -> u32 = |_| Ok(4);

        fn indent() -> String = |o| Ok(" ".repeat(o.indent_width()? as usize));

        fn wrap() -> bool = |o| Ok(o.line_width()? > 0);

        /// Extension of the rendered file, derived from the format.
        fn file_extension() -> String = |o| file_extension(&o.output_format()?);

        fn header() -> String = |o| Ok(format!("{} grammar ({})", o.grammar_name()?, o.output_format()?));

        /// Keywords rendered in upper case.
        fn keywords() -> Vec<String> = |_| Ok(Vec::new());
    }
}

fn file_extension(format: &str) -> Result<String, ResolveError> {
    match format {
        "ebnf" => Ok("ebnf".to_string()),
        "iso14977" => Ok("txt".to_string()),
        "xml" => Ok("xml".to_string()),
        other => Err(ResolveError::msg(format!(
            "unknown output format `{}` (expected one of {})",
            other,
            OUTPUT_FORMATS.join(", ")
        ))),
    }
}
