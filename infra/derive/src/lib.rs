#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the workspace crates.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! dtk-derive = { path = "../../infra/derive" }
//! thiserror = "2"
//! ```

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for the error enums used across the workspace.
///
/// It wires an enum into `thiserror` and adds the conversions every crate here relies on.
///
/// * **Derives**: adds `Debug` and `thiserror::Error` unless already derived.
/// * **Context**: generates a companion `<Name>Ext` trait with `.context(..)` and the lazy
///   `.with_context(|| ..)` for `Result<T, Name>` and for `Result<T, Source>` of every wrapped
///   source type, plus an inherent `Name::with_note(..)`.
/// * **Conversions**: `From<Source>` for each variant holding a `source` field (or a field marked
///   `#[source]`/`#[from]`), so `?` works on upstream errors.
/// * **Fallback**: `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * **Formatting**: a private `format_context` helper for the `#[error(..)]` strings.
///
/// # Requirements
///
/// 1. Only enums are accepted.
/// 2. Every variant uses named fields.
/// 3. A `context` field must be `Option<Cow<'static, str>>`; variants with a source must have one.
///
/// # Example
///
/// ```rust,ignore
/// use dtk_derive::dtk_error;
/// use std::borrow::Cow;
///
/// #[dtk_error]
/// pub enum VersionError {
///     #[error("Cannot read version file{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Version error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read(path: &std::path::Path) -> Result<String, VersionError> {
///     std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
/// }
/// ```
#[proc_macro_attribute]
pub fn dtk_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_error(input).into()
}
