use dtk_derive::dtk_error;
use std::borrow::Cow;

#[dtk_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Unknown key `{key}`{}", format_context(.context))]
    UnknownKey { key: String, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read(path: &str) -> Result<String, DemoError> {
    std::fs::read_to_string(path).with_context(|| format!("reading {path}"))
}

fn lookup(key: &str) -> Result<(), DemoError> {
    Err(DemoError::UnknownKey { key: key.to_owned(), context: None }).context("lookup")
}

fn main() {
    let err = read("/definitely/missing").unwrap_err();
    assert!(err.to_string().contains("(reading /definitely/missing)"));

    let err = lookup("x").unwrap_err();
    assert_eq!(err.to_string(), "Unknown key `x` (lookup)");

    let err: DemoError = "boom".into();
    assert_eq!(err.with_note("late").to_string(), "Internal error (late): boom");
}
