//! Error primitives shared across the workspace.
//!
//! Library crates define their own typed errors (with `snafu`) for anything a caller might want to match on. Everything
//! else -- application glue, delivery failures reported by forwarders, and so on -- flows through [`GenericError`].
#![deny(warnings)]
#![deny(missing_docs)]

use std::fmt::Display;

/// A type-erased error, with an optional chain of contextual messages.
pub type GenericError = anyhow::Error;

/// Creates a [`GenericError`].
///
/// Accepts a string literal, a format string plus arguments (in the same order as `std::format!`), or an existing value
/// implementing `Debug` and `Display`. When given a value implementing `std::error::Error`, its source chain is kept.
#[macro_export]
macro_rules! generic_error {
    ($msg:literal $(,)?) => { $crate::__private_anyhow!($msg) };
    ($err:expr $(,)?) => { $crate::__private_anyhow!($err) };
    ($fmt:expr, $($arg:tt)*) => { $crate::__private_anyhow!($fmt, $($arg)*) };
}

#[doc(hidden)]
pub use anyhow::anyhow as __private_anyhow;

mod private {
    pub trait Sealed {}

    impl<T, E> Sealed for Result<T, E> {}
}

/// Extension methods for attaching context to fallible results.
///
/// This mirrors `anyhow::Context`, but under different method names so that it can be imported alongside
/// `snafu::ResultExt` without the two colliding.
pub trait ErrorContext<T, E>: private::Sealed {
    /// Wraps the error value with the given context.
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static;

    /// Wraps the error value with context that is only built if an error actually occurred.
    fn with_error_context<C, F>(self, f: F) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T, E> for Result<T, E>
where
    Result<T, E>: anyhow::Context<T, E>,
{
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
    {
        anyhow::Context::context(self, context)
    }

    fn with_error_context<C, F>(self, f: F) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        anyhow::Context::with_context(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_prepended_to_chain() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("disk on fire"));
        let error = result.error_context("Failed to write payload.").unwrap_err();

        let chain = error.chain().map(|e| e.to_string()).collect::<Vec<_>>();
        assert_eq!(chain, vec!["Failed to write payload.", "disk on fire"]);
    }

    #[test]
    fn lazy_context_not_built_on_success() {
        let result: Result<u32, std::io::Error> = Ok(42);
        let value = result
            .with_error_context(|| -> String { panic!("context should not be evaluated") })
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn macro_formats_arguments() {
        let error = generic_error!("endpoint {} rejected {} payload(s)", "/api/v2/series", 3);
        assert_eq!(error.to_string(), "endpoint /api/v2/series rejected 3 payload(s)");
    }
}
