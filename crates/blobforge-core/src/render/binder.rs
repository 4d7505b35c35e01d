//! Positional snippet argument binding.
//!
//! The Nth supplied token binds to the Nth declared name, nothing more:
//! no defaulting, no partial binding, no type coercion. Tokens are opaque
//! text; the renderer pastes them verbatim wherever the snippet template
//! references the declared name.

use crate::error::{Error, Result};

/// Binds supplied tokens to declared parameter names, in order.
///
/// Fails with [`Error::ArityMismatch`] when the counts differ.
pub fn bind(
    snippet: &str,
    declared: &[String],
    supplied: &[String],
) -> Result<Vec<(String, String)>> {
    if declared.len() != supplied.len() {
        return Err(Error::arity_mismatch(snippet, declared.len(), supplied.len()));
    }
    Ok(declared
        .iter()
        .cloned()
        .zip(supplied.iter().cloned())
        .collect())
}

/// Splits a colon-delimited argument token list as supplied on the command
/// line. An empty string means no arguments at all.
pub fn split_args(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(':').map(str::to_string).collect()
}
