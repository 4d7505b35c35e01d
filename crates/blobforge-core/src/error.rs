//! Error types for the blobforge-core library.
//!
//! All failures here stem from static configuration — a bad catalog, a bad
//! selection, a template that references a name nobody provides. None of
//! them are retryable; validation runs before any byte transform so a
//! failing run never produces partial output.

use crate::catalog::Category;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for blobforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all blobforge operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Selected index absent from its catalog category
    #[error("unknown {category} index {index}: not present in catalog")]
    UnknownAlgorithm {
        /// Category the lookup ran against
        category: Category,
        /// The index that failed to resolve
        index: u32,
    },

    /// Snippet selector (name or index) matched nothing
    #[error("unknown snippet '{selector}': no catalog entry with that name or index")]
    UnknownSnippet {
        /// The selector as supplied by the caller
        selector: String,
    },

    /// Malformed or self-inconsistent catalog
    #[error("catalog error: {details}")]
    CatalogFormat {
        /// What exactly is wrong with the catalog
        details: String,
    },

    /// Catalog document failed to deserialize
    #[error("failed to parse catalog: {0}")]
    CatalogParse(#[from] serde_yaml::Error),

    /// Supplied snippet argument count differs from the declared list
    #[error("snippet '{snippet}' declares {declared} argument(s) but {supplied} were supplied")]
    ArityMismatch {
        /// Name of the snippet being bound
        snippet: String,
        /// Number of declared parameters
        declared: usize,
        /// Number of supplied tokens
        supplied: usize,
    },

    /// Template references a placeholder the render context does not hold
    #[error("unresolved placeholder '@{placeholder}@' in template")]
    UnresolvedPlaceholder {
        /// Name of the missing placeholder
        placeholder: String,
    },

    /// A reverse transform was handed bytes it cannot decode
    #[error("malformed {stage} stream: {details}")]
    MalformedStream {
        /// Which stage's reverse failed
        stage: String,
        /// Why the stream was rejected
        details: String,
    },

    /// A catalog entry's `params` value could not be interpreted
    #[error("bad parameter '{param}' on entry '{entry}': {details}")]
    BadParam {
        /// Name of the catalog entry
        entry: String,
        /// Name of the offending parameter
        param: String,
        /// Why the value was rejected
        details: String,
    },

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Creates a new unknown-algorithm error
    pub fn unknown_algorithm(category: Category, index: u32) -> Self {
        Self::UnknownAlgorithm { category, index }
    }

    /// Creates a new unknown-snippet error
    pub fn unknown_snippet(selector: impl Into<String>) -> Self {
        Self::UnknownSnippet {
            selector: selector.into(),
        }
    }

    /// Creates a new catalog format error
    pub fn catalog_format(details: impl Into<String>) -> Self {
        Self::CatalogFormat {
            details: details.into(),
        }
    }

    /// Creates a new arity mismatch error
    pub fn arity_mismatch(snippet: impl Into<String>, declared: usize, supplied: usize) -> Self {
        Self::ArityMismatch {
            snippet: snippet.into(),
            declared,
            supplied,
        }
    }

    /// Creates a new unresolved-placeholder error
    pub fn unresolved_placeholder(placeholder: impl Into<String>) -> Self {
        Self::UnresolvedPlaceholder {
            placeholder: placeholder.into(),
        }
    }

    /// Creates a new malformed-stream error
    pub fn malformed_stream(stage: impl Into<String>, details: impl Into<String>) -> Self {
        Self::MalformedStream {
            stage: stage.into(),
            details: details.into(),
        }
    }

    /// Creates a new bad-parameter error
    pub fn bad_param(
        entry: impl Into<String>,
        param: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::BadParam {
            entry: entry.into(),
            param: param.into(),
            details: details.into(),
        }
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error indicates a malformed catalog rather than a
    /// bad invocation (useful for pointing the user at the right file)
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            Self::CatalogFormat { .. } | Self::CatalogParse(_) | Self::BadParam { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unknown_algorithm(Category::Encoder, 7);
        assert!(err.to_string().contains("encoder"));
        assert!(err.to_string().contains('7'));

        let err = Error::unresolved_placeholder("duration");
        assert!(err.to_string().contains("@duration@"));
    }

    #[test]
    fn test_is_catalog_error() {
        assert!(Error::catalog_format("dup index").is_catalog_error());
        assert!(!Error::unknown_snippet("delay").is_catalog_error());
    }
}
