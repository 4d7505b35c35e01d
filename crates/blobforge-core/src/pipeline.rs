//! Pipeline executor.
//!
//! Fixed forward order: compress, then encode, then envelope. Every
//! selection — the three stage indices and any snippet choices with their
//! arguments — is resolved and validated before the first byte moves, so a
//! bad configuration can never leave a half-transformed artifact behind.

use crate::catalog::{Catalog, CatalogEntry, Category};
use crate::error::Result;
use crate::render::binder;
use crate::transform::{
    self, Artifact, MetaValue, Metadata, META_ENCODED_LEN, META_ORIGINAL_LEN, META_PAYLOAD_LEN,
};
use tracing::{debug, trace};

/// One auxiliary snippet selection: a selector (index or name) plus the
/// argument tokens to bind positionally
#[derive(Debug, Clone, Default)]
pub struct SnippetSelection {
    /// Snippet name or numeric index
    pub selector: String,
    /// Supplied argument tokens, in declaration order
    pub args: Vec<String>,
}

impl SnippetSelection {
    /// Creates a selection from a selector and a colon-delimited argument
    /// token list
    pub fn new(selector: impl Into<String>, raw_args: &str) -> Self {
        Self {
            selector: selector.into(),
            args: binder::split_args(raw_args),
        }
    }
}

/// Caller-supplied pipeline configuration. The all-zero default is the
/// identity pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Compressor index (0 = none)
    pub compressor: u32,
    /// Encoder index (0 = none)
    pub encoder: u32,
    /// Envelope index (0 = none)
    pub envelope: u32,
    /// Auxiliary snippet selections, in insertion order
    pub snippets: Vec<SnippetSelection>,
}

/// Everything a run produces: the final artifact, the accumulated
/// metadata, and the catalog entries that were selected
#[derive(Debug)]
pub struct PipelineOutput<'a> {
    /// The processed payload
    pub artifact: Artifact,
    /// Stage metadata, in recording order
    pub metadata: Metadata,
    /// Selected compressor entry
    pub compressor: &'a CatalogEntry,
    /// Selected encoder entry
    pub encoder: &'a CatalogEntry,
    /// Selected envelope entry
    pub envelope: &'a CatalogEntry,
    /// Selected snippets with their bound arguments, in selection order
    pub snippets: Vec<(&'a CatalogEntry, Vec<(String, String)>)>,
}

/// Composes catalog-resolved stages over an input buffer
#[derive(Debug)]
pub struct Executor<'a> {
    catalog: &'a Catalog,
}

impl<'a> Executor<'a> {
    /// Creates an executor over a loaded catalog
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Runs the forward pipeline.
    ///
    /// Resolution and argument binding happen up front; any
    /// `UnknownAlgorithm`, `UnknownSnippet`, or `ArityMismatch` fires
    /// before a single transform executes.
    pub fn run(&self, input: &[u8], config: &PipelineConfig) -> Result<PipelineOutput<'a>> {
        let compressor = self.catalog.resolve(Category::Compressor, config.compressor)?;
        let encoder = self.catalog.resolve(Category::Encoder, config.encoder)?;
        let envelope = self.catalog.resolve(Category::Envelope, config.envelope)?;

        let mut snippets = Vec::with_capacity(config.snippets.len());
        for selection in &config.snippets {
            let entry = self.catalog.find_snippet(&selection.selector)?;
            let bound = binder::bind(&entry.name, &entry.args, &selection.args)?;
            snippets.push((entry, bound));
        }

        debug!(
            "pipeline: compressor='{}' encoder='{}' envelope='{}' snippets={} input={} bytes",
            compressor.name,
            encoder.name,
            envelope.name,
            snippets.len(),
            input.len()
        );

        let mut metadata = Metadata::new();
        metadata.insert(META_ORIGINAL_LEN, MetaValue::Int(input.len() as u64))?;

        let compressed = transform::forward_compress(compressor, input, &mut metadata)?;
        trace!("compress: {} -> {} bytes", input.len(), compressed.len());

        let encoded = transform::forward_encode(encoder, &compressed, &mut metadata)?;
        trace!("encode: {} bytes", encoded.len());

        let artifact = match transform::forward_envelope(envelope, &encoded)? {
            Some(text) => {
                metadata.insert(META_ENCODED_LEN, MetaValue::Int(encoded.len() as u64))?;
                trace!("envelope: {} bytes -> {} chars", encoded.len(), text.len());
                Artifact::Text(text)
            }
            None => Artifact::Bytes(encoded),
        };

        metadata.insert(META_PAYLOAD_LEN, MetaValue::Int(artifact.len() as u64))?;

        Ok(PipelineOutput {
            artifact,
            metadata,
            compressor,
            encoder,
            envelope,
            snippets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transform::{decode_envelope, reverse_compress, reverse_encode, META_KEY};
    use pretty_assertions::assert_eq;

    const CATALOG: &str = r#"
compressors:
  - { index: 1, name: rle, kind: rle, template: "// rle decode" }
encoders:
  - index: 1
    name: xor
    kind: xor
    params: { key: "0x5A" }
    template: "// xor inverse"
  - { index: 2, name: arx, kind: arx, template: "// arx inverse" }
envelopes:
  - { index: 1, name: base64, kind: base64, template: "// b64 decode" }
  - { index: 2, name: base91, kind: base91, template: "// b91 decode" }
snippets:
  - index: 1
    name: delay_ms
    args: [duration]
    template: "spin(@duration@);"
"#;

    fn roundtrip(input: &[u8], config: &PipelineConfig) -> Vec<u8> {
        let catalog = Catalog::from_str(CATALOG).unwrap();
        let executor = Executor::new(&catalog);
        let output = executor.run(input, config).unwrap();
        reverse(&output)
    }

    /// Undo a run from its artifact and metadata alone
    fn reverse(output: &PipelineOutput<'_>) -> Vec<u8> {
        let bytes = match &output.artifact {
            Artifact::Text(text) => decode_envelope(output.envelope, text).unwrap(),
            Artifact::Bytes(b) => b.clone(),
        };
        let decoded = reverse_encode(output.encoder, &bytes, &output.metadata).unwrap();
        reverse_compress(output.compressor, &decoded, &output.metadata).unwrap()
    }

    #[test]
    fn test_identity_roundtrip() {
        let input = b"any bytes at all \x00\xff\x7f".to_vec();
        let recovered = roundtrip(&input, &PipelineConfig::default());
        assert_eq!(recovered, input);
    }

    #[test]
    fn test_identity_preserves_bytes_exactly() {
        let catalog = Catalog::from_str(CATALOG).unwrap();
        let output = Executor::new(&catalog)
            .run(&[0xDE, 0xAD], &PipelineConfig::default())
            .unwrap();
        assert_eq!(output.artifact, Artifact::Bytes(vec![0xDE, 0xAD]));
        assert_eq!(output.metadata.get_int(META_ORIGINAL_LEN), Some(2));
        assert_eq!(output.metadata.get_int(META_PAYLOAD_LEN), Some(2));
    }

    #[test]
    fn test_fixed_key_xor_example() {
        let catalog = Catalog::from_str(CATALOG).unwrap();
        let config = PipelineConfig {
            encoder: 1,
            ..Default::default()
        };
        let output = Executor::new(&catalog)
            .run(&[0x41, 0x42, 0x43], &config)
            .unwrap();
        assert_eq!(output.artifact, Artifact::Bytes(vec![0x1B, 0x18, 0x19]));
        assert_eq!(output.metadata.get_bytes(META_KEY), Some(&[0x5A][..]));
        assert_eq!(output.metadata.get_int(META_PAYLOAD_LEN), Some(3));
    }

    #[test]
    fn test_full_stack_roundtrip() {
        let input: Vec<u8> = (0u16..600).map(|i| (i % 251) as u8).collect();
        for envelope in [0, 1, 2] {
            for encoder in [0, 1, 2] {
                for compressor in [0, 1] {
                    let config = PipelineConfig {
                        compressor,
                        encoder,
                        envelope,
                        snippets: Vec::new(),
                    };
                    let recovered = roundtrip(&input, &config);
                    assert_eq!(
                        recovered, input,
                        "roundtrip failed for c={compressor} e={encoder} v={envelope}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_empty_input_all_stages() {
        let config = PipelineConfig {
            compressor: 1,
            encoder: 2,
            envelope: 1,
            snippets: Vec::new(),
        };
        let recovered = roundtrip(&[], &config);
        assert_eq!(recovered, Vec::<u8>::new());
    }

    #[test]
    fn test_unknown_index_fails_before_transform() {
        let catalog = Catalog::from_str(CATALOG).unwrap();
        let config = PipelineConfig {
            encoder: 99,
            ..Default::default()
        };
        let err = Executor::new(&catalog).run(b"abc", &config).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownAlgorithm {
                category: Category::Encoder,
                index: 99
            }
        ));
    }

    #[test]
    fn test_snippet_binding() {
        let catalog = Catalog::from_str(CATALOG).unwrap();
        let config = PipelineConfig {
            snippets: vec![SnippetSelection::new("delay_ms", "3000")],
            ..Default::default()
        };
        let output = Executor::new(&catalog).run(b"abc", &config).unwrap();
        assert_eq!(output.snippets.len(), 1);
        let (entry, bound) = &output.snippets[0];
        assert_eq!(entry.name, "delay_ms");
        assert_eq!(bound, &vec![("duration".to_string(), "3000".to_string())]);
    }

    #[test]
    fn test_snippet_arity_fails_before_transform() {
        let catalog = Catalog::from_str(CATALOG).unwrap();
        let config = PipelineConfig {
            snippets: vec![SnippetSelection::new("delay_ms", "3000:extra")],
            ..Default::default()
        };
        let err = Executor::new(&catalog).run(b"abc", &config).unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { supplied: 2, .. }));
    }

    #[test]
    fn test_unknown_snippet_rejected() {
        let catalog = Catalog::from_str(CATALOG).unwrap();
        let config = PipelineConfig {
            snippets: vec![SnippetSelection::new("jitter", "")],
            ..Default::default()
        };
        assert!(matches!(
            Executor::new(&catalog).run(b"abc", &config),
            Err(Error::UnknownSnippet { .. })
        ));
    }

    #[test]
    fn test_envelope_records_encoded_len() {
        let catalog = Catalog::from_str(CATALOG).unwrap();
        let config = PipelineConfig {
            envelope: 1,
            ..Default::default()
        };
        let output = Executor::new(&catalog).run(b"ABC", &config).unwrap();
        assert_eq!(output.metadata.get_int(META_ENCODED_LEN), Some(3));
        assert_eq!(output.artifact, Artifact::Text("QUJD".to_string()));
        // payload_len counts envelope characters
        assert_eq!(output.metadata.get_int(META_PAYLOAD_LEN), Some(4));
    }
}
