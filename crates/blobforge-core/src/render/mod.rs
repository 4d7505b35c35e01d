//! Template rendering and source emission.
//!
//! Placeholders are `@name@` tokens; `@@` is a literal `@`. Substitution is
//! single-pass and purely textual — no evaluation, no control flow, no
//! recursive expansion. A template placeholder the context cannot resolve
//! is a hard error: silently emitting an empty value would produce code
//! that compiles but reconstructs garbage.
//!
//! Bracketed-brace syntaxes were rejected on purpose: C templates are full
//! of braces, and the at-sign form needs no escaping gymnastics.
//!
//! ## Two-level rendering
//!
//! Each selected snippet is resolved first, against its bound arguments
//! plus the global context (so a snippet can reference pipeline metadata
//! such as `@payload_len@`). The resolved fragments are concatenated in
//! selection order and become the `@aux_snippets@` value of the top-level
//! emission template.

pub mod binder;
pub mod format;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::pipeline::PipelineOutput;
use crate::transform::{Artifact, MetaValue};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Token substituted for the payload body in split (manifest) emission
pub const PAYLOAD_TOKEN: &str = "__PAYLOAD_PLACEHOLDER__";

/// Emission scaffold used when the catalog does not carry one
pub const DEFAULT_EMISSION_TEMPLATE: &str = r#"/* generated by blobforge */
#include <stdlib.h>
#include <string.h>

@meta_decls@
@payload_decl@
@aux_snippets@
static unsigned char *restore_payload(unsigned int *out_len) {
    unsigned char *buf = (unsigned char *)malloc(@payload_len@ + 1);
    unsigned int buf_len = @payload_len@;
    memcpy(buf, payload, @payload_len@);
@decode_steps@
    *out_len = buf_len;
    return buf;
}
"#;

/// The final placeholder-to-text mapping. Built once, never mutated after
/// construction, consumed by [`render`].
#[derive(Debug, Clone)]
pub struct RenderContext {
    entries: Vec<(String, String)>,
}

impl RenderContext {
    /// Builds a context from name/value pairs
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Looks up a placeholder value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates context names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

/// Rendering options
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Column width for wrapped array and string literals (floor 40)
    pub width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { width: 96 }
    }
}

#[derive(Debug, PartialEq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// Splits a template into literal text and placeholder segments.
///
/// A placeholder is `@` + identifier + `@` where the identifier starts with
/// a letter or underscore. Any `@` not forming such a token passes through
/// literally, and `@@` collapses to one `@`.
fn scan(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '@' {
            text.push(chars[i]);
            i += 1;
            continue;
        }
        // escaped literal
        if chars.get(i + 1) == Some(&'@') {
            text.push('@');
            i += 2;
            continue;
        }
        // try @ident@
        let mut j = i + 1;
        if j < chars.len() && (chars[j].is_ascii_alphabetic() || chars[j] == '_') {
            j += 1;
            while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                j += 1;
            }
            if chars.get(j) == Some(&'@') {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Placeholder(chars[i + 1..j].iter().collect()));
                i = j + 1;
                continue;
            }
        }
        text.push('@');
        i += 1;
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

/// Returns the set of placeholder names a template references
pub fn placeholders(template: &str) -> BTreeSet<String> {
    scan(template)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Renders a template against a context in a single substitution pass
pub fn render(template: &str, context: &RenderContext) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    for segment in scan(template) {
        match segment {
            Segment::Text(t) => out.push_str(&t),
            Segment::Placeholder(name) => match context.get(&name) {
                Some(value) => out.push_str(value),
                None => return Err(Error::unresolved_placeholder(name)),
            },
        }
    }
    Ok(out)
}

/// Assembles the final emitted source from a pipeline run
#[derive(Debug)]
pub struct Emitter<'a> {
    catalog: &'a Catalog,
    options: RenderOptions,
}

impl<'a> Emitter<'a> {
    /// Creates an emitter with default options
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            options: RenderOptions::default(),
        }
    }

    /// Creates an emitter with explicit options
    pub fn with_options(catalog: &'a Catalog, options: RenderOptions) -> Self {
        Self { catalog, options }
    }

    /// Renders the complete source text with the payload inlined
    pub fn emit(&self, run: &PipelineOutput<'_>) -> Result<String> {
        self.emit_inner(run, true)
    }

    /// Renders the source text with the payload body replaced by
    /// [`PAYLOAD_TOKEN`], for split (manifest) output
    pub fn emit_template(&self, run: &PipelineOutput<'_>) -> Result<String> {
        self.emit_inner(run, false)
    }

    /// The payload body on its own: envelope text verbatim, raw bytes as
    /// hex lines of sixteen
    pub fn payload_body(&self, run: &PipelineOutput<'_>) -> String {
        match &run.artifact {
            Artifact::Text(text) => text.clone(),
            Artifact::Bytes(bytes) => bytes
                .chunks(16)
                .map(|row| {
                    row.iter()
                        .map(|b| format!("0x{b:02X}"))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn emit_inner(&self, run: &PipelineOutput<'_>, inline_payload: bool) -> Result<String> {
        let width = self.options.width.max(40);

        // metadata doubles as the placeholder vocabulary for stage and
        // snippet templates: scalars substitute their value, byte strings
        // substitute the C identifier their declaration carries
        let mut vocab: Vec<(String, String)> = Vec::new();
        for (name, value) in run.metadata.iter() {
            match value {
                MetaValue::Int(v) => vocab.push((name.to_string(), v.to_string())),
                MetaValue::Bytes(_) => vocab.push((name.to_string(), name.to_string())),
            }
        }

        // metadata declarations: byte strings as arrays, scalars as consts
        let mut meta_decls = String::new();
        for (name, value) in run.metadata.iter() {
            match value {
                MetaValue::Bytes(bytes) => meta_decls.push_str(&format::c_array(name, bytes, width)),
                MetaValue::Int(v) => meta_decls.push_str(&format::uint_var(name, *v)),
            }
        }

        let payload_decl = match (&run.artifact, inline_payload) {
            (Artifact::Bytes(bytes), true) => format::c_array("payload", bytes, width),
            (Artifact::Text(text), true) => format::c_string("payload", text, width),
            (Artifact::Bytes(_), false) => {
                format!("unsigned char payload[] = {{ /* {PAYLOAD_TOKEN} */ }};\n")
            }
            (Artifact::Text(_), false) => format!("const char payload[] = \"{PAYLOAD_TOKEN}\";\n"),
        };

        // snippets resolve first, each against its own arguments plus the
        // global vocabulary, then concatenate in selection order; bound
        // arguments come first so they shadow same-named metadata
        let mut aux_snippets = String::new();
        for (entry, bound) in &run.snippets {
            let mut pairs = bound.clone();
            pairs.extend(vocab.iter().cloned());
            let local = RenderContext::new(pairs);
            let fragment = render(&entry.template, &local)?;
            trace!("resolved snippet '{}' ({} bytes)", entry.name, fragment.len());
            aux_snippets.push_str(&format!("// ---- snippet: {} ----\n", entry.name));
            aux_snippets.push_str(&fragment);
            if !fragment.ends_with('\n') {
                aux_snippets.push('\n');
            }
        }

        // reverse steps run opposite to the forward pipeline
        let stage_context = RenderContext::new(vocab.clone());
        let mut decode_steps = String::new();
        for (banner, entry) in [
            ("envelope decode", run.envelope),
            ("inverse encoding", run.encoder),
            ("decompress", run.compressor),
        ] {
            if entry.is_identity() {
                continue;
            }
            let step = render(&entry.template, &stage_context)?;
            decode_steps.push_str(&format!("// ---- {banner} ({}) ----\n", entry.name));
            decode_steps.push_str(&step);
            if !step.ends_with('\n') {
                decode_steps.push('\n');
            }
        }

        let mut pairs = vocab;
        pairs.push(("meta_decls".to_string(), meta_decls));
        pairs.push(("payload_decl".to_string(), payload_decl));
        pairs.push(("aux_snippets".to_string(), aux_snippets));
        pairs.push(("decode_steps".to_string(), decode_steps));
        let context = RenderContext::new(pairs);

        let template = self
            .catalog
            .emission_template()
            .unwrap_or(DEFAULT_EMISSION_TEMPLATE);
        let text = render(template, &context)?;
        debug!("emitted {} bytes of source", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Executor, PipelineConfig, SnippetSelection};
    use pretty_assertions::assert_eq;

    fn ctx(pairs: &[(&str, &str)]) -> RenderContext {
        RenderContext::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_placeholder_extraction() {
        let found = placeholders("sleep(@duration@); if (n > @payload_len@) { }");
        let names: Vec<&str> = found.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["duration", "payload_len"]);
    }

    #[test]
    fn test_literal_at_signs_pass_through() {
        // escaped, unterminated, and non-identifier forms are all literal
        assert!(placeholders("a @@ b").is_empty());
        assert!(placeholders("user@example.com and 1 @ 2").is_empty());
        assert!(placeholders("@0x41@").is_empty());

        let c = ctx(&[]);
        assert_eq!(render("a @@ b", &c).unwrap(), "a @ b");
        assert_eq!(render("1 @ 2", &c).unwrap(), "1 @ 2");
    }

    #[test]
    fn test_render_substitutes() {
        let c = ctx(&[("duration", "3000"), ("payload_len", "3")]);
        assert_eq!(
            render("spin(@duration@, @payload_len@, @duration@);", &c).unwrap(),
            "spin(3000, 3, 3000);"
        );
    }

    #[test]
    fn test_render_is_single_pass() {
        // substituted text is not re-scanned for placeholders
        let c = ctx(&[("a", "@b@"), ("b", "boom")]);
        assert_eq!(render("@a@", &c).unwrap(), "@b@");
    }

    #[test]
    fn test_unresolved_placeholder_fails() {
        let c = ctx(&[("duration", "3000")]);
        let err = render("spin(@duration@, @jitter@);", &c).unwrap_err();
        assert!(matches!(
            err,
            Error::UnresolvedPlaceholder { ref placeholder } if placeholder == "jitter"
        ));
    }

    #[test]
    fn test_subset_of_context_succeeds() {
        let c = ctx(&[("a", "1"), ("b", "2"), ("c", "3")]);
        assert_eq!(render("only @b@", &c).unwrap(), "only 2");
    }

    #[test]
    fn test_context_lookup() {
        let c = ctx(&[("key_len", "1")]);
        assert_eq!(c.get("key_len"), Some("1"));
        assert_eq!(c.get("key"), None);
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["key_len"]);
    }

    fn emitted(catalog_yaml: &str, input: &[u8], config: &PipelineConfig) -> String {
        let catalog = Catalog::from_str(catalog_yaml).unwrap();
        let run = Executor::new(&catalog).run(input, config).unwrap();
        Emitter::new(&catalog).emit(&run).unwrap()
    }

    #[test]
    fn test_snippet_byte_metadata_resolves_to_identifier() {
        // @key@ stands for the declared C array, so any name the catalog
        // validation vocabulary admits also renders
        let yaml = r#"
encoders:
  - index: 1
    name: xor
    kind: xor
    params: { key: "0x5A" }
    template: |
      for (i = 0; i < buf_len; i++) buf[i] ^= key[0];
snippets:
  - index: 1
    name: key_check
    template: "check(@key@, @key_len@);"
"#;
        let config = PipelineConfig {
            encoder: 1,
            snippets: vec![SnippetSelection::new("key_check", "")],
            ..Default::default()
        };
        let text = emitted(yaml, b"ABC", &config);
        assert!(text.contains("check(key, 1);"), "got:\n{text}");
        assert!(text.contains("unsigned char key[] = { 0x5a"));
    }

    #[test]
    fn test_bound_argument_shadows_metadata_name() {
        // a snippet arg may reuse a pipeline metadata name; the supplied
        // token wins over the recorded value
        let yaml = r#"
encoders:
  - index: 1
    name: arx
    kind: arx
    params: { rounds: "2" }
    template: |
      unwind(buf, buf_len, key, @rounds@);
snippets:
  - index: 1
    name: tuner
    args: [rounds]
    template: "tune(@rounds@);"
"#;
        let config = PipelineConfig {
            encoder: 1,
            snippets: vec![SnippetSelection::new("tuner", "9")],
            ..Default::default()
        };
        let text = emitted(yaml, b"ABC", &config);
        assert!(text.contains("tune(9);"), "got:\n{text}");
        // the stage template still sees the pipeline value
        assert!(text.contains("unwind(buf, buf_len, key, 2);"));
    }

    #[test]
    fn test_default_emission_template_placeholders() {
        let names = placeholders(DEFAULT_EMISSION_TEMPLATE);
        for required in ["meta_decls", "payload_decl", "aux_snippets", "decode_steps", "payload_len"] {
            assert!(names.contains(required), "missing @{required}@");
        }
    }
}
