//! Catalog loading and the codec registry.
//!
//! The catalog is a YAML document with four top-level blocks — compressors,
//! encoders, envelopes, snippets — plus an optional top-level emission
//! template. Entries are pure data: an index, a name, the built-in
//! [`TransformKind`] they bind to, a C template for the reverse direction,
//! and (for snippets) an ordered list of declared argument names. New
//! algorithms are new catalog entries, never new code paths in the core.
//!
//! ## Validation
//!
//! Everything is checked at load, before any byte moves: duplicate indices
//! or names within a category, missing templates, kinds that do not belong
//! to their category, and snippet templates whose placeholders are not
//! covered by the declared arguments plus the fixed pipeline metadata
//! names. Index 0 of the compressor/encoder/envelope categories is reserved
//! for identity and synthesized when the document omits it.

use crate::error::{Error, Result};
use crate::render::placeholders;
use crate::transform::{TransformKind, PIPELINE_META_NAMES};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, trace};

/// The default catalog shipped with the crate
const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.yaml");

/// Catalog entry category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    /// Reversible byte-reduction transforms
    Compressor,
    /// Reversible, possibly keyed, byte-scrambling transforms
    Encoder,
    /// Printable-text renderings of a byte buffer
    Envelope,
    /// Parameterized auxiliary source fragments
    Snippet,
}

impl Category {
    /// All categories, in pipeline order
    pub const ALL: [Category; 4] = [
        Category::Compressor,
        Category::Encoder,
        Category::Envelope,
        Category::Snippet,
    ];

    /// Returns the lowercase singular name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Compressor => "compressor",
            Category::Encoder => "encoder",
            Category::Envelope => "envelope",
            Category::Snippet => "snippet",
        }
    }

    /// True for the three byte-transform categories where index 0 means
    /// identity
    pub fn has_identity(&self) -> bool {
        !matches!(self, Category::Snippet)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validated catalog entry
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Index, unique within the category
    pub index: u32,
    /// Name, unique within the category
    pub name: String,
    /// Which category this entry lives in
    pub category: Category,
    /// Built-in algorithm the entry binds to (always `None` for snippets)
    pub kind: TransformKind,
    /// One-line description for listings
    pub desc: Option<String>,
    /// C source template: the reverse transform for stages, the inserted
    /// fragment for snippets. Empty for identity entries.
    pub template: String,
    /// Declared argument names, in binding order (snippets only)
    pub args: Vec<String>,
    /// Optional per-entry tuning (fixed key, round count, key length)
    pub params: BTreeMap<String, String>,
}

impl CatalogEntry {
    /// True for the reserved identity/pass-through entries
    pub fn is_identity(&self) -> bool {
        self.kind == TransformKind::None && self.category.has_identity()
    }

    fn identity(category: Category) -> Self {
        Self {
            index: 0,
            name: "none".to_string(),
            category,
            kind: TransformKind::None,
            desc: Some("pass-through".to_string()),
            template: String::new(),
            args: Vec::new(),
            params: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    index: u32,
    name: String,
    #[serde(default)]
    kind: Option<TransformKind>,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    params: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCatalog {
    #[serde(default)]
    emission: Option<String>,
    #[serde(default)]
    compressors: Vec<RawEntry>,
    #[serde(default)]
    encoders: Vec<RawEntry>,
    #[serde(default)]
    envelopes: Vec<RawEntry>,
    #[serde(default)]
    snippets: Vec<RawEntry>,
}

/// The validated, immutable catalog for one run
#[derive(Debug, Clone)]
pub struct Catalog {
    compressors: BTreeMap<u32, CatalogEntry>,
    encoders: BTreeMap<u32, CatalogEntry>,
    envelopes: BTreeMap<u32, CatalogEntry>,
    snippets: BTreeMap<u32, CatalogEntry>,
    emission: Option<String>,
}

impl Catalog {
    /// Parses and validates a catalog document
    pub fn from_str(yaml: &str) -> Result<Self> {
        let raw: RawCatalog = serde_yaml::from_str(yaml)?;

        let compressors = validate_block(Category::Compressor, raw.compressors)?;
        let encoders = validate_block(Category::Encoder, raw.encoders)?;
        let envelopes = validate_block(Category::Envelope, raw.envelopes)?;
        let snippets = validate_block(Category::Snippet, raw.snippets)?;

        if let Some(emission) = &raw.emission {
            if emission.trim().is_empty() {
                return Err(Error::catalog_format("emission template is empty"));
            }
        }

        debug!(
            "catalog loaded: {} compressors, {} encoders, {} envelopes, {} snippets",
            compressors.len(),
            encoders.len(),
            envelopes.len(),
            snippets.len()
        );

        Ok(Self {
            compressors,
            encoders,
            envelopes,
            snippets,
            emission: raw.emission,
        })
    }

    /// Loads and validates a catalog file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_str(&text)
    }

    /// Returns the catalog embedded in the crate
    pub fn builtin() -> Result<Self> {
        Self::from_str(BUILTIN_CATALOG)
    }

    /// Resolves an entry by category and index
    pub fn resolve(&self, category: Category, index: u32) -> Result<&CatalogEntry> {
        self.table(category)
            .get(&index)
            .ok_or(Error::UnknownAlgorithm { category, index })
    }

    /// Iterates a category's entries in index order
    pub fn entries(&self, category: Category) -> impl Iterator<Item = &CatalogEntry> {
        self.table(category).values()
    }

    /// Finds a snippet by case-insensitive name, falling back to a numeric
    /// index
    pub fn find_snippet(&self, selector: &str) -> Result<&CatalogEntry> {
        let lowered = selector.to_lowercase();
        if let Some(entry) = self
            .snippets
            .values()
            .find(|e| e.name.to_lowercase() == lowered)
        {
            return Ok(entry);
        }
        if let Ok(index) = selector.parse::<u32>() {
            if let Some(entry) = self.snippets.get(&index) {
                return Ok(entry);
            }
        }
        Err(Error::unknown_snippet(selector))
    }

    /// The top-level emission template, if the document carries one.
    ///
    /// Callers fall back to [`crate::render::DEFAULT_EMISSION_TEMPLATE`]
    /// when absent.
    pub fn emission_template(&self) -> Option<&str> {
        self.emission.as_deref()
    }

    fn table(&self, category: Category) -> &BTreeMap<u32, CatalogEntry> {
        match category {
            Category::Compressor => &self.compressors,
            Category::Encoder => &self.encoders,
            Category::Envelope => &self.envelopes,
            Category::Snippet => &self.snippets,
        }
    }
}

fn validate_block(
    category: Category,
    items: Vec<RawEntry>,
) -> Result<BTreeMap<u32, CatalogEntry>> {
    let mut by_index: BTreeMap<u32, CatalogEntry> = BTreeMap::new();

    for (position, raw) in items.into_iter().enumerate() {
        let label = format!("{category}[{}]", position + 1);

        if raw.name.is_empty() {
            return Err(Error::catalog_format(format!("{label}: empty name")));
        }
        if let Some(previous) = by_index.get(&raw.index) {
            return Err(Error::catalog_format(format!(
                "duplicate {category} index {} (used by '{}' and '{}')",
                raw.index, previous.name, raw.name
            )));
        }
        if by_index.values().any(|e| e.name == raw.name) {
            return Err(Error::catalog_format(format!(
                "duplicate {category} name '{}'",
                raw.name
            )));
        }

        let entry = validate_entry(category, &label, raw)?;
        trace!("catalog entry: {category} {} '{}'", entry.index, entry.name);
        by_index.insert(entry.index, entry);
    }

    // index 0 always resolves to pass-through for the stage categories
    if category.has_identity() {
        by_index
            .entry(0)
            .or_insert_with(|| CatalogEntry::identity(category));
    }

    Ok(by_index)
}

fn validate_entry(category: Category, label: &str, raw: RawEntry) -> Result<CatalogEntry> {
    let kind = match category {
        Category::Snippet => {
            if raw.kind.is_some() {
                return Err(Error::catalog_format(format!(
                    "{label}: snippets do not take a kind"
                )));
            }
            TransformKind::None
        }
        _ => {
            let kind = raw.kind.unwrap_or(TransformKind::None);
            let fits = match category {
                Category::Compressor => kind.is_compressor(),
                Category::Encoder => kind.is_encoder(),
                Category::Envelope => kind.is_envelope(),
                Category::Snippet => unreachable!(),
            };
            if !fits {
                return Err(Error::catalog_format(format!(
                    "{label}: kind '{kind}' is not a valid {category}"
                )));
            }
            if kind != TransformKind::None && raw.index == 0 {
                return Err(Error::catalog_format(format!(
                    "{label}: index 0 is reserved for pass-through"
                )));
            }
            if kind == TransformKind::None && raw.index != 0 {
                return Err(Error::catalog_format(format!(
                    "{label}: non-zero index requires a kind"
                )));
            }
            kind
        }
    };

    let template = match raw.template {
        Some(t) if !t.trim().is_empty() => t,
        _ if kind == TransformKind::None && category != Category::Snippet => String::new(),
        _ => {
            return Err(Error::catalog_format(format!(
                "{label}: missing or empty template"
            )));
        }
    };

    if category != Category::Snippet && !raw.args.is_empty() {
        return Err(Error::catalog_format(format!(
            "{label}: only snippets declare args"
        )));
    }

    if category == Category::Snippet {
        for name in placeholders(&template) {
            let declared = raw.args.iter().any(|a| a == &name);
            let pipeline = PIPELINE_META_NAMES.contains(&name.as_str());
            if !declared && !pipeline {
                return Err(Error::catalog_format(format!(
                    "{label}: template placeholder '@{name}@' is neither a declared \
                     argument nor a pipeline metadata name"
                )));
            }
        }
    }

    Ok(CatalogEntry {
        index: raw.index,
        name: raw.name,
        category,
        kind,
        desc: raw.desc,
        template,
        args: raw.args,
        params: raw.params,
    })
}
