//! blobforge - convert binary payloads into self-reconstructing C source
//!
//! Reads an input file, runs it through the compress/encode/envelope
//! pipeline selected by catalog indices, and emits C source that rebuilds
//! the original bytes in memory at runtime. With `--manifest` the result is
//! split into a YAML document carrying the code template and the payload
//! body separately.

use anyhow::{bail, Context, Result};
use blobforge_core::render::PAYLOAD_TOKEN;
use blobforge_core::{
    Catalog, Category, Emitter, Executor, PipelineConfig, PipelineOutput, RenderOptions,
    SnippetSelection,
};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

/// Convert binary payloads into self-reconstructing C source
#[derive(Parser, Debug)]
#[command(name = "blobforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input file to transform
    #[arg(required_unless_present = "list")]
    input: Option<PathBuf>,

    /// Catalog file (defaults to the built-in catalog)
    #[arg(short = 'C', long)]
    catalog: Option<PathBuf>,

    /// Compressor index (0 = none)
    #[arg(short = 'c', long, default_value = "0")]
    compressor: u32,

    /// Encoder index (0 = none)
    #[arg(short = 'e', long, default_value = "0")]
    encoder: u32,

    /// Envelope index (0 = none)
    #[arg(short = 'E', long, default_value = "0")]
    envelope: u32,

    /// Auxiliary snippet, by name or index (repeatable)
    #[arg(short = 's', long = "snippet")]
    snippets: Vec<String>,

    /// Colon-delimited argument list for the matching --snippet, in order
    /// (repeatable; e.g. --args 3000 or --args 16:4)
    #[arg(long = "args")]
    args: Vec<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit a YAML manifest with the code template and payload split apart
    #[arg(long)]
    manifest: bool,

    /// List the catalog entries and exit
    #[arg(long)]
    list: bool,

    /// Column width for wrapped array and string literals
    #[arg(long, default_value = "96")]
    width: usize,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Split output document: the source with the payload replaced by a
/// placeholder token, the payload body, its checksum, and the selections
/// that produced it.
#[derive(Serialize)]
struct Manifest {
    code_template: String,
    payload: String,
    payload_checksum: Checksum,
    options: ManifestOptions,
}

#[derive(Serialize)]
struct Checksum {
    algorithm: String,
    value: String,
}

#[derive(Serialize)]
struct ManifestOptions {
    compressor: StageRef,
    encoder: StageRef,
    envelope: StageRef,
    snippets: Vec<SnippetRef>,
    catalog: String,
}

#[derive(Serialize)]
struct StageRef {
    index: u32,
    name: String,
}

#[derive(Serialize)]
struct SnippetRef {
    name: String,
    args: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_path(path)
            .with_context(|| format!("failed to load catalog: {}", path.display()))?,
        None => Catalog::builtin().context("built-in catalog is invalid")?,
    };

    if cli.list {
        print!("{}", list_catalog(&catalog));
        return Ok(());
    }

    let text = run_pipeline(&cli, &catalog)?;

    match &cli.output {
        Some(path) => {
            fs::write(path, &text)
                .with_context(|| format!("failed to write output: {}", path.display()))?;
            info!("wrote {} bytes to {}", text.len(), path.display());
        }
        None => print!("{text}"),
    }

    Ok(())
}

/// Runs the full pipeline and renders either inline source or a manifest,
/// entirely in memory. Nothing is written until the whole document exists.
fn run_pipeline(cli: &Cli, catalog: &Catalog) -> Result<String> {
    let input = match &cli.input {
        Some(path) => fs::read(path)
            .with_context(|| format!("failed to read input file: {}", path.display()))?,
        None => bail!("an input file is required"),
    };
    debug!("read {} input bytes", input.len());

    let config = build_config(cli)?;
    let run = Executor::new(catalog).run(&input, &config)?;

    let options = RenderOptions { width: cli.width };
    let emitter = Emitter::with_options(catalog, options);

    if cli.manifest {
        let manifest = build_manifest(cli, &emitter, &run)?;
        Ok(serde_yaml::to_string(&manifest)?)
    } else {
        Ok(emitter.emit(&run)?)
    }
}

/// Pairs each `--args` occurrence with the `--snippet` at the same
/// position; trailing snippets get an empty argument list.
fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    if cli.args.len() > cli.snippets.len() {
        bail!(
            "{} --args given for {} --snippet selections",
            cli.args.len(),
            cli.snippets.len()
        );
    }

    let snippets = cli
        .snippets
        .iter()
        .enumerate()
        .map(|(i, selector)| {
            let raw = cli.args.get(i).map(String::as_str).unwrap_or("");
            SnippetSelection::new(selector, raw)
        })
        .collect();

    Ok(PipelineConfig {
        compressor: cli.compressor,
        encoder: cli.encoder,
        envelope: cli.envelope,
        snippets,
    })
}

fn build_manifest(cli: &Cli, emitter: &Emitter<'_>, run: &PipelineOutput<'_>) -> Result<Manifest> {
    let code_template = emitter.emit_template(run)?;
    debug_assert!(code_template.contains(PAYLOAD_TOKEN));
    let payload = emitter.payload_body(run);
    let value = blake3::hash(payload.as_bytes()).to_hex().to_string();

    Ok(Manifest {
        code_template,
        payload,
        payload_checksum: Checksum {
            algorithm: "blake3".to_string(),
            value,
        },
        options: ManifestOptions {
            compressor: stage_ref(run.compressor.index, &run.compressor.name),
            encoder: stage_ref(run.encoder.index, &run.encoder.name),
            envelope: stage_ref(run.envelope.index, &run.envelope.name),
            snippets: run
                .snippets
                .iter()
                .map(|(entry, bound)| SnippetRef {
                    name: entry.name.clone(),
                    args: bound.iter().map(|(_, v)| v.clone()).collect(),
                })
                .collect(),
            catalog: cli
                .catalog
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "builtin".to_string()),
        },
    })
}

/// Renders the catalog as aligned per-category tables
fn list_catalog(catalog: &Catalog) -> String {
    let mut out = String::new();
    for category in Category::ALL {
        out.push_str(&format!("{category}s:\n"));
        for entry in catalog.entries(category) {
            let name = if entry.args.is_empty() {
                entry.name.clone()
            } else {
                format!("{}({})", entry.name, entry.args.join(", "))
            };
            let desc = entry.desc.as_deref().unwrap_or("");
            out.push_str(&format!("  {:>3}  {:<28} {}\n", entry.index, name, desc));
        }
        out.push('\n');
    }
    out
}

fn stage_ref(index: u32, name: &str) -> StageRef {
    StageRef {
        index,
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(argv: &[&str]) -> Cli {
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_args_zip_positionally() {
        let cli = cli(&[
            "blobforge", "in.bin", "-s", "delay_ms", "--args", "3000", "-s", "alloc_gate",
            "--args", "16:4",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.snippets.len(), 2);
        assert_eq!(config.snippets[0].selector, "delay_ms");
        assert_eq!(config.snippets[0].args, vec!["3000"]);
        assert_eq!(config.snippets[1].args, vec!["16", "4"]);
    }

    #[test]
    fn test_trailing_snippet_without_args() {
        let cli = cli(&["blobforge", "in.bin", "-s", "length_guard"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.snippets[0].args.len(), 0);
    }

    #[test]
    fn test_excess_args_rejected() {
        let cli = cli(&["blobforge", "in.bin", "--args", "3000"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn test_input_required_unless_list() {
        assert!(Cli::try_parse_from(["blobforge"]).is_err());
        assert!(Cli::try_parse_from(["blobforge", "--list"]).is_ok());
    }

    #[test]
    fn test_list_catalog_names_builtin_entries() {
        let catalog = Catalog::builtin().unwrap();
        let listing = list_catalog(&catalog);
        assert!(listing.contains("compressors:"));
        assert!(listing.contains("rle"));
        assert!(listing.contains("delay_ms(duration)"));
        assert!(listing.contains("pass-through"));
    }

    #[test]
    fn test_emit_with_fixed_key_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("catalog.yaml");
        let input_path = dir.path().join("in.bin");
        let output_path = dir.path().join("out.c");
        fs::write(
            &catalog_path,
            r#"
encoders:
  - index: 1
    name: xor
    kind: xor
    params: { key: "0x5A" }
    template: |
      for (i = 0; i < buf_len; i++) buf[i] ^= key[0];
"#,
        )
        .unwrap();
        fs::write(&input_path, b"ABC").unwrap();

        let cli = cli(&[
            "blobforge",
            input_path.to_str().unwrap(),
            "-C",
            catalog_path.to_str().unwrap(),
            "-e",
            "1",
        ]);
        let catalog = Catalog::from_path(&catalog_path).unwrap();
        let text = run_pipeline(&cli, &catalog).unwrap();
        fs::write(&output_path, &text).unwrap();

        // "ABC" xor 0x5A
        assert!(text.contains("0x1b, 0x18, 0x19"));
        assert!(text.contains("0x5a"));
        assert!(text.contains("restore_payload"));
    }

    #[test]
    fn test_manifest_splits_payload() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.bin");
        fs::write(&input_path, b"ABC").unwrap();

        let cli = cli(&[
            "blobforge",
            input_path.to_str().unwrap(),
            "-E",
            "1",
            "--manifest",
        ]);
        let catalog = Catalog::builtin().unwrap();
        let text = run_pipeline(&cli, &catalog).unwrap();

        assert!(text.contains(PAYLOAD_TOKEN));
        assert!(text.contains("QUJD"));
        assert!(text.contains("blake3"));
        assert!(text.contains("catalog: builtin"));
    }
}
