use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use modelcall_core::Catalog;
use modelcall_core::CatalogHandle;
use modelcall_core::Completion;
use modelcall_core::ModelEntry;

use crate::Backend;

#[derive(Debug, Args)]
pub struct CompleteArgs {
    /// Text typed so far.
    pub text: String,

    /// Cursor position in characters (defaults to the end of the text).
    #[arg(long = "cursor")]
    pub cursor: Option<usize>,

    /// JSON file holding an array of models to complete against instead of
    /// fetching the live list.
    #[arg(long = "catalog", value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Emit JSON instead of text.
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

pub async fn run(backend: &Backend, args: CompleteArgs) -> anyhow::Result<i32> {
    let handle = load_catalog(backend, args.catalog.as_deref()).await?;
    let cursor = args
        .cursor
        .unwrap_or_else(|| args.text.chars().count());

    let completion = backend
        .completer()
        .complete(&args.text, cursor, &handle.snapshot());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&completion)?);
    } else {
        for line in render_completion(&completion) {
            println!("{line}");
        }
    }
    Ok(0)
}

/// File catalog if given, else the live list when a key is configured,
/// else nothing.
async fn load_catalog(backend: &Backend, file: Option<&Path>) -> anyhow::Result<CatalogHandle> {
    let provider = backend.config.provider.as_str();
    if let Some(path) = file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let entries: Vec<ModelEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid catalog JSON in {}", path.display()))?;
        return Ok(CatalogHandle::with_catalog(Catalog::new(provider, entries)));
    }

    let handle = CatalogHandle::new(provider);
    if backend.has_api_key() {
        handle.refresh(backend.client.as_ref()).await;
    } else {
        tracing::info!("no API key configured; completing without a model list");
    }
    Ok(handle)
}

fn render_completion(completion: &Completion) -> Vec<String> {
    let context = &completion.context;
    let mut lines = vec![format!(
        "stage: {}  prefix: {:?}  replace: {}..{}",
        context.stage.as_str(),
        context.prefix,
        context.replace_range.start,
        context.replace_range.end
    )];
    for candidate in &completion.candidates {
        let mut line = format!("  {}\t{}", candidate.label, candidate.insert_text);
        if let Some(detail) = &candidate.detail {
            line.push('\t');
            line.push_str(detail);
        }
        lines.push(line);
    }
    lines
}
