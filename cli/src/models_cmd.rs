use anyhow::Context;
use clap::Args;
use modelcall_core::Catalog;

use crate::Backend;

#[derive(Debug, Args)]
pub struct ModelsArgs {
    /// Emit JSON instead of a table.
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

pub async fn run(backend: &Backend, args: ModelsArgs) -> anyhow::Result<i32> {
    let entries = backend
        .client
        .fetch_models()
        .await
        .with_context(|| format!("Failed to list models for {}", backend.config.provider))?;
    let catalog = Catalog::new(backend.config.provider.as_str(), entries);

    if args.json {
        println!("{}", serde_json::to_string_pretty(catalog.entries())?);
        return Ok(0);
    }

    for entry in catalog.entries() {
        let display = entry.display_name.as_deref().unwrap_or("-");
        println!(
            "{}\t{display}\t{}",
            entry.name,
            entry.supported_actions.join(",")
        );
    }
    match catalog.default_selection() {
        Some((model, Some(action))) => println!("default: {}.{action}", model.name),
        Some((model, None)) => println!("default: {}", model.name),
        None => println!("no models available"),
    }
    Ok(0)
}
