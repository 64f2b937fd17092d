mod cli;
mod report;

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use formtree_layout::{
    parse_layout, FormDataRowSource, JsonFormData, LayoutComponentDefinition, LayoutPages,
};
use formtree_store::{NodeGenerator, NodeId, NodeStore, NodeStoreConfig};

use crate::cli::{Cli, OutputFormat};

fn page_key(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut layouts: Vec<(String, Vec<LayoutComponentDefinition>)> = Vec::new();
    for path in &cli.layouts {
        let json = fs::read_to_string(path)
            .map_err(|err| format!("reading {}: {err}", path.display()))?;
        let layout = parse_layout(&json).map_err(|err| format!("{}: {err}", path.display()))?;
        log::info!("loaded {} component(s) from {}", layout.len(), path.display());
        layouts.push((page_key(path), layout));
    }

    let data = match &cli.data {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|err| format!("reading {}: {err}", path.display()))?;
            JsonFormData::new(serde_json::from_str(&json)?)
        }
        None => JsonFormData::default(),
    };

    let mut pages = LayoutPages::build(
        layouts
            .iter()
            .map(|(key, layout)| (key.as_str(), layout.as_slice())),
        &FormDataRowSource::new(&data),
    );
    if let Some(current) = &cli.current {
        pages.set_current_page(current)?;
    }
    let pages = Arc::new(pages);

    let store = NodeStore::new(NodeStoreConfig {
        force_visible: cli.force_visible,
        ..NodeStoreConfig::default()
    });
    let report = NodeGenerator::new(store.clone()).run(Arc::clone(&pages));
    log::info!(
        "generation {}: {} node(s) across {} page(s)",
        report.generation,
        report.added,
        pages.pages().len()
    );
    store.mark_hidden_via_rule(cli.hide.iter().map(|id| (NodeId::from(id.as_str()), true)));

    match cli.format {
        OutputFormat::Tree => print!("{}", report::render_tree(&pages, &store)?),
        OutputFormat::Json => println!("{}", report::render_json(&store)?),
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
