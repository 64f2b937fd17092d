//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "layout-inspect",
    version,
    about = "Expand form layouts against form data and print the node tree",
    long_about = "Expand one or more page layouts against a form-data document, generate\n\
                  the node store and print every node with its bindings, hidden state\n\
                  and configuration errors.\n\n\
                  Log output is controlled with RUST_LOG."
)]
pub struct Cli {
    /// Page layout JSON. Repeat for multi-page forms; the file stem is the page key.
    #[arg(long = "layout", value_name = "PATH", required = true)]
    pub layouts: Vec<PathBuf>,

    /// Form data JSON used to count repeating-group rows.
    #[arg(long = "data", value_name = "PATH")]
    pub data: Option<PathBuf>,

    /// Page to make current (default: the first layout).
    #[arg(long = "current", value_name = "PAGE")]
    pub current: Option<String>,

    /// Treat these node ids as hidden by rule.
    #[arg(long = "hide", value_name = "ID")]
    pub hide: Vec<String>,

    /// Ignore every hidden flag, as the developer override does.
    #[arg(long = "force-visible")]
    pub force_visible: bool,

    #[arg(long = "format", value_enum, default_value = "tree")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented node tree.
    Tree,
    /// Store records and diagnostics as JSON.
    Json,
}
