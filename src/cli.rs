use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "plotextract",
    version,
    about = "Recover binned plot data from legacy inspection report exports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Convert(ConvertArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = "dp_input")]
    pub input_root: PathBuf,

    #[arg(long, default_value = "output")]
    pub output_root: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(long, default_value = "dp_input")]
    pub input_root: PathBuf,

    #[arg(long, default_value = "output")]
    pub output_root: PathBuf,

    /// Only convert these inspection slugs.
    #[arg(long = "inspection")]
    pub inspections: Vec<String>,

    #[arg(long, default_value = "ft-in")]
    pub default_units: String,

    /// Inspections whose legacy data carries wrong units; forced to m-mm.
    #[arg(long = "metric-units-inspection")]
    pub metric_units_inspections: Vec<String>,

    /// External decoder for encoded arrays; reads a descriptor on stdin.
    #[arg(long)]
    pub codec_command: Option<String>,

    #[arg(long = "codec-arg", requires = "codec_command")]
    pub codec_args: Vec<String>,

    #[arg(long, default_value_t = false)]
    pub skip_legacy_copy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "output")]
    pub output_root: PathBuf,
}
