use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::agreement::DistanceKind;
use crate::model::FieldName;

#[derive(Parser, Debug)]
#[command(
    name = "harm-agreement",
    version,
    about = "Harm annotation store and inter-annotator agreement tooling"
)]
pub struct Cli {
    /// JSON configuration with the taxonomy and agreement defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Import(ImportArgs),
    Record(RecordArgs),
    Agreement(AgreementArgs),
    Matrix(MatrixArgs),
    Summary(SummaryArgs),
    Status(StatusArgs),
    ClearCache(ClearCacheArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".cache/harm-agreement")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.cache_root.join("annotations.sqlite"))
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// First submission day to include (YYYY-MM-DD).
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Last submission day to include (YYYY-MM-DD).
    #[arg(long)]
    pub until: Option<NaiveDate>,

    #[arg(long)]
    pub incident: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ImportFormat {
    /// One object per sheet row with the annotation sheet columns.
    Wide,
    /// One object per (item, rater, session, field, value).
    Long,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// JSON array or JSON lines file.
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t = ImportFormat::Wide)]
    pub format: ImportFormat,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub annotator: String,

    #[arg(long)]
    pub incident: String,

    #[arg(long = "stakeholder", required = true)]
    pub stakeholders: Vec<String>,

    #[arg(long)]
    pub harm_category: String,

    #[arg(long = "harm-subcategory", required = true)]
    pub harm_subcategories: Vec<String>,

    #[arg(long)]
    pub harm_type: String,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AgreementArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Fields to compute agreement on; defaults come from the configuration.
    #[arg(long = "field", value_enum)]
    pub fields: Vec<FieldName>,

    #[arg(long, value_enum)]
    pub distance: Option<DistanceKind>,

    /// Recompute even when a cached report for the same snapshot exists.
    #[arg(long, default_value_t = false)]
    pub refresh: bool,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MatrixArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[arg(long, value_enum)]
    pub field: FieldName,

    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Write the matrix here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[arg(long)]
    pub catalog: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ClearCacheArgs {
    #[arg(long, default_value = ".cache/harm-agreement")]
    pub cache_root: PathBuf,
}
