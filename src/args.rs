use std::borrow::Cow;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum, ValueHint};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use derive_more::Display;

use crate::results::TimestampSelection;

const DEFAULT_RESULTS_DIR: &str = "./results";

/// Visualize kernel scheduler experiment results as Gantt and comparison charts
#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Path to the results directory with `<phase>_<YYYYMMDD>_<HHMMSS>.txt` stats files
    #[arg(value_name = "RESULTS_DIR", default_value = DEFAULT_RESULTS_DIR, value_hint = ValueHint::DirPath)]
    results_dir: PathBuf,

    /// Use the most recent results when the directory holds several runs
    ///
    /// Without this flag the run of the first stats file in file name order is used.
    #[arg(long)]
    latest: bool,

    /// Save the charts as files instead of displaying them
    #[arg(long)]
    save: bool,

    /// Output format for saved charts
    #[arg(long, value_enum, default_value_t = ChartOutputFormat::default())]
    format: ChartOutputFormat,

    /// Directory to write saved charts to
    ///
    /// Defaults to `RESULTS_DIR`.
    #[arg(long, short = 'o', value_hint = ValueHint::DirPath)]
    out_dir: Option<PathBuf>,

    /// Write the per-workload comparison metrics as JSON to this file
    ///
    /// A relative path is resolved against the output directory.
    #[arg(long, value_name = "FILENAME", value_hint = ValueHint::FilePath)]
    metrics_json: Option<PathBuf>,
}

#[derive(Debug, Display, ValueEnum, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartOutputFormat {
    #[default]
    #[display("png")]
    Png,
    #[display("pdf")]
    Pdf,
    #[display("svg")]
    Svg,
}

impl ChartOutputFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
            Self::Svg => "svg",
        }
    }
}

impl Args {
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub const fn timestamp_selection(&self) -> TimestampSelection {
        if self.latest {
            TimestampSelection::Latest
        } else {
            TimestampSelection::First
        }
    }

    pub const fn should_save(&self) -> bool {
        self.save
    }

    pub const fn format(&self) -> ChartOutputFormat {
        self.format
    }

    pub fn output_dir(&self) -> &Path {
        self.out_dir.as_deref().unwrap_or(&self.results_dir)
    }

    fn concatenate_with_out_path<'a>(&'a self, path: &'a Path) -> Cow<'a, Path> {
        if path.is_absolute() {
            path.into()
        } else {
            self.output_dir().join(path).into()
        }
    }

    pub fn metrics_json_path(&self) -> Option<Cow<'_, Path>> {
        self.metrics_json
            .as_deref()
            .map(|path| self.concatenate_with_out_path(path))
    }
}
