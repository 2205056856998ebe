use crate::aspectsort_core::sorter::SortOptions;
use clap::Parser;
use simplelog::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Sort photos and videos into portrait and landscape folders")]
pub struct Cli {
    /// Folder containing the media to sort (not searched recursively)
    #[arg(required = true)]
    pub source_dir: PathBuf,

    /// Put portrait/ and landscape/ inside this subfolder of the source
    #[arg(short, long)]
    pub output: Option<String>,

    /// Lowercase file names when moving them
    #[arg(long)]
    pub lowercase: bool,

    /// Show what would be moved without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Hide the progress bar and per-file lines
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable file logging to aspectsort.log
    #[arg(long = "log")]
    pub log: bool,

    /// Log level for file logging (debug, info, warn, error)
    #[arg(long, default_value_t = LevelFilter::Debug)]
    pub log_level: LevelFilter,
}

impl Cli {
    pub fn sort_options(&self) -> SortOptions {
        SortOptions {
            output_subdir: self.output.clone(),
            lowercase_names: self.lowercase,
            dry_run: self.dry_run,
        }
    }
}
