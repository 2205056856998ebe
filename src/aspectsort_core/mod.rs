pub mod cli;
pub mod error;
pub mod media;
pub mod outcome;
pub mod sorter;

pub use cli::Cli;
pub use error::{AspectSortError, ProbeError, Result};
pub use media::{
    Dimensions, FileProber, MediaEntry, MediaKind, MediaProber, Orientation, Probe,
    ffprobe_available,
};
pub use outcome::{SortOutcome, SortStatus, SortSummary};
pub use sorter::{CancelToken, Destinations, SortOptions, SortRun, Sorter, list_entries};
