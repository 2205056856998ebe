use crate::aspectsort_core::error::ProbeError;
use crate::aspectsort_core::media::{Dimensions, Orientation};
use std::path::PathBuf;

/// What happened to one file during a sort.
#[derive(Debug)]
pub enum SortStatus {
    /// Moved into its orientation folder.
    Moved {
        orientation: Orientation,
        dimensions: Dimensions,
        destination: PathBuf,
    },
    /// Dry run: would have been moved here.
    Planned {
        orientation: Orientation,
        dimensions: Dimensions,
        destination: PathBuf,
    },
    /// Extension not in the supported set. Not an error.
    Unsupported,
    /// Supported extension, but dimensions could not be read.
    Unreadable(ProbeError),
    /// A file with the same name already sits at the destination.
    Conflict(PathBuf),
    /// The filesystem refused the move.
    MoveFailed {
        destination: PathBuf,
        error: std::io::Error,
    },
}

impl SortStatus {
    pub fn is_moved(&self) -> bool {
        matches!(self, SortStatus::Moved { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SortStatus::MoveFailed { .. })
    }

    pub fn orientation(&self) -> Option<Orientation> {
        match self {
            SortStatus::Moved { orientation, .. } | SortStatus::Planned { orientation, .. } => {
                Some(*orientation)
            }
            _ => None,
        }
    }

    /// Human-readable reason for files that were left in place.
    pub fn reason(&self) -> Option<String> {
        match self {
            SortStatus::Moved { .. } | SortStatus::Planned { .. } => None,
            SortStatus::Unsupported => Some("unsupported file type".to_string()),
            SortStatus::Unreadable(e) => Some(format!("unreadable media: {}", e)),
            SortStatus::Conflict(dest) => {
                Some(format!("destination already exists: {}", dest.display()))
            }
            SortStatus::MoveFailed { destination, error } => Some(format!(
                "move to {} failed: {}",
                destination.display(),
                error
            )),
        }
    }
}

/// Outcome record for a single source file.
#[derive(Debug)]
pub struct SortOutcome {
    pub path: PathBuf,
    pub status: SortStatus,
}

impl SortOutcome {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

impl std::fmt::Display for SortOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.file_name();
        match &self.status {
            SortStatus::Moved {
                orientation,
                dimensions,
                ..
            } => write!(
                f,
                "{:<9} -> {}  ({})",
                orientation.as_str().to_uppercase(),
                name,
                dimensions
            ),
            SortStatus::Planned {
                orientation,
                destination,
                ..
            } => write!(
                f,
                "[DRY RUN] {} -> {} ({})",
                name,
                destination.display(),
                orientation
            ),
            SortStatus::MoveFailed { .. } => {
                write!(f, "FAILED    -> {}: {}", name, self.status.reason().unwrap_or_default())
            }
            _ => write!(f, "SKIPPED   -> {}: {}", name, self.status.reason().unwrap_or_default()),
        }
    }
}

/// Statistics from a sort run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SortSummary {
    pub moved_portrait: usize,
    pub moved_landscape: usize,
    pub planned: usize,
    pub unsupported: usize,
    pub unreadable: usize,
    pub conflicts: usize,
    pub failed: usize,
}

impl SortSummary {
    pub fn record(&mut self, outcome: &SortOutcome) {
        match &outcome.status {
            SortStatus::Moved { orientation, .. } => match orientation {
                Orientation::Portrait => self.moved_portrait += 1,
                Orientation::Landscape => self.moved_landscape += 1,
            },
            SortStatus::Planned { .. } => self.planned += 1,
            SortStatus::Unsupported => self.unsupported += 1,
            SortStatus::Unreadable(_) => self.unreadable += 1,
            SortStatus::Conflict(_) => self.conflicts += 1,
            SortStatus::MoveFailed { .. } => self.failed += 1,
        }
    }

    pub fn moved(&self) -> usize {
        self.moved_portrait + self.moved_landscape
    }

    /// Files left in place, not counting move failures: unsupported, unreadable
    /// or conflicting.
    pub fn skipped(&self) -> usize {
        self.unsupported + self.unreadable + self.conflicts
    }

    pub fn total(&self) -> usize {
        self.moved() + self.planned + self.skipped() + self.failed
    }
}

impl std::fmt::Display for SortSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} portrait, {} landscape moved ({} skipped, {} failed)",
            self.moved_portrait, self.moved_landscape, self.skipped(), self.failed
        )
    }
}
