use crate::aspectsort_core::error::{AspectSortError, Result};
use crate::aspectsort_core::media::{MediaEntry, MediaProber, Orientation, Probe};
use crate::aspectsort_core::outcome::{SortOutcome, SortStatus, SortSummary};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

/// Options for a sort run.
#[derive(Debug, Clone, Default)]
pub struct SortOptions {
    /// Folder under the source that holds `portrait/` and `landscape/`.
    pub output_subdir: Option<String>,
    /// Lowercase file names at the destination.
    pub lowercase_names: bool,
    /// Report what would be moved without touching the filesystem.
    pub dry_run: bool,
}

/// Shared flag used to stop a run between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The two folders files are moved into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    pub portrait: PathBuf,
    pub landscape: PathBuf,
}

impl Destinations {
    fn resolve(source_dir: &Path, output_subdir: Option<&str>) -> Self {
        let base = match output_subdir {
            Some(sub) => source_dir.join(sub),
            None => source_dir.to_path_buf(),
        };
        Destinations {
            portrait: base.join(Orientation::Portrait.folder_name()),
            landscape: base.join(Orientation::Landscape.folder_name()),
        }
    }

    pub fn for_orientation(&self, orientation: Orientation) -> &Path {
        match orientation {
            Orientation::Portrait => &self.portrait,
            Orientation::Landscape => &self.landscape,
        }
    }

    fn create(&self) -> Result<()> {
        for dir in [&self.portrait, &self.landscape] {
            fs::create_dir_all(dir).map_err(|source| AspectSortError::CreateDestination {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Sorts the files of one directory into portrait and landscape folders.
#[derive(Debug)]
pub struct Sorter {
    source: PathBuf,
    destinations: Destinations,
    options: SortOptions,
    cancel: Option<CancelToken>,
}

impl Sorter {
    /// Validate the source directory and resolve the destination folders.
    pub fn new(source_dir: &Path, mut options: SortOptions) -> Result<Self> {
        if !source_dir.exists() {
            return Err(AspectSortError::PathNotFound(source_dir.to_path_buf()));
        }
        if !source_dir.is_dir() {
            return Err(AspectSortError::NotADirectory(source_dir.to_path_buf()));
        }

        options.output_subdir = match options.output_subdir.take() {
            Some(sub) if sub.trim().is_empty() => None,
            Some(sub) => {
                let sub = sub.trim().to_string();
                let is_relative = Path::new(&sub)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
                if !is_relative {
                    return Err(AspectSortError::InvalidOutputName(sub));
                }
                Some(sub)
            }
            None => None,
        };

        let destinations = Destinations::resolve(source_dir, options.output_subdir.as_deref());

        Ok(Sorter {
            source: source_dir.to_path_buf(),
            destinations,
            options,
            cancel: None,
        })
    }

    /// Stop the run, between files, once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destinations(&self) -> &Destinations {
        &self.destinations
    }

    pub fn options(&self) -> &SortOptions {
        &self.options
    }

    /// Create the destination folders, list the source and return an
    /// iterator that sorts one file per step.
    pub fn run<'a, P>(&'a self, prober: &'a P) -> Result<SortRun<'a, P>>
    where
        P: MediaProber + ?Sized,
    {
        if self.options.dry_run {
            log::info!("Dry run: no folders will be created and no files moved");
        } else {
            log::info!(
                "Creating destination folders {} and {}",
                self.destinations.portrait.display(),
                self.destinations.landscape.display()
            );
            self.destinations.create()?;
        }

        log::info!("Scanning source directory {}", self.source.display());
        let entries = list_entries(&self.source)?;
        log::info!("Found {} files", entries.len());

        Ok(SortRun {
            sorter: self,
            prober,
            total: entries.len(),
            entries: entries.into_iter(),
        })
    }

    /// Sort the whole directory, calling `observer` once per file.
    pub fn sort_with<P, F>(&self, prober: &P, mut observer: F) -> Result<SortSummary>
    where
        P: MediaProber + ?Sized,
        F: FnMut(&SortOutcome),
    {
        let mut summary = SortSummary::default();
        for outcome in self.run(prober)? {
            summary.record(&outcome);
            observer(&outcome);
        }
        log::info!("Sort complete: {}", summary);
        Ok(summary)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn process<P>(&self, entry: MediaEntry, prober: &P) -> SortOutcome
    where
        P: MediaProber + ?Sized,
    {
        let status = match prober.probe(&entry.path) {
            Probe::Unsupported => {
                log::debug!("Skipping unsupported file: {}", entry.path.display());
                SortStatus::Unsupported
            }
            Probe::Unreadable(e) => {
                log::warn!("Could not read {}: {}", entry.path.display(), e);
                SortStatus::Unreadable(e)
            }
            Probe::Dimensions(dimensions) => {
                let orientation = dimensions.orientation();
                let mut filename = entry.file_name();
                if self.options.lowercase_names {
                    filename = filename.to_lowercase();
                }
                let destination = self.destinations.for_orientation(orientation).join(&filename);

                if fs::symlink_metadata(&destination).is_ok() {
                    log::warn!(
                        "Not moving {}: {} already exists",
                        entry.path.display(),
                        destination.display()
                    );
                    SortStatus::Conflict(destination)
                } else if self.options.dry_run {
                    SortStatus::Planned {
                        orientation,
                        dimensions,
                        destination,
                    }
                } else {
                    match move_file(&entry.path, &destination) {
                        Ok(()) => {
                            log::info!(
                                "Moved {} ({}) to {}",
                                entry.path.display(),
                                dimensions,
                                destination.display()
                            );
                            SortStatus::Moved {
                                orientation,
                                dimensions,
                                destination,
                            }
                        }
                        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                            log::warn!(
                                "Not moving {}: {} appeared during the move",
                                entry.path.display(),
                                destination.display()
                            );
                            SortStatus::Conflict(destination)
                        }
                        Err(error) => {
                            log::warn!(
                                "Failed to move {} to {}: {}",
                                entry.path.display(),
                                destination.display(),
                                error
                            );
                            SortStatus::MoveFailed { destination, error }
                        }
                    }
                }
            }
        };

        SortOutcome {
            path: entry.path,
            status,
        }
    }
}

/// Lazily sorts the listed files, yielding one outcome per file.
pub struct SortRun<'a, P: ?Sized> {
    sorter: &'a Sorter,
    prober: &'a P,
    entries: std::vec::IntoIter<MediaEntry>,
    total: usize,
}

impl<P: ?Sized> SortRun<'_, P> {
    /// Number of files found in the source directory.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl<P> Iterator for SortRun<'_, P>
where
    P: MediaProber + ?Sized,
{
    type Item = SortOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.entries.as_slice().is_empty() && self.sorter.is_cancelled() {
            log::info!(
                "Sort cancelled, {} files left untouched",
                self.entries.len()
            );
            self.entries = Vec::new().into_iter();
            return None;
        }
        let entry = self.entries.next()?;
        Some(self.sorter.process(entry, self.prober))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.entries.len()))
    }
}

/// Immediate files of `dir`, in file-name order. Subdirectories are skipped.
pub fn list_entries(dir: &Path) -> Result<Vec<MediaEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        match entry {
            Ok(e) if e.file_type().is_file() => entries.push(MediaEntry::new(e.into_path())),
            Ok(_) => {}
            // The source itself could not be read.
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => log::warn!("Skipping unreadable directory entry: {}", e),
        }
    }
    Ok(entries)
}

/// Move `src` to `dest` without ever replacing an existing `dest`.
///
/// A hard link claims the destination name atomically. Where linking is not
/// possible (another filesystem, or one without link support) the contents
/// are copied into a newly created `dest` instead. Fails with `AlreadyExists`
/// if `dest` appeared after it was checked. On failure neither a partial
/// `dest` nor a missing `src` is left behind.
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::hard_link(src, dest) {
        Ok(()) => {}
        Err(e) if matches!(e.kind(), io::ErrorKind::AlreadyExists | io::ErrorKind::NotFound) => {
            return Err(e);
        }
        Err(e) => {
            log::debug!(
                "Hard link failed for {} ({}), copying instead",
                src.display(),
                e
            );
            copy_new(src, dest)?;
        }
    }
    if let Err(remove_err) = fs::remove_file(src) {
        let _ = fs::remove_file(dest);
        return Err(remove_err);
    }
    Ok(())
}

/// Copy `src` into `dest`, which must not exist yet.
fn copy_new(src: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = fs::File::open(src)?;
    let mut writer = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)?;
    let copied = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all());
    if let Err(e) = copied {
        drop(writer);
        let _ = fs::remove_file(dest);
        return Err(e);
    }
    if let Ok(meta) = reader.metadata() {
        let _ = writer.set_permissions(meta.permissions());
    }
    Ok(())
}
