use crate::error::EtlError;
use crate::sink::Sink;
use crate::types::FileStats;
use std::path::{Path, PathBuf};

/// Progress of a pass over one data directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<'a> {
    /// Files were discovered under `root`
    Found { total: usize, root: &'a Path },
    /// A file was processed and committed
    Processed { done: usize, total: usize },
}

/// Print progress the way the loader reports it on stdout
pub fn print_progress(progress: Progress<'_>) {
    match progress {
        Progress::Found { total, root } => println!("{} files found in {}", total, root.display()),
        Progress::Processed { done, total } => println!("{}/{} files processed.", done, total),
    }
}

/// Run `extract` over each file in order, committing after every file
///
/// The first failing file aborts the pass. Files committed before it stay committed.
pub fn process_data<S, F, P>(
    sink: &mut S,
    root: &Path,
    files: &[PathBuf],
    mut extract: F,
    mut progress: P,
) -> Result<FileStats, EtlError>
where
    S: Sink + ?Sized,
    F: FnMut(&mut S, &Path) -> Result<FileStats, EtlError>,
    P: FnMut(Progress<'_>),
{
    let total = files.len();
    progress(Progress::Found { total, root });

    let mut stats = FileStats::default();
    for (idx, file) in files.iter().enumerate() {
        let file_stats = extract(&mut *sink, file)?;
        sink.commit()?;
        stats.merge(&file_stats);
        progress(Progress::Processed { done: idx + 1, total });
    }

    Ok(stats)
}
