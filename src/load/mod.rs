//! File discovery and the per-file commit loop

pub mod driver;
pub mod walker;

pub use driver::{print_progress, process_data, Progress};
pub use walker::{file_pattern, find_files, find_json_files};
