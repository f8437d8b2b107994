//! Turn data files into star-schema rows
//!
//! Each extractor handles one file and writes its rows to the sink as it goes.
//! Nothing is buffered across files.

pub mod log;
pub mod song;

pub use log::{derive_time, process_log_file};
pub use song::process_song_file;
