//! Input and output formats
//!
//! - `gfa.rs`: assembly graphs (GFA 1 segments and links)
//! - `paf.rs`: long-read alignments against graph segments
//! - `bins.rs`: node to population tables

pub mod bins;
pub mod gfa;
pub mod paf;

pub use bins::{load_bins, read_bins};
pub use gfa::{load_gfa, read_gfa, write_gfa};
pub use paf::{AlignmentRecord, PafReader};

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::utils::configuration::PipelineError;

/// Opens a text input, decompressing it when the name ends in `.gz`.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::IOError {
        message: format!("cannot open {}: {}", path.display(), e),
    })?;
    let gzipped = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
