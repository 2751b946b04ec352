//! PAF alignment records
//!
//! Only the twelve mandatory columns are read. Records of the same read are
//! expected to be adjacent, which is what aligners emit.

use std::io::{BufRead, Lines};
use std::path::Path;
use tracing::debug;

use crate::core::alignment::Alignment;
use crate::core::graph::BidirectedGraph;
use crate::io::open_input;
use crate::utils::configuration::{AlignmentConfig, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub read_name: String,
    pub read_length: i64,
    pub read_start: i64,
    pub read_end: i64,
    pub forward: bool,
    pub target_name: String,
    pub target_length: i64,
    pub target_start: i64,
    pub target_end: i64,
    pub quality: u8,
}

impl AlignmentRecord {
    pub fn parse(line: &str, line_number: usize) -> Result<Self, PipelineError> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            return Err(PipelineError::InputError {
                line: line_number,
                message: format!("expected 12 columns, found {}", fields.len()),
            });
        }
        let int = |i: usize| -> Result<i64, PipelineError> {
            fields[i].parse().map_err(|_| PipelineError::InputError {
                line: line_number,
                message: format!("column {} is not an integer: {}", i + 1, fields[i]),
            })
        };
        let forward = match fields[4] {
            "+" => true,
            "-" => false,
            other => {
                return Err(PipelineError::InputError {
                    line: line_number,
                    message: format!("bad strand {}", other),
                })
            }
        };
        Ok(Self {
            read_name: fields[0].to_string(),
            read_length: int(1)?,
            read_start: int(2)?,
            read_end: int(3)?,
            forward,
            target_name: fields[5].to_string(),
            target_length: int(6)?,
            target_start: int(7)?,
            target_end: int(8)?,
            quality: int(11)?.clamp(0, 255) as u8,
        })
    }

    /// The record as an alignment against a graph node, with its usefulness
    /// assessed. `None` when the target is not a node of `graph`.
    pub fn to_alignment(
        &self,
        graph: &BidirectedGraph,
        config: &AlignmentConfig,
    ) -> Option<Alignment> {
        let Some(node) = graph.node_id(&self.target_name) else {
            debug!(
                "read {} aligns to unknown segment {}",
                self.read_name, self.target_name
            );
            return None;
        };
        let mut alignment = Alignment::new(
            self.read_name.clone(),
            node,
            self.read_start,
            self.read_end,
            self.forward,
            self.quality,
        )
        .with_reference(self.target_start, self.target_end)
        .with_read_length(self.read_length);
        alignment.assess(graph, config);
        Some(alignment)
    }
}

/// Streams records out of a PAF file, skipping blank and `#` lines.
pub struct PafReader<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
}

impl PafReader<Box<dyn BufRead + Send>> {
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        Ok(Self::new(open_input(path)?))
    }
}

impl<R: BufRead> PafReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for PafReader<R> {
    type Item = Result<AlignmentRecord, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(AlignmentRecord::parse(line, self.line_number));
        }
    }
}
