//! Node to population tables
//!
//! Two tab-separated columns per line: segment name and bin number. Lines
//! starting with `#` are comments.

use std::io::BufRead;
use std::path::Path;
use tracing::{info, warn};

use crate::binning::{BinId, StaticBinner};
use crate::core::graph::BidirectedGraph;
use crate::io::open_input;
use crate::utils::configuration::PipelineError;

pub fn load_bins(
    path: &Path,
    graph: &BidirectedGraph,
    coverage_tolerance: f64,
) -> Result<StaticBinner, PipelineError> {
    let binner = read_bins(open_input(path)?, graph, coverage_tolerance)?;
    info!(
        "🧬 {} unique node(s) in {} bin(s) from {}",
        binner.assigned_count(),
        binner.bins().count(),
        path.display()
    );
    Ok(binner)
}

pub fn read_bins<R: BufRead>(
    reader: R,
    graph: &BidirectedGraph,
    coverage_tolerance: f64,
) -> Result<StaticBinner, PipelineError> {
    let mut assignments = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(name), Some(bin)) = (fields.next(), fields.next()) else {
            return Err(PipelineError::InputError {
                line: index + 1,
                message: "expected a segment name and a bin".to_string(),
            });
        };
        let bin: BinId = bin.parse().map_err(|_| PipelineError::InputError {
            line: index + 1,
            message: format!("bin is not a number: {}", bin),
        })?;
        match graph.node_id(name) {
            Some(node) => assignments.push((node, bin)),
            None => warn!("bin table names unknown segment {}", name),
        }
    }
    Ok(StaticBinner::from_assignments(
        graph,
        assignments,
        coverage_tolerance,
    ))
}

#[cfg(test)]
mod bins_tests {
    use super::*;
    use crate::binning::PopulationClassifier;

    fn graph() -> BidirectedGraph {
        let mut g = BidirectedGraph::new(0);
        g.add_node("a", 1000, 20.0).unwrap();
        g.add_node("b", 3000, 40.0).unwrap();
        g.add_node("c", 500, 8.0).unwrap();
        g
    }

    #[test]
    fn test_read_bin_table() {
        let g = graph();
        let table = "# node\tbin\na\t1\nb\t1\nc\t2\nghost\t3\n";
        let binner = read_bins(table.as_bytes(), &g, 0.25).unwrap();
        assert_eq!(binner.assigned_count(), 3);
        assert_eq!(binner.unique_bin(g.node_id("c").unwrap()), Some(2));
        // length weighted: (20*1000 + 40*3000) / 4000
        assert_eq!(binner.bin_coverage(1), Some(35.0));
        assert!(!binner.bins_compatible(1, 2));
    }

    #[test]
    fn test_malformed_line_is_reported() {
        let g = graph();
        let err = read_bins("a\t1\nb\n".as_bytes(), &g, 0.25).unwrap_err();
        assert!(matches!(err, PipelineError::InputError { line: 2, .. }));
        let err = read_bins("a\tone\n".as_bytes(), &g, 0.25).unwrap_err();
        assert!(matches!(err, PipelineError::InputError { line: 1, .. }));
    }
}
