//! GFA 1 reader and writer.
//!
//! Segments become nodes and links become edges. Segment depth comes from a
//! `DP:f` (or `dp:f`) tag, or from `KC:i` / `RC:i` divided by the segment length. Link
//! overlaps `<n>M` are stored as edge length `-n`; a positive gap can be
//! carried in a `GL:i` tag, which is how summary and read-only edges are
//! written back.

use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::core::graph::{BidirectedGraph, EdgeKind, NodeId};
use crate::io::open_input;
use crate::utils::configuration::PipelineError;

pub fn load_gfa(path: &Path, kmer_size: i64) -> Result<BidirectedGraph, PipelineError> {
    let graph = read_gfa(open_input(path)?, kmer_size)?;
    info!(
        "📂 loaded {}: {} segments, {} links",
        path.display(),
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

struct PendingLink {
    line: usize,
    from: String,
    from_orient: String,
    to: String,
    to_orient: String,
    length: i64,
}

pub fn read_gfa<R: BufRead>(reader: R, kmer_size: i64) -> Result<BidirectedGraph, PipelineError> {
    let mut graph = BidirectedGraph::new(kmer_size);
    // Links may precede the segments they name
    let mut pending_links: Vec<PendingLink> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        match fields[0] {
            "S" => {
                if fields.len() < 3 {
                    return Err(malformed(line_number, "segment needs a name and a sequence"));
                }
                let name = fields[1];
                let sequence = match fields[2] {
                    "*" => Vec::new(),
                    s => s.as_bytes().to_vec(),
                };
                let tags = &fields[3..];
                let length = int_tag(tags, "LN").unwrap_or(sequence.len() as i64);
                let coverage = segment_depth(tags, length);
                let node = graph
                    .add_node(name, length, coverage)
                    .map_err(|e| malformed(line_number, &e.to_string()))?;
                if !sequence.is_empty() {
                    graph.set_sequence(node, sequence);
                }
            }
            "L" => {
                if fields.len() < 6 {
                    return Err(malformed(line_number, "link needs 5 fields"));
                }
                let length = match int_tag(&fields[6..], "GL") {
                    Some(gap) => gap,
                    None => -parse_overlap(fields[5]).ok_or_else(|| {
                        malformed(line_number, &format!("unsupported overlap {}", fields[5]))
                    })?,
                };
                pending_links.push(PendingLink {
                    line: line_number,
                    from: fields[1].to_string(),
                    from_orient: fields[2].to_string(),
                    to: fields[3].to_string(),
                    to_orient: fields[4].to_string(),
                    length,
                });
            }
            _ => {}
        }
    }

    for link in pending_links {
        let from = lookup(&graph, &link.from, link.line)?;
        let to = lookup(&graph, &link.to, link.line)?;
        // leaving `from` forward exits its out side; entering `to` forward
        // goes through its in side
        let dir_from = orientation(&link.from_orient, link.line)?;
        let dir_to = !orientation(&link.to_orient, link.line)?;
        if graph.find_edge(from, to, dir_from, dir_to).is_some() {
            debug!("duplicate link at line {}", link.line);
            continue;
        }
        graph
            .add_edge(from, to, dir_from, dir_to, link.length)
            .map_err(|e| malformed(link.line, &e.to_string()))?;
    }
    Ok(graph)
}

/// Writes nodes and live edges back as GFA 1.
pub fn write_gfa<W: Write>(graph: &BidirectedGraph, mut out: W) -> Result<(), PipelineError> {
    writeln!(out, "H\tVN:Z:1.0")?;
    for node in graph.nodes() {
        let sequence = if node.sequence.is_empty() {
            "*".to_string()
        } else {
            String::from_utf8_lossy(&node.sequence).into_owned()
        };
        writeln!(
            out,
            "S\t{}\t{}\tLN:i:{}\tDP:f:{:.3}",
            node.name, sequence, node.length, node.coverage
        )?;
    }

    let mut edges: Vec<_> = graph.active_edges().collect();
    edges.sort_by_key(|e| e.key);
    for edge in edges {
        let key = edge.key;
        let from = &graph.node(key.node0).name;
        let to = &graph.node(key.node1).name;
        let from_orient = if key.dir0 { '+' } else { '-' };
        let to_orient = if key.dir1 { '-' } else { '+' };
        let (overlap, gap_tag) = if edge.length <= 0 {
            (format!("{}M", -edge.length), String::new())
        } else {
            ("*".to_string(), format!("\tGL:i:{}", edge.length))
        };
        let kind_tag = match &edge.kind {
            EdgeKind::Overlap => String::new(),
            EdgeKind::Synthetic => "\tKD:Z:synthetic".to_string(),
            EdgeKind::Reduced(path) => format!("\tKD:Z:reduced\tPW:Z:{}", path.label(graph)),
        };
        writeln!(
            out,
            "L\t{}\t{}\t{}\t{}\t{}{}{}",
            from, from_orient, to, to_orient, overlap, gap_tag, kind_tag
        )?;
    }
    out.flush()?;
    Ok(())
}

fn malformed(line: usize, message: &str) -> PipelineError {
    PipelineError::InputError {
        line,
        message: message.to_string(),
    }
}

fn lookup(graph: &BidirectedGraph, name: &str, line: usize) -> Result<NodeId, PipelineError> {
    graph
        .node_id(name)
        .ok_or_else(|| malformed(line, &format!("link names unknown segment {}", name)))
}

fn orientation(field: &str, line: usize) -> Result<bool, PipelineError> {
    match field {
        "+" => Ok(true),
        "-" => Ok(false),
        other => Err(malformed(line, &format!("bad orientation {}", other))),
    }
}

fn parse_overlap(cigar: &str) -> Option<i64> {
    if cigar == "*" {
        return Some(0);
    }
    cigar.strip_suffix('M')?.parse().ok()
}

fn tag<'a>(tags: &[&'a str], name: &str) -> Option<&'a str> {
    tags.iter().find_map(|t| {
        let mut parts = t.splitn(3, ':');
        let (key, _, value) = (parts.next()?, parts.next()?, parts.next()?);
        (key == name).then_some(value)
    })
}

fn int_tag(tags: &[&str], name: &str) -> Option<i64> {
    tag(tags, name)?.parse().ok()
}

fn segment_depth(tags: &[&str], length: i64) -> f64 {
    let depth = tag(tags, "DP").or_else(|| tag(tags, "dp"));
    if let Some(depth) = depth.and_then(|v| v.parse::<f64>().ok()) {
        return depth;
    }
    let count = int_tag(tags, "KC").or_else(|| int_tag(tags, "RC"));
    match count {
        Some(count) if length > 0 => count as f64 / length as f64,
        _ => 0.0,
    }
}
