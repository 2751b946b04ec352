//! Files in, reduced graph out: GFA, bin table and PAF through the streaming resolver

use bridge_forge::io::{load_bins, load_gfa, write_gfa, PafReader};
use bridge_forge::{BridgeResolver, ResolverConfiguration, StreamingResolver};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const GRAPH: &str = "H\tVN:Z:1.0
S\ta\t*\tLN:i:500\tDP:f:10
S\tc\t*\tLN:i:500\tDP:f:10
S\tr\t*\tLN:i:100\tDP:f:20
S\tb\t*\tLN:i:600\tDP:f:10
S\td\t*\tLN:i:600\tDP:f:10
L\ta\t+\tr\t+\t0M
L\tc\t+\tr\t+\t0M
L\tr\t+\tb\t+\t0M
L\tr\t+\td\t+\t0M
";

const BINS: &str = "# node bin
a 1
c 1
b 1
d 1
";

const ALIGNMENTS: &str = "r1\t1200\t0\t500\t+\ta\t500\t0\t500\t500\t500\t60
r1\t1200\t600\t1200\t+\tb\t600\t0\t600\t600\t600\t60
r2\t1200\t0\t500\t+\tc\t500\t0\t500\t500\t500\t60
r2\t1200\t600\t1200\t+\td\t600\t0\t600\t600\t600\t60
";

fn write_inputs(dir: &Path, gzip_alignments: bool) -> (PathBuf, PathBuf, PathBuf) {
    let graph = dir.join("graph.gfa");
    let bins = dir.join("bins.tsv");
    fs::write(&graph, GRAPH).unwrap();
    fs::write(&bins, BINS).unwrap();

    let alignments = if gzip_alignments {
        let path = dir.join("reads.paf.gz");
        let mut encoder = GzEncoder::new(fs::File::create(&path).unwrap(), Compression::default());
        encoder.write_all(ALIGNMENTS.as_bytes()).unwrap();
        encoder.finish().unwrap();
        path
    } else {
        let path = dir.join("reads.paf");
        fs::write(&path, ALIGNMENTS).unwrap();
        path
    };
    (graph, bins, alignments)
}

fn resolve(dir: &Path, gzip_alignments: bool) -> (bridge_forge::StreamingStats, String) {
    let (graph_path, bins_path, paf_path) = write_inputs(dir, gzip_alignments);
    let config = ResolverConfiguration::default();
    let graph = load_gfa(&graph_path, config.search.kmer_size).unwrap();
    let binner = load_bins(&bins_path, &graph, config.binning.coverage_tolerance).unwrap();

    let streaming = StreamingResolver::new(BridgeResolver::new(graph, Box::new(binner), config));
    let stats = streaming.run(PafReader::open(&paf_path).unwrap()).unwrap();

    let resolver = streaming.resolver();
    let resolver = resolver.lock();
    let mut out = Vec::new();
    write_gfa(resolver.graph(), &mut out).unwrap();
    (stats, String::from_utf8(out).unwrap())
}

#[cfg(test)]
pub mod streaming_pipeline_tests {
    use super::*;

    #[test]
    fn test_repeat_is_split_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (stats, gfa) = resolve(dir.path(), false);

        assert_eq!(stats.records, 4);
        assert_eq!(stats.reads, 2);
        assert_eq!(stats.skipped_records, 0);
        assert_eq!(stats.reductions, 2);
        assert!(!stats.stopped);

        let links: Vec<&str> = gfa.lines().filter(|l| l.starts_with("L\t")).collect();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.contains("KD:Z:reduced")));
        assert!(links.iter().any(|l| l.starts_with("L\ta\t+\tb\t+")));
        assert!(links.iter().any(|l| l.starts_with("L\tc\t+\td\t+")));
        // the repeat stays as a segment with nothing attached
        assert!(gfa.lines().any(|l| l.starts_with("S\tr\t")));
    }

    #[test]
    fn test_gzipped_alignments_give_the_same_graph() {
        let plain = tempfile::tempdir().unwrap();
        let packed = tempfile::tempdir().unwrap();
        let (plain_stats, plain_gfa) = resolve(plain.path(), false);
        let (packed_stats, packed_gfa) = resolve(packed.path(), true);
        assert_eq!(plain_stats, packed_stats);
        assert_eq!(plain_gfa, packed_gfa);
    }
}
