//! Streaming Resolver
//! ==================
//!
//! One producer thread pulls alignment records off the source and pushes them
//! through a bounded channel. The consumer groups consecutive records by read
//! name and applies each finished read to the shared resolver under its lock.
//! Records of one read must be adjacent in the source.

use crossbeam_channel::bounded;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::assembly::resolver::BridgeResolver;
use crate::io::paf::AlignmentRecord;
use crate::utils::configuration::{AlignmentConfig, PipelineError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamingStats {
    pub records: usize,
    pub skipped_records: usize,
    pub reads: usize,
    pub reductions: usize,
    pub stopped: bool,
}

pub struct StreamingResolver {
    resolver: Arc<Mutex<BridgeResolver>>,
    shutdown_signal: Arc<AtomicBool>,
    alignment: AlignmentConfig,
    capacity: usize,
}

impl StreamingResolver {
    pub fn new(resolver: BridgeResolver) -> Self {
        let alignment = resolver.config().alignment.clone();
        let capacity = resolver.config().pipeline.channel_capacity.max(1);
        Self {
            resolver: Arc::new(Mutex::new(resolver)),
            shutdown_signal: Arc::new(AtomicBool::new(false)),
            alignment,
            capacity,
        }
    }

    pub fn resolver(&self) -> Arc<Mutex<BridgeResolver>> {
        Arc::clone(&self.resolver)
    }

    /// Flag that stops a running [`run`](Self::run) at the next record
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_signal)
    }

    pub fn stop(&self) {
        self.shutdown_signal.store(true, Ordering::Relaxed);
    }

    /// Drains `records` into the resolver. A stop request leaves the read
    /// being collected unprocessed.
    pub fn run<I>(&self, records: I) -> crate::Result<StreamingStats>
    where
        I: Iterator<Item = Result<AlignmentRecord, PipelineError>> + Send + 'static,
    {
        let start = Instant::now();
        let (tx, rx) = bounded(self.capacity);
        let producer_stop = Arc::clone(&self.shutdown_signal);
        let producer = thread::spawn(move || {
            for record in records {
                if producer_stop.load(Ordering::Relaxed) {
                    break;
                }
                if tx.send(record).is_err() {
                    break;
                }
            }
        });

        let mut stats = StreamingStats::default();
        let mut pending: Vec<AlignmentRecord> = Vec::new();
        for record in rx.iter() {
            if self.shutdown_signal.load(Ordering::Relaxed) {
                stats.stopped = true;
                break;
            }
            stats.records += 1;
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("skipping alignment record: {}", e);
                    stats.skipped_records += 1;
                    continue;
                }
            };
            if pending
                .first()
                .is_some_and(|first| first.read_name != record.read_name)
            {
                self.flush(&mut pending, &mut stats);
            }
            pending.push(record);
        }
        stats.stopped |= self.shutdown_signal.load(Ordering::Relaxed);
        if stats.stopped {
            info!("stop requested, {} pending record(s) dropped", pending.len());
        } else {
            self.flush(&mut pending, &mut stats);
        }
        drop(rx);
        producer
            .join()
            .map_err(|_| anyhow::anyhow!("alignment reader thread panicked"))?;

        info!(
            "🚀 streamed {} record(s) from {} read(s) in {:.2?}, {} reduction(s)",
            stats.records,
            stats.reads,
            start.elapsed(),
            stats.reductions
        );
        Ok(stats)
    }

    fn flush(&self, pending: &mut Vec<AlignmentRecord>, stats: &mut StreamingStats) {
        if pending.is_empty() {
            return;
        }
        let records = std::mem::take(pending);
        let read_name = records[0].read_name.clone();
        let mut resolver = self.resolver.lock();
        let alignments: Vec<_> = records
            .iter()
            .filter_map(|record| {
                let alignment = record.to_alignment(resolver.graph(), &self.alignment);
                if alignment.is_none() {
                    warn!(
                        "read {}: unknown segment {}, record skipped",
                        read_name, record.target_name
                    );
                    stats.skipped_records += 1;
                }
                alignment
            })
            .collect();
        let reduced = resolver.process_and_reduce(&read_name, &alignments);
        debug!("read {} reduced {} path(s)", read_name, reduced.len());
        stats.reads += 1;
        stats.reductions += reduced.len();
    }
}
