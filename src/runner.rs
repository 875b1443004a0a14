//! JSONL driver: fans lines out to chunking workers and writes records in input order.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use thiserror::Error;

use crate::chunker::{Chunker, DocumentOutcome};
use crate::config::{ConfigError, DEFAULT_ID_NAMESPACE};
use crate::record::ChunkRecord;
use crate::tokenizer::{Tokenizer, TokenizerError};

/// Run-level knobs that do not affect chunk content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Worker threads; zero is treated as one.
    pub workers: usize,
    /// Chunk-id namespace width per document.
    pub id_namespace: u64,
    /// Emit a progress event every N documents; zero disables.
    pub progress_every: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            id_namespace: DEFAULT_ID_NAMESPACE,
            progress_every: 10,
        }
    }
}

impl RunOptions {
    /// Rejects options that would make chunk ids collide.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id_namespace == 0 {
            return Err(ConfigError::ZeroNamespace);
        }
        Ok(())
    }
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Documents chunked, including those yielding no chunks.
    pub documents: usize,
    /// Lines skipped as malformed or over their id namespace.
    pub skipped: usize,
    /// Chunk records written.
    pub chunks: usize,
}

/// Failures that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Invalid run options.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The input stream could not be read.
    #[error("failed to read input line {line}")]
    Read {
        /// 1-based line index.
        line: usize,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The output stream rejected a write.
    #[error("failed to write chunk records")]
    Write(#[from] io::Error),
    /// A record could not be serialised.
    #[error("failed to serialise chunk record")]
    Serialize(#[from] serde_json::Error),
    /// The tokenizer broke its contract while chunking a document.
    #[error("line {line}: tokenizer failure")]
    Tokenizer {
        /// 1-based line index.
        line: usize,
        /// Underlying tokenizer error.
        #[source]
        source: TokenizerError,
    },
    /// Worker threads went away with documents still in flight.
    #[error("chunking worker channel closed unexpectedly")]
    WorkerDisconnected,
}

struct LineTask {
    seq: usize,
    line: usize,
    raw: String,
}

struct LineResult {
    seq: usize,
    line: usize,
    outcome: Result<DocumentOutcome, TokenizerError>,
}

/// Chunks every document in `reader`, writing one JSON record per line to `writer`.
///
/// Blank lines are ignored. Output order follows input order for any worker
/// count, and a document's records are written only once it fully succeeded.
pub fn run<R, W, T>(
    reader: R,
    writer: &mut W,
    chunker: &Chunker<T>,
    options: &RunOptions,
) -> Result<RunSummary, RunError>
where
    R: BufRead,
    W: Write,
    T: Tokenizer,
{
    options.validate()?;
    let workers = options.workers.max(1);
    let capacity = workers * 2;
    let namespace = options.id_namespace;
    tracing::info!(workers, namespace, parser = chunker.parser_tag(), "starting chunker");

    thread::scope(|scope| {
        let (task_tx, task_rx) = bounded::<LineTask>(capacity);
        let (result_tx, result_rx) = bounded::<LineResult>(capacity);
        for worker_id in 0..workers {
            let worker_rx = task_rx.clone();
            let worker_tx = result_tx.clone();
            scope.spawn(move || worker_loop(worker_id, worker_rx, worker_tx, chunker, namespace));
        }
        drop(task_rx);
        drop(result_tx);

        let mut collector = Collector::new(writer, options.progress_every);
        let mut next_seq = 0usize;
        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let raw = line.map_err(|source| RunError::Read {
                line: line_no,
                source,
            })?;
            if raw.trim().is_empty() {
                continue;
            }
            while collector.inflight >= capacity {
                let result = result_rx.recv().map_err(|_| RunError::WorkerDisconnected)?;
                collector.accept(result)?;
            }
            task_tx
                .send(LineTask {
                    seq: next_seq,
                    line: line_no,
                    raw,
                })
                .map_err(|_| RunError::WorkerDisconnected)?;
            next_seq += 1;
            collector.inflight += 1;
            collector.drain_ready(&result_rx)?;
        }
        drop(task_tx);

        while collector.inflight > 0 {
            let result = result_rx.recv().map_err(|_| RunError::WorkerDisconnected)?;
            collector.accept(result)?;
        }
        collector.finish()
    })
}

struct Collector<'w, W: Write> {
    writer: &'w mut W,
    pending: BTreeMap<usize, LineResult>,
    next_seq: usize,
    inflight: usize,
    progress_every: usize,
    summary: RunSummary,
}

impl<'w, W: Write> Collector<'w, W> {
    fn new(writer: &'w mut W, progress_every: usize) -> Self {
        Self {
            writer,
            pending: BTreeMap::new(),
            next_seq: 0,
            inflight: 0,
            progress_every,
            summary: RunSummary::default(),
        }
    }

    fn drain_ready(&mut self, result_rx: &Receiver<LineResult>) -> Result<(), RunError> {
        loop {
            match result_rx.try_recv() {
                Ok(result) => self.accept(result)?,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(RunError::WorkerDisconnected),
            }
        }
    }

    fn accept(&mut self, result: LineResult) -> Result<(), RunError> {
        self.inflight = self.inflight.saturating_sub(1);
        self.pending.insert(result.seq, result);
        while let Some(ready) = self.pending.remove(&self.next_seq) {
            self.next_seq += 1;
            self.settle(ready)?;
        }
        Ok(())
    }

    fn settle(&mut self, result: LineResult) -> Result<(), RunError> {
        let outcome = result.outcome.map_err(|source| RunError::Tokenizer {
            line: result.line,
            source,
        })?;
        match outcome {
            DocumentOutcome::Chunked { doc_id, records } => {
                let written = self.write_records(&records)?;
                self.summary.documents += 1;
                self.summary.chunks += written;
                tracing::debug!(line = result.line, %doc_id, chunks = written, "document written");
            }
            DocumentOutcome::Skipped(reason) => {
                self.summary.skipped += 1;
                tracing::warn!(line = result.line, error = %reason, "skipping document");
            }
        }

        let seen = self.summary.documents + self.summary.skipped;
        if self.progress_every > 0 && seen % self.progress_every == 0 {
            tracing::info!(
                documents = self.summary.documents,
                skipped = self.summary.skipped,
                chunks = self.summary.chunks,
                "progress"
            );
        }
        Ok(())
    }

    fn write_records(&mut self, records: &[ChunkRecord]) -> Result<usize, RunError> {
        for record in records {
            serde_json::to_writer(&mut *self.writer, record)?;
            self.writer.write_all(b"\n")?;
        }
        Ok(records.len())
    }

    fn finish(self) -> Result<RunSummary, RunError> {
        self.writer.flush()?;
        let summary = self.summary;
        tracing::info!(
            documents = summary.documents,
            skipped = summary.skipped,
            chunks = summary.chunks,
            "chunking complete"
        );
        Ok(summary)
    }
}

fn worker_loop<T: Tokenizer>(
    worker_id: usize,
    receiver: Receiver<LineTask>,
    sender: Sender<LineResult>,
    chunker: &Chunker<T>,
    namespace: u64,
) {
    for task in receiver.iter() {
        tracing::trace!(worker_id, line = task.line, "chunking document");
        let outcome = chunker.process_line(task.line, &task.raw, namespace);
        let result = LineResult {
            seq: task.seq,
            line: task.line,
            outcome,
        };
        if sender.send(result).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkerConfig, ChunkerSettings};
    use crate::tokenizer::CharTokenizer;
    use pretty_assertions::assert_eq;

    const PARAGRAPH: &str = "The harbour town grew around a sheltered bay used by fishing fleets for centuries.";

    fn chunker() -> Chunker<CharTokenizer> {
        let config = ChunkerConfig::new(ChunkerSettings {
            max_chunk_tokens: 60,
            chunk_overlap: 10,
            min_merge_tokens: 20,
            min_tail_tokens: 10,
            ..ChunkerSettings::default()
        })
        .expect("valid test config");
        Chunker::new(config, CharTokenizer)
    }

    fn input(lines: usize) -> String {
        let mut buf = String::new();
        for idx in 0..lines {
            let line = serde_json::json!({
                "text": format!("<body><h2>Part {idx}</h2><p>{PARAGRAPH}</p></body>"),
                "example_id": idx,
            });
            buf.push_str(&line.to_string());
            buf.push('\n');
        }
        buf
    }

    fn run_with(input: &str, options: RunOptions) -> (RunSummary, Vec<ChunkRecord>) {
        let mut out = Vec::new();
        let summary = run(input.as_bytes(), &mut out, &chunker(), &options).unwrap();
        let records = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (summary, records)
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        let text = format!("\n{{broken\n{}   \n", input(2));
        let (summary, records) = run_with(&text, RunOptions::default());
        assert_eq!(
            summary,
            RunSummary {
                documents: 2,
                skipped: 1,
                chunks: records.len(),
            }
        );
        assert_eq!(records[0].metadata.doc_id, "0");
        assert_eq!(records[0].metadata.chunk_id, 3 * DEFAULT_ID_NAMESPACE);
    }

    #[test]
    fn output_order_is_independent_of_worker_count() {
        let text = input(25);
        let (_, single) = run_with(&text, RunOptions::default());
        let (summary, pooled) = run_with(
            &text,
            RunOptions {
                workers: 4,
                ..RunOptions::default()
            },
        );
        assert_eq!(summary.documents, 25);
        assert_eq!(single, pooled);
    }

    #[test]
    fn zero_namespace_is_rejected_before_reading() {
        let mut out = Vec::new();
        let err = run(
            input(1).as_bytes(),
            &mut out,
            &chunker(),
            &RunOptions {
                id_namespace: 0,
                ..RunOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::ZeroNamespace)));
        assert!(out.is_empty());
    }
}
