//! Per-document chunking engine: parse, filter, merge, window, assemble.

use thiserror::Error;

use crate::config::ChunkerConfig;
use crate::filter::{SemanticFilter, Verdict};
use crate::input::InputRecord;
use crate::merger::{merge_sections, Section};
use crate::record::{ChunkRecord, RecordAssembler};
use crate::tokenizer::{Tokenizer, TokenizerError};
use crate::window::split_windows;

/// Reasons a single document is skipped without affecting the rest of a run.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The input line is not a valid record.
    #[error("line {line}: malformed record: {source}")]
    MalformedRecord {
        /// 1-based line index.
        line: usize,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The document produced more chunks than its id namespace holds.
    #[error("line {line}: document {doc_id} produced {chunks} chunks, namespace holds {namespace}")]
    NamespaceExhausted {
        /// 1-based line index.
        line: usize,
        /// Derived document id.
        doc_id: String,
        /// Chunks the document produced.
        chunks: usize,
        /// Namespace width.
        namespace: u64,
    },
    /// The line index times the namespace width does not fit a chunk id.
    #[error("line {line}: chunk id base overflows with namespace {namespace}")]
    IdBaseOverflow {
        /// 1-based line index.
        line: usize,
        /// Namespace width.
        namespace: u64,
    },
}

/// Result of processing one input line.
#[derive(Debug)]
pub enum DocumentOutcome {
    /// The document was chunked; `records` may be empty.
    Chunked {
        /// Derived document id.
        doc_id: String,
        /// Records in emission order.
        records: Vec<ChunkRecord>,
    },
    /// The document was skipped whole.
    Skipped(DocumentError),
}

/// Chunking engine bound to one configuration and tokenizer.
pub struct Chunker<T: Tokenizer> {
    config: ChunkerConfig,
    filter: SemanticFilter,
    tokenizer: T,
    parser_tag: String,
}

impl<T: Tokenizer> Chunker<T> {
    /// Builds an engine from a validated configuration.
    pub fn new(config: ChunkerConfig, tokenizer: T) -> Self {
        let filter = SemanticFilter::from_config(&config);
        let parser_tag = config.parser_tag(tokenizer.name());
        Self {
            config,
            filter,
            tokenizer,
            parser_tag,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Tokenizer used for merging, windowing and counting.
    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// Tag written to each record's `parser` field.
    pub fn parser_tag(&self) -> &str {
        &self.parser_tag
    }

    /// Filtered section candidates of a document, before merging.
    pub fn sections(&self, markup: &str, doc_id: &str) -> Vec<Section> {
        wiki_parser::extract_blocks(markup)
            .into_iter()
            .filter_map(|block| match self.filter.evaluate(&block.text) {
                Verdict::Accepted(text) => Some(Section::new(&block.context_path, text)),
                Verdict::Rejected(rule) => {
                    tracing::debug!(doc_id, rule, path = %block.joined_path(), "block rejected");
                    None
                }
            })
            .collect()
    }

    /// Chunks one document's markup.
    ///
    /// Chunk ids run from `id_base` upward in emission order; the caller keeps
    /// `id_base` plus the chunk count within `u64`.
    pub fn chunk_document(
        &self,
        markup: &str,
        doc_id: &str,
        source: &str,
        id_base: u64,
    ) -> Result<Vec<ChunkRecord>, TokenizerError> {
        let candidates = self.sections(markup, doc_id);
        let sections = merge_sections(candidates, &self.tokenizer, &self.config);
        let assembler = RecordAssembler::new(
            &self.tokenizer,
            doc_id,
            source,
            &self.parser_tag,
            self.config.inject_context(),
        );

        let mut records = Vec::new();
        for section in &sections {
            for window in split_windows(&section.text, &self.tokenizer, &self.config)? {
                let chunk_id = id_base + records.len() as u64;
                records.push(assembler.assemble(chunk_id, &section.context_path, window));
            }
        }
        tracing::debug!(
            doc_id,
            sections = sections.len(),
            chunks = records.len(),
            "document chunked"
        );
        Ok(records)
    }

    /// Parses and chunks the input line at 1-based index `line`.
    ///
    /// Chunk ids start at `line * namespace`. Only tokenizer failures are
    /// returned as errors; everything else that stops a document is reported
    /// as [`DocumentOutcome::Skipped`].
    pub fn process_line(
        &self,
        line: usize,
        raw: &str,
        namespace: u64,
    ) -> Result<DocumentOutcome, TokenizerError> {
        let record = match InputRecord::from_line(raw) {
            Ok(record) => record,
            Err(source) => {
                return Ok(DocumentOutcome::Skipped(DocumentError::MalformedRecord {
                    line,
                    source,
                }))
            }
        };
        let doc_id = record.doc_id(line);

        let line_no = line as u64;
        let Some(id_base) = line_no
            .checked_add(1)
            .and_then(|next| next.checked_mul(namespace))
            .map(|end| end - namespace)
        else {
            return Ok(DocumentOutcome::Skipped(DocumentError::IdBaseOverflow {
                line,
                namespace,
            }));
        };

        let records = self.chunk_document(
            record.markup(),
            &doc_id,
            record.source_or(&doc_id),
            id_base,
        )?;
        if records.len() as u64 > namespace {
            return Ok(DocumentOutcome::Skipped(DocumentError::NamespaceExhausted {
                line,
                doc_id,
                chunks: records.len(),
                namespace,
            }));
        }
        Ok(DocumentOutcome::Chunked { doc_id, records })
    }
}
