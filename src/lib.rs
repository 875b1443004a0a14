#![warn(missing_docs)]
//! Structure-aware chunking of HTML documents into retrieval-ready records.
//!
//! Documents flow through the structural parser in `wiki-parser`, then the
//! semantic filter, the section merger, the token windower and the record
//! assembler. [`Chunker`] runs that pipeline for one document and [`run`]
//! drives it over a JSONL stream.

pub mod chunker;
pub mod config;
pub mod filter;
pub mod input;
pub mod merger;
pub mod record;
pub mod runner;
pub mod tokenizer;
pub mod window;

pub use chunker::{Chunker, DocumentError, DocumentOutcome};
pub use config::{
    ChunkerConfig, ChunkerSettings, Cli, ConfigError, TokenizerKind, DEFAULT_ID_NAMESPACE,
};
pub use filter::{BlockStats, SemanticFilter, Verdict};
pub use input::InputRecord;
pub use merger::{merge_sections, Section, ROOT_CONTEXT};
pub use record::{ChunkMetadata, ChunkRecord, RecordAssembler};
pub use runner::{run, RunError, RunOptions, RunSummary};
pub use tokenizer::{CharTokenizer, Cl100kTokenizer, TokenId, Tokenizer, TokenizerError};
pub use window::{plan_windows, split_windows};
pub use wiki_parser::{extract_blocks, RawBlock};
