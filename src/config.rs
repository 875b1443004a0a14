//! Chunking configuration and the command-line surface that builds it.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default chunk-id namespace width per document.
pub const DEFAULT_ID_NAMESPACE: u64 = 100_000;

/// Raw, unvalidated chunking options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerSettings {
    /// Window size ceiling in tokens.
    pub max_chunk_tokens: usize,
    /// Tokens shared by consecutive windows (absolute count, not a ratio).
    pub chunk_overlap: usize,
    /// Sections under this many tokens are merged with their neighbours.
    pub min_merge_tokens: usize,
    /// Trailing windows under this many tokens fold into the previous window.
    pub min_tail_tokens: usize,
    /// Blocks with fewer words are rejected by the semantic filter.
    pub min_words_per_block: usize,
    /// Prefix embedding text with the section path.
    pub inject_context: bool,
}

impl Default for ChunkerSettings {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 512,
            chunk_overlap: 50,
            min_merge_tokens: 50,
            min_tail_tokens: 30,
            min_words_per_block: 8,
            inject_context: true,
        }
    }
}

/// Invalid combinations of chunking options, rejected before any document is read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `max_chunk_tokens` was zero.
    #[error("max_chunk_tokens must be positive")]
    ZeroWindow,
    /// Overlap leaves no forward progress between windows.
    #[error("chunk_overlap ({overlap}) must be smaller than max_chunk_tokens ({max})")]
    NonPositiveStride {
        /// Configured window size.
        max: usize,
        /// Configured overlap.
        overlap: usize,
    },
    /// A tail threshold that could swallow entire windows.
    #[error("min_tail_tokens ({min_tail}) must be smaller than max_chunk_tokens ({max})")]
    TailNotBelowWindow {
        /// Configured window size.
        max: usize,
        /// Configured tail threshold.
        min_tail: usize,
    },
    /// A merge threshold larger than a window.
    #[error("min_merge_tokens ({min_merge}) must not exceed max_chunk_tokens ({max})")]
    MergeAboveWindow {
        /// Configured window size.
        max: usize,
        /// Configured merge threshold.
        min_merge: usize,
    },
    /// The per-document chunk-id namespace was zero.
    #[error("id namespace must be positive")]
    ZeroNamespace,
}

/// Validated, immutable chunking configuration.
///
/// The default value carries the default settings, which always validate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkerConfig {
    settings: ChunkerSettings,
}

impl ChunkerConfig {
    /// Validates `settings` and freezes them.
    pub fn new(settings: ChunkerSettings) -> Result<Self, ConfigError> {
        let max = settings.max_chunk_tokens;
        if max == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if settings.chunk_overlap >= max {
            return Err(ConfigError::NonPositiveStride {
                max,
                overlap: settings.chunk_overlap,
            });
        }
        if settings.min_tail_tokens >= max {
            return Err(ConfigError::TailNotBelowWindow {
                max,
                min_tail: settings.min_tail_tokens,
            });
        }
        if settings.min_merge_tokens > max {
            return Err(ConfigError::MergeAboveWindow {
                max,
                min_merge: settings.min_merge_tokens,
            });
        }
        Ok(Self { settings })
    }

    /// Window size ceiling in tokens.
    pub fn max_chunk_tokens(&self) -> usize {
        self.settings.max_chunk_tokens
    }

    /// Tokens shared by consecutive windows.
    pub fn chunk_overlap(&self) -> usize {
        self.settings.chunk_overlap
    }

    /// Distance between window starts; always at least one.
    pub fn stride(&self) -> usize {
        self.settings.max_chunk_tokens - self.settings.chunk_overlap
    }

    /// Merge threshold in tokens.
    pub fn min_merge_tokens(&self) -> usize {
        self.settings.min_merge_tokens
    }

    /// Tail-merge threshold in tokens.
    pub fn min_tail_tokens(&self) -> usize {
        self.settings.min_tail_tokens
    }

    /// Word-count floor for the semantic filter.
    pub fn min_words_per_block(&self) -> usize {
        self.settings.min_words_per_block
    }

    /// Whether embedding text carries the `Context:` prefix.
    pub fn inject_context(&self) -> bool {
        self.settings.inject_context
    }

    /// Underlying settings.
    pub fn settings(&self) -> &ChunkerSettings {
        &self.settings
    }

    /// Version tag written to every record's `parser` field.
    pub fn parser_tag(&self, tokenizer: &str) -> String {
        format!(
            "fastchunk-structural/{}:{}:w{}o{}{}",
            env!("CARGO_PKG_VERSION"),
            tokenizer,
            self.settings.max_chunk_tokens,
            self.settings.chunk_overlap,
            if self.settings.inject_context { "+ctx" } else { "" }
        )
    }
}

/// Tokenizer backends selectable from the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum TokenizerKind {
    /// `cl100k_base` byte-pair encoding.
    Cl100k,
    /// One token per character.
    Chars,
}

/// Command-line interface of the `fastchunk` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fastchunk",
    about = "Structure-aware chunking of HTML documents into retrieval-ready JSONL"
)]
pub struct Cli {
    /// JSONL file with one document per line (`text` or `document_text`)
    #[arg(long, env = "FASTCHUNK_INPUT", default_value = "embedding_samples.jsonl")]
    pub input: PathBuf,

    /// JSONL file receiving one chunk record per line
    #[arg(long, env = "FASTCHUNK_OUTPUT", default_value = "chunks_all.jsonl")]
    pub output: PathBuf,

    /// Maximum tokens per window
    #[arg(long, env = "FASTCHUNK_MAX_TOKENS", default_value_t = 512)]
    pub max_tokens: usize,

    /// Tokens shared by consecutive windows
    #[arg(long, env = "FASTCHUNK_OVERLAP", default_value_t = 50)]
    pub overlap: usize,

    /// Sections under this many tokens merge into their neighbours
    #[arg(long, env = "FASTCHUNK_MIN_MERGE_TOKENS", default_value_t = 50)]
    pub min_merge_tokens: usize,

    /// Trailing windows under this many tokens fold into the previous one
    #[arg(long, env = "FASTCHUNK_MIN_TAIL_TOKENS", default_value_t = 30)]
    pub min_tail_tokens: usize,

    /// Minimum words for a block to count as prose
    #[arg(long, env = "FASTCHUNK_MIN_WORDS", default_value_t = 8)]
    pub min_words: usize,

    /// Emit bare chunk text as embedding text (no `Context:` prefix)
    #[arg(long, env = "FASTCHUNK_NO_CONTEXT", default_value_t = false)]
    pub no_context: bool,

    /// Worker threads chunking documents in parallel
    #[arg(long, env = "FASTCHUNK_WORKERS", default_value_t = 1)]
    pub workers: usize,

    /// Chunk-id namespace width per document (chunk ids start at line * width)
    #[arg(long, env = "FASTCHUNK_ID_NAMESPACE", default_value_t = DEFAULT_ID_NAMESPACE)]
    pub id_namespace: u64,

    /// Log progress every N documents (0 disables)
    #[arg(long, env = "FASTCHUNK_PROGRESS_EVERY", default_value_t = 10)]
    pub progress_every: usize,

    /// Tokenizer backend
    #[arg(long, env = "FASTCHUNK_TOKENIZER", value_enum, default_value = "cl100k")]
    pub tokenizer: TokenizerKind,
}

impl Cli {
    /// Converts the parsed flags into a validated chunking configuration.
    pub fn build_config(&self) -> Result<ChunkerConfig, ConfigError> {
        ChunkerConfig::new(ChunkerSettings {
            max_chunk_tokens: self.max_tokens,
            chunk_overlap: self.overlap,
            min_merge_tokens: self.min_merge_tokens,
            min_tail_tokens: self.min_tail_tokens,
            min_words_per_block: self.min_words,
            inject_context: !self.no_context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = ChunkerConfig::new(ChunkerSettings::default()).expect("valid defaults");
        assert_eq!(config, ChunkerConfig::default());
        assert_eq!(config.stride(), 462);
    }

    #[test]
    fn rejects_overlap_without_progress() {
        let settings = ChunkerSettings {
            max_chunk_tokens: 100,
            chunk_overlap: 100,
            ..ChunkerSettings::default()
        };
        assert_eq!(
            ChunkerConfig::new(settings),
            Err(ConfigError::NonPositiveStride {
                max: 100,
                overlap: 100
            })
        );
    }

    #[test]
    fn rejects_tail_threshold_at_window_size() {
        let settings = ChunkerSettings {
            max_chunk_tokens: 40,
            chunk_overlap: 10,
            min_merge_tokens: 20,
            min_tail_tokens: 40,
            ..ChunkerSettings::default()
        };
        assert_eq!(
            ChunkerConfig::new(settings),
            Err(ConfigError::TailNotBelowWindow {
                max: 40,
                min_tail: 40
            })
        );
    }

    #[test]
    fn rejects_zero_window() {
        let settings = ChunkerSettings {
            max_chunk_tokens: 0,
            ..ChunkerSettings::default()
        };
        assert_eq!(ChunkerConfig::new(settings), Err(ConfigError::ZeroWindow));
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: ChunkerSettings =
            serde_json::from_str(r#"{"max_chunk_tokens": 256, "inject_context": false}"#)
                .expect("parse settings");
        assert_eq!(settings.max_chunk_tokens, 256);
        assert_eq!(settings.chunk_overlap, 50);
        assert!(!settings.inject_context);
    }

    #[test]
    fn cli_builds_config() {
        let cli = Cli::parse_from([
            "fastchunk",
            "--max-tokens",
            "128",
            "--overlap",
            "16",
            "--no-context",
        ]);
        let config = cli.build_config().expect("valid cli config");
        assert_eq!(config.max_chunk_tokens(), 128);
        assert_eq!(config.stride(), 112);
        assert!(!config.inject_context());
        assert_eq!(cli.tokenizer, TokenizerKind::Cl100k);
    }

    #[test]
    fn parser_tag_reflects_geometry() {
        let tag = ChunkerConfig::default().parser_tag("cl100k");
        assert!(tag.starts_with("fastchunk-structural/"));
        assert!(tag.ends_with(":cl100k:w512o50+ctx"));
    }
}
