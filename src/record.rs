//! Chunk records written to the output JSONL stream.

use crc32fast::Hasher as Crc32;
use serde::{Deserialize, Serialize};

use crate::tokenizer::Tokenizer;

/// Characters of chunk text folded into the record hash.
const HASH_PREFIX_CHARS: usize = 50;

/// Per-chunk metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Document identifier shared by every chunk of a document.
    pub doc_id: String,
    /// Namespaced, per-document monotonic chunk identifier.
    pub chunk_id: u64,
    /// Heading path of the section the chunk was cut from.
    pub section_path: String,
    /// Token count of the display text.
    pub tokens: usize,
    /// Engine and configuration tag.
    pub parser: String,
    /// Origin reference of the document.
    pub source: String,
    /// CRC32 of `doc_id|chunk_id|prefix`, lower-case hex.
    pub hash: String,
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Embedding text, optionally prefixed with the section path.
    pub text: String,
    /// Chunk text exactly as cut from the section.
    pub original_text: String,
    /// Deterministic metadata.
    pub metadata: ChunkMetadata,
}

/// Builds records for the chunks of a single document.
pub struct RecordAssembler<'a, T: Tokenizer + ?Sized> {
    tokenizer: &'a T,
    doc_id: &'a str,
    source: &'a str,
    parser: &'a str,
    inject_context: bool,
}

impl<'a, T: Tokenizer + ?Sized> RecordAssembler<'a, T> {
    /// Binds the assembler to one document.
    pub fn new(
        tokenizer: &'a T,
        doc_id: &'a str,
        source: &'a str,
        parser: &'a str,
        inject_context: bool,
    ) -> Self {
        Self {
            tokenizer,
            doc_id,
            source,
            parser,
            inject_context,
        }
    }

    /// Produces the record for one windowed chunk.
    pub fn assemble(&self, chunk_id: u64, section_path: &str, chunk_text: String) -> ChunkRecord {
        let tokens = self.tokenizer.count(&chunk_text);
        let text = if self.inject_context {
            embedding_text(section_path, &chunk_text)
        } else {
            chunk_text.clone()
        };
        let hash = chunk_hash(self.doc_id, chunk_id, &chunk_text);
        ChunkRecord {
            text,
            original_text: chunk_text,
            metadata: ChunkMetadata {
                doc_id: self.doc_id.to_string(),
                chunk_id,
                section_path: section_path.to_string(),
                tokens,
                parser: self.parser.to_string(),
                source: self.source.to_string(),
                hash,
            },
        }
    }
}

/// Context-injected embedding text.
pub fn embedding_text(section_path: &str, chunk_text: &str) -> String {
    format!("Context: {section_path}\nContent: {chunk_text}")
}

/// Derived content hash over the document id, chunk id and text prefix.
pub fn chunk_hash(doc_id: &str, chunk_id: u64, chunk_text: &str) -> String {
    let prefix_end = chunk_text
        .char_indices()
        .nth(HASH_PREFIX_CHARS)
        .map_or(chunk_text.len(), |(idx, _)| idx);
    let mut hasher = Crc32::new();
    hasher.update(doc_id.as_bytes());
    hasher.update(b"|");
    hasher.update(chunk_id.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(chunk_text[..prefix_end].as_bytes());
    format!("{:08x}", hasher.finalize())
}
