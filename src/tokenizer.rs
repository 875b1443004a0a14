//! Token encoding seam used by the merger, windower and record assembler.

use thiserror::Error;
use tiktoken_rs::CoreBPE;

/// Integer token identifier.
pub type TokenId = u32;

/// Errors surfaced by tokenizer backends.
///
/// Any of these aborts the run.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// The backend could not be initialised.
    #[error("tokenizer unavailable: {0}")]
    Unavailable(String),
    /// A token sequence holds ids the backend does not know.
    #[error("failed to decode {len} token(s): {reason}")]
    Decode {
        /// Number of ids in the rejected sequence.
        len: usize,
        /// Backend-provided failure description.
        reason: String,
    },
}

/// Reversible text <-> token id conversion.
pub trait Tokenizer: Send + Sync {
    /// Encodes text into token ids.
    fn encode(&self, text: &str) -> Vec<TokenId>;

    /// Decodes a contiguous run of token ids back into text.
    ///
    /// Any run cut from an [`encode`](Tokenizer::encode) result decodes, even
    /// when its ends split a character; the partial bytes become U+FFFD.
    fn decode(&self, ids: &[TokenId]) -> Result<String, TokenizerError>;

    /// Number of tokens `text` encodes to.
    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }

    /// Short label recorded in the output `parser` tag.
    fn name(&self) -> &'static str;
}

/// Ordinary `cl100k_base` ranks are `0..ORDINARY_RANKS`.
const ORDINARY_RANKS: TokenId = 100_256;

/// Special token ranks registered by `tiktoken_rs::cl100k_base`.
const SPECIAL_RANKS: &[TokenId] = &[100_257, 100_258, 100_259, 100_260, 100_276];

/// `cl100k_base` byte-pair encoding backed by `tiktoken-rs`.
pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    /// Loads the bundled `cl100k_base` ranks.
    pub fn new() -> Result<Self, TokenizerError> {
        let bpe =
            tiktoken_rs::cl100k_base().map_err(|err| TokenizerError::Unavailable(err.to_string()))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn encode(&self, text: &str) -> Vec<TokenId> {
        self.bpe
            .encode_with_special_tokens(text)
            .into_iter()
            .map(|id| id as TokenId)
            .collect()
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String, TokenizerError> {
        if let Some(&unknown) = ids
            .iter()
            .find(|&&id| id >= ORDINARY_RANKS && !SPECIAL_RANKS.contains(&id))
        {
            return Err(TokenizerError::Decode {
                len: ids.len(),
                reason: format!("{unknown} is not a cl100k_base rank"),
            });
        }
        let bytes: Vec<u8> = self
            .bpe
            ._decode_native_and_split(ids.to_vec())
            .flatten()
            .collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn name(&self) -> &'static str {
        "cl100k"
    }
}

/// One token per Unicode scalar value.
///
/// Every slice of ids decodes, which makes window arithmetic easy to reason
/// about in tests and offline dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Vec<TokenId> {
        text.chars().map(TokenId::from).collect()
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String, TokenizerError> {
        ids.iter()
            .map(|&id| {
                char::from_u32(id).ok_or_else(|| TokenizerError::Decode {
                    len: ids.len(),
                    reason: format!("{id:#x} is not a Unicode scalar value"),
                })
            })
            .collect()
    }

    fn count(&self, text: &str) -> usize {
        text.chars().count()
    }

    fn name(&self) -> &'static str {
        "chars"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_tokenizer_round_trips_any_slice() {
        let tokenizer = CharTokenizer;
        let ids = tokenizer.encode("héllo 中文");
        assert_eq!(ids.len(), 8);
        assert_eq!(tokenizer.decode(&ids[1..4]).unwrap(), "éll");
        assert_eq!(tokenizer.count("héllo 中文"), 8);
    }

    #[test]
    fn char_tokenizer_rejects_surrogates() {
        let err = CharTokenizer.decode(&[0x61, 0xD800]).unwrap_err();
        assert!(matches!(err, TokenizerError::Decode { len: 2, .. }));
    }

    #[test]
    fn cl100k_round_trips_ascii_windows() {
        let tokenizer = Cl100kTokenizer::new().expect("bundled ranks");
        let text = "Lighthouses guide ships safely into harbour at night.";
        let ids = tokenizer.encode(text);
        assert!(ids.len() > 5);
        assert_eq!(tokenizer.decode(&ids).unwrap(), text);
        let head = tokenizer.decode(&ids[..3]).unwrap();
        let tail = tokenizer.decode(&ids[3..]).unwrap();
        assert_eq!(format!("{head}{tail}"), text);
    }

    #[test]
    fn cl100k_decodes_slices_that_split_characters() {
        let tokenizer = Cl100kTokenizer::new().expect("bundled ranks");
        let text = "東京の古い港町では漁師たちが毎朝魚を運んでいた。";
        let ids = tokenizer.encode(text);
        assert_eq!(tokenizer.decode(&ids).unwrap(), text);
        let mut saw_split = false;
        for cut in 1..ids.len() {
            let head = tokenizer.decode(&ids[..cut]).unwrap();
            let tail = tokenizer.decode(&ids[cut..]).unwrap();
            if head.ends_with('\u{FFFD}') {
                saw_split = true;
                assert!(tail.starts_with('\u{FFFD}'), "cut {cut}: {tail}");
            } else {
                assert_eq!(format!("{head}{tail}"), text);
            }
        }
        assert!(saw_split, "expected at least one cut inside a character");
    }

    #[test]
    fn cl100k_rejects_unknown_ranks() {
        let tokenizer = Cl100kTokenizer::new().expect("bundled ranks");
        let err = tokenizer.decode(&[9_906, 200_000]).unwrap_err();
        assert!(matches!(err, TokenizerError::Decode { len: 2, .. }));
        assert!(tokenizer.decode(&[100_257]).is_ok());
    }
}
