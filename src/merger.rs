//! Single-pass coalescing of undersized and transitional sections.

use crate::config::ChunkerConfig;
use crate::tokenizer::Tokenizer;

/// Label used for content that appears before the first heading.
pub const ROOT_CONTEXT: &str = "Summary";

/// A run of filtered text sharing one heading path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading chain joined with `" > "`, or [`ROOT_CONTEXT`].
    pub context_path: String,
    /// One or more blocks joined with newlines.
    pub text: String,
}

impl Section {
    /// Builds a section from a heading chain, labelling an empty chain [`ROOT_CONTEXT`].
    pub fn new(context_path: &[String], text: impl Into<String>) -> Self {
        let context_path = if context_path.is_empty() {
            ROOT_CONTEXT.to_string()
        } else {
            context_path.join(" > ")
        };
        Self {
            context_path,
            text: text.into(),
        }
    }
}

/// Merges sections left to right in one pass.
///
/// A section absorbs its successor when both share a context and either the
/// section is still under `min_merge_tokens` or the pair fits in
/// `max_chunk_tokens`. Across a context change only an undersized (or
/// colon-terminated, undersized) section is carried forward, and only when the
/// pair fits; the merged section then takes the later context. Combined size
/// is the sum of both parts' token counts.
pub fn merge_sections<T>(
    candidates: Vec<Section>,
    tokenizer: &T,
    config: &ChunkerConfig,
) -> Vec<Section>
where
    T: Tokenizer + ?Sized,
{
    let min_merge = config.min_merge_tokens();
    let max_tokens = config.max_chunk_tokens();

    let mut merged = Vec::new();
    let mut candidates = candidates.into_iter();
    let Some(mut current) = candidates.next() else {
        return merged;
    };
    let mut current_tokens = tokenizer.count(&current.text);

    for next in candidates {
        let next_tokens = tokenizer.count(&next.text);
        let same_context = current.context_path == next.context_path;
        let is_tiny = current_tokens < min_merge;
        let is_transition = is_tiny && current.text.trim_end().ends_with(':');
        let fits = current_tokens + next_tokens <= max_tokens;

        let should_merge = if same_context {
            is_tiny || fits
        } else {
            (is_transition || is_tiny) && fits
        };

        if should_merge {
            tracing::trace!(
                from = %current.context_path,
                into = %next.context_path,
                current_tokens,
                next_tokens,
                is_transition,
                "merging sections"
            );
            current.text.push('\n');
            current.text.push_str(&next.text);
            if !same_context {
                current.context_path = next.context_path;
            }
            current_tokens = tokenizer.count(&current.text);
        } else {
            merged.push(current);
            current = next;
            current_tokens = next_tokens;
        }
    }

    merged.push(current);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkerSettings;
    use crate::tokenizer::CharTokenizer;
    use pretty_assertions::assert_eq;

    fn config() -> ChunkerConfig {
        ChunkerConfig::new(ChunkerSettings {
            max_chunk_tokens: 100,
            chunk_overlap: 10,
            min_merge_tokens: 20,
            min_tail_tokens: 5,
            ..ChunkerSettings::default()
        })
        .expect("valid test config")
    }

    fn section(path: &str, text: &str) -> Section {
        Section {
            context_path: path.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn labels_headingless_content_as_summary() {
        assert_eq!(Section::new(&[], "lead").context_path, ROOT_CONTEXT);
        let path = vec!["A".to_string(), "B".to_string()];
        assert_eq!(Section::new(&path, "body").context_path, "A > B");
    }

    #[test]
    fn same_context_blocks_fill_up_to_window() {
        let a = "a".repeat(40);
        let b = "b".repeat(40);
        let c = "c".repeat(40);
        let merged = merge_sections(
            vec![section("X", &a), section("X", &b), section("X", &c)],
            &CharTokenizer,
            &config(),
        );
        assert_eq!(
            merged,
            vec![section("X", &format!("{a}\n{b}")), section("X", &c)]
        );
    }

    #[test]
    fn undersized_section_absorbs_same_context_successor_even_when_large() {
        let big = "b".repeat(95);
        let merged = merge_sections(
            vec![section("X", "tiny"), section("X", &big)],
            &CharTokenizer,
            &config(),
        );
        assert_eq!(merged, vec![section("X", &format!("tiny\n{big}"))]);
    }

    #[test]
    fn transition_sentence_moves_into_next_context() {
        let body = "The committee recommended three changes to the charter.";
        let merged = merge_sections(
            vec![section("Reform", "Proposals:"), section("Reform > Charter", body)],
            &CharTokenizer,
            &config(),
        );
        assert_eq!(
            merged,
            vec![section("Reform > Charter", &format!("Proposals:\n{body}"))]
        );
    }

    #[test]
    fn sized_sections_keep_their_own_context() {
        let a = "a".repeat(30);
        let b = "b".repeat(30);
        let merged = merge_sections(
            vec![section("A", &a), section("B", &b)],
            &CharTokenizer,
            &config(),
        );
        assert_eq!(merged, vec![section("A", &a), section("B", &b)]);
    }

    #[test]
    fn undersized_section_stays_when_pair_overflows_across_contexts() {
        let big = "b".repeat(97);
        let merged = merge_sections(
            vec![section("A", "tiny"), section("B", &big)],
            &CharTokenizer,
            &config(),
        );
        assert_eq!(merged, vec![section("A", "tiny"), section("B", &big)]);
    }

    #[test]
    fn empty_input_yields_no_sections() {
        assert!(merge_sections(Vec::new(), &CharTokenizer, &config()).is_empty());
    }
}
