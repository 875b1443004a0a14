//! Boilerplate cleaning and prose acceptance heuristics.
//!
//! Every rule lives in a named table entry so it can be tested and swapped on
//! its own. Blocks are checked against the garbage triggers, cleaned and
//! checked again, then measured against the acceptance heuristics; the first
//! rule that fires decides the rejection.

use regex::Regex;
use wiki_parser::normalize_whitespace;

use crate::config::ChunkerConfig;

/// Substring patterns that mark a whole block as site boilerplate.
const GARBAGE_TRIGGERS: &[(&str, &str)] = &[
    (
        "maintenance_banner",
        r"(?i)this (?:article|section) (?:has multiple issues|needs additional citations|relies (?:largely|too much|excessively) on|does not cite any sources|may (?:require|need) cleanup|is an orphan|possibly contains original research)",
    ),
    ("jump_link", r"(?i)jump to (?:navigation|search|content)"),
    (
        "copyright_notice",
        r"(?i)text is available under the creative commons|additional terms may apply",
    ),
    (
        "edit_history",
        r"(?i)this page was last (?:edited|modified) on|retrieved from\s+\W?https?://",
    ),
    (
        "citation_disclaimer",
        r"(?i)unsourced material may be challenged and removed|please help (?:improve|by adding)",
    ),
];

/// Fragments removed from otherwise acceptable text, applied in order.
const STRIP_PATTERNS: &[&str] = &[
    r"(?i)\(\s*hide\s*\)",
    r"(?i)\(\s*learn how and when[^)]*\)",
    r"\[\s*\d+\s*\]",
];

const SECTION_NUMBER: &str = r"\d\.\d";

/// Named acceptance rule over a cleaned block.
struct Heuristic {
    name: &'static str,
    rejects: fn(&BlockStats, &str, usize) -> bool,
}

const HEURISTICS: &[Heuristic] = &[
    Heuristic {
        name: "too_short",
        rejects: too_short,
    },
    Heuristic {
        name: "bilingual_stub",
        rejects: bilingual_stub,
    },
    Heuristic {
        name: "too_few_words",
        rejects: too_few_words,
    },
    Heuristic {
        name: "section_numbering",
        rejects: section_numbering,
    },
    Heuristic {
        name: "symbol_dense",
        rejects: symbol_dense,
    },
    Heuristic {
        name: "link_list",
        rejects: link_list,
    },
];

fn too_short(stats: &BlockStats, _: &str, _: usize) -> bool {
    stats.chars < 5
}

fn bilingual_stub(stats: &BlockStats, text: &str, _: usize) -> bool {
    stats.chars < 100 && text.contains("中文") && text.contains("English")
}

fn too_few_words(stats: &BlockStats, _: &str, min_words: usize) -> bool {
    stats.words < min_words
}

fn section_numbering(stats: &BlockStats, _: &str, _: usize) -> bool {
    stats.section_numbers >= 3 && stats.words < 50
}

fn symbol_dense(stats: &BlockStats, _: &str, _: usize) -> bool {
    (stats.alphabetic as f64) < 0.55 * stats.chars as f64
}

fn link_list(stats: &BlockStats, _: &str, _: usize) -> bool {
    stats.short_words as f64 > 0.35 * stats.words as f64
}

/// Character and word statistics the acceptance heuristics are defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStats {
    /// Unicode scalar values, whitespace included.
    pub chars: usize,
    /// Alphabetic scalar values.
    pub alphabetic: usize,
    /// Whitespace-separated words.
    pub words: usize,
    /// Words of at most two characters.
    pub short_words: usize,
    /// Occurrences of a `digit.digit` pattern.
    pub section_numbers: usize,
}

/// Outcome of running a block through the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Cleaned text judged to be prose.
    Accepted(String),
    /// Name of the trigger or heuristic that discarded the block.
    Rejected(&'static str),
}

/// Semantic filter that cleans boilerplate and rejects non-prose blocks.
pub struct SemanticFilter {
    min_words: usize,
    triggers: Vec<(&'static str, Regex)>,
    strip: Vec<Regex>,
    section_number: Regex,
}

impl SemanticFilter {
    /// Builds a filter with the given word-count floor.
    pub fn new(min_words: usize) -> Self {
        let triggers = GARBAGE_TRIGGERS
            .iter()
            .map(|(name, pattern)| (*name, Regex::new(pattern).expect("valid garbage trigger")))
            .collect();
        let strip = STRIP_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).expect("valid strip pattern"))
            .collect();
        Self {
            min_words,
            triggers,
            strip,
            section_number: Regex::new(SECTION_NUMBER).expect("valid section number pattern"),
        }
    }

    /// Builds a filter from the chunking configuration.
    pub fn from_config(config: &ChunkerConfig) -> Self {
        Self::new(config.min_words_per_block())
    }

    /// Cleaned text when the block is accepted, `None` otherwise.
    pub fn apply(&self, text: &str) -> Option<String> {
        match self.evaluate(text) {
            Verdict::Accepted(cleaned) => Some(cleaned),
            Verdict::Rejected(_) => None,
        }
    }

    /// Runs triggers, cleaning and heuristics, reporting which rule fired.
    ///
    /// Triggers are checked before and after cleaning, since stripping a
    /// marker can join a boilerplate phrase back together.
    pub fn evaluate(&self, text: &str) -> Verdict {
        if let Some(name) = self.trigger(text) {
            return Verdict::Rejected(name);
        }
        let cleaned = self.clean(text);
        if let Some(name) = self.trigger(&cleaned) {
            return Verdict::Rejected(name);
        }
        let stats = self.measure(&cleaned);
        match HEURISTICS
            .iter()
            .find(|rule| (rule.rejects)(&stats, &cleaned, self.min_words))
        {
            Some(rule) => Verdict::Rejected(rule.name),
            None => Verdict::Accepted(cleaned),
        }
    }

    fn trigger(&self, text: &str) -> Option<&'static str> {
        self.triggers
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(name, _)| *name)
    }

    /// Removes `(hide)` markers, "Learn how and when" parentheticals and numeric
    /// footnote markers, then collapses whitespace.
    pub fn clean(&self, text: &str) -> String {
        let mut current = normalize_whitespace(text);
        loop {
            let mut next = current.clone();
            for re in &self.strip {
                next = re.replace_all(&next, "").into_owned();
            }
            let next = normalize_whitespace(&next);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// Computes the statistics used by the acceptance heuristics.
    pub fn measure(&self, text: &str) -> BlockStats {
        let mut words = 0usize;
        let mut short_words = 0usize;
        for word in text.split_whitespace() {
            words += 1;
            if word.chars().count() <= 2 {
                short_words += 1;
            }
        }
        BlockStats {
            chars: text.chars().count(),
            alphabetic: text.chars().filter(|ch| ch.is_alphabetic()).count(),
            words,
            short_words,
            section_numbers: self.section_number.find_iter(text).count(),
        }
    }
}

impl Default for SemanticFilter {
    fn default() -> Self {
        Self::from_config(&ChunkerConfig::default())
    }
}
