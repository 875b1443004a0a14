use pretty_assertions::assert_eq;

use wiki_parser::{extract_blocks, extract_text};

#[test]
fn fixtures_match_expected_output() {
    let cases = [
        (
            "bodycontent-fallback",
            include_str!("fixtures/html/bodycontent-fallback.html"),
            include_str!("fixtures/expected/bodycontent-fallback.txt"),
        ),
        (
            "lead-with-infobox",
            include_str!("fixtures/html/lead-with-infobox.html"),
            include_str!("fixtures/expected/lead-with-infobox.txt"),
        ),
        (
            "no-structured-nodes",
            include_str!("fixtures/html/no-structured-nodes.html"),
            include_str!("fixtures/expected/no-structured-nodes.txt"),
        ),
        (
            "references-and-navbox",
            include_str!("fixtures/html/references-and-navbox.html"),
            include_str!("fixtures/expected/references-and-navbox.txt"),
        ),
        (
            "sections-and-list",
            include_str!("fixtures/html/sections-and-list.html"),
            include_str!("fixtures/expected/sections-and-list.txt"),
        ),
        (
            "suppressed-sections",
            include_str!("fixtures/html/suppressed-sections.html"),
            include_str!("fixtures/expected/suppressed-sections.txt"),
        ),
        (
            "toc-hatnote-and-thumb",
            include_str!("fixtures/html/toc-hatnote-and-thumb.html"),
            include_str!("fixtures/expected/toc-hatnote-and-thumb.txt"),
        ),
    ];

    for (name, html, expected) in cases {
        let actual = extract_text(html);
        assert_eq!(
            actual,
            expected.trim_end_matches('\n'),
            "fixture mismatch: {name}"
        );
    }
}

#[test]
fn edit_links_never_reach_heading_paths() {
    let blocks = extract_blocks(include_str!("fixtures/html/sections-and-list.html"));
    let paths: Vec<String> = blocks.iter().map(|block| block.joined_path()).collect();
    assert_eq!(
        paths,
        vec![
            "Lighthouse",
            "Lighthouse > History",
            "Lighthouse > History > Ancient lighthouses",
            "Lighthouse > History > Ancient lighthouses",
            "Lighthouse > Construction",
        ]
    );
}

#[test]
fn suppressed_sections_resume_at_next_sibling_heading() {
    let blocks = extract_blocks(include_str!("fixtures/html/suppressed-sections.html"));
    let paths: Vec<String> = blocks.iter().map(|block| block.joined_path()).collect();
    assert_eq!(
        paths,
        vec![
            "Tide mill",
            "Tide mill > Operation",
            "Tide mill > Preservation",
            "Tide mill > Preservation > Museums",
        ]
    );
    assert!(blocks.iter().all(|block| !block.text.contains("Eling")));
}
