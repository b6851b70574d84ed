//! Whole-pipeline properties: idempotent rendering, block structure that
//! survives a trip through plain text, linear behavior on adversarial
//! input and isolation between extensions.

use std::time::{Duration, Instant};

use gfmark_ast::{Document, NodeType, NodeValue};
use gfmark_core::{Engine, EngineConfig};
use gfmark_parser::{DEFAULT_MAX_NESTING, MarkdownParser, Parser};
use rstest::rstest;

fn block_types(doc: &Document) -> Vec<NodeType> {
    doc.arena
        .descendants(doc.root)
        .map(|id| doc.value(id))
        .filter(|value| value.is_block())
        .map(NodeValue::node_type)
        .collect()
}

mod idempotence {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case::core("# Title\n\n> quote *em*\n\n1. one\n2. two\n\n```rust\nfn main() {}\n```\n")]
    #[case::gfm("- [x] done ~~old~~\n\n| a | b |\n| - | :-: |\n| 1 | www.x.org |\n")]
    #[case::footnotes("Text[^1].\n\n[^1]: Note.\n")]
    fn rendering_twice_is_byte_identical(#[case] input: &str) {
        let mut config = EngineConfig::gfm();
        config.parse.footnotes = true;
        let engine = Engine::new(config).unwrap();
        let doc = engine.parse(input).unwrap();

        assert_eq!(engine.render_html(&doc).unwrap(), engine.render_html(&doc).unwrap());
        assert_eq!(engine.render_xml(&doc).unwrap(), engine.render_xml(&doc).unwrap());
        assert_eq!(engine.render_plaintext(&doc), engine.render_plaintext(&doc));
    }
}

mod round_trip {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case::paragraphs("first *para*\n\nsecond `para`\n")]
    #[case::bullet_list("- a\n- b\n\nafter\n")]
    #[case::ordered_list("1. x\n2. y\n")]
    #[case::nested_list("- a\n  - b\n  - c\n- d\n")]
    #[case::loose_list("- a\n\n- b\n")]
    fn plain_text_keeps_block_structure(#[case] input: &str) {
        let engine = Engine::new(EngineConfig::new()).unwrap();
        let doc = engine.parse(input).unwrap();
        let text = engine.render_plaintext(&doc);
        let reparsed = engine.parse(&text).unwrap();

        assert_eq!(block_types(&reparsed), block_types(&doc), "plain text was {text:?}");
    }
}

mod pathological {
    use super::*;
    use pretty_assertions::assert_eq;

    const LIMIT: Duration = Duration::from_secs(5);

    fn assert_fast(input: &str) -> String {
        let engine = Engine::new(EngineConfig::gfm()).unwrap();
        let start = Instant::now();
        let html = engine.markdown_to_html(input).unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed < LIMIT, "took {elapsed:?} for {} bytes", input.len());
        html
    }

    #[test]
    fn unclosed_emphasis_openers() {
        let html = assert_fast(&"*a ".repeat(20_000));
        assert!(html.starts_with("<p>*a *a"));
    }

    #[test]
    fn alternating_delimiters() {
        assert_fast(&"*_~".repeat(20_000));
    }

    #[test]
    fn unclosed_brackets() {
        let html = assert_fast(&"[".repeat(20_000));
        assert_eq!(html.len(), "<p></p>\n".len() + 20_000);
    }

    #[test]
    fn unclosed_link_destinations() {
        assert_fast(&"[a](".repeat(10_000));
    }

    #[test]
    fn nested_brackets() {
        let input = format!("{}a{}", "[".repeat(10_000), "]".repeat(10_000));
        assert_fast(&input);
    }

    #[test]
    fn backtick_runs() {
        let input: String = (1..300).map(|n| format!("{} ", "`".repeat(n))).collect();
        assert_fast(&input);
    }

    #[test]
    fn wide_table() {
        let columns = 20_000;
        let input = format!("{}\n{}\n", "|a".repeat(columns), "|:-".repeat(columns));
        let html = assert_fast(&input);
        assert_eq!(html.matches("<th align=\"left\">a</th>").count(), columns);
    }

    #[test]
    fn long_ordered_list_as_plain_text() {
        let engine = Engine::new(EngineConfig::new()).unwrap();
        let input = "1. x\n".repeat(20_000);
        let doc = engine.parse(&input).unwrap();

        let start = Instant::now();
        let text = engine.render_plaintext(&doc);
        assert!(start.elapsed() < LIMIT);
        assert!(text.ends_with("20000. x\n"));
    }

    #[test]
    fn deep_block_quotes_are_capped() {
        let depth = DEFAULT_MAX_NESTING * 4;
        let input = format!("{}x\n", "> ".repeat(depth));
        assert_fast(&input);

        let doc = MarkdownParser::new().parse(&input).unwrap();
        let quotes = doc
            .arena
            .descendants(doc.root)
            .filter(|&id| matches!(doc.value(id), NodeValue::BlockQuote))
            .count();
        assert!(quotes <= DEFAULT_MAX_NESTING);
    }
}

mod isolation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case::paragraph("Hello *world* and `code`.\n")]
    #[case::lists("- a\n- b\n\n1. c\n")]
    #[case::links("[text](/url) <http://a.b> ![img](/i.png)\n")]
    #[case::headings("# One\n\nTwo\n===\n")]
    #[case::code("```\n| a |\n```\n")]
    fn extensions_do_not_change_unrelated_input(#[case] input: &str) {
        let core = Engine::new(EngineConfig::new()).unwrap();
        let gfm = Engine::new(EngineConfig::gfm()).unwrap();

        assert_eq!(
            gfm.markdown_to_html(input).unwrap(),
            core.markdown_to_html(input).unwrap()
        );
        assert_eq!(
            block_types(&gfm.parse(input).unwrap()),
            block_types(&core.parse(input).unwrap())
        );
    }

    #[test]
    fn disabling_one_extension_keeps_the_others() {
        let input = "~~x~~\n\n| a |\n| - |\n";
        let mut config = EngineConfig::gfm();
        config.extensions.retain(|entry| entry.name() != "table");
        let engine = Engine::new(config).unwrap();

        assert_eq!(
            engine.markdown_to_html(input).unwrap(),
            "<p><del>x</del></p>\n<p>| a |\n| - |</p>\n"
        );
    }
}

mod tree_shape {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strong_with_nested_emphasis() {
        let doc = MarkdownParser::new().parse("**a *b* c**").unwrap();
        let paragraph = doc.arena.first_child(doc.root).unwrap();
        let strong = doc.arena.first_child(paragraph).unwrap();
        assert!(matches!(doc.value(strong), NodeValue::Strong));

        let children: Vec<_> = doc.arena.children(strong).collect();
        assert_eq!(children.len(), 3);
        assert!(matches!(doc.value(children[0]), NodeValue::Text(t) if t == "a "));
        assert!(matches!(doc.value(children[1]), NodeValue::Emph));
        assert_eq!(doc.text_content(children[1]), "b");
        assert!(matches!(doc.value(children[2]), NodeValue::Text(t) if t == " c"));
    }

    #[test]
    fn table_rows_share_the_column_count() {
        let engine = Engine::new(EngineConfig::gfm()).unwrap();
        let doc = engine
            .parse("| a | b | c |\n| - | - | - |\n| 1 |\n| 1 | 2 | 3 | 4 |\n")
            .unwrap();

        let rows: Vec<_> = doc
            .arena
            .descendants(doc.root)
            .filter(|&id| matches!(doc.value(id), NodeValue::TableRow(_)))
            .collect();
        assert_eq!(rows.len(), 3);
        for row in rows {
            assert_eq!(doc.arena.children(row).count(), 3);
        }
    }
}
