//! CommonMark and GFM conformance tests
//!
//! Runs the engine end to end on small documents with known cmark-gfm
//! output.

use std::fs;
use std::path::PathBuf;

use gfmark_core::{gfm_to_html, markdown_to_html};
use rstest::rstest;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

mod commonmark {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case::nested_emphasis("**a *b* c**", "<p><strong>a <em>b</em> c</strong></p>\n")]
    #[case::emphasis_in_emphasis(
        "*foo**bar**baz*",
        "<p><em>foo<strong>bar</strong>baz</em></p>\n"
    )]
    #[case::escaped_delimiter("\\*not emphasized*", "<p>*not emphasized*</p>\n")]
    #[case::unmatched_reference("[foo]", "<p>[foo]</p>\n")]
    #[case::code_span_backtick("`hi`lo`", "<p><code>hi</code>lo`</p>\n")]
    #[case::hard_break("foo  \nbaz", "<p>foo<br />\nbaz</p>\n")]
    #[case::entities("&amp; &copy; &#35;", "<p>&amp; © #</p>\n")]
    #[case::setext_heading("Foo\n---\n", "<h2>Foo</h2>\n")]
    #[case::thematic_breaks("***\n---\n___\n", "<hr />\n<hr />\n<hr />\n")]
    #[case::indented_code(
        "    a simple\n      indented code block\n",
        "<pre><code>a simple\n  indented code block\n</code></pre>\n"
    )]
    #[case::fenced_code_escaped(
        "```\n<\n >\n```\n",
        "<pre><code>&lt;\n &gt;\n</code></pre>\n"
    )]
    #[case::blockquote_lazy(
        "> # Foo\n> bar\nbaz\n",
        "<blockquote>\n<h1>Foo</h1>\n<p>bar\nbaz</p>\n</blockquote>\n"
    )]
    #[case::list_marker_change(
        "- foo\n- bar\n+ baz\n",
        "<ul>\n<li>foo</li>\n<li>bar</li>\n</ul>\n<ul>\n<li>baz</li>\n</ul>\n"
    )]
    #[case::loose_ordered_list(
        "1. a\n\n   b\n2. c\n",
        "<ol>\n<li>\n<p>a</p>\n<p>b</p>\n</li>\n<li>\n<p>c</p>\n</li>\n</ol>\n"
    )]
    #[case::reference_link(
        "[foo]: /url \"title\"\n\n[foo]\n",
        "<p><a href=\"/url\" title=\"title\">foo</a></p>\n"
    )]
    #[case::image(
        "![foo](/url \"title\")",
        "<p><img src=\"/url\" alt=\"foo\" title=\"title\" /></p>\n"
    )]
    #[case::uri_autolink(
        "<http://foo.bar.baz>",
        "<p><a href=\"http://foo.bar.baz\">http://foo.bar.baz</a></p>\n"
    )]
    fn renders_like_cmark(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(markdown_to_html(input).unwrap(), expected);
    }

    #[test]
    fn gfm_syntax_is_literal_without_extensions() {
        assert_eq!(
            markdown_to_html("~~a~~ www.x.org\n\n| a |\n| - |\n").unwrap(),
            "<p>~~a~~ www.x.org</p>\n<p>| a |\n| - |</p>\n"
        );
    }
}

mod gfm {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case::strikethrough("~~Hi~~ Hello, world!", "<p><del>Hi</del> Hello, world!</p>\n")]
    #[case::www_autolink(
        "Visit www.commonmark.org/help for more.",
        "<p>Visit <a href=\"http://www.commonmark.org/help\">www.commonmark.org/help</a> for more.</p>\n"
    )]
    #[case::email_autolink(
        "foo@bar.baz",
        "<p><a href=\"mailto:foo@bar.baz\">foo@bar.baz</a></p>\n"
    )]
    #[case::table_short_row_padded(
        "| a | b |\n| - | - |\n| c |\n",
        "<table>\n<thead>\n<tr>\n<th>a</th>\n<th>b</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td>c</td>\n<td></td>\n</tr>\n</tbody>\n</table>\n"
    )]
    fn renders_like_cmark_gfm(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(gfm_to_html(input).unwrap(), expected);
    }

    #[test]
    fn fixtures_match_expected_html() {
        let dir = fixtures_dir().join("gfm");
        let mut checked = 0;
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().is_none_or(|ext| ext != "md") {
                continue;
            }
            let input = fs::read_to_string(&path).unwrap();
            let expected = fs::read_to_string(path.with_extension("html")).unwrap();
            assert_eq!(
                gfm_to_html(&input).unwrap(),
                expected,
                "fixture {}",
                path.display()
            );
            checked += 1;
        }
        assert!(checked > 0, "no fixtures in {}", dir.display());
    }
}
