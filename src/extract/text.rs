//! HTML to visible text
//!
//! Produces the text chunks a browser would render, split into sentences at
//! block boundaries, from the parsed tree alone. Each element is classified as
//! inline or block from a static table; unknown elements are traversed but
//! never emitted themselves.
//!
//! # Emission rules
//!
//! A node is a candidate when it is a classified element, or a text node that
//! is not the only child of its element (a lone text child carries its
//! parent's full text and is emitted through the parent instead).
//!
//! - A classified element is emitted only when it holds exactly one child and
//!   that child is non-blank text.
//! - A text node is emitted unless it is structural whitespace: blank text
//!   containing a newline. Such whitespace still separates two inline
//!   siblings with a space. Prose that wraps across source lines is kept.
//!
//! Before a candidate's text is appended a line break may be inserted:
//!
//! - text node: unless the previous sibling (or, failing that, the parent)
//!   is inline; whitespace-only text is never counted as a sibling
//! - element: if it is a block, if its previous sibling is a block, or if
//!   the previous sibling-or-parent is a block without a text child

use ego_tree::NodeRef;
use scraper::{Html, Node};
use std::collections::HashSet;

/// Display classification of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Inline,
    Block,
}

/// Returns the display classification for an element name
pub fn display_of(name: &str) -> Option<Display> {
    match name {
        "a" | "abbr" | "acronym" | "b" | "bdi" | "bdo" | "big" | "button" | "cite" | "code"
        | "data" | "del" | "dfn" | "em" | "font" | "i" | "img" | "ins" | "kbd" | "label"
        | "mark" | "meter" | "output" | "progress" | "q" | "rp" | "rt" | "ruby" | "s"
        | "samp" | "small" | "span" | "strike" | "strong" | "sub" | "sup" | "time" | "tt"
        | "u" | "var" | "wbr" => Some(Display::Inline),

        "address" | "article" | "aside" | "blockquote" | "br" | "caption" | "center" | "dd"
        | "details" | "dialog" | "dir" | "div" | "dl" | "dt" | "fieldset" | "figcaption"
        | "figure" | "footer" | "form" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "header"
        | "hgroup" | "hr" | "legend" | "li" | "main" | "menu" | "nav" | "ol" | "option"
        | "p" | "pre" | "section" | "summary" | "table" | "tbody" | "td" | "tfoot" | "th"
        | "thead" | "tr" | "ul" => Some(Display::Block),

        _ => None,
    }
}

/// Elements whose content is never rendered as text
const HIDDEN: &[&str] = &["head", "script", "style", "noscript", "template", "iframe", "svg"];

fn display(node: NodeRef<'_, Node>) -> Option<Display> {
    node.value().as_element().and_then(|e| display_of(e.name()))
}

fn is_hidden(node: NodeRef<'_, Node>) -> bool {
    let hidden = |n: NodeRef<'_, Node>| {
        n.value()
            .as_element()
            .is_some_and(|e| HIDDEN.contains(&e.name()))
    };
    hidden(node) || node.ancestors().any(hidden)
}

fn is_blank_text(node: NodeRef<'_, Node>) -> bool {
    node.value().as_text().is_some_and(|t| t.trim().is_empty())
}

/// Previous sibling, ignoring whitespace-only text between tags
fn prev_sibling(node: NodeRef<'_, Node>) -> Option<NodeRef<'_, Node>> {
    node.prev_siblings().find(|sibling| !is_blank_text(*sibling))
}

fn prev_sibling_or_parent(node: NodeRef<'_, Node>) -> Option<NodeRef<'_, Node>> {
    prev_sibling(node).or_else(|| node.parent())
}

fn has_text_child(node: NodeRef<'_, Node>) -> bool {
    node.children()
        .any(|c| c.value().is_text() && !is_blank_text(c))
}

/// Returns the text of an element's only child, if that child is text
fn sole_text_child(node: NodeRef<'_, Node>) -> Option<&str> {
    let mut children = node.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }
    only.value().as_text().map(|t| &**t)
}

/// True when the node is the only child of an element
fn is_sole_child(node: NodeRef<'_, Node>) -> bool {
    node.prev_sibling().is_none()
        && node.next_sibling().is_none()
        && node.parent().is_some_and(|parent| parent.value().is_element())
}

/// Appends text with every whitespace run collapsed to one space
fn push_collapsed(buffer: &mut String, text: &str) {
    let mut in_space = buffer.ends_with(' ');
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                buffer.push(' ');
                in_space = true;
            }
        } else {
            buffer.push(c);
            in_space = false;
        }
    }
}

/// Extracts the visible text of a document as ordered sentences
///
/// The result depends only on the input tree, so recomputing it always
/// yields the same sequence.
///
/// # Example
///
/// ```
/// use scraper::Html;
/// use webcrawl::extract::extract_text;
///
/// let html = Html::parse_document("<p>Hello</p><div>World</div>");
/// assert_eq!(extract_text(&html), vec!["Hello", "World"]);
///
/// let html = Html::parse_document("<span>Hello</span> <span>World</span>");
/// assert_eq!(extract_text(&html), vec!["Hello World"]);
/// ```
pub fn extract_text(html: &Html) -> Vec<String> {
    let mut buffer = String::new();

    for node in html.tree.root().descendants() {
        match node.value() {
            Node::Text(text) => {
                let text: &str = text;
                if text.is_empty() || is_hidden(node) {
                    continue;
                }
                if is_sole_child(node) {
                    continue;
                }

                let after_inline = prev_sibling_or_parent(node)
                    .is_some_and(|prev| display(prev) == Some(Display::Inline));

                if text.trim().is_empty() && text.contains('\n') {
                    if after_inline {
                        push_collapsed(&mut buffer, " ");
                    }
                    continue;
                }

                if !after_inline {
                    buffer.push('\n');
                }
                push_collapsed(&mut buffer, text);
            }
            Node::Element(element) => {
                let Some(own_display) = display_of(element.name()) else {
                    continue;
                };
                let Some(text) = sole_text_child(node) else {
                    continue;
                };
                if text.trim().is_empty() || is_hidden(node) {
                    continue;
                }

                let prev_is_block = prev_sibling(node)
                    .is_some_and(|prev| display(prev) == Some(Display::Block));
                let after_bare_block = prev_sibling_or_parent(node).is_some_and(|prev| {
                    display(prev) == Some(Display::Block) && !has_text_child(prev)
                });

                if own_display == Display::Block || prev_is_block || after_bare_block {
                    buffer.push('\n');
                }
                push_collapsed(&mut buffer, text);
            }
            _ => {}
        }
    }

    into_sentences(&buffer)
}

/// Splits the buffer into trimmed, non-empty, unique sentences in order
fn into_sentences(buffer: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    buffer
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(html: &str) -> Vec<String> {
        extract_text(&Html::parse_document(html))
    }

    #[test]
    fn test_blocks_are_separate_sentences() {
        assert_eq!(text_of("<p>Hello</p><div>World</div>"), vec!["Hello", "World"]);
    }

    #[test]
    fn test_inline_siblings_share_a_line() {
        assert_eq!(
            text_of("<span>Hello</span> <span>World</span>"),
            vec!["Hello World"]
        );
    }

    #[test]
    fn test_nested_leaf_emitted_once() {
        assert_eq!(text_of("<ul><li><a href='/'>Home</a></li></ul>"), vec!["Home"]);
    }

    #[test]
    fn test_mixed_inline_content() {
        assert_eq!(
            text_of("<p>Hello <b>bold</b> world</p>"),
            vec!["Hello bold world"]
        );
    }

    #[test]
    fn test_list_items() {
        let html = r#"
            <ul>
                <li>One</li>
                <li>Two</li>
                <li><a href="/three">Three</a></li>
            </ul>
        "#;
        assert_eq!(text_of(html), vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_structural_whitespace_between_inlines() {
        let html = "<nav>\n  <a href='/'>Home</a>\n  <a href='/about'>About</a>\n</nav>";
        assert_eq!(text_of(html), vec!["Home About"]);
    }

    #[test]
    fn test_line_break_element() {
        assert_eq!(text_of("<p>First line<br>Second line</p>"), vec!["First line", "Second line"]);
    }

    #[test]
    fn test_text_after_block() {
        assert_eq!(
            text_of("<div><p>Inside</p>Trailing text</div>"),
            vec!["Inside", "Trailing text"]
        );
    }

    #[test]
    fn test_table_cells() {
        let html = "<table><tr><th>Name</th><th>Age</th></tr><tr><td>Ann</td><td>30</td></tr></table>";
        assert_eq!(text_of(html), vec!["Name", "Age", "Ann", "30"]);
    }

    #[test]
    fn test_hidden_content_skipped() {
        let html = r#"
            <html><head><title>Page title</title><style>p { color: red; }</style></head>
            <body><script>var x = 1;</script><p>Visible</p><noscript>Enable JS</noscript></body></html>
        "#;
        assert_eq!(text_of(html), vec!["Visible"]);
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(
            text_of("<p>Lots   of\n   space\there</p>"),
            vec!["Lots of space here"]
        );
    }

    #[test]
    fn test_duplicate_sentences_removed() {
        assert_eq!(
            text_of("<p>Same</p><p>Other</p><p>Same</p>"),
            vec!["Same", "Other"]
        );
    }

    #[test]
    fn test_unclassified_leaf_not_emitted() {
        assert_eq!(text_of("<div><custom-tag>Hidden</custom-tag></div>"), Vec::<String>::new());
    }

    #[test]
    fn test_empty_document() {
        assert!(text_of("").is_empty());
        assert!(text_of("<html><body>   </body></html>").is_empty());
    }

    #[test]
    fn test_wrapped_prose_kept() {
        assert_eq!(
            text_of("<p>First\nline <b>bold</b></p>"),
            vec!["First line bold"]
        );
    }

    #[test]
    fn test_many_lines_in_one_block() {
        let lines: String = (0..20_000)
            .map(|n| format!("line number {} here<br>", n))
            .collect();
        let sentences = text_of(&format!("<div>{}</div>", lines));

        assert_eq!(sentences.len(), 20_000);
        assert_eq!(sentences[0], "line number 0 here");
        assert_eq!(sentences[19_999], "line number 19999 here");
    }

    #[test]
    fn test_restartable() {
        let html = Html::parse_document("<h1>Title</h1><p>Body <em>text</em>.</p>");
        assert_eq!(extract_text(&html), extract_text(&html));
        assert_eq!(extract_text(&html), vec!["Title", "Body text."]);
    }
}
