//! Free text to item body markup
//!
//!     Prompts, options and feedback are parsed with the dialect's inline parser and mapped
//!     onto XHTML elements. Text is never spliced into markup as a string: plain runs become
//!     text nodes (escaped once, by the renderer) and placeholders become whatever element the
//!     caller's slot function returns, at exactly the position the author wrote them.
//!
//!         **x**       <strong>x</strong>
//!         *x*         <em>x</em>
//!         `x`         <code>x</code>
//!         ![a](p)     <img src="p" alt="a"/>
//!         {{blank_1}} slot(Blank 1), or the literal token when the slot is not handled

use crate::xml::{Element, Node};
use quizmark_parser::quizmark::inlines::{parse_inlines, InlineNode, Placeholder};

/// Maps a placeholder to the element that replaces it.
pub type SlotFn<'a> = dyn FnMut(Placeholder) -> Option<Element> + 'a;

/// Inline content of one line of text.
pub fn inline(text: &str, slot: &mut SlotFn<'_>) -> Vec<Node> {
    let nodes = parse_inlines(text);
    convert(&nodes, slot)
}

/// Inline content with no placeholders expected.
pub fn inline_plain(text: &str) -> Vec<Node> {
    inline(text, &mut |_| None)
}

/// Multi-line inline content; line breaks become `<br/>`.
pub fn inline_lines(text: &str, slot: &mut SlotFn<'_>) -> Vec<Node> {
    let mut out = Vec::new();
    for (i, line) in text.trim().lines().enumerate() {
        if i > 0 {
            out.push(Node::Element(Element::new("br")));
        }
        out.extend(inline(line.trim_end(), slot));
    }
    out
}

/// Block content: blank lines separate `<p>` elements.
pub fn paragraphs(text: &str, slot: &mut SlotFn<'_>) -> Vec<Element> {
    split_paragraphs(text)
        .into_iter()
        .map(|para| Element::new("p").nodes(inline_lines(&para, slot)))
        .collect()
}

pub fn paragraphs_plain(text: &str) -> Vec<Element> {
    paragraphs(text, &mut |_| None)
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paras = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paras.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paras.push(current.join("\n"));
    }
    paras
}

fn convert(nodes: &[InlineNode], slot: &mut SlotFn<'_>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let converted = match node {
            InlineNode::Plain(text) => Node::Text(text.clone()),
            InlineNode::Strong(children) => {
                Node::Element(Element::new("strong").nodes(convert(children, slot)))
            }
            InlineNode::Emphasis(children) => {
                Node::Element(Element::new("em").nodes(convert(children, slot)))
            }
            InlineNode::Code(text) => Node::Element(Element::new("code").text(text.clone())),
            InlineNode::Image { alt, source } => Node::Element(
                Element::new("img")
                    .attr("src", source)
                    .attr("alt", alt),
            ),
            InlineNode::Placeholder(placeholder) => match slot(*placeholder) {
                Some(element) => Node::Element(element),
                None => Node::Text(placeholder.token()),
            },
        };
        out.push(converted);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::render;
    use quizmark_parser::quizmark::inlines::SlotKind;

    fn body(text: &str) -> String {
        let mut slot = |p: Placeholder| match p.kind {
            SlotKind::Blank => Some(
                Element::new("textEntryInteraction")
                    .attr("responseIdentifier", format!("RESPONSE_{}", p.position)),
            ),
            SlotKind::Dropdown => None,
        };
        let root = Element::new("itemBody").children(paragraphs(text, &mut slot));
        render(&root).unwrap()
    }

    #[test]
    fn escapes_before_substituting() {
        let xml = body("Is 1 < 2 & {{blank_1}} > 0?");
        assert!(xml.contains(
            "<p>Is 1 &lt; 2 &amp; <textEntryInteraction responseIdentifier=\"RESPONSE_1\"/> &gt; 0?</p>"
        ));
    }

    #[test]
    fn markup_inside_text_is_not_interpreted() {
        let xml = body("<script>alert('x')</script>");
        assert!(xml.contains("&lt;script&gt;alert('x')&lt;/script&gt;"));
        assert!(!xml.contains("<script>"));
    }

    #[test]
    fn converts_emphasis_code_and_images() {
        let xml = body("**ATP** and *ADP* use `P`.\n\n![Cell](resources/Q1-cell.png)");
        assert!(xml.contains("<strong>ATP</strong>"));
        assert!(xml.contains("<em>ADP</em>"));
        assert!(xml.contains("<code>P</code>"));
        assert!(xml.contains("<img src=\"resources/Q1-cell.png\" alt=\"Cell\"/>"));
        assert_eq!(xml.matches("<p>").count(), 2);
    }

    #[test]
    fn unhandled_slots_stay_literal() {
        let xml = body("Pick {{dropdown_2}}.");
        assert!(xml.contains("Pick {{dropdown_2}}."));
    }

    #[test]
    fn line_breaks_within_a_paragraph() {
        let nodes = inline_lines("one\ntwo", &mut |_| None);
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[1], Node::Element(e) if e.name() == "br"));
    }
}
