//! Inline nodes

use serde::Serialize;

/// Sequence of inline nodes parsed from one piece of free text.
pub type InlineContent = Vec<InlineNode>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Blank,
    Dropdown,
}

impl SlotKind {
    pub fn name(&self) -> &'static str {
        match self {
            SlotKind::Blank => "blank",
            SlotKind::Dropdown => "dropdown",
        }
    }
}

/// A `{{blank_N}}` or `{{dropdown_N}}` slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Placeholder {
    pub kind: SlotKind,
    pub position: usize,
}

impl Placeholder {
    pub fn new(kind: SlotKind, position: usize) -> Self {
        Self { kind, position }
    }

    /// Canonical token text
    pub fn token(&self) -> String {
        format!("{{{{{}_{}}}}}", self.kind.name(), self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InlineNode {
    Plain(String),
    /// `**text**`
    Strong(InlineContent),
    /// `*text*`
    Emphasis(InlineContent),
    /// `` `text` ``
    Code(String),
    /// `![alt](source)`
    Image { alt: String, source: String },
    Placeholder(Placeholder),
}

impl InlineNode {
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            InlineNode::Plain(text) | InlineNode::Code(text) => Some(text),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&InlineContent> {
        match self {
            InlineNode::Strong(children) | InlineNode::Emphasis(children) => Some(children),
            _ => None,
        }
    }
}

/// Placeholders in document order, including those nested in emphasis.
pub fn collect_placeholders(nodes: &[InlineNode]) -> Vec<Placeholder> {
    let mut found = Vec::new();
    for node in nodes {
        match node {
            InlineNode::Placeholder(p) => found.push(*p),
            other => {
                if let Some(children) = other.children() {
                    found.extend(collect_placeholders(children));
                }
            }
        }
    }
    found
}
