use super::nodes::{InlineContent, InlineNode};
use super::placeholders::{media_at_start, placeholder_at_start};

/// Parse inline nodes from a raw string.
pub fn parse_inlines(text: &str) -> InlineContent {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let mut stack = vec![InlineFrame::new(FrameKind::Root)];
    let mut blocked = BlockedClosings::default();

    let mut i = 0;
    while i < chars.len() {
        let (offset, ch) = chars[i];
        let prev = if i == 0 { None } else { Some(chars[i - 1].1) };
        let top_kind = frame_kind(&stack);

        // Escapes first so escaped tokens never trigger parser state.
        if ch == '\\' && top_kind != FrameKind::Code {
            match chars.get(i + 1) {
                Some((_, next_char)) => {
                    push_char(&mut stack, *next_char);
                    i += 2;
                    continue;
                }
                None => {
                    push_char(&mut stack, '\\');
                    break;
                }
            }
        }

        // Atomic tokens outside code spans: media references and placeholders.
        if top_kind != FrameKind::Code {
            let rest = &text[offset..];
            let atom = if ch == '!' {
                media_at_start(rest).map(|(alt, source, len)| (InlineNode::Image { alt, source }, len))
            } else if ch == '{' {
                placeholder_at_start(rest).map(|(p, len)| (InlineNode::Placeholder(p), len))
            } else {
                None
            };
            if let Some((node, len)) = atom {
                push_node(&mut stack, node);
                let end = offset + len;
                while i < chars.len() && chars[i].0 < end {
                    i += 1;
                }
                continue;
            }
        }

        let following = chars.get(i + 1).map(|c| c.1);
        let (token_kind, width) = match ch {
            // `***` closing `**...*...***`: the single star closes the emphasis first.
            '*' if top_kind == FrameKind::Emphasis
                && is_valid_end(prev, following, FrameKind::Emphasis) =>
            {
                (Some(FrameKind::Emphasis), 1)
            }
            '*' if following == Some('*') => (Some(FrameKind::Strong), 2),
            '*' => (Some(FrameKind::Emphasis), 1),
            '`' => (Some(FrameKind::Code), 1),
            _ => (None, 1),
        };
        let next = chars.get(i + width).map(|c| c.1);

        let mut consumed = false;
        if let Some(token_kind) = token_kind {
            if token_kind == top_kind {
                if blocked.consume(token_kind) {
                    // Literal closing paired to a disallowed nested start.
                } else if is_valid_end(prev, next, token_kind) {
                    let Some(mut frame) = stack.pop() else { break };
                    frame.flush_buffer();
                    if !frame.has_content() {
                        // No content: both delimiters are literal.
                        let literal = token_kind.token();
                        push_str(&mut stack, literal);
                        push_str(&mut stack, literal);
                    } else {
                        push_node(&mut stack, frame.into_node());
                    }
                    consumed = true;
                }
            }

            if !consumed && top_kind != FrameKind::Code && is_valid_start(prev, next) {
                if stack.iter().any(|frame| frame.kind == token_kind) {
                    blocked.increment(token_kind);
                } else {
                    if let Some(top) = stack.last_mut() {
                        top.flush_buffer();
                    }
                    stack.push(InlineFrame::new(token_kind));
                    consumed = true;
                }
            }
        }

        if consumed {
            i += width;
        } else {
            // A `**` that is neither start nor end is two literal stars.
            for _ in 0..width {
                push_char(&mut stack, ch);
            }
            i += width;
        }
    }

    if let Some(frame) = stack.last_mut() {
        frame.flush_buffer();
    }

    // Unclosed frames unwind into literal delimiters followed by their children.
    while stack.len() > 1 {
        let Some(mut frame) = stack.pop() else { break };
        frame.flush_buffer();
        push_str(&mut stack, frame.kind.token());
        for child in frame.children {
            push_node(&mut stack, child);
        }
    }

    match stack.pop() {
        Some(mut root) => {
            root.flush_buffer();
            root.children
        }
        None => Vec::new(),
    }
}

fn frame_kind(stack: &[InlineFrame]) -> FrameKind {
    stack.last().map(|f| f.kind).unwrap_or(FrameKind::Root)
}

fn push_char(stack: &mut [InlineFrame], ch: char) {
    if let Some(top) = stack.last_mut() {
        top.buffer.push(ch);
    }
}

fn push_str(stack: &mut [InlineFrame], text: &str) {
    if let Some(top) = stack.last_mut() {
        top.buffer.push_str(text);
    }
}

fn push_node(stack: &mut [InlineFrame], node: InlineNode) {
    if let Some(top) = stack.last_mut() {
        top.push_node(node);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Root,
    Strong,
    Emphasis,
    Code,
}

impl FrameKind {
    fn token(self) -> &'static str {
        match self {
            FrameKind::Strong => "**",
            FrameKind::Emphasis => "*",
            FrameKind::Code => "`",
            FrameKind::Root => "",
        }
    }
}

struct InlineFrame {
    kind: FrameKind,
    buffer: String,
    children: InlineContent,
}

impl InlineFrame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            buffer: String::new(),
            children: Vec::new(),
        }
    }

    fn has_content(&self) -> bool {
        !self.buffer.is_empty() || !self.children.is_empty()
    }

    fn flush_buffer(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.buffer);
        if let Some(InlineNode::Plain(existing)) = self.children.last_mut() {
            existing.push_str(&text);
        } else {
            self.children.push(InlineNode::Plain(text));
        }
    }

    fn push_node(&mut self, node: InlineNode) {
        self.flush_buffer();
        match node {
            InlineNode::Plain(text) => {
                if text.is_empty() {
                    return;
                }
                if let Some(InlineNode::Plain(existing)) = self.children.last_mut() {
                    existing.push_str(&text);
                } else {
                    self.children.push(InlineNode::Plain(text));
                }
            }
            other => self.children.push(other),
        }
    }

    fn into_node(self) -> InlineNode {
        match self.kind {
            FrameKind::Strong => InlineNode::Strong(self.children),
            FrameKind::Emphasis => InlineNode::Emphasis(self.children),
            FrameKind::Code | FrameKind::Root => InlineNode::Code(flatten_literal(self.children)),
        }
    }
}

fn flatten_literal(children: InlineContent) -> String {
    let mut text = String::new();
    for node in children {
        if let Some(plain) = node.as_plain() {
            text.push_str(plain);
        }
    }
    text
}

#[derive(Default)]
struct BlockedClosings {
    strong: usize,
    emphasis: usize,
}

impl BlockedClosings {
    fn increment(&mut self, kind: FrameKind) {
        match kind {
            FrameKind::Strong => self.strong += 1,
            FrameKind::Emphasis => self.emphasis += 1,
            _ => {}
        }
    }

    fn consume(&mut self, kind: FrameKind) -> bool {
        let counter = match kind {
            FrameKind::Strong => &mut self.strong,
            FrameKind::Emphasis => &mut self.emphasis,
            _ => return false,
        };
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

fn is_valid_start(prev: Option<char>, next: Option<char>) -> bool {
    !is_word(prev) && matches!(next, Some(ch) if !ch.is_whitespace())
}

fn is_valid_end(prev: Option<char>, next: Option<char>, token: FrameKind) -> bool {
    let inside_valid = match token {
        FrameKind::Code => prev.is_some(),
        _ => matches!(prev, Some(ch) if !ch.is_whitespace()),
    };

    inside_valid && !is_word(next)
}

fn is_word(ch: Option<char>) -> bool {
    ch.map(|c| c.is_alphanumeric()).unwrap_or(false)
}
