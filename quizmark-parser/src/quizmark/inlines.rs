//! Inline parsing
//!
//!     Free text (prompts, options, feedback) carries a small inline vocabulary:
//!
//!         **strong**  *emphasis*  `code`  ![alt](path)  {{blank_1}}  {{dropdown_1}}
//!
//!     Parsing is a single pass with a frame stack. Media references and placeholders are
//!     atomic and are recognized before any delimiter; code spans are literal. A backslash
//!     escapes the next character.
//!
//!     [placeholders] is the single definition of the slot and media reference patterns used
//!     across the crate.

pub mod nodes;
pub mod parser;
pub mod placeholders;

pub use nodes::{collect_placeholders, InlineContent, InlineNode, Placeholder, SlotKind};
pub use parser::parse_inlines;
pub use placeholders::{
    canonicalize_placeholders, has_underscore_gaps, legacy_placeholders, media_references,
    placeholders, rewrite_media, scaffold_underscore_gaps, MEDIA_REFERENCE,
};
