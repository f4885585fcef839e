//! Data model for quizmark documents
//!
//!     A document is front matter plus an ordered list of question blocks. Each block is the
//!     generic two-level field tree written by the author; blocks whose type, identifier and
//!     points are usable are decoded once into a typed [Question] carrying a closed
//!     [Payload] variant per question type.
//!
//!     Ownership is strictly hierarchical: the [Document] owns its blocks and questions, each
//!     question owns its payload, nothing is shared between questions.
//!
//! Modules
//!
//!     - `range` - spans and line lookup
//!     - `field` - the Field/Subfield substrate
//!     - `document` - document, front matter, blocks
//!     - `question` - question types and the typed question
//!     - `payload` - typed payloads (options, blanks, zones, scoring, feedback)
//!     - `points` - integer-preferred point values

pub mod document;
pub mod field;
pub mod payload;
pub mod points;
pub mod question;
pub mod range;

pub use document::{Dialect, Document, DocumentMetadata, Header, QuestionBlock, SectionSpec};
pub use field::{Field, FieldLevel, MarkerStyle, MetadataEntry};
pub use payload::{
    Blank, ChoiceOption, ChoicePayload, Dropdown, ExtendedPayload, Feedback, FeedbackState,
    GapMatchPayload, GraphicPayload, ImageRef, InlineChoicePayload, MatchItem, MatchPayload,
    Pairing, Payload, Scoring, Shape, TextEntryPayload, Tolerance, TrueFalsePayload, Zone,
};
pub use points::{format_score, Points, PointsError};
pub use question::{parse_flag, Question, QuestionType};
pub use range::{format_source_context, LineIndex, Span};
