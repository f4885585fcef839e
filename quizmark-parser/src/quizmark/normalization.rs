//! Normalization
//!
//!     Rewrites documents written in older dialect variants, or with small mechanical mistakes,
//!     into the canonical dialect. Every rewrite is a plain text-to-text [Rule]; the rules run
//!     in a fixed order:
//!
//!         1. `^key: value` metadata → `^key value`
//!         2. placeholder spellings → `{{blank_N}}` / `{{dropdown_N}}`
//!         3. `## Question N: Title` headers → `# Q00N Title`; a legacy title heading moves
//!            into the front matter
//!         4. `@subfield:` and misnested `@field:` subfields → `@@field:`
//!         5. missing closing markers, inserted where the parser assumed them
//!         6. question type aliases → canonical names
//!         7. inline correct markers → `@field: answer`
//!         8. underscore gaps in text entry prompts → `{{blank_N}}`
//!
//!     [Normalizer::iterate] drives the rules from validation results. A round only counts when
//!     it strictly reduces the number of actionable issues; otherwise the rewrite is discarded
//!     and the loop stops, so it always terminates. See [TerminalState] for the outcomes.

pub mod engine;
pub mod rule;
pub mod rules;

pub use engine::{
    FixOutcome, MemorySuggestions, Normalizer, Round, SuggestionStore, TerminalState,
    DEFAULT_MAX_ROUNDS,
};
pub use rule::Rule;
pub use rules::default_rules;

/// Apply every rule once with the default rule set.
pub fn fix_round(content: &str) -> (String, Vec<&'static str>) {
    Normalizer::new().fix_round(content)
}

/// Run the fix loop with default settings.
pub fn iterate(content: &str, max_rounds: usize) -> FixOutcome {
    Normalizer::new().with_max_rounds(max_rounds).iterate(content)
}
