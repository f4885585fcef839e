//! Response declarations and response processing
//!
//!     Every item declares its responses, the `SCORE`/`MAXSCORE` outcomes and a multiple
//!     `FEEDBACK` identifier outcome. Scoring is expressed as a [ScorePlan]: one
//!     [Contribution] per response, summed into `SCORE`, optionally replaced by an
//!     all-correct award and finally clamped into `[minimum, MAXSCORE]`.
//!
//!     Contributions
//!
//!         Match       exact match against the declared correct response; for multiple
//!                     cardinality this is set equality
//!         Map         mapResponse over the declaration's mapping (weighted partial credit,
//!                     case-(in)sensitive string lists, directed pairs)
//!         Accepts     mapResponse over a string mapping; correct when the response matches
//!                     any accepted answer, with the blank's case sensitivity
//!         Tolerance   numeric compare within an absolute or relative tolerance

use crate::xml::Element;
use quizmark_parser::quizmark::ast::{format_score, Tolerance};

pub const SCORE: &str = "SCORE";
pub const MAXSCORE: &str = "MAXSCORE";
pub const FEEDBACK: &str = "FEEDBACK";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Multiple,
}

impl Cardinality {
    pub fn name(&self) -> &'static str {
        match self {
            Cardinality::Single => "single",
            Cardinality::Multiple => "multiple",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Identifier,
    String,
    Float,
    DirectedPair,
    File,
}

impl BaseType {
    pub fn name(&self) -> &'static str {
        match self {
            BaseType::Identifier => "identifier",
            BaseType::String => "string",
            BaseType::Float => "float",
            BaseType::DirectedPair => "directedPair",
            BaseType::File => "file",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: String,
    pub value: f64,
    pub case_sensitive: Option<bool>,
}

impl MapEntry {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
            case_sensitive: None,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub default_value: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub entries: Vec<MapEntry>,
}

impl Mapping {
    pub fn new(default_value: f64) -> Self {
        Self {
            default_value,
            lower_bound: None,
            upper_bound: None,
            entries: Vec::new(),
        }
    }

    pub fn bounds(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn entry(mut self, entry: MapEntry) -> Self {
        self.entries.push(entry);
        self
    }

    fn to_element(&self) -> Element {
        let entries = self.entries.iter().map(|e| {
            Element::new("mapEntry")
                .attr("mapKey", &e.key)
                .attr("mappedValue", format_score(e.value))
                .opt_attr("caseSensitive", e.case_sensitive)
        });
        Element::new("mapping")
            .opt_attr("lowerBound", self.lower_bound.map(format_score))
            .opt_attr("upperBound", self.upper_bound.map(format_score))
            .attr("defaultValue", format_score(self.default_value))
            .children(entries)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDeclaration {
    pub identifier: String,
    pub cardinality: Cardinality,
    pub base_type: BaseType,
    pub correct: Vec<String>,
    pub mapping: Option<Mapping>,
}

impl ResponseDeclaration {
    pub fn new(identifier: impl Into<String>, cardinality: Cardinality, base_type: BaseType) -> Self {
        Self {
            identifier: identifier.into(),
            cardinality,
            base_type,
            correct: Vec::new(),
            mapping: None,
        }
    }

    pub fn correct(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.correct.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn to_element(&self) -> Element {
        let mut decl = Element::new("responseDeclaration")
            .attr("identifier", &self.identifier)
            .attr("cardinality", self.cardinality.name())
            .attr("baseType", self.base_type.name());
        if !self.correct.is_empty() {
            let values = self
                .correct
                .iter()
                .map(|v| Element::new("value").text(v.clone()));
            decl = decl.child(Element::new("correctResponse").children(values));
        }
        if let Some(mapping) = &self.mapping {
            decl = decl.child(mapping.to_element());
        }
        decl
    }
}

/// `SCORE`, `MAXSCORE` and `FEEDBACK`
pub fn outcome_declarations(max_score: f64) -> Vec<Element> {
    let float_outcome = |id: &str, value: f64| {
        Element::new("outcomeDeclaration")
            .attr("identifier", id)
            .attr("cardinality", "single")
            .attr("baseType", "float")
            .child(
                Element::new("defaultValue")
                    .child(Element::new("value").text(format_score(value))),
            )
    };
    vec![
        float_outcome(SCORE, 0.0),
        float_outcome(MAXSCORE, max_score),
        Element::new("outcomeDeclaration")
            .attr("identifier", FEEDBACK)
            .attr("cardinality", "multiple")
            .attr("baseType", "identifier"),
    ]
}

// Expression helpers

pub fn variable(identifier: &str) -> Element {
    Element::new("variable").attr("identifier", identifier)
}

pub fn correct(identifier: &str) -> Element {
    Element::new("correct").attr("identifier", identifier)
}

pub fn base_value(base_type: BaseType, value: impl Into<String>) -> Element {
    Element::new("baseValue")
        .attr("baseType", base_type.name())
        .text(value.into())
}

pub fn float(value: f64) -> Element {
    base_value(BaseType::Float, format_score(value))
}

pub fn matches_correct(response: &str) -> Element {
    Element::new("match")
        .child(variable(response))
        .child(correct(response))
}

pub fn is_null(response: &str) -> Element {
    Element::new("isNull").child(variable(response))
}

pub fn all_of(mut expressions: Vec<Element>) -> Element {
    if expressions.len() == 1 {
        return expressions.remove(0);
    }
    Element::new("and").children(expressions)
}

pub fn any_of(mut expressions: Vec<Element>) -> Element {
    if expressions.len() == 1 {
        return expressions.remove(0);
    }
    Element::new("or").children(expressions)
}

pub fn string_match(response: &str, value: &str, case_sensitive: bool) -> Element {
    Element::new("stringMatch")
        .attr("caseSensitive", case_sensitive)
        .child(variable(response))
        .child(base_value(BaseType::String, value))
}

pub fn set_outcome(identifier: &str, expression: Element) -> Element {
    Element::new("setOutcomeValue")
        .attr("identifier", identifier)
        .child(expression)
}

/// `SCORE = SCORE + expression`
pub fn add_to_score(expression: Element) -> Element {
    set_outcome(
        SCORE,
        Element::new("sum").child(variable(SCORE)).child(expression),
    )
}

/// `if condition { then } [else { otherwise }]`
pub fn condition(test: Element, then: Vec<Element>, otherwise: Option<Vec<Element>>) -> Element {
    let mut cond =
        Element::new("responseCondition").child(Element::new("responseIf").child(test).children(then));
    if let Some(otherwise) = otherwise {
        cond = cond.child(Element::new("responseElse").children(otherwise));
    }
    cond
}

/// A numeric compare, inclusive of the tolerance band.
pub fn numeric_equal(response: &str, target: f64, tolerance: Option<Tolerance>) -> Element {
    let equal = match tolerance {
        Some(Tolerance::Absolute(d)) => Element::new("equal")
            .attr("toleranceMode", "absolute")
            .attr("tolerance", format!("{} {}", format_score(d), format_score(d))),
        Some(Tolerance::Percent(p)) => Element::new("equal")
            .attr("toleranceMode", "relative")
            .attr("tolerance", format!("{} {}", format_score(p), format_score(p))),
        None => Element::new("equal").attr("toleranceMode", "exact"),
    };
    equal
        .attr("includeLowerBound", true)
        .attr("includeUpperBound", true)
        .child(variable(response))
        .child(float(target))
}

/// How one response adds to `SCORE`
#[derive(Debug, Clone, PartialEq)]
pub enum Contribution {
    Match { correct: f64, wrong: f64 },
    Map,
    Accepts {
        answers: Vec<String>,
        case_sensitive: bool,
    },
    Tolerance {
        target: f64,
        tolerance: Option<Tolerance>,
        correct: f64,
        wrong: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorePlan {
    pub responses: Vec<(String, Contribution)>,
    /// Score awarded when every response is correct, replacing the sum
    pub all_correct: Option<f64>,
    pub minimum: f64,
}

impl ScorePlan {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            all_correct: None,
            minimum: 0.0,
        }
    }

    /// All or nothing on a single response.
    pub fn exact(response: &str, points: f64) -> Self {
        Self::new().with(response, Contribution::Match {
            correct: points,
            wrong: 0.0,
        })
    }

    pub fn with(mut self, response: impl Into<String>, contribution: Contribution) -> Self {
        self.responses.push((response.into(), contribution));
        self
    }

    pub fn all_correct(mut self, award: Option<f64>) -> Self {
        self.all_correct = award;
        self
    }

    pub fn minimum(mut self, minimum: Option<f64>) -> Self {
        self.minimum = minimum.unwrap_or(0.0);
        self
    }

    fn correct_test(response: &str, contribution: &Contribution) -> Element {
        match contribution {
            Contribution::Match { .. } | Contribution::Map => matches_correct(response),
            Contribution::Accepts {
                answers,
                case_sensitive,
            } => any_of(
                answers
                    .iter()
                    .map(|answer| string_match(response, answer, *case_sensitive))
                    .collect(),
            ),
            Contribution::Tolerance {
                target, tolerance, ..
            } => numeric_equal(response, *target, *tolerance),
        }
    }

    /// The scoring rules, in order, for `responseProcessing`.
    pub fn rules(&self) -> Vec<Element> {
        let mut rules = Vec::new();
        for (response, contribution) in &self.responses {
            let rule = match contribution {
                Contribution::Map | Contribution::Accepts { .. } => condition(
                    Element::new("not").child(is_null(response)),
                    vec![add_to_score(
                        Element::new("mapResponse").attr("identifier", response),
                    )],
                    None,
                ),
                Contribution::Match { correct, wrong } | Contribution::Tolerance { correct, wrong, .. } => {
                    let mut otherwise = None;
                    if *wrong != 0.0 {
                        otherwise = Some(vec![condition(
                            Element::new("not").child(is_null(response)),
                            vec![add_to_score(float(*wrong))],
                            None,
                        )]);
                    }
                    condition(
                        Element::new("and")
                            .child(Element::new("not").child(is_null(response)))
                            .child(Self::correct_test(response, contribution)),
                        vec![add_to_score(float(*correct))],
                        otherwise,
                    )
                }
            };
            rules.push(rule);
        }

        if let Some(award) = self.all_correct {
            let tests = self
                .responses
                .iter()
                .map(|(r, c)| Self::correct_test(r, c))
                .collect();
            rules.push(condition(all_of(tests), vec![set_outcome(SCORE, float(award))], None));
        }

        rules.push(condition(
            Element::new("gt").child(variable(SCORE)).child(variable(MAXSCORE)),
            vec![set_outcome(SCORE, variable(MAXSCORE))],
            None,
        ));
        rules.push(condition(
            Element::new("lt").child(variable(SCORE)).child(float(self.minimum)),
            vec![set_outcome(SCORE, float(self.minimum))],
            None,
        ));
        rules
    }
}

impl Default for ScorePlan {
    fn default() -> Self {
        Self::new()
    }
}
