//! Pattern matching over fragment lists
//!
//! A pattern is a sequence of parts separated by spaces: a literal word
//! (with `|`-separated alternatives) matches an unconsumed word fragment,
//! `%N` captures any fragment into slot N. Several rules may share one
//! pattern string, separated by `;`. When a rule matches and the pass
//! accepts the captures, the matched window is replaced by the pass's
//! output terms, each spanning the window's range.

use crate::models::{Comparator, Term, Value};

/// One tagged token: a term plus its range in the original query
#[derive(Clone, Debug)]
pub struct Fragment {
    pub term: Term,
    pub start: usize,
    pub end: usize,
}

impl Fragment {
    pub fn new(term: Term, start: usize, end: usize) -> Self {
        Self { term, start, end }
    }

    /// The raw word, when this fragment is still an unconsumed literal
    pub fn as_word(&self) -> Option<&str> {
        match &self.term {
            Term::Literal {
                property,
                value: Value::String(s),
                comparator: Comparator::Equal,
            } if property.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Integer payload of a parsed number fragment
    pub fn as_integer(&self) -> Option<i64> {
        match &self.term {
            Term::Literal {
                property,
                value: Value::Integer(i),
                ..
            } if property.is_empty() => Some(*i),
            _ => None,
        }
    }
}

/// A rewrite pass: inspects the captured fragments of one rule match and
/// returns the replacement terms, or `None` to reject the match
pub trait Pass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>>;
}

enum Part {
    Word(Vec<String>),
    Capture(usize),
}

fn parse_rule(rule: &str) -> (Vec<Part>, usize) {
    let mut parts = Vec::new();
    let mut max_capture = 0usize;
    for piece in rule.split_whitespace() {
        if let Some(rest) = piece.strip_prefix('%') {
            if let Ok(n) = rest.parse::<usize>() {
                max_capture = max_capture.max(n);
                parts.push(Part::Capture(n - 1));
                continue;
            }
        }
        parts.push(Part::Word(
            piece.split('|').map(|alt| alt.to_lowercase()).collect(),
        ));
    }
    (parts, max_capture)
}

/// Run one pass over the fragment list with the given pattern rules
pub fn run_pass(fragments: &mut Vec<Fragment>, pass: &dyn Pass, patterns: &str) {
    for rule in patterns.split(';') {
        let rule = rule.trim();
        if rule.is_empty() {
            continue;
        }
        let (parts, capture_count) = parse_rule(rule);
        if parts.is_empty() {
            continue;
        }
        run_rule(fragments, pass, &parts, capture_count);
    }
}

fn run_rule(fragments: &mut Vec<Fragment>, pass: &dyn Pass, parts: &[Part], capture_count: usize) {
    let mut i = 0;
    while i < fragments.len() {
        match try_match(fragments, i, parts, capture_count, pass) {
            Some(replacement) => {
                let window = parts.len();
                let start = fragments[i].start;
                let end = fragments[i + window - 1].end;
                let produced = replacement.len();

                fragments.splice(
                    i..i + window,
                    replacement
                        .into_iter()
                        .map(|term| Fragment::new(term, start, end)),
                );
                i += produced.max(1);
            }
            None => i += 1,
        }
    }
}

fn try_match(
    fragments: &[Fragment],
    at: usize,
    parts: &[Part],
    capture_count: usize,
    pass: &dyn Pass,
) -> Option<Vec<Term>> {
    if at + parts.len() > fragments.len() {
        return None;
    }

    let mut captures: Vec<Option<Fragment>> = vec![None; capture_count];
    for (offset, part) in parts.iter().enumerate() {
        let fragment = &fragments[at + offset];
        match part {
            Part::Word(alternatives) => {
                let word = fragment.as_word()?;
                let lowered = word.to_lowercase();
                if !alternatives.iter().any(|alt| *alt == lowered) {
                    return None;
                }
            }
            Part::Capture(slot) => {
                captures[*slot] = Some(fragment.clone());
            }
        }
    }

    pass.apply(&captures)
}
