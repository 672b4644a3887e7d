//! Natural-language query parser
//!
//! A multi-pass rewrite pipeline over a list of tagged fragments. Each
//! pass declares localized patterns; fragments matching a pattern are
//! replaced by richer terms. After all passes, adjacent date components
//! fold into one date-time literal and a final tuning step lifts special
//! terms into query attributes (search string, type filters, date
//! filter, fuzzy intervals).

mod dates;
mod fold;
mod matcher;
mod passes;
mod tune;

pub use matcher::{run_pass, Fragment, Pass};

use chrono::{Local, NaiveDateTime};

use crate::models::{Comparator, Query, Term, Value};
use dates::{DatePeriodsPass, DateValuesPass, PeriodNamesPass};
use passes::{
    ComparatorsPass, DecimalValuesPass, FileNamesPass, FileSizePass, NumbersPass, PropertiesPass,
    PropertyType, SplitUnitsPass, TypeHintsPass,
};

/// Characters kept in the query for further processing but considered
/// word boundaries
const SEPARATORS: &str = ".,;:!?()[]{}<>=#+-/";

/// Parser from user text to a structured query
pub struct NaturalLangParser {
    reference: NaiveDateTime,
    detect_filename_pattern: bool,
}

impl Default for NaturalLangParser {
    fn default() -> Self {
        Self {
            reference: Local::now().naive_local(),
            detect_filename_pattern: false,
        }
    }
}

impl NaturalLangParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin "now" for offset calculations; used by tests
    pub fn with_reference(mut self, reference: NaiveDateTime) -> Self {
        self.reference = reference;
        self
    }

    /// Also rewrite shell-glob-like tokens into `filename` terms
    pub fn detect_filename_patterns(mut self) -> Self {
        self.detect_filename_pattern = true;
        self
    }

    pub fn parse(&self, text: &str) -> Query {
        let mut fragments: Vec<Fragment> = split(text)
            .into_iter()
            .map(|(word, start)| {
                let end = start + word.len();
                Fragment {
                    term: Term::literal("", Value::String(word), Comparator::Equal),
                    start,
                    end,
                }
            })
            .collect();

        self.run_passes(&mut fragments);

        let mut query = Query::default();
        let term = fuse_terms(fragments);
        query.term = tune::tune_term(term, &mut query);
        query.search_string = query.search_string.trim_end().to_string();
        query
    }

    fn run_passes(&self, fragments: &mut Vec<Fragment>) {
        // Prepare literal values
        run_pass(fragments, &SplitUnitsPass, "%1");
        run_pass(fragments, &NumbersPass, "%1");
        run_pass(fragments, &FileSizePass, "%1 %2");
        run_pass(fragments, &TypeHintsPass, "%1");

        if self.detect_filename_pattern {
            run_pass(fragments, &FileNamesPass, "%1 . %2;%1");
        }

        // Date-time periods
        run_pass(fragments, &PeriodNamesPass, "%1");

        run_pass(fragments, &DatePeriodsPass::offset(), "in %2 %1");
        run_pass(fragments, &DatePeriodsPass::inverted_offset(), "%2 %1 ago");

        run_pass(fragments, &DatePeriodsPass::fixed_day_offset(1), "tomorrow");
        run_pass(fragments, &DatePeriodsPass::fixed_day_offset(-1), "yesterday");
        run_pass(fragments, &DatePeriodsPass::fixed_day_offset(0), "today");

        run_pass(fragments, &DatePeriodsPass::fixed_value(1), "first %1");
        run_pass(fragments, &DatePeriodsPass::fixed_value(-1), "last %1 of");
        run_pass(fragments, &DatePeriodsPass::value(), "%2 %1");

        run_pass(fragments, &DatePeriodsPass::fixed_offset(1), "next %1");
        run_pass(fragments, &DatePeriodsPass::fixed_offset(-1), "last %1");

        // Setting values of date-time periods (14:30, June 6, etc)
        run_pass(
            fragments,
            &DateValuesPass::pm(),
            "at %5 : %6 pm;at %5 h pm;at %5 pm;%5 : %6 pm;%5 h pm;%5 pm",
        );
        run_pass(
            fragments,
            &DateValuesPass::am(),
            "at %5 : %6 am;at %5 : %6;at %5 h am;at %5 am;at %5;\
             %5 : %6 am;%5 : %6 : %7;%5 : %6;%5 h am;%5 h;%5 am",
        );
        run_pass(
            fragments,
            &DateValuesPass::plain(),
            "%3 of %2 %1;%3 st %2 %1;%3 nd %2 %1;%3 rd %2 %1;%3 th %2 %1;\
             in %2 %1;in %1;, %1;\
             %3 of %2;%2 %3;%2 %1;%1 - %2 - %3;%1 - %2;%3 / %2 / %1;%3 / %2",
        );

        // Fold date-time fragments into real date-time literals
        fold::fold_date_times(fragments, self.reference);

        // Decimal values
        run_pass(fragments, &DecimalValuesPass, "%1 . %2");

        // Comparators
        run_pass(
            fragments,
            &ComparatorsPass::new(Comparator::Contains),
            "contains %1;containing %1",
        );
        run_pass(
            fragments,
            &ComparatorsPass::new(Comparator::Greater),
            "greater|bigger|more than %1;at least %1;> %1;after|since %1",
        );
        run_pass(
            fragments,
            &ComparatorsPass::new(Comparator::Less),
            "smaller|less|lesser than %1;at most %1;< %1;before|until %1",
        );
        run_pass(
            fragments,
            &ComparatorsPass::new(Comparator::Equal),
            "equal|equals %1;equal to %1;= %1",
        );

        // Properties associated with any resource
        run_pass(
            fragments,
            &PropertiesPass::new("rating", PropertyType::Integer),
            "rated as %1;rated %1;score is %1;score|scored %1;having %1 stars|star",
        );
        run_pass(
            fragments,
            &PropertiesPass::new("usercomment", PropertyType::String),
            "described as %1;description|comment is %1;described|description|comment %1",
        );

        // Email-related properties
        run_pass(
            fragments,
            &PropertiesPass::new("from", PropertyType::EmailAddress),
            "sent by %1;from %1;sender is %1;sender %1",
        );
        run_pass(
            fragments,
            &PropertiesPass::new("subject", PropertyType::String),
            "title|subject is %1;title|subject %1;titled %1",
        );
        run_pass(
            fragments,
            &PropertiesPass::new("to", PropertyType::EmailAddress),
            "sent to %1;to %1;recipient is %1;recipient %1",
        );
        run_pass(
            fragments,
            &PropertiesPass::new("_k_datesent", PropertyType::DateTime),
            "sent at|on %1;sent %1",
        );
        run_pass(
            fragments,
            &PropertiesPass::new("_k_datereceived", PropertyType::DateTime),
            "received at|on %1;received %1;reception is %1",
        );

        // File-related properties
        run_pass(
            fragments,
            &PropertiesPass::new("author", PropertyType::Contact),
            "written|created|composed by %1;author is %1;by %1",
        );
        run_pass(
            fragments,
            &PropertiesPass::new("size", PropertyType::IntegerOrDouble),
            "size is %1;size %1;being %1 large;%1 large",
        );
        run_pass(
            fragments,
            &PropertiesPass::new("filename", PropertyType::String),
            "name is %1;name %1;named %1",
        );
        run_pass(
            fragments,
            &PropertiesPass::new("_k_datecreated", PropertyType::DateTime),
            "created|dated at|on|in|of %1;created|dated %1;creation date|time is %1",
        );
        run_pass(
            fragments,
            &PropertiesPass::new("_k_datemodified", PropertyType::DateTime),
            "modified|edited at|on %1;modified|edited %1;modification|edition date|time is %1",
        );

        // Tags
        run_pass(
            fragments,
            &PropertiesPass::new("tags", PropertyType::Tag),
            "tagged as %1;has tag %1;tag is %1;# %1",
        );
    }
}

/// Split user text into word fragments with byte positions; separators
/// survive as their own fragments, quoted regions stay together
fn split(query: &str) -> Vec<(String, usize)> {
    let mut parts: Vec<(String, usize)> = Vec::new();
    let mut part = String::new();
    let mut part_pos = 0usize;
    let mut between_quotes = false;

    for (i, c) in query.char_indices() {
        if !between_quotes && (c.is_whitespace() || SEPARATORS.contains(c)) {
            if !part.is_empty() {
                parts.push((std::mem::take(&mut part), part_pos));
            }
            if !c.is_whitespace() {
                parts.push((c.to_string(), i));
            }
        } else if c == '"' {
            between_quotes = !between_quotes;
        } else {
            if part.is_empty() {
                part_pos = i;
            }
            part.push(c);
        }
    }

    if !part.is_empty() {
        parts.push((part, part_pos));
    }
    parts
}

/// Combine the remaining fragments into one AND term
fn fuse_terms(fragments: Vec<Fragment>) -> Term {
    let mut terms: Vec<Term> = fragments
        .into_iter()
        .map(|f| f.term)
        .filter(|t| !t.is_empty())
        .collect();
    match terms.len() {
        0 => Term::default(),
        1 => terms.pop().unwrap(),
        _ => Term::and(terms),
    }
}
