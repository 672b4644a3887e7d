//! Final term-tree tuning
//!
//! Lifts special terms into query attributes: free string literals join
//! the search string, type hints become type filters, numeric equality
//! widens to a fuzzy interval, date-time literals become the native
//! calendar date filter.

use crate::models::{Comparator, DateFilter, DatePrecision, Query, Term, Value};

/// Tune one term, mutating the query; returns the surviving term
/// (possibly empty)
pub fn tune_term(term: Term, query: &mut Query) -> Term {
    let mut term = match term {
        Term::Boolean { op, sub_terms } => {
            let tuned: Vec<Term> = sub_terms
                .into_iter()
                .map(|sub| tune_term(sub, query))
                .filter(|sub| !sub.is_empty())
                .collect();
            match tuned.len() {
                0 => return Term::default(),
                1 => {
                    let mut tuned = tuned;
                    tuned.pop().unwrap()
                }
                _ => return Term::Boolean { op, sub_terms: tuned },
            }
        }
        other => other,
    };

    // A resource type hint becomes a type filter
    if term.property() == "_k_typehint" {
        if let Term::Literal {
            value: Value::String(hint),
            ..
        } = &term
        {
            if query.types.is_empty() {
                query.add_type(hint.clone());
            }
            return Term::default();
        }
    }

    // Free literals: strings join the search string, bare numbers read
    // as sizes, bare date-times as creation dates
    if let Term::Literal {
        property,
        value,
        comparator,
    } = &mut term
    {
        if property.is_empty() {
            match value {
                Value::String(s) => {
                    query.search_string.push_str(s);
                    query.search_string.push(' ');
                    return Term::default();
                }
                Value::Integer(_) => *property = "size".to_string(),
                Value::DateTime { .. } => *property = "_k_datecreated".to_string(),
                _ => {}
            }
        }

        // Numeric equality is fuzzy: compare against the value ±20%
        if *comparator == Comparator::Equal {
            if let Value::Integer(v) = value {
                let v = *v;
                return Term::Range {
                    property: std::mem::take(property),
                    lo: Value::Integer(v * 80 / 100),
                    hi: Value::Integer(v * 120 / 100),
                    lo_inclusive: true,
                    hi_inclusive: true,
                };
            }
        }
    }

    // Date-time equality runs through the store's native date filter;
    // other comparators survive as property literals for the slot
    // compiler to turn into ranges
    if let Term::Literal {
        value: Value::DateTime { stamp, precision },
        comparator: Comparator::Equal,
        ..
    } = &term
    {
        if query.date_filter.is_none() {
            let date = stamp.date();
            use chrono::Datelike;
            query.date_filter = match precision {
                DatePrecision::Year => Some(DateFilter::year(date.year())),
                DatePrecision::Month => Some(DateFilter::month(date.year(), date.month())),
                DatePrecision::Week
                | DatePrecision::DayOfWeek
                | DatePrecision::Day => Some(DateFilter::day(date.year(), date.month(), date.day())),
                _ => None,
            };
        }
        return Term::default();
    }

    term
}
