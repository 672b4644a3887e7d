//! Compilation of structured queries into index queries
//!
//! Each store publishes a map from property names to the prefix or value
//! slot that indexes them; compilation walks the term tree against that
//! map, attaches the free-text search string and AND-folds type filters
//! and the calendar date filter on top.

use std::collections::HashMap;

use crate::error::{FathomError, Result};
use crate::index::document::{
    DATE_DAY_PREFIX, DATE_MONTH_PREFIX, DATE_YEAR_PREFIX, TYPE_PREFIX,
};
use crate::index::{serialise_f64, IndexData, IndexQuery};
use crate::models::{BoolOp, Comparator, Query, Term, Value};
use crate::search::text::TextQueryParser;
use crate::tokenizer::Tokenizer;

/// How a property is materialised in the index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    /// Exact-match boolean terms under a prefix
    Boolean,
    /// Sortable numeric value slot
    Numeric,
    /// Sortable date-time value slot (epoch seconds)
    DateTime,
}

/// One property's indexing declaration
#[derive(Clone, Debug)]
pub struct PropertyIndexing {
    pub kind: PropertyKind,
    pub prefix: Option<String>,
    pub slot: Option<u16>,
}

/// Per-store map from property name to prefix/slot
#[derive(Clone, Debug, Default)]
pub struct PropertyMap {
    entries: HashMap<String, PropertyIndexing>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_prefix(&mut self, property: &str, prefix: &str) -> &mut Self {
        self.entries.insert(
            property.to_lowercase(),
            PropertyIndexing {
                kind: PropertyKind::Boolean,
                prefix: Some(prefix.to_string()),
                slot: None,
            },
        );
        self
    }

    pub fn insert_numeric(&mut self, property: &str, slot: u16) -> &mut Self {
        self.entries.insert(
            property.to_lowercase(),
            PropertyIndexing {
                kind: PropertyKind::Numeric,
                prefix: None,
                slot: Some(slot),
            },
        );
        self
    }

    pub fn insert_datetime(&mut self, property: &str, slot: u16) -> &mut Self {
        self.entries.insert(
            property.to_lowercase(),
            PropertyIndexing {
                kind: PropertyKind::DateTime,
                prefix: None,
                slot: Some(slot),
            },
        );
        self
    }

    pub fn get(&self, property: &str) -> Option<&PropertyIndexing> {
        self.entries.get(&property.to_lowercase())
    }

    /// The map published by the file store
    pub fn file_store_defaults() -> Self {
        let mut map = Self::new();
        map.insert_prefix("filename", "F")
            .insert_prefix("tags", "TAG")
            .insert_prefix("author", "A")
            .insert_prefix("usercomment", "C")
            .insert_numeric("size", 1)
            .insert_datetime("_k_datecreated", 2)
            .insert_datetime("_k_datemodified", 3)
            .insert_numeric("rating", 4);
        map
    }
}

/// Compiles one `Query` against one store's property map
pub struct QueryCompiler<'a> {
    map: &'a PropertyMap,
    snapshot: Option<&'a IndexData>,
    strict: bool,
    tokenizer: Tokenizer,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(map: &'a PropertyMap, snapshot: Option<&'a IndexData>) -> Self {
        Self {
            map,
            snapshot,
            strict: false,
            tokenizer: Tokenizer::default(),
        }
    }

    /// Make unknown properties a compile error instead of an empty match
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn compile(&self, query: &Query) -> Result<IndexQuery> {
        let term_query = self.compile_term(&query.term)?;

        let text_query = if query.search_string.is_empty() {
            None
        } else {
            TextQueryParser::new(self.snapshot).parse(&query.search_string)
        };

        let date_query = query.date_filter.map(|filter| {
            let mut parts = vec![IndexQuery::Term(format!(
                "{}{}",
                DATE_YEAR_PREFIX, filter.year
            ))];
            if let Some(month) = filter.month {
                parts.push(IndexQuery::Term(format!("{}{}", DATE_MONTH_PREFIX, month)));
            }
            if let Some(day) = filter.day {
                parts.push(IndexQuery::Term(format!("{}{}", DATE_DAY_PREFIX, day)));
            }
            IndexQuery::And(parts)
        });

        let base = IndexQuery::and_maybe(IndexQuery::and_maybe(term_query, text_query), date_query);

        // An empty term tree with no search string would otherwise match
        // everything; reject the accidental full scan.
        let Some(mut compiled) = base else {
            return Ok(IndexQuery::MatchNothing);
        };

        for ty in &query.types {
            let lowered = ty.to_lowercase();
            if lowered == "file" {
                continue;
            }
            compiled = IndexQuery::And(vec![
                compiled,
                IndexQuery::Term(format!("{}{}", TYPE_PREFIX, lowered)),
            ]);
        }

        Ok(compiled)
    }

    /// Compile a term tree node; `None` means "no constraint"
    pub fn compile_term(&self, term: &Term) -> Result<Option<IndexQuery>> {
        if term.is_empty() {
            return Ok(None);
        }

        match term {
            Term::Boolean { op, sub_terms } => self.compile_boolean(*op, sub_terms),
            Term::Literal {
                property,
                value,
                comparator,
            } => {
                if property.is_empty() {
                    self.compile_free_literal(value, *comparator)
                } else {
                    self.compile_property_literal(property, value, *comparator)
                }
            }
            Term::Range {
                property,
                lo,
                hi,
                lo_inclusive,
                hi_inclusive,
            } => self.compile_range(property, lo, hi, *lo_inclusive, *hi_inclusive),
        }
    }

    fn compile_boolean(&self, op: BoolOp, sub_terms: &[Term]) -> Result<Option<IndexQuery>> {
        let mut compiled = Vec::with_capacity(sub_terms.len());
        for sub in sub_terms {
            if let Some(q) = self.compile_term(sub)? {
                compiled.push(q);
            }
        }
        if compiled.is_empty() {
            return Ok(None);
        }

        Ok(Some(match op {
            BoolOp::And => IndexQuery::And(compiled),
            BoolOp::Or => IndexQuery::Or(compiled),
            BoolOp::Not => {
                let inner = if compiled.len() == 1 {
                    compiled.remove(0)
                } else {
                    IndexQuery::Or(compiled)
                };
                IndexQuery::AndNot(Box::new(IndexQuery::MatchAll), Box::new(inner))
            }
        }))
    }

    fn compile_free_literal(
        &self,
        value: &Value,
        comparator: Comparator,
    ) -> Result<Option<IndexQuery>> {
        match comparator {
            Comparator::Contains | Comparator::Equal => {
                let text = value_display(value);
                Ok(TextQueryParser::new(self.snapshot).parse(&text))
            }
            _ => Err(FathomError::UnsupportedComparator {
                property: String::new(),
                comparator: comparator.symbol().to_string(),
            }),
        }
    }

    fn compile_property_literal(
        &self,
        property: &str,
        value: &Value,
        comparator: Comparator,
    ) -> Result<Option<IndexQuery>> {
        let Some(indexing) = self.map.get(property) else {
            if self.strict {
                return Err(FathomError::UnknownProperty(property.to_string()));
            }
            return Ok(Some(IndexQuery::MatchNothing));
        };

        match indexing.kind {
            PropertyKind::Boolean => {
                let prefix = indexing.prefix.as_deref().unwrap_or("");
                match comparator {
                    Comparator::Equal => {
                        let folded = self.tokenizer.fold(&value_display(value));
                        Ok(Some(IndexQuery::Term(format!("{}{}", prefix, folded))))
                    }
                    Comparator::Contains => Ok(TextQueryParser::new(self.snapshot)
                        .with_prefix(prefix)
                        .parse(&value_display(value))),
                    _ => Err(FathomError::UnsupportedComparator {
                        property: property.to_string(),
                        comparator: comparator.symbol().to_string(),
                    }),
                }
            }
            PropertyKind::Numeric | PropertyKind::DateTime => {
                let slot = indexing.slot.unwrap_or_default();
                let number = value_number(value).ok_or_else(|| {
                    FathomError::UnsupportedComparator {
                        property: property.to_string(),
                        comparator: comparator.symbol().to_string(),
                    }
                })?;
                self.slot_comparison(property, slot, number, comparator)
                    .map(Some)
            }
        }
    }

    fn slot_comparison(
        &self,
        property: &str,
        slot: u16,
        value: f64,
        comparator: Comparator,
    ) -> Result<IndexQuery> {
        let encoded = serialise_f64(value).to_vec();
        let range = match comparator {
            Comparator::Equal => IndexQuery::ValueRange {
                slot,
                lo: Some(encoded.clone()),
                hi: Some(encoded),
                lo_inclusive: true,
                hi_inclusive: true,
            },
            Comparator::Greater => IndexQuery::ValueRange {
                slot,
                lo: Some(encoded),
                hi: None,
                lo_inclusive: false,
                hi_inclusive: true,
            },
            Comparator::GreaterEq => IndexQuery::ValueRange {
                slot,
                lo: Some(encoded),
                hi: None,
                lo_inclusive: true,
                hi_inclusive: true,
            },
            Comparator::Less => IndexQuery::ValueRange {
                slot,
                lo: None,
                hi: Some(encoded),
                lo_inclusive: true,
                hi_inclusive: false,
            },
            Comparator::LessEq => IndexQuery::ValueRange {
                slot,
                lo: None,
                hi: Some(encoded),
                lo_inclusive: true,
                hi_inclusive: true,
            },
            Comparator::Contains => {
                return Err(FathomError::UnsupportedComparator {
                    property: property.to_string(),
                    comparator: comparator.symbol().to_string(),
                })
            }
        };
        Ok(range)
    }

    fn compile_range(
        &self,
        property: &str,
        lo: &Value,
        hi: &Value,
        lo_inclusive: bool,
        hi_inclusive: bool,
    ) -> Result<Option<IndexQuery>> {
        let Some(indexing) = self.map.get(property) else {
            if self.strict {
                return Err(FathomError::UnknownProperty(property.to_string()));
            }
            return Ok(Some(IndexQuery::MatchNothing));
        };
        if indexing.kind == PropertyKind::Boolean {
            return Err(FathomError::UnsupportedComparator {
                property: property.to_string(),
                comparator: "range".to_string(),
            });
        }

        let slot = indexing.slot.unwrap_or_default();
        Ok(Some(IndexQuery::ValueRange {
            slot,
            lo: value_number(lo).map(|v| serialise_f64(v).to_vec()),
            hi: value_number(hi).map(|v| serialise_f64(v).to_vec()),
            lo_inclusive,
            hi_inclusive,
        }))
    }
}

fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::DateTime { stamp, .. } => stamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        other => other.as_f64(),
    }
}
