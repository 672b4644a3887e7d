//! Documents and the fluent builder used by extractors and indexers

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::index::sortable::serialise_f64;
use crate::tokenizer::Tokenizer;

/// Prefix for content-type boolean terms (`T` + lowercase type)
pub const TYPE_PREFIX: &str = "T";

/// Prefixes for calendar boolean terms derived from date-time slots
pub const DATE_YEAR_PREFIX: &str = "DT_Y";
pub const DATE_MONTH_PREFIX: &str = "DT_M";
pub const DATE_DAY_PREFIX: &str = "DT_D";

/// Per-term payload inside a document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TermData {
    pub wdf: u32,
    pub positions: Vec<u32>,
}

/// The unit of retrieval: a bag of terms plus value slots
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub terms: BTreeMap<String, TermData>,
    pub slots: BTreeMap<u16, Vec<u8>>,
}

impl IndexDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn slot(&self, slot: u16) -> Option<&[u8]> {
        self.slots.get(&slot).map(Vec::as_slice)
    }
}

/// Fluent accumulator operating on one document
///
/// Boolean terms carry no weight and no position; indexed text advances a
/// positional cursor so phrases can later be matched in order.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    doc: IndexDocument,
    tokenizer: Tokenizer,
    position: u32,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokenizer(tokenizer: Tokenizer) -> Self {
        Self {
            doc: IndexDocument::new(),
            tokenizer,
            position: 0,
        }
    }

    /// Add a weighted term without positional data
    pub fn add_term(&mut self, text: &str, prefix: &str) -> &mut Self {
        let term = format!("{}{}", prefix, self.tokenizer.fold(text));
        let entry = self.doc.terms.entry(term).or_default();
        entry.wdf += 1;
        self
    }

    /// Add an exact-match boolean term (no weight, no position)
    pub fn add_bool_term(&mut self, text: &str, prefix: &str) -> &mut Self {
        let term = format!("{}{}", prefix, self.tokenizer.fold(text));
        self.doc.terms.entry(term).or_default();
        self
    }

    pub fn add_bool_term_int(&mut self, value: i64, prefix: &str) -> &mut Self {
        self.add_bool_term(&value.to_string(), prefix)
    }

    /// Add the boolean content-type term used by type filters
    pub fn add_type_term(&mut self, content_type: &str) -> &mut Self {
        self.add_bool_term(&content_type.to_lowercase(), TYPE_PREFIX)
    }

    /// Tokenise text and append each token as a positional term,
    /// advancing the positional cursor
    pub fn index_text(&mut self, text: &str, prefix: Option<&str>, wdf_inc: u32) -> &mut Self {
        let prefix = prefix.unwrap_or("");
        for token in self.tokenizer.tokenize(text) {
            self.position += 1;
            let term = format!("{}{}", prefix, token);
            let entry = self.doc.terms.entry(term).or_default();
            entry.wdf += wdf_inc;
            entry.positions.push(self.position);
        }
        self
    }

    /// Store raw bytes in a value slot
    pub fn set_slot(&mut self, slot: u16, bytes: Vec<u8>) -> &mut Self {
        self.doc.slots.insert(slot, bytes);
        self
    }

    /// Store a number in a value slot using the sortable serialization
    pub fn set_slot_number(&mut self, slot: u16, value: f64) -> &mut Self {
        self.set_slot(slot, serialise_f64(value).to_vec())
    }

    /// Store a date-time in a value slot and add the calendar boolean
    /// terms the date filter compiles against
    pub fn index_datetime(&mut self, slot: u16, stamp: NaiveDateTime) -> &mut Self {
        self.set_slot_number(slot, stamp.and_utc().timestamp() as f64);
        let date = stamp.date();
        self.add_bool_term(&date.year().to_string(), DATE_YEAR_PREFIX);
        self.add_bool_term(&date.month().to_string(), DATE_MONTH_PREFIX);
        self.add_bool_term(&date.day().to_string(), DATE_DAY_PREFIX);
        self
    }

    pub fn document(&self) -> &IndexDocument {
        &self.doc
    }

    pub fn term_count(&self) -> usize {
        self.doc.term_count()
    }

    pub fn into_document(self) -> IndexDocument {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_bool_terms_have_no_weight() {
        let mut builder = DocumentBuilder::new();
        builder.add_bool_term("Note", "SU");
        let doc = builder.into_document();

        let data = doc.terms.get("SUnote").unwrap();
        assert_eq!(data.wdf, 0);
        assert!(data.positions.is_empty());
    }

    #[test]
    fn test_index_text_positions() {
        let mut builder = DocumentBuilder::new();
        builder.index_text("This is sample text", None, 1);
        let doc = builder.into_document();

        assert_eq!(doc.terms.get("sample").unwrap().positions, vec![3]);
        assert_eq!(doc.terms.get("text").unwrap().positions, vec![4]);
    }

    #[test]
    fn test_index_text_accumulates_wdf() {
        let mut builder = DocumentBuilder::new();
        builder.index_text("sample sample more sample text", None, 1);
        let doc = builder.into_document();

        let sample = doc.terms.get("sample").unwrap();
        assert_eq!(sample.wdf, 3);
        assert_eq!(sample.positions, vec![1, 2, 4]);
    }

    #[test]
    fn test_prefixed_text() {
        let mut builder = DocumentBuilder::new();
        builder.index_text("body note", Some("BO"), 1);
        let doc = builder.into_document();

        assert!(doc.terms.contains_key("BObody"));
        assert!(doc.terms.contains_key("BOnote"));
    }

    #[test]
    fn test_datetime_terms() {
        let stamp = NaiveDate::from_ymd_opt(2013, 11, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let mut builder = DocumentBuilder::new();
        builder.index_datetime(2, stamp);
        let doc = builder.into_document();

        assert!(doc.terms.contains_key("DT_Y2013"));
        assert!(doc.terms.contains_key("DT_M11"));
        assert!(doc.terms.contains_key("DT_D10"));
        assert!(doc.slot(2).is_some());
    }
}
