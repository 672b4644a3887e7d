//! The query envelope: term tree, free-text search string, type filters,
//! result limit and an optional calendar date filter.

use serde_json::{json, Value as Json};

use crate::error::{FathomError, Result};
use crate::models::term::Term;
use crate::store::{ResultIterator, StoreRegistry};

/// Default result limit when the caller does not set one
pub const DEFAULT_LIMIT: u32 = 100_000;

/// Calendar filter applied natively by the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateFilter {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl DateFilter {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    pub fn month(year: i32, month: u32) -> Self {
        Self {
            year,
            month: Some(month),
            day: None,
        }
    }

    pub fn day(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month: Some(month),
            day: Some(day),
        }
    }
}

/// A structured query against one store
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub term: Term,
    pub search_string: String,
    pub types: Vec<String>,
    pub limit: u32,
    pub date_filter: Option<DateFilter>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            term: Term::default(),
            search_string: String::new(),
            types: Vec::new(),
            limit: DEFAULT_LIMIT,
            date_filter: None,
        }
    }
}

impl Query {
    pub fn new(term: Term) -> Self {
        Self {
            term,
            ..Self::default()
        }
    }

    pub fn with_search_string(mut self, search: impl Into<String>) -> Self {
        self.search_string = search.into();
        self
    }

    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn add_type(&mut self, ty: impl Into<String>) {
        let ty = ty.into();
        if !ty.is_empty() && !self.types.contains(&ty) {
            self.types.push(ty);
        }
    }

    /// Route this query through a registry and return a result cursor.
    /// A query no registered store claims yields an empty iterator.
    pub fn exec_in(&self, registry: &StoreRegistry) -> Result<ResultIterator> {
        match registry.store_for_query(self) {
            Some(store) => store.query(self),
            None => Ok(ResultIterator::empty()),
        }
    }

    pub fn to_json(&self) -> Json {
        let mut map = json!({
            "type": self.types,
            "limit": self.limit,
            "searchString": self.search_string,
            "term": self.term.to_json(),
        });
        if let Some(filter) = &self.date_filter {
            map["dateFilter"] = json!({
                "year": filter.year,
                "month": filter.month,
                "day": filter.day,
            });
        }
        map
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    pub fn from_json(value: &Json) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| FathomError::MalformedQueryJson("query must be an object".into()))?;

        let types = map
            .get("type")
            .and_then(Json::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Json::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let limit = map
            .get("limit")
            .and_then(Json::as_u64)
            .map(|l| l as u32)
            .unwrap_or(DEFAULT_LIMIT);

        let search_string = map
            .get("searchString")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string();

        let term = match map.get("term") {
            Some(t) => Term::from_json(t)?,
            None => Term::default(),
        };

        let date_filter = match map.get("dateFilter").and_then(Json::as_object) {
            Some(f) => Some(DateFilter {
                year: f
                    .get("year")
                    .and_then(Json::as_i64)
                    .ok_or_else(|| {
                        FathomError::MalformedQueryJson("dateFilter without year".into())
                    })? as i32,
                month: f.get("month").and_then(Json::as_u64).map(|m| m as u32),
                day: f.get("day").and_then(Json::as_u64).map(|d| d as u32),
            }),
            None => None,
        };

        Ok(Self {
            term,
            search_string,
            types,
            limit,
            date_filter,
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Json = serde_json::from_str(text)
            .map_err(|e| FathomError::MalformedQueryJson(e.to_string()))?;
        Self::from_json(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::term::{Comparator, Value};

    #[test]
    fn test_default_limit() {
        assert_eq!(Query::default().limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_add_type_deduplicates() {
        let mut query = Query::default();
        query.add_type("File");
        query.add_type("File");
        assert_eq!(query.types, vec!["File".to_string()]);
    }

    #[test]
    fn test_query_roundtrip() {
        let query = Query::new(Term::or(vec![
            Term::literal("subject", Value::String("note".into()), Comparator::Equal),
            Term::literal("", Value::String("body".into()), Comparator::Contains),
        ]))
        .with_search_string("sample")
        .with_types(vec!["File".into()])
        .with_limit(50);

        let restored = Query::from_json_str(&query.to_json_string()).unwrap();
        assert_eq!(query, restored);
    }

    #[test]
    fn test_query_roundtrip_with_date_filter() {
        let mut query = Query::default().with_search_string("report");
        query.date_filter = Some(DateFilter::month(2013, 1));

        let restored = Query::from_json_str(&query.to_json_string()).unwrap();
        assert_eq!(query, restored);
    }

    #[test]
    fn test_malformed_query_rejected() {
        assert!(Query::from_json_str("not json").is_err());
        assert!(Query::from_json_str("[1,2,3]").is_err());
        assert!(Query::from_json_str(r#"{"term": {"op": "nand", "subTerms": []}}"#).is_err());
    }
}
