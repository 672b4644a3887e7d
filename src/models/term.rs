//! The term tree: boolean/comparator AST for structured queries
//!
//! Terms are plain value structs with owned children. A term is either a
//! `Literal` comparison against a property (or free text when the property
//! is empty), a `Boolean` combination, or a `Range` produced by folding
//! two comparisons over the same property into one interval.

use chrono::NaiveDateTime;
use serde_json::{json, Map, Value as Json};

use crate::error::{FathomError, Result};

/// Comparison operator attached to a literal term
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparator {
    Equal,
    Contains,
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

impl Comparator {
    /// Wire symbol used in the JSON encoding
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Equal => "=",
            Comparator::Contains => "~",
            Comparator::Greater => ">",
            Comparator::GreaterEq => ">=",
            Comparator::Less => "<",
            Comparator::LessEq => "<=",
        }
    }

    pub fn from_symbol(sym: &str) -> Option<Self> {
        match sym {
            "=" => Some(Comparator::Equal),
            "~" => Some(Comparator::Contains),
            ">" => Some(Comparator::Greater),
            ">=" => Some(Comparator::GreaterEq),
            "<" => Some(Comparator::Less),
            "<=" => Some(Comparator::LessEq),
            _ => None,
        }
    }
}

/// How much of a date-time the user actually specified
///
/// Ordered coarsest to finest; the finest specified period decides how an
/// equality comparison widens into an interval or a date filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatePrecision {
    Year,
    Month,
    Week,
    DayOfWeek,
    Day,
    Hour,
    Minute,
    Second,
}

impl DatePrecision {
    pub fn name(self) -> &'static str {
        match self {
            DatePrecision::Year => "year",
            DatePrecision::Month => "month",
            DatePrecision::Week => "week",
            DatePrecision::DayOfWeek => "dayofweek",
            DatePrecision::Day => "day",
            DatePrecision::Hour => "hour",
            DatePrecision::Minute => "minute",
            DatePrecision::Second => "second",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "year" => Some(DatePrecision::Year),
            "month" => Some(DatePrecision::Month),
            "week" => Some(DatePrecision::Week),
            "dayofweek" => Some(DatePrecision::DayOfWeek),
            "day" => Some(DatePrecision::Day),
            "hour" => Some(DatePrecision::Hour),
            "minute" => Some(DatePrecision::Minute),
            "second" => Some(DatePrecision::Second),
            _ => None,
        }
    }
}

/// Scalar value carried by a literal term
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    DateTime {
        stamp: NaiveDateTime,
        precision: DatePrecision,
    },
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view used by value-slot comparisons
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::DateTime { stamp, .. } => Some(stamp.and_utc().timestamp() as f64),
            _ => None,
        }
    }

    pub fn is_empty_string(&self) -> bool {
        matches!(self, Value::String(s) if s.is_empty())
    }

    fn to_json(&self) -> Json {
        match self {
            Value::String(s) => json!(s),
            Value::Integer(i) => json!(i),
            Value::Float(f) => json!(f),
            Value::Bool(b) => json!(b),
            Value::DateTime { stamp, precision } => json!({
                "datetime": stamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "precision": precision.name(),
            }),
        }
    }

    fn from_json(value: &Json) -> Result<Self> {
        match value {
            Json::String(s) => Ok(Value::String(s.clone())),
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else {
                    Ok(Value::Float(n.as_f64().unwrap_or(0.0)))
                }
            }
            Json::Object(map) => {
                let stamp = map
                    .get("datetime")
                    .and_then(Json::as_str)
                    .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
                    .ok_or_else(|| malformed("expected a datetime object"))?;
                let precision = map
                    .get("precision")
                    .and_then(Json::as_str)
                    .and_then(DatePrecision::from_name)
                    .ok_or_else(|| malformed("missing datetime precision"))?;
                Ok(Value::DateTime { stamp, precision })
            }
            _ => Err(malformed("unsupported value type")),
        }
    }
}

/// Boolean combination operator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

impl BoolOp {
    pub fn name(self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
            BoolOp::Not => "not",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "and" => Some(BoolOp::And),
            "or" => Some(BoolOp::Or),
            "not" => Some(BoolOp::Not),
            _ => None,
        }
    }
}

/// One node of the term tree
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Literal {
        property: String,
        value: Value,
        comparator: Comparator,
    },
    Boolean {
        op: BoolOp,
        sub_terms: Vec<Term>,
    },
    Range {
        property: String,
        lo: Value,
        hi: Value,
        lo_inclusive: bool,
        hi_inclusive: bool,
    },
}

impl Default for Term {
    /// The empty term: matches nothing on its own and is dropped by
    /// boolean parents
    fn default() -> Self {
        Term::Literal {
            property: String::new(),
            value: Value::String(String::new()),
            comparator: Comparator::Equal,
        }
    }
}

impl Term {
    pub fn literal(
        property: impl Into<String>,
        value: Value,
        comparator: Comparator,
    ) -> Self {
        Term::Literal {
            property: property.into(),
            value,
            comparator,
        }
    }

    pub fn and(sub_terms: Vec<Term>) -> Self {
        Term::Boolean {
            op: BoolOp::And,
            sub_terms,
        }
    }

    pub fn or(sub_terms: Vec<Term>) -> Self {
        Term::Boolean {
            op: BoolOp::Or,
            sub_terms,
        }
    }

    pub fn negated(term: Term) -> Self {
        Term::Boolean {
            op: BoolOp::Not,
            sub_terms: vec![term],
        }
    }

    /// True for the default "nothing here" literal
    pub fn is_empty(&self) -> bool {
        match self {
            Term::Literal {
                property, value, ..
            } => property.is_empty() && value.is_empty_string(),
            Term::Boolean { sub_terms, .. } => sub_terms.iter().all(Term::is_empty),
            Term::Range { .. } => false,
        }
    }

    pub fn property(&self) -> &str {
        match self {
            Term::Literal { property, .. } | Term::Range { property, .. } => property,
            Term::Boolean { .. } => "",
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Term::Literal {
                property,
                value,
                comparator,
            } => json!({
                "property": property,
                "value": value.to_json(),
                "comparator": comparator.symbol(),
            }),
            Term::Boolean { op, sub_terms } => json!({
                "op": op.name(),
                "subTerms": sub_terms.iter().map(Term::to_json).collect::<Vec<_>>(),
            }),
            Term::Range {
                property,
                lo,
                hi,
                lo_inclusive,
                hi_inclusive,
            } => json!({
                "property": property,
                "lo": lo.to_json(),
                "hi": hi.to_json(),
                "loInclusive": lo_inclusive,
                "hiInclusive": hi_inclusive,
            }),
        }
    }

    pub fn from_json(value: &Json) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| malformed("term must be an object"))?;

        if map.contains_key("op") {
            let op = map
                .get("op")
                .and_then(Json::as_str)
                .and_then(BoolOp::from_name)
                .ok_or_else(|| malformed("unknown boolean op"))?;
            let subs = map
                .get("subTerms")
                .and_then(Json::as_array)
                .ok_or_else(|| malformed("boolean term without subTerms"))?;
            if op == BoolOp::Not && subs.len() != 1 {
                return Err(malformed("not takes exactly one sub-term"));
            }
            let sub_terms = subs.iter().map(Term::from_json).collect::<Result<_>>()?;
            return Ok(Term::Boolean { op, sub_terms });
        }

        if map.contains_key("lo") || map.contains_key("hi") {
            return Self::range_from_json(map);
        }

        let property = map
            .get("property")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string();
        let value = Value::from_json(
            map.get("value")
                .ok_or_else(|| malformed("literal term without value"))?,
        )?;
        let comparator = map
            .get("comparator")
            .and_then(Json::as_str)
            .and_then(Comparator::from_symbol)
            .ok_or_else(|| malformed("unknown comparator"))?;

        Ok(Term::Literal {
            property,
            value,
            comparator,
        })
    }

    fn range_from_json(map: &Map<String, Json>) -> Result<Self> {
        let property = map
            .get("property")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string();
        let lo = Value::from_json(map.get("lo").ok_or_else(|| malformed("range without lo"))?)?;
        let hi = Value::from_json(map.get("hi").ok_or_else(|| malformed("range without hi"))?)?;
        Ok(Term::Range {
            property,
            lo,
            hi,
            lo_inclusive: map
                .get("loInclusive")
                .and_then(Json::as_bool)
                .unwrap_or(true),
            hi_inclusive: map
                .get("hiInclusive")
                .and_then(Json::as_bool)
                .unwrap_or(true),
        })
    }
}

fn malformed(msg: &str) -> FathomError {
    FathomError::MalformedQueryJson(msg.to_string())
}
