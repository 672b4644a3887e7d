//! Query model: the term tree and the query envelope around it

mod query;
mod term;

pub use query::{DateFilter, Query, DEFAULT_LIMIT};
pub use term::{BoolOp, Comparator, DatePrecision, Term, Value};
