//! Compiled index queries and their evaluation over a snapshot

use std::collections::HashMap;

use roaring::RoaringTreemap;

use crate::index::data::IndexData;
use crate::index::DocumentId;

/// A compiled query against the inverted index
///
/// This is the target language of the query compiler and the free-text
/// parser; evaluation walks the tree bottom-up, combining candidate
/// bitmaps and term weights.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexQuery {
    /// Every live document, weightless
    MatchAll,
    /// The empty result set
    MatchNothing,
    /// One exact dictionary term
    Term(String),
    /// OR over dictionary completions of a common stem
    Synonym(Vec<String>),
    And(Vec<IndexQuery>),
    Or(Vec<IndexQuery>),
    /// Documents matching the left operand but not the right
    AndNot(Box<IndexQuery>, Box<IndexQuery>),
    /// Ordered positional phrase; elements are `Term` or `Synonym`
    Phrase(Vec<IndexQuery>),
    /// Byte-compared constraint on a value slot
    ValueRange {
        slot: u16,
        lo: Option<Vec<u8>>,
        hi: Option<Vec<u8>>,
        lo_inclusive: bool,
        hi_inclusive: bool,
    },
}

/// Matching documents plus per-document weights
///
/// Weights come from within-document frequencies; weightless operators
/// (boolean terms, ranges, match-all) contribute membership only.
#[derive(Clone, Debug, Default)]
pub struct ResultSet {
    pub docs: RoaringTreemap,
    pub weights: HashMap<DocumentId, f64>,
}

impl ResultSet {
    fn empty() -> Self {
        Self::default()
    }

    fn weight(&self, doc: DocumentId) -> f64 {
        self.weights.get(&doc).copied().unwrap_or(0.0)
    }

    /// Documents ordered by descending weight, ties by ascending id
    pub fn ranked(&self, limit: usize) -> Vec<DocumentId> {
        let mut docs: Vec<DocumentId> = self.docs.iter().collect();
        docs.sort_by(|a, b| {
            self.weight(*b)
                .partial_cmp(&self.weight(*a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
        docs.truncate(limit);
        docs
    }
}

impl IndexQuery {
    pub fn is_match_nothing(&self) -> bool {
        matches!(self, IndexQuery::MatchNothing)
    }

    /// Combine two queries with AND, treating `None` as "no constraint"
    pub fn and_maybe(a: Option<IndexQuery>, b: Option<IndexQuery>) -> Option<IndexQuery> {
        match (a, b) {
            (Some(a), Some(b)) => Some(IndexQuery::And(vec![a, b])),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    pub fn execute(&self, data: &IndexData) -> ResultSet {
        match self {
            IndexQuery::MatchAll => ResultSet {
                docs: data.all_documents(),
                weights: HashMap::new(),
            },
            IndexQuery::MatchNothing => ResultSet::empty(),
            IndexQuery::Term(term) => execute_term(data, term),
            IndexQuery::Synonym(terms) => {
                let mut result = ResultSet::empty();
                for term in terms {
                    merge_or(&mut result, execute_term(data, term));
                }
                result
            }
            IndexQuery::And(subs) => execute_and(data, subs),
            IndexQuery::Or(subs) => {
                let mut result = ResultSet::empty();
                for sub in subs {
                    merge_or(&mut result, sub.execute(data));
                }
                result
            }
            IndexQuery::AndNot(left, right) => {
                let mut result = left.execute(data);
                let excluded = right.execute(data);
                result.docs -= &excluded.docs;
                let docs = &result.docs;
                result.weights.retain(|doc, _| docs.contains(*doc));
                result
            }
            IndexQuery::Phrase(elements) => execute_phrase(data, elements),
            IndexQuery::ValueRange {
                slot,
                lo,
                hi,
                lo_inclusive,
                hi_inclusive,
            } => execute_value_range(data, *slot, lo, hi, *lo_inclusive, *hi_inclusive),
        }
    }

    /// Position set of a phrase element within one document
    fn element_positions(&self, data: &IndexData, doc: DocumentId) -> Vec<u32> {
        match self {
            IndexQuery::Term(term) => data
                .positions(term, doc)
                .map(|p| p.to_vec())
                .unwrap_or_default(),
            IndexQuery::Synonym(terms) => {
                let mut positions: Vec<u32> = terms
                    .iter()
                    .flat_map(|t| data.positions(t, doc).unwrap_or(&[]).iter().copied())
                    .collect();
                positions.sort_unstable();
                positions.dedup();
                positions
            }
            _ => Vec::new(),
        }
    }
}

fn execute_term(data: &IndexData, term: &str) -> ResultSet {
    let mut result = ResultSet::empty();
    if let Some(list) = data.postings(term) {
        for posting in list.iter() {
            result.docs.insert(posting.doc);
            if posting.wdf > 0 {
                *result.weights.entry(posting.doc).or_insert(0.0) += posting.wdf as f64;
            }
        }
    }
    result
}

fn execute_and(data: &IndexData, subs: &[IndexQuery]) -> ResultSet {
    let mut iter = subs.iter();
    let Some(first) = iter.next() else {
        return ResultSet::empty();
    };

    let mut result = first.execute(data);
    for sub in iter {
        let other = sub.execute(data);
        result.docs &= &other.docs;
        if result.docs.is_empty() {
            return ResultSet::empty();
        }
        for (doc, weight) in other.weights {
            if result.docs.contains(doc) {
                *result.weights.entry(doc).or_insert(0.0) += weight;
            }
        }
    }
    let docs = &result.docs;
    result.weights.retain(|doc, _| docs.contains(*doc));
    result
}

fn merge_or(into: &mut ResultSet, other: ResultSet) {
    into.docs |= &other.docs;
    for (doc, weight) in other.weights {
        *into.weights.entry(doc).or_insert(0.0) += weight;
    }
}

fn execute_phrase(data: &IndexData, elements: &[IndexQuery]) -> ResultSet {
    if elements.is_empty() {
        return ResultSet::empty();
    }
    if elements.len() == 1 {
        return elements[0].execute(data);
    }

    let candidates = execute_and(data, elements);
    let mut result = ResultSet::empty();

    'docs: for doc in candidates.docs.iter() {
        let mut chains = elements[0].element_positions(data, doc);
        for element in &elements[1..] {
            let positions = element.element_positions(data, doc);
            chains = chains
                .iter()
                .map(|p| p + 1)
                .filter(|p| positions.binary_search(p).is_ok())
                .collect();
            if chains.is_empty() {
                continue 'docs;
            }
        }
        result.docs.insert(doc);
        result.weights.insert(doc, chains.len() as f64);
    }
    result
}

fn execute_value_range(
    data: &IndexData,
    slot: u16,
    lo: &Option<Vec<u8>>,
    hi: &Option<Vec<u8>>,
    lo_inclusive: bool,
    hi_inclusive: bool,
) -> ResultSet {
    let mut result = ResultSet::empty();
    for (doc, document) in data.iter_documents() {
        let Some(value) = document.slot(slot) else {
            continue;
        };
        if let Some(lo) = lo {
            let ok = if lo_inclusive {
                value >= lo.as_slice()
            } else {
                value > lo.as_slice()
            };
            if !ok {
                continue;
            }
        }
        if let Some(hi) = hi {
            let ok = if hi_inclusive {
                value <= hi.as_slice()
            } else {
                value < hi.as_slice()
            };
            if !ok {
                continue;
            }
        }
        result.docs.insert(doc);
    }
    result
}
