//! End-to-end store scenarios: indexing, structured queries, cursors

use std::path::Path;
use std::sync::Arc;

use fathom::config::StoreConfig;
use fathom::index::{DocumentBuilder, DocumentId, IndexDocument};
use fathom::models::{Comparator, DateFilter, Query, Term, Value};
use fathom::search::PropertyMap;
use fathom::store::runner::deserialize_result_id;
use fathom::store::{IndexStore, StoreRegistry};
use tempfile::TempDir;

const NOTE_TYPE: &str = "text/x-vnd.akonadi.note";

fn file_store(tmp: &TempDir) -> Arc<IndexStore> {
    let config = StoreConfig::new(tmp.path(), "file").with_types(vec!["File".into()]);
    IndexStore::open_file_store(config).unwrap()
}

fn note_store(tmp: &TempDir) -> Arc<IndexStore> {
    let config = StoreConfig::new(tmp.path(), "akonadi").with_types(vec![NOTE_TYPE.into()]);
    let mut map = PropertyMap::new();
    map.insert_prefix("subject", "SU").insert_prefix("body", "BO");
    IndexStore::open(config, map).unwrap()
}

fn body_doc(body: &str) -> IndexDocument {
    let mut builder = DocumentBuilder::new();
    builder.index_text(body, None, 1);
    builder.into_document()
}

fn note_doc(subject: &str, body: &str) -> IndexDocument {
    let mut builder = DocumentBuilder::new();
    for word in subject.split_whitespace() {
        builder.add_bool_term(word, "SU");
    }
    builder.index_text(body, Some("BO"), 1);
    builder.add_type_term(NOTE_TYPE);
    builder.into_document()
}

fn collect_ids(store: &Arc<IndexStore>, query: &Query) -> Vec<DocumentId> {
    let iter = store.query(query).unwrap();
    let mut ids = Vec::new();
    while iter.next() {
        ids.push(iter.document_id().unwrap());
    }
    ids
}

fn subject_eq(value: &str) -> Term {
    Term::literal("subject", Value::String(value.into()), Comparator::Equal)
}

fn body_eq(value: &str) -> Term {
    Term::literal("body", Value::String(value.into()), Comparator::Equal)
}

#[test]
fn scenario_term_frequency_ranking() {
    let tmp = TempDir::new().unwrap();
    let store = file_store(&tmp);

    let a = store.create_path_mapping(Path::new("/home/t/a")).unwrap();
    let b = store.create_path_mapping(Path::new("/home/t/b")).unwrap();
    store
        .apply_batch(
            &[
                (a, body_doc("This is sample text")),
                (b, body_doc("sample sample more sample text")),
            ],
            &[],
        )
        .unwrap();

    let query = Query::default()
        .with_types(vec!["File".into()])
        .with_search_string("Sample");
    let iter = store.query(&query).unwrap();

    assert!(iter.next());
    assert_eq!(deserialize_result_id(&iter.id()), Some(("file".into(), b)));
    assert_eq!(iter.path(), Some(Path::new("/home/t/b").to_path_buf()));

    assert!(iter.next());
    assert_eq!(deserialize_result_id(&iter.id()), Some(("file".into(), a)));

    assert!(!iter.next());
    assert!(iter.id().is_empty());
    assert_eq!(iter.path(), None);
}

#[test]
fn scenario_boolean_subject_body() {
    let tmp = TempDir::new().unwrap();
    let store = note_store(&tmp);

    store
        .apply_batch(
            &[
                (1000, note_doc("note", "body note")),
                (1001, note_doc("note2", "note")),
                (1002, note_doc("note3", "note3")),
            ],
            &[],
        )
        .unwrap();

    let with_type = |term: Term| Query::new(term).with_types(vec![NOTE_TYPE.into()]);

    let mut ids = collect_ids(
        &store,
        &with_type(Term::or(vec![subject_eq("note"), body_eq("note")])),
    );
    ids.sort();
    assert_eq!(ids, vec![1000, 1001]);

    let ids = collect_ids(
        &store,
        &with_type(Term::and(vec![subject_eq("note3"), body_eq("note3")])),
    );
    assert_eq!(ids, vec![1002]);

    let mut ids = collect_ids(&store, &with_type(Term::negated(subject_eq("note3"))));
    ids.sort();
    assert_eq!(ids, vec![1000, 1001]);
}

#[test]
fn scenario_numeric_ranges() {
    let tmp = TempDir::new().unwrap();
    let store = file_store(&tmp);

    let sizes = [1000.0, 1002.0, 1002.0, 1002.0, 1002.0];
    let adds: Vec<(DocumentId, IndexDocument)> = sizes
        .iter()
        .enumerate()
        .map(|(i, size)| {
            let mut builder = DocumentBuilder::new();
            builder.set_slot_number(1, *size);
            builder.index_text("message", None, 1);
            ((i + 1) as DocumentId, builder.into_document())
        })
        .collect();
    store.apply_batch(&adds, &[]).unwrap();

    let size_query = |cmp: Comparator, v: i64| {
        Query::new(Term::literal("size", Value::Integer(v), cmp))
    };

    let mut ids = collect_ids(&store, &size_query(Comparator::GreaterEq, 1001));
    ids.sort();
    assert_eq!(ids, vec![2, 3, 4, 5]);

    let ids = collect_ids(&store, &size_query(Comparator::Equal, 1000));
    assert_eq!(ids, vec![1]);

    let mut ids = collect_ids(&store, &size_query(Comparator::LessEq, 1002));
    ids.sort();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    // The fuzzy interval produced for "size is 1000" spans all five
    let fuzzy = Query::new(Term::Range {
        property: "size".into(),
        lo: Value::Integer(800),
        hi: Value::Integer(1200),
        lo_inclusive: true,
        hi_inclusive: true,
    });
    let mut ids = collect_ids(&store, &fuzzy);
    ids.sort();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn scenario_phrase_search() {
    let tmp = TempDir::new().unwrap();
    let store = file_store(&tmp);

    let a = store.create_path_mapping(Path::new("/home/t/a")).unwrap();
    let b = store.create_path_mapping(Path::new("/home/t/b")).unwrap();
    store
        .apply_batch(
            &[
                (a, body_doc("This is sample text")),
                (b, body_doc("sample sample more sample")),
            ],
            &[],
        )
        .unwrap();

    let query = Query::default()
        .with_types(vec!["File".into()])
        .with_search_string("\"sample text\"");
    assert_eq!(collect_ids(&store, &query), vec![a]);
}

#[test]
fn scenario_date_filter() {
    let tmp = TempDir::new().unwrap();
    let store = file_store(&tmp);

    let january = chrono::NaiveDate::from_ymd_opt(2013, 1, 17)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let november = chrono::NaiveDate::from_ymd_opt(2013, 11, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();

    let doc = |stamp| {
        let mut builder = DocumentBuilder::new();
        builder.index_text("report", None, 1);
        builder.index_datetime(2, stamp);
        builder.into_document()
    };
    store
        .apply_batch(&[(1, doc(january)), (2, doc(november))], &[])
        .unwrap();

    let mut query = Query::default().with_search_string("report");
    query.date_filter = Some(DateFilter::month(2013, 1));
    assert_eq!(collect_ids(&store, &query), vec![1]);

    let mut query = Query::default().with_search_string("report");
    query.date_filter = Some(DateFilter::year(2013));
    assert_eq!(collect_ids(&store, &query).len(), 2);
}

#[test]
fn accent_folding_matches_both_ways() {
    let tmp = TempDir::new().unwrap();
    let store = file_store(&tmp);

    store
        .apply_batch(
            &[(1, body_doc("mälmöö")), (2, body_doc("malmoo plain"))],
            &[],
        )
        .unwrap();

    let query = Query::default().with_search_string("malmoo");
    let mut ids = collect_ids(&store, &query);
    ids.sort();
    assert_eq!(ids, vec![1, 2]);

    let query = Query::default().with_search_string("mälmöö");
    let mut ids = collect_ids(&store, &query);
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn file_type_filter_is_wildcard() {
    let tmp = TempDir::new().unwrap();
    let store = file_store(&tmp);

    store.apply_batch(&[(1, body_doc("wildcard test"))], &[]).unwrap();

    let untyped = Query::default().with_search_string("wildcard");
    let typed = untyped.clone().with_types(vec!["File".into()]);
    assert_eq!(collect_ids(&store, &untyped), collect_ids(&store, &typed));
}

#[test]
fn empty_query_returns_no_results() {
    let tmp = TempDir::new().unwrap();
    let store = file_store(&tmp);
    store.apply_batch(&[(1, body_doc("content"))], &[]).unwrap();

    let query = Query::default().with_types(vec!["File".into()]);
    assert!(collect_ids(&store, &query).is_empty());
}

#[test]
fn registry_routes_by_type() {
    let file_tmp = TempDir::new().unwrap();
    let note_tmp = TempDir::new().unwrap();

    let files = file_store(&file_tmp);
    files.apply_batch(&[(1, body_doc("file content"))], &[]).unwrap();
    let notes = note_store(&note_tmp);
    notes
        .apply_batch(&[(1000, note_doc("note", "note body"))], &[])
        .unwrap();

    let registry = StoreRegistry::new();
    registry.install(files);
    registry.install(notes);

    let query = Query::new(subject_eq("note")).with_types(vec![NOTE_TYPE.into()]);
    let iter = query.exec_in(&registry).unwrap();
    assert!(iter.next());
    assert_eq!(
        deserialize_result_id(&iter.id()),
        Some(("akonadi".into(), 1000))
    );

    // A type nobody claims yields an empty iterator
    let query = Query::default()
        .with_search_string("anything")
        .with_types(vec!["Email".into()]);
    let iter = query.exec_in(&registry).unwrap();
    assert!(!iter.next());
}

#[test]
fn batch_visibility_and_replacement() {
    let tmp = TempDir::new().unwrap();
    let store = file_store(&tmp);

    store
        .apply_batch(&[(1, body_doc("first version")), (2, body_doc("other"))], &[])
        .unwrap();
    store
        .apply_batch(&[(1, body_doc("second version"))], &[2])
        .unwrap();

    let snapshot = store.reader().reopen().unwrap();
    assert!(snapshot.contains(1));
    assert!(!snapshot.contains(2));

    // The replaced document no longer matches its old terms
    let query = Query::default().with_search_string("first");
    assert!(collect_ids(&store, &query).is_empty());
    let query = Query::default().with_search_string("second");
    assert_eq!(collect_ids(&store, &query), vec![1]);
}

#[test]
fn rename_keeps_id_and_updates_path() {
    let tmp = TempDir::new().unwrap();
    let store = file_store(&tmp);

    let id = store.create_path_mapping(Path::new("/home/t/old")).unwrap();
    store.apply_batch(&[(id, body_doc("movable"))], &[]).unwrap();

    store.rename_path(id, Path::new("/home/t/new")).unwrap();

    let query = Query::default().with_search_string("movable");
    let iter = store.query(&query).unwrap();
    assert!(iter.next());
    assert_eq!(iter.path(), Some(Path::new("/home/t/new").to_path_buf()));
}

#[test]
fn remove_path_forgets_document() {
    let tmp = TempDir::new().unwrap();
    let store = file_store(&tmp);

    let id = store.create_path_mapping(Path::new("/home/t/gone")).unwrap();
    store.apply_batch(&[(id, body_doc("ephemeral"))], &[]).unwrap();

    let removed = store.remove_path(Path::new("/home/t/gone")).unwrap();
    assert_eq!(removed, Some(id));
    store.apply_batch(&[], &[id]).unwrap();

    assert_eq!(store.id_for_path(Path::new("/home/t/gone")).unwrap(), None);
    let query = Query::default().with_search_string("ephemeral");
    assert!(collect_ids(&store, &query).is_empty());
}
