use mapindex_core::aggregate::Aggregator;
use mapindex_core::config::PipelineConfig;
use mapindex_core::corpus::{read_aggregate_records, read_documents, write_aggregate_records};
use mapindex_core::persist::{load_snapshot, save_snapshot, IndexPaths, IndexSnapshot, MetaFile};
use mapindex_core::tokenizer::words;
use mapindex_core::{build_index, search, DocumentLengths, DocumentRecord, Error, QuerySession, SearchOutcome, StopWords};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;

const CORPUS: &str = "doc1\tCats\tthe cat sat\ndoc2\tDogs\tthe dog sat\n";

fn docs() -> Vec<DocumentRecord> {
    read_documents(CORPUS.as_bytes()).unwrap()
}

fn aggregator(context_size: usize) -> Aggregator {
    Aggregator::new(PipelineConfig::default().with_context_size(context_size)).unwrap()
}

fn only_the(word: &str) -> bool {
    word == "the"
}

#[test]
fn cat_and_dog_corpus_indexes_sat_twice() {
    let stats = aggregator(1).aggregate(&docs());
    let index = build_index(stats, &only_the).unwrap();
    let sat = index.postings("sat").unwrap();
    assert_eq!(sat.len(), 2);
    assert_eq!(sat[0].document_id, "doc1");
    assert_eq!(sat[1].document_id, "doc2");
    assert!(sat.iter().all(|p| p.frequency == 1));
    assert_eq!(sat[0].contexts, vec!["cat sat"]);
    assert!(!index.contains("the"));
}

#[test]
fn zero_idf_keeps_insertion_order() {
    let docs = docs();
    let index = build_index(aggregator(1).aggregate(&docs), &only_the).unwrap();
    let lengths = DocumentLengths::from_documents(&docs);
    match search(&index, "sat", 2, &lengths, 10) {
        SearchOutcome::Found { document_frequency, idf, results } => {
            assert_eq!(document_frequency, 2);
            assert_eq!(idf, 0.0);
            assert!(results.iter().all(|r| r.score == 0.0));
            let ids: Vec<_> = results.iter().map(|r| r.document_id.as_str()).collect();
            assert_eq!(ids, vec!["doc1", "doc2"]);
        }
        SearchOutcome::NotFound => panic!("sat should be indexed"),
    }
}

#[test]
fn unknown_term_is_not_found() {
    let index = build_index(aggregator(1).aggregate(&docs()), &only_the).unwrap();
    let outcome = search(&index, "unicorn", 2, &DocumentLengths::new(), 10);
    assert_eq!(outcome, SearchOutcome::NotFound);
    assert!(outcome.results().is_empty());
    // stopwords are simply absent from the index
    assert!(!search(&index, "the", 2, &DocumentLengths::new(), 10).is_found());
}

#[test]
fn missing_length_defaults_to_one() {
    let index = build_index(aggregator(0).aggregate(&docs()), &only_the).unwrap();
    let mut lengths = DocumentLengths::new();
    lengths.insert("doc2".into(), 3);
    let results = search(&index, "cat", 4, &lengths, 10).results().to_vec();
    assert_eq!(results.len(), 1);
    assert!((results[0].score - (4.0f64).ln()).abs() < 1e-12);
    assert!(results[0].score.is_finite());
}

#[test]
fn malformed_aggregate_record_is_skipped() {
    let stats = aggregator(1).aggregate(&docs());
    let mut buf = Vec::new();
    write_aggregate_records(&mut buf, &stats).unwrap();
    let clean = read_aggregate_records(buf.as_slice()).unwrap();

    let mut dirty = b"doc9\tBroken\tcat\n".to_vec();
    dirty.extend_from_slice(&buf);
    let with_bad = read_aggregate_records(dirty.as_slice()).unwrap();
    assert_eq!(clean, with_bad);

    let a = build_index(clean, &only_the).unwrap();
    let b = build_index(with_bad, &only_the).unwrap();
    assert_eq!(a, b);
    assert!(a.postings("cat").unwrap().iter().all(|p| p.document_id != "doc9"));
}

#[test]
fn frequencies_sum_to_token_count() {
    let docs = vec![
        DocumentRecord { document_id: "a".into(), title: "A".into(), content: "to be or not to be, that is it".into() },
        DocumentRecord { document_id: "b".into(), title: "B".into(), content: "Rust rust RUST".into() },
    ];
    let stats = aggregator(2).aggregate(&docs);
    let mut per_doc: HashMap<&str, u32> = HashMap::new();
    for s in &stats {
        assert_eq!(s.frequency as usize, s.contexts.len());
        *per_doc.entry(s.document_id.as_str()).or_default() += s.frequency;
    }
    for d in &docs {
        assert_eq!(per_doc[d.document_id.as_str()] as usize, words(&d.content).len());
    }
}

#[test]
fn repeated_builds_are_identical() {
    let docs = docs();
    let a = build_index(aggregator(2).aggregate(&docs), &StopWords::english()).unwrap();
    let b = build_index(aggregator(2).aggregate(&docs), &StopWords::english()).unwrap();
    assert_eq!(a, b);

    let lengths = DocumentLengths::from_documents(&docs);
    let first = search(&a, "sat", 2, &lengths, 10);
    let second = search(&b, "sat", 2, &lengths, 10);
    assert_eq!(first, second);
}

#[test]
fn snapshot_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("idx"));
    let docs = docs();
    let snapshot = IndexSnapshot {
        index: build_index(aggregator(3).aggregate(&docs), &StopWords::english()).unwrap(),
        lengths: DocumentLengths::from_documents(&docs),
    };
    let meta = MetaFile {
        num_docs: 2,
        num_terms: snapshot.index.num_terms(),
        context_size: 3,
        created_at: "2024-01-01T00:00:00Z".into(),
        version: 1,
    };
    save_snapshot(&paths, &snapshot, &meta).unwrap();
    let loaded = load_snapshot(&paths).unwrap();
    assert_eq!(loaded, snapshot);

    let session = QuerySession::new(Arc::new(loaded)).unwrap();
    assert_eq!(session.num_docs(), 2);
    assert_eq!(session.search("cat", 10).results()[0].title, "Cats");
}

#[test]
fn loading_a_missing_index_reports_the_path() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    match load_snapshot(&paths) {
        Err(Error::MissingResource { path }) => assert!(path.ends_with("index.bin")),
        other => panic!("expected MissingResource, got {other:?}"),
    }
}

#[test]
fn negative_length_still_counts_as_a_document() {
    let index = build_index(aggregator(0).aggregate(&docs()), &only_the).unwrap();
    let lengths = DocumentLengths::parse("doc1:3\ndoc2:-3\n".as_bytes()).unwrap();
    let snapshot = IndexSnapshot { index, lengths };
    let session = QuerySession::new(Arc::new(snapshot)).unwrap();
    assert_eq!(session.num_docs(), 2);
    let dog = session.search("dog", 10);
    // doc2's length clamps to 1: tf = 1, idf = ln(2)
    assert!((dog.results()[0].score - (2.0f64).ln()).abs() < 1e-12);
}
