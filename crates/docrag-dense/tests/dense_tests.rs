use docrag_core::error::Error;
use docrag_dense::DenseIndex;

#[test]
fn insert_rejects_wrong_dimensionality() {
    let mut index = DenseIndex::new(3).expect("index");
    match index.insert(vec![1.0, 0.0]) {
        Err(Error::DimensionMismatch { expected, got }) => {
            assert_eq!(expected, 3);
            assert_eq!(got, 2);
        }
        other => panic!("expected DimensionMismatch, got {other:?}"),
    }
}

#[test]
fn search_rejects_wrong_query_dimensionality() {
    let mut index = DenseIndex::new(2).expect("index");
    index.insert(vec![1.0, 0.0]).expect("insert");
    assert!(matches!(
        index.search(&[1.0, 0.0, 0.0], 1, None),
        Err(Error::DimensionMismatch { .. })
    ));
}

#[test]
fn nearest_vector_ranks_first() {
    let mut index = DenseIndex::new(2).expect("index");
    index.insert(vec![1.0, 0.0]).expect("insert");
    index.insert(vec![0.0, 1.0]).expect("insert");
    index.insert(vec![0.7, 0.7]).expect("insert");

    let hits = index.search(&[1.0, 0.1], 3, None).expect("search");
    assert_eq!(hits[0].ord, 0);
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn vectors_are_normalized_once_at_insert() {
    let mut index = DenseIndex::new(2).expect("index");
    // Same direction, wildly different magnitude.
    index.insert(vec![100.0, 0.0]).expect("insert");
    let hits = index.search(&[2.0, 0.0], 1, None).expect("search");
    assert!((hits[0].score - 1.0).abs() < 1e-5);
}

#[test]
fn filtered_ordinals_are_skipped_before_scoring() {
    let mut index = DenseIndex::new(2).expect("index");
    index.insert(vec![1.0, 0.0]).expect("insert");
    index.insert(vec![0.9, 0.1]).expect("insert");
    let mask = vec![false, true];
    let hits = index.search(&[1.0, 0.0], 2, Some(&mask)).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].ord, 1);
}

#[test]
fn ties_break_by_ordinal_ascending() {
    let mut index = DenseIndex::new(2).expect("index");
    index.insert(vec![1.0, 0.0]).expect("insert");
    index.insert(vec![1.0, 0.0]).expect("insert");
    let hits = index.search(&[1.0, 0.0], 2, None).expect("search");
    assert_eq!(hits[0].ord, 0);
    assert_eq!(hits[1].ord, 1);
}

#[test]
fn from_stored_keeps_vectors_as_is() {
    let stored = vec![vec![0.6, 0.8], vec![1.0, 0.0]];
    let index = DenseIndex::from_stored(2, stored.clone()).expect("load");
    assert_eq!(index.vectors(), stored.as_slice());
}
