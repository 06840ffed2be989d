use super::*;

fn points() -> Vec<(CustomerId, Vec<f32>)> {
    vec![
        ("A".to_string(), vec![2.0, 0.0, 1.0]),
        ("B".to_string(), vec![0.0, 3.0, 1.0]),
        ("C".to_string(), vec![1.0, 1.0, 0.0]),
    ]
}

fn ids(neighbors: &[Neighbor]) -> Vec<&str> {
    neighbors.iter().map(|neighbor| neighbor.id.as_str()).collect()
}

#[test]
fn returns_neighbors_by_ascending_distance() {
    let index = BruteForceIndex::new(Metric::Euclidean, 3, points()).expect("index must build");

    let neighbors = index
        .nearest_neighbors(&[2.0, 0.0, 1.0], 3)
        .expect("query must succeed");

    assert_eq!(ids(&neighbors), vec!["A", "C", "B"]);
    assert_eq!(neighbors[0].distance, 0.0);
    assert!((neighbors[1].distance - 3.0f32.sqrt()).abs() < 1e-5);
    assert!((neighbors[2].distance - 13.0f32.sqrt()).abs() < 1e-5);
}

#[test]
fn truncates_to_k_and_caps_at_len() {
    let index = BruteForceIndex::new(Metric::Euclidean, 3, points()).expect("index must build");

    let one = index
        .nearest_neighbors(&[0.0, 3.0, 1.0], 1)
        .expect("query must succeed");
    assert_eq!(ids(&one), vec!["B"]);

    let all = index
        .nearest_neighbors(&[0.0, 3.0, 1.0], 50)
        .expect("query must succeed");
    assert_eq!(all.len(), 3);

    let none = index
        .nearest_neighbors(&[0.0, 3.0, 1.0], 0)
        .expect("query must succeed");
    assert!(none.is_empty());
}

#[test]
fn equal_distances_keep_stored_order() {
    let index = BruteForceIndex::new(
        Metric::Euclidean,
        2,
        vec![
            ("late".to_string(), vec![0.0, 1.0]),
            ("early".to_string(), vec![1.0, 0.0]),
            ("origin".to_string(), vec![0.0, 0.0]),
            ("mid".to_string(), vec![0.0, -1.0]),
        ],
    )
    .expect("index must build");

    let neighbors = index
        .nearest_neighbors(&[0.0, 0.0], 4)
        .expect("query must succeed");
    assert_eq!(ids(&neighbors), vec!["origin", "late", "early", "mid"]);

    let partial = index
        .nearest_neighbors(&[0.0, 0.0], 2)
        .expect("query must succeed");
    assert_eq!(ids(&partial), vec!["origin", "late"]);
}

#[test]
fn manhattan_metric_ranks_by_l1() {
    let index = BruteForceIndex::new(
        Metric::Manhattan,
        2,
        vec![
            ("diagonal".to_string(), vec![1.0, 1.0]),
            ("axis".to_string(), vec![1.5, 0.0]),
        ],
    )
    .expect("index must build");

    let neighbors = index
        .nearest_neighbors(&[0.0, 0.0], 2)
        .expect("query must succeed");
    assert_eq!(ids(&neighbors), vec!["axis", "diagonal"]);
    assert_eq!(neighbors[0].distance, 1.5);
    assert_eq!(neighbors[1].distance, 2.0);
}

#[test]
fn from_matrix_follows_row_order() {
    let matrix = InteractionMatrix::new(
        vec!["P1".to_string(), "P2".to_string(), "P3".to_string()],
        points(),
    )
    .expect("matrix must be valid");

    let index = BruteForceIndex::from_matrix(&matrix, Metric::Euclidean);
    assert_eq!(index.dimension(), 3);
    assert_eq!(index.ids(), matrix.customer_ids());
    let rows: Vec<(&str, &[f32])> = index.iter_points().collect();
    assert_eq!(rows[1], ("B", &[0.0, 3.0, 1.0][..]));
}

#[test]
fn empty_index_returns_no_neighbors() {
    let index = BruteForceIndex::new(Metric::Euclidean, 2, Vec::new()).expect("index must build");
    assert!(index.is_empty());
    let neighbors = index
        .nearest_neighbors(&[1.0, 1.0], 3)
        .expect("query must succeed");
    assert!(neighbors.is_empty());
}

#[test]
fn rejects_invalid_points() {
    let error = BruteForceIndex::new(Metric::Euclidean, 0, Vec::new()).expect_err("must fail");
    assert_eq!(error, IndexError::ZeroDimension);

    let error = BruteForceIndex::new(
        Metric::Euclidean,
        2,
        vec![("A".to_string(), vec![1.0])],
    )
    .expect_err("must fail");
    assert!(matches!(
        error,
        IndexError::InvalidDimension {
            expected: 2,
            got: 1,
            ..
        }
    ));

    let error = BruteForceIndex::new(
        Metric::Euclidean,
        1,
        vec![("A".to_string(), vec![1.0]), ("A".to_string(), vec![2.0])],
    )
    .expect_err("must fail");
    assert_eq!(error, IndexError::DuplicateId("A".to_string()));

    let error = BruteForceIndex::new(
        Metric::Euclidean,
        1,
        vec![("A".to_string(), vec![f32::INFINITY])],
    )
    .expect_err("must fail");
    assert!(matches!(error, IndexError::NonFiniteValue { index: 0, .. }));

    let error = BruteForceIndex::new(Metric::Euclidean, 1, vec![(String::new(), vec![1.0])])
        .expect_err("must fail");
    assert_eq!(error, IndexError::EmptyId { position: 0 });
}

#[test]
fn rejects_malformed_queries() {
    let index = BruteForceIndex::new(Metric::Euclidean, 3, points()).expect("index must build");

    let error = index
        .nearest_neighbors(&[1.0, 2.0], 2)
        .expect_err("must fail");
    assert_eq!(
        error,
        IndexError::QueryDimension {
            expected: 3,
            got: 2
        }
    );

    let error = index
        .nearest_neighbors(&[1.0, f32::NAN, 0.0], 2)
        .expect_err("must fail");
    assert_eq!(error, IndexError::NonFiniteQuery { index: 1 });
}
