use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use super::*;
use crate::recommend::Classification;

const SAMPLE_CSV: &str = "CustomerID,P1,P2,P3\nA,2,0,1\nB,0,3,1\nC,1,1,0\n";

fn test_root(prefix: &str) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock must be monotonic")
        .as_nanos();

    let root = std::env::temp_dir().join(format!("knnrec_{prefix}_{timestamp}"));
    fs::create_dir_all(&root).expect("temp directory should be creatable");
    root
}

fn cleanup(root: &Path) {
    if root.exists() {
        fs::remove_dir_all(root).expect("temp directory should be removable");
    }
}

fn write_file(root: &Path, name: &str, contents: &str) -> PathBuf {
    let path = root.join(name);
    fs::write(&path, contents).expect("fixture should be writable");
    path
}

fn sample_blob() -> serde_json::Value {
    let points: [(&str, [f32; 3]); 3] = [
        ("A", [2.0, 0.0, 1.0]),
        ("B", [0.0, 3.0, 1.0]),
        ("C", [1.0, 1.0, 0.0]),
    ];
    let checksum = index_checksum(points.iter().map(|(id, values)| (*id, &values[..])));
    json!({
        "version": INDEX_BLOB_VERSION,
        "metric": "euclidean",
        "dimension": 3,
        "checksum": checksum,
        "points": points
            .iter()
            .map(|(id, values)| json!({"id": id, "values": values}))
            .collect::<Vec<_>>(),
    })
}

fn loader(matrix_path: PathBuf, index_path: Option<PathBuf>) -> ResourceLoader {
    ResourceLoader::new(LoaderPaths {
        matrix_path,
        index_path,
    })
}

#[test]
fn loads_matrix_from_csv() {
    let root = test_root("matrix_csv");
    let matrix_path = write_file(&root, "matrix.csv", SAMPLE_CSV);

    let matrix = loader(matrix_path, None)
        .interaction_matrix()
        .expect("matrix must load");

    assert_eq!(matrix.products(), &["P1", "P2", "P3"].map(String::from)[..]);
    assert_eq!(matrix.customer_ids(), &["A", "B", "C"].map(String::from)[..]);
    assert_eq!(matrix.row("B"), Some(&[0.0, 3.0, 1.0][..]));
    cleanup(&root);
}

#[test]
fn customer_ids_are_kept_verbatim() {
    let root = test_root("matrix_ids");
    let matrix_path = write_file(
        &root,
        "matrix.csv",
        "CustomerID,85123A,71053\n12346.0,1, 2.5\n00042,0,1\n",
    );

    let matrix = loader(matrix_path, None)
        .interaction_matrix()
        .expect("matrix must load");

    assert!(matrix.contains("12346.0"));
    assert!(matrix.contains("00042"));
    assert!(!matrix.contains("42"));
    assert_eq!(matrix.row("12346.0"), Some(&[1.0, 2.5][..]));
    cleanup(&root);
}

#[test]
fn missing_matrix_file_is_a_load_error() {
    let root = test_root("matrix_missing");
    let error = loader(root.join("absent.csv"), None)
        .interaction_matrix()
        .expect_err("must fail");
    assert!(matches!(error, ResourceError::Load { .. }));
    cleanup(&root);
}

#[test]
fn non_numeric_cell_is_a_load_error() {
    let root = test_root("matrix_nan");
    let matrix_path = write_file(&root, "matrix.csv", "id,P1,P2\nA,1,lots\n");

    let error = loader(matrix_path, None)
        .interaction_matrix()
        .expect_err("must fail");

    match error {
        ResourceError::Load { message, .. } => {
            assert!(message.contains("line 2"), "{message}");
            assert!(message.contains("'P2'"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
    cleanup(&root);
}

#[test]
fn ragged_row_is_a_load_error() {
    let root = test_root("matrix_ragged");
    let matrix_path = write_file(&root, "matrix.csv", "id,P1,P2\nA,1\n");

    let error = loader(matrix_path, None)
        .interaction_matrix()
        .expect_err("must fail");
    assert!(matches!(error, ResourceError::Load { .. }));
    cleanup(&root);
}

#[test]
fn header_without_products_is_a_schema_error() {
    let root = test_root("matrix_no_products");
    let matrix_path = write_file(&root, "matrix.csv", "CustomerID\nA\nB\n");

    let error = loader(matrix_path, None)
        .interaction_matrix()
        .expect_err("must fail");
    assert!(matches!(error, ResourceError::Schema(_)));
    cleanup(&root);
}

#[test]
fn empty_matrix_file_is_a_schema_error() {
    let root = test_root("matrix_empty");
    let matrix_path = write_file(&root, "matrix.csv", "");

    let error = loader(matrix_path, None)
        .interaction_matrix()
        .expect_err("must fail");
    assert!(matches!(error, ResourceError::Schema(_)));
    cleanup(&root);
}

#[test]
fn duplicate_customer_or_negative_count_is_a_schema_error() {
    let root = test_root("matrix_schema");
    let duplicate = write_file(&root, "duplicate.csv", "id,P1\nA,1\nA,2\n");
    let negative = write_file(&root, "negative.csv", "id,P1\nA,-1\n");

    for path in [duplicate, negative] {
        let error = loader(path, None)
            .interaction_matrix()
            .expect_err("must fail");
        assert!(matches!(error, ResourceError::Schema(_)));
    }
    cleanup(&root);
}

#[test]
fn loads_index_blob() {
    let root = test_root("index_blob");
    let matrix_path = write_file(&root, "matrix.csv", SAMPLE_CSV);
    let index_path = write_file(&root, "index.json", &sample_blob().to_string());

    let resources = loader(matrix_path, Some(index_path))
        .load()
        .expect("resources must load");

    assert_eq!(resources.index.len(), 3);
    assert_eq!(resources.index.metric(), Metric::Euclidean);
    let result = resources.recommend("A", 2).expect("recommend must succeed");
    assert_eq!(result.items, vec!["P2".to_string()]);
    assert_eq!(result.classification, Classification::Existing);
    cleanup(&root);
}

#[test]
fn index_blob_without_checksum_or_metric_uses_defaults() {
    let root = test_root("index_defaults");
    let index_path = write_file(
        &root,
        "index.json",
        &json!({
            "version": 1,
            "dimension": 2,
            "points": [{"id": "x", "values": [1.0, 0.0]}],
        })
        .to_string(),
    );

    let index = loader(root.join("unused.csv"), Some(index_path))
        .neighbor_index()
        .expect("index must load");
    assert_eq!(index.metric(), Metric::Euclidean);
    assert_eq!(index.dimension(), 2);
    cleanup(&root);
}

#[test]
fn corrupt_index_blobs_are_load_errors() {
    let root = test_root("index_corrupt");

    let mut bad_version = sample_blob();
    bad_version["version"] = json!(99);
    let mut bad_checksum = sample_blob();
    bad_checksum["points"][0]["values"][0] = json!(7.0);
    let mut bad_dimension = sample_blob();
    bad_dimension["dimension"] = json!(4);
    bad_dimension
        .as_object_mut()
        .expect("blob must be an object")
        .remove("checksum");

    let cases = [
        ("garbage.json", "not json".to_string()),
        ("version.json", bad_version.to_string()),
        ("checksum.json", bad_checksum.to_string()),
        ("dimension.json", bad_dimension.to_string()),
    ];
    for (name, contents) in cases {
        let index_path = write_file(&root, name, &contents);
        let error = loader(root.join("unused.csv"), Some(index_path))
            .neighbor_index()
            .expect_err("must fail");
        assert!(
            matches!(error, ResourceError::Load { .. }),
            "{name}: unexpected {error}"
        );
    }

    let error = loader(root.join("unused.csv"), Some(root.join("absent.json")))
        .neighbor_index()
        .expect_err("must fail");
    assert!(matches!(error, ResourceError::Load { .. }));
    cleanup(&root);
}

#[test]
fn index_and_matrix_width_must_agree() {
    let root = test_root("index_width");
    let matrix_path = write_file(&root, "matrix.csv", "id,P1,P2\nA,1,0\n");
    let index_path = write_file(&root, "index.json", &sample_blob().to_string());

    let error = loader(matrix_path, Some(index_path))
        .load()
        .expect_err("must fail");
    assert!(matches!(error, ResourceError::Schema(_)));
    cleanup(&root);
}

#[test]
fn index_is_built_from_matrix_when_no_blob_is_configured() {
    let root = test_root("index_from_matrix");
    let matrix_path = write_file(&root, "matrix.csv", SAMPLE_CSV);

    let resources = loader(matrix_path, None)
        .load()
        .expect("resources must load");

    assert_eq!(resources.index.ids(), resources.matrix.customer_ids());
    let result = resources.recommend("Z", 2).expect("recommend must succeed");
    assert_eq!(result.items, vec!["P2".to_string(), "P1".to_string()]);
    assert_eq!(result.classification, Classification::New);
    cleanup(&root);
}

#[test]
fn repeated_loads_reuse_the_first_result() {
    let root = test_root("memoized");
    let matrix_path = write_file(&root, "matrix.csv", SAMPLE_CSV);
    let index_path = write_file(&root, "index.json", &sample_blob().to_string());
    let loader = loader(matrix_path.clone(), Some(index_path.clone()));

    let first = loader.load().expect("resources must load");
    fs::remove_file(&matrix_path).expect("fixture should be removable");
    fs::remove_file(&index_path).expect("fixture should be removable");
    let second = loader.load().expect("memoized resources must load");

    assert!(Arc::ptr_eq(&first.matrix, &second.matrix));
    assert!(Arc::ptr_eq(&first.index, &second.index));
    cleanup(&root);
}

#[test]
fn concurrent_first_access_loads_once() {
    let root = test_root("concurrent");
    let matrix_path = write_file(&root, "matrix.csv", SAMPLE_CSV);
    let loader = loader(matrix_path, None);

    let loaded: Vec<Resources> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| loader.load())).collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .expect("loader thread must not panic")
                    .expect("resources must load")
            })
            .collect()
    });

    for resources in &loaded[1..] {
        assert!(Arc::ptr_eq(&loaded[0].matrix, &resources.matrix));
        assert!(Arc::ptr_eq(&loaded[0].index, &resources.index));
    }
    cleanup(&root);
}

#[test]
fn failed_load_is_not_memoized() {
    let root = test_root("retry");
    let matrix_path = root.join("matrix.csv");
    let loader = loader(matrix_path.clone(), None);

    assert!(loader.interaction_matrix().is_err());
    fs::write(&matrix_path, SAMPLE_CSV).expect("fixture should be writable");
    let matrix = loader.interaction_matrix().expect("matrix must load");
    assert_eq!(matrix.len(), 3);
    cleanup(&root);
}
