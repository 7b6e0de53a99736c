//! Shared test utilities for integration tests

use std::path::PathBuf;
use std::sync::Arc;

use sales_dash::{load_file, Dataset};

/// Load a fixture from the tests/test_data directory
pub fn load_fixture(name: &str) -> Arc<Dataset> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/test_data")
        .join(name);
    let dataset = load_file(&path)
        .unwrap_or_else(|e| panic!("Failed to load test data {}: {:#}", name, e));
    Arc::new(dataset)
}

/// Float comparison for money sums
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
