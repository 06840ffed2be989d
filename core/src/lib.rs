#![forbid(unsafe_code)]
//! Core of knnrec: nearest-neighbor product recommendations.
//!
//! The crate loads two artifacts produced by an offline training step, an
//! interaction matrix and a neighbor index, and answers "what should this
//! customer buy next" with either a neighbor-vote ranking or, for unknown
//! customers, a popularity ranking.

pub mod loader;
pub mod matrix;
pub mod neighbors;
pub mod recommend;
pub mod vector;

pub use loader::{
    index_checksum, IndexBlob, IndexBlobPoint, LoaderPaths, ResourceError, ResourceLoader,
    Resources, INDEX_BLOB_VERSION,
};
pub use matrix::{CustomerId, InteractionMatrix, MatrixError, ProductId};
pub use neighbors::{BruteForceIndex, IndexError, Metric, Neighbor, NeighborIndex};
pub use recommend::{recommend, Classification, Recommendation, RecommendError, DEFAULT_TOP_N};
pub use vector::{l1_distance, l2_distance, VectorError, VectorSide};
