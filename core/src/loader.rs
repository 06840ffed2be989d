use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::matrix::{InteractionMatrix, MatrixError};
use crate::neighbors::{BruteForceIndex, Metric};
use crate::recommend::{recommend, Recommendation, RecommendError};

mod index_blob;
mod matrix_file;

pub use index_blob::{index_checksum, IndexBlob, IndexBlobPoint, INDEX_BLOB_VERSION};

use index_blob::read_index_blob;
use matrix_file::read_interaction_matrix;

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// The artifact is missing, unreadable, or does not decode into the expected shape.
    Load { path: PathBuf, message: String },
    /// The artifacts decoded but their column layout cannot be established or disagrees.
    Schema(String),
}

impl ResourceError {
    pub(crate) fn load(path: &Path, message: impl Into<String>) -> Self {
        Self::Load {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { path, message } => {
                write!(f, "failed to load '{}': {message}", path.display())
            }
            Self::Schema(message) => write!(f, "schema error: {message}"),
        }
    }
}

impl Error for ResourceError {}

impl From<MatrixError> for ResourceError {
    fn from(value: MatrixError) -> Self {
        Self::Schema(value.to_string())
    }
}

/// Locations of the two artifacts produced by the offline training step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderPaths {
    pub matrix_path: PathBuf,
    /// When absent the index is built in memory from the interaction matrix.
    pub index_path: Option<PathBuf>,
}

/// Loaded, immutable inputs of the recommendation engine.
#[derive(Debug, Clone)]
pub struct Resources {
    pub matrix: Arc<InteractionMatrix>,
    pub index: Arc<BruteForceIndex>,
}

impl Resources {
    pub fn recommend(
        &self,
        customer_id: &str,
        top_n: usize,
    ) -> Result<Recommendation, RecommendError> {
        recommend(customer_id, self.index.as_ref(), &self.matrix, top_n)
    }
}

/// Reads each artifact at most once per loader and hands out shared handles.
#[derive(Debug)]
pub struct ResourceLoader {
    paths: LoaderPaths,
    matrix_guard: Mutex<()>,
    index_guard: Mutex<()>,
    matrix: OnceLock<Arc<InteractionMatrix>>,
    index: OnceLock<Arc<BruteForceIndex>>,
}

impl ResourceLoader {
    pub fn new(paths: LoaderPaths) -> Self {
        Self {
            paths,
            matrix_guard: Mutex::new(()),
            index_guard: Mutex::new(()),
            matrix: OnceLock::new(),
            index: OnceLock::new(),
        }
    }

    pub fn paths(&self) -> &LoaderPaths {
        &self.paths
    }

    pub fn interaction_matrix(&self) -> Result<Arc<InteractionMatrix>, ResourceError> {
        get_or_load(&self.matrix, &self.matrix_guard, || {
            read_interaction_matrix(&self.paths.matrix_path)
        })
    }

    pub fn neighbor_index(&self) -> Result<Arc<BruteForceIndex>, ResourceError> {
        get_or_load(&self.index, &self.index_guard, || match &self.paths.index_path {
            Some(path) => read_index_blob(path),
            None => {
                let matrix = self.interaction_matrix()?;
                Ok(BruteForceIndex::from_matrix(&matrix, Metric::Euclidean))
            }
        })
    }

    /// Loads both artifacts and checks that they share one product vocabulary width.
    pub fn load(&self) -> Result<Resources, ResourceError> {
        let matrix = self.interaction_matrix()?;
        let index = self.neighbor_index()?;

        if index.dimension() != matrix.dimension() {
            return Err(ResourceError::Schema(format!(
                "neighbor index dimension {} does not match product vocabulary size {}",
                index.dimension(),
                matrix.dimension()
            )));
        }

        Ok(Resources { matrix, index })
    }
}

fn get_or_load<T>(
    cell: &OnceLock<Arc<T>>,
    guard: &Mutex<()>,
    load: impl FnOnce() -> Result<T, ResourceError>,
) -> Result<Arc<T>, ResourceError> {
    if let Some(value) = cell.get() {
        return Ok(Arc::clone(value));
    }

    // The guard only serializes first access; a poisoned guard protects no data.
    let _guard = guard.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(value) = cell.get() {
        return Ok(Arc::clone(value));
    }

    let value = Arc::new(load()?);
    Ok(Arc::clone(cell.get_or_init(|| value)))
}

#[cfg(test)]
mod tests;
