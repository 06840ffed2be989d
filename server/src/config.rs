use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use knnrec_core::{LoaderPaths, DEFAULT_TOP_N};

const MATRIX_PATH_DEFAULT: &str = "data/user_item_matrix.csv";
const INDEX_PATH_DEFAULT: &str = "data/knn_index.json";
const MAX_TOP_N_DEFAULT: usize = 100;
const MAX_BATCH_DEFAULT: usize = 256;

#[derive(Debug, Clone)]
pub(crate) struct AppConfig {
    pub(crate) bind: SocketAddr,
    pub(crate) matrix_path: PathBuf,
    pub(crate) index_path: Option<PathBuf>,
    pub(crate) default_top_n: usize,
    pub(crate) max_top_n: usize,
    pub(crate) max_batch: usize,
    pub(crate) request_timeout_ms: u64,
    pub(crate) max_body_bytes: usize,
    pub(crate) max_concurrency: usize,
}

impl AppConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let bind = parse_socket_addr("KNNREC_BIND", "127.0.0.1:8080")?;
        let matrix_path = parse_path("KNNREC_MATRIX_PATH", MATRIX_PATH_DEFAULT)?;
        let index_path = parse_optional_path("KNNREC_INDEX_PATH", INDEX_PATH_DEFAULT);
        let default_top_n = parse_usize("KNNREC_DEFAULT_TOP_N", DEFAULT_TOP_N)?;
        let max_top_n = parse_usize("KNNREC_MAX_TOP_N", MAX_TOP_N_DEFAULT)?;
        let max_batch = parse_usize("KNNREC_MAX_BATCH", MAX_BATCH_DEFAULT)?;
        let request_timeout_ms = parse_u64("KNNREC_REQUEST_TIMEOUT_MS", 2000)?;
        let max_body_bytes = parse_usize("KNNREC_MAX_BODY_BYTES", 1_048_576)?;
        let max_concurrency = parse_usize("KNNREC_MAX_CONCURRENCY", 256)?;

        if default_top_n == 0 {
            anyhow::bail!("KNNREC_DEFAULT_TOP_N must be > 0");
        }
        if max_top_n == 0 {
            anyhow::bail!("KNNREC_MAX_TOP_N must be > 0");
        }
        if default_top_n > max_top_n {
            anyhow::bail!(
                "KNNREC_DEFAULT_TOP_N ({default_top_n}) must not exceed KNNREC_MAX_TOP_N ({max_top_n})"
            );
        }
        if max_batch == 0 {
            anyhow::bail!("KNNREC_MAX_BATCH must be > 0");
        }
        if max_body_bytes == 0 {
            anyhow::bail!("KNNREC_MAX_BODY_BYTES must be > 0");
        }
        if max_concurrency == 0 {
            anyhow::bail!("KNNREC_MAX_CONCURRENCY must be > 0");
        }

        Ok(Self {
            bind,
            matrix_path,
            index_path,
            default_top_n,
            max_top_n,
            max_batch,
            request_timeout_ms,
            max_body_bytes,
            max_concurrency,
        })
    }

    pub(crate) fn loader_paths(&self) -> LoaderPaths {
        LoaderPaths {
            matrix_path: self.matrix_path.clone(),
            index_path: self.index_path.clone(),
        }
    }
}

fn parse_socket_addr(key: &str, default: &str) -> Result<SocketAddr> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{key} must be a valid socket address, got '{raw}'"))
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))
}

fn parse_u64(key: &str, default: u64) -> Result<u64> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))
}

fn parse_path(key: &str, default: &str) -> Result<PathBuf> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    if raw.trim().is_empty() {
        anyhow::bail!("{key} must not be empty");
    }
    Ok(PathBuf::from(raw))
}

// An explicitly empty value opts out of the file.
fn parse_optional_path(key: &str, default: &str) -> Option<PathBuf> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    if raw.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(raw))
}
