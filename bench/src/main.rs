#![forbid(unsafe_code)]
//! Micro-benchmarks for knnrec.
//!
//! Scenarios:
//! - `l2`: full scan of customer rows by L2 distance
//! - `l1`: the same scan by L1 (Manhattan) distance
//! - `index`: exact k-nearest-neighbor query against the brute-force index
//! - `recommend`: end-to-end recommendation for known and unknown customers

use std::env;
use std::process;
use std::time::{Duration, Instant};

use knnrec_core::{
    l1_distance, l2_distance, recommend, BruteForceIndex, InteractionMatrix, Metric,
    NeighborIndex, VectorError,
};

const DEFAULT_CUSTOMERS: usize = 5_000;
const DEFAULT_PRODUCTS: usize = 256;
const DEFAULT_TOP_N: usize = 5;
const DEFAULT_WARMUP_RUNS: usize = 8;
const DEFAULT_MEASURED_RUNS: usize = 50;

#[derive(Clone, Copy)]
struct BenchConfig {
    customers: usize,
    products: usize,
    top_n: usize,
    warmup_runs: usize,
    measured_runs: usize,
}

fn main() {
    if cfg!(debug_assertions) && env::var("KNNREC_ALLOW_DEBUG_BENCH").as_deref() != Ok("1") {
        eprintln!(
            "error=debug_build_not_allowed message=\"run `cargo run --release -p knnrec-bench`\""
        );
        process::exit(2);
    }

    let mode = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };

    let config = load_config();
    let Some(matrix) = generate_matrix(config.customers, config.products) else {
        process::exit(1);
    };
    let index = BruteForceIndex::from_matrix(&matrix, Metric::Euclidean);

    let scenario = env::var("KNNREC_BENCH_SCENARIO").unwrap_or_else(|_| "all".to_string());
    let ok = match scenario.as_str() {
        "all" => {
            run_scan_bench(mode, config, &matrix, ScanMetric::L2)
                && run_scan_bench(mode, config, &matrix, ScanMetric::L1)
                && run_index_bench(mode, config, &matrix, &index)
                && run_recommend_bench(mode, config, &matrix, &index)
        }
        "l2" => run_scan_bench(mode, config, &matrix, ScanMetric::L2),
        "l1" => run_scan_bench(mode, config, &matrix, ScanMetric::L1),
        "index" => run_index_bench(mode, config, &matrix, &index),
        "recommend" => run_recommend_bench(mode, config, &matrix, &index),
        _ => {
            eprintln!(
                "error=invalid_scenario scenario=\"{}\" allowed=\"all,l2,l1,index,recommend\"",
                scenario
            );
            false
        }
    };

    if !ok {
        process::exit(1);
    }
}

fn load_config() -> BenchConfig {
    BenchConfig {
        customers: read_usize_env_with_min("KNNREC_BENCH_CUSTOMERS", DEFAULT_CUSTOMERS, 2),
        products: read_usize_env_with_min("KNNREC_BENCH_PRODUCTS", DEFAULT_PRODUCTS, 1),
        top_n: read_usize_env_with_min("KNNREC_BENCH_TOP_N", DEFAULT_TOP_N, 1),
        warmup_runs: read_usize_env_with_min("KNNREC_BENCH_WARMUP_RUNS", DEFAULT_WARMUP_RUNS, 0),
        measured_runs: read_usize_env_with_min(
            "KNNREC_BENCH_MEASURED_RUNS",
            DEFAULT_MEASURED_RUNS,
            1,
        ),
    }
}

#[derive(Clone, Copy)]
enum ScanMetric {
    L2,
    L1,
}

impl ScanMetric {
    fn name(self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::L1 => "l1",
        }
    }

    fn distance(self, left: &[f32], right: &[f32]) -> Result<f32, VectorError> {
        match self {
            Self::L2 => l2_distance(left, right),
            Self::L1 => l1_distance(left, right),
        }
    }
}

fn run_scan_bench(
    mode: &str,
    config: BenchConfig,
    matrix: &InteractionMatrix,
    metric: ScanMetric,
) -> bool {
    let query = deterministic_row(1337, config.products);

    for _ in 0..config.warmup_runs {
        if run_scan_once(&query, matrix, metric).is_none() {
            return false;
        }
    }

    let mut elapsed_samples = Vec::with_capacity(config.measured_runs);
    let mut total_duration = Duration::from_secs(0);
    let mut last_best_distance = f32::MAX;

    for _ in 0..config.measured_runs {
        let Some((elapsed, best_distance)) = run_scan_once(&query, matrix, metric) else {
            return false;
        };
        elapsed_samples.push(elapsed.as_secs_f64() * 1_000.0);
        total_duration += elapsed;
        last_best_distance = best_distance;
    }

    let (p50_ms, p95_ms, avg_ms) = summarize_ms(&elapsed_samples);
    let total_ops = (config.measured_runs * config.customers) as f64;
    let qps = total_ops / total_duration.as_secs_f64();

    println!(
        "bench={}_scan mode={mode} customers={} products={} warmup_runs={} measured_runs={} p50_ms={p50_ms:.6} p95_ms={p95_ms:.6} avg_ms={avg_ms:.6} qps={qps:.2} best_distance={last_best_distance:.6}",
        metric.name(),
        config.customers,
        config.products,
        config.warmup_runs,
        config.measured_runs
    );

    true
}

fn run_index_bench(
    mode: &str,
    config: BenchConfig,
    matrix: &InteractionMatrix,
    index: &BruteForceIndex,
) -> bool {
    let Some(query) = matrix.row("customer-0") else {
        eprintln!("error=missing_query_customer customer=\"customer-0\"");
        return false;
    };
    let k = config.top_n + 1;

    let mut elapsed_samples = Vec::with_capacity(config.measured_runs);
    let mut total_duration = Duration::from_secs(0);
    let mut nearest = String::new();

    for run in 0..(config.warmup_runs + config.measured_runs) {
        let started_at = Instant::now();
        let neighbors = match index.nearest_neighbors(query, k) {
            Ok(value) => value,
            Err(error) => {
                eprintln!("error=nearest_neighbors_failed detail=\"{error}\"");
                return false;
            }
        };
        let elapsed = started_at.elapsed();
        if run < config.warmup_runs {
            continue;
        }
        elapsed_samples.push(elapsed.as_secs_f64() * 1_000.0);
        total_duration += elapsed;
        nearest = neighbors
            .get(1)
            .map(|neighbor| neighbor.id.clone())
            .unwrap_or_default();
    }

    let (p50_ms, p95_ms, avg_ms) = summarize_ms(&elapsed_samples);
    let qps = config.measured_runs as f64 / total_duration.as_secs_f64();

    println!(
        "bench=index_knn mode={mode} customers={} products={} k={k} warmup_runs={} measured_runs={} p50_ms={p50_ms:.6} p95_ms={p95_ms:.6} avg_ms={avg_ms:.6} qps={qps:.2} nearest=\"{nearest}\"",
        config.customers, config.products, config.warmup_runs, config.measured_runs
    );

    true
}

fn run_recommend_bench(
    mode: &str,
    config: BenchConfig,
    matrix: &InteractionMatrix,
    index: &BruteForceIndex,
) -> bool {
    for (label, customer) in [("existing", "customer-1"), ("new", "customer-unknown")] {
        let mut elapsed_samples = Vec::with_capacity(config.measured_runs);
        let mut total_duration = Duration::from_secs(0);
        let mut items = 0usize;

        for run in 0..(config.warmup_runs + config.measured_runs) {
            let started_at = Instant::now();
            let recommendation = match recommend(customer, index, matrix, config.top_n) {
                Ok(value) => value,
                Err(error) => {
                    eprintln!("error=recommend_failed customer=\"{customer}\" detail=\"{error}\"");
                    return false;
                }
            };
            let elapsed = started_at.elapsed();
            if run < config.warmup_runs {
                continue;
            }
            elapsed_samples.push(elapsed.as_secs_f64() * 1_000.0);
            total_duration += elapsed;
            items = recommendation.items.len();
        }

        let (p50_ms, p95_ms, avg_ms) = summarize_ms(&elapsed_samples);
        let qps = config.measured_runs as f64 / total_duration.as_secs_f64();

        println!(
            "bench=recommend_{label} mode={mode} customers={} products={} top_n={} warmup_runs={} measured_runs={} p50_ms={p50_ms:.6} p95_ms={p95_ms:.6} avg_ms={avg_ms:.6} qps={qps:.2} items={items}",
            config.customers,
            config.products,
            config.top_n,
            config.warmup_runs,
            config.measured_runs
        );
    }

    true
}

fn run_scan_once(
    query: &[f32],
    matrix: &InteractionMatrix,
    metric: ScanMetric,
) -> Option<(Duration, f32)> {
    let started_at = Instant::now();
    let mut best_distance = f32::MAX;

    for (_, row) in matrix.iter_rows() {
        let distance = match metric.distance(query, row) {
            Ok(value) => value,
            Err(error) => {
                eprintln!(
                    "error=distance_failed metric={} detail=\"{error}\"",
                    metric.name()
                );
                return None;
            }
        };
        best_distance = best_distance.min(distance);
    }

    Some((started_at.elapsed(), best_distance))
}

fn generate_matrix(customers: usize, products: usize) -> Option<InteractionMatrix> {
    let product_ids = (0..products).map(|id| format!("product-{id}")).collect();
    let rows = (0..customers)
        .map(|id| (format!("customer-{id}"), deterministic_row(id as u64, products)))
        .collect();

    match InteractionMatrix::new(product_ids, rows) {
        Ok(matrix) => Some(matrix),
        Err(error) => {
            eprintln!("error=matrix_build_failed detail=\"{error}\"");
            None
        }
    }
}

fn summarize_ms(samples_ms: &[f64]) -> (f64, f64, f64) {
    let p50_ms = percentile_ms(samples_ms, 0.50);
    let p95_ms = percentile_ms(samples_ms, 0.95);
    let avg_ms = samples_ms.iter().sum::<f64>() / samples_ms.len() as f64;
    (p50_ms, p95_ms, avg_ms)
}

fn percentile_ms(samples_ms: &[f64], quantile: f64) -> f64 {
    if samples_ms.is_empty() {
        return 0.0;
    }

    let mut sorted = samples_ms.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last_index = sorted.len().saturating_sub(1);
    let position = (quantile.clamp(0.0, 1.0) * last_index as f64).round() as usize;
    sorted[position]
}

// Sparse purchase counts: roughly one product in seven is owned, with 1..=5 units.
fn deterministic_row(seed: u64, products: usize) -> Vec<f32> {
    (0..products)
        .map(|index| {
            let mixed = (seed as usize)
                .wrapping_mul(31)
                .wrapping_add(index.wrapping_mul(17))
                .wrapping_add((seed as usize) ^ index);
            if mixed % 7 == 0 {
                (mixed % 5 + 1) as f32
            } else {
                0.0
            }
        })
        .collect()
}

fn read_usize_env_with_min(key: &str, default: usize, min: usize) -> usize {
    let Ok(raw) = env::var(key) else {
        return default;
    };
    let Ok(parsed) = raw.parse::<usize>() else {
        return default;
    };
    if parsed < min {
        default
    } else {
        parsed
    }
}
