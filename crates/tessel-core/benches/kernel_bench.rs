//! Benchmark: sequential vs rayon kernels for map, zip and reduce.

use std::time::Instant;

use tessel_core::ops::{ParallelOps, SimpleOps, TensorOps};
use tessel_core::{KernelConfig, Tensor};

fn time_per_iter(iters: usize, mut op: impl FnMut()) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        op();
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn row(label: String, simple_s: f64, par_s: f64) {
    println!(
        "{:<22} {:>10.3}ms {:>10.3}ms {:>9.1}x",
        label,
        simple_s * 1000.0,
        par_s * 1000.0,
        simple_s / par_s,
    );
}

fn main() {
    let config = match KernelConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("bad kernel config: {e}");
            std::process::exit(1);
        }
    };
    let par = match ParallelOps::from_config(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("cannot build thread pool: {e}");
            std::process::exit(1);
        }
    };

    println!("=== Tessel Kernel Benchmark ===");
    println!(
        "threshold={} threads={}\n",
        config.parallel_threshold,
        config
            .num_threads
            .map_or_else(|| format!("global({})", rayon::current_num_threads()), |n| n.to_string())
    );

    println!(
        "{:<22} {:>12} {:>12} {:>10}",
        "Case", "Simple (ms)", "Rayon (ms)", "Speedup"
    );
    println!("{}", "-".repeat(60));

    for &n in &[64usize, 256, 1024] {
        let iters = if n <= 64 { 200 } else if n <= 256 { 20 } else { 3 };
        let a = Tensor::rand_uniform(&[n, n], -1.0, 1.0);
        let at = a.transpose().unwrap_or_else(|_| a.clone());
        let bias = Tensor::rand_uniform(&[n], -1.0, 1.0);

        let simple_s = time_per_iter(iters, || {
            let _ = SimpleOps.map(f64::tanh, &at, None);
        });
        let par_s = time_per_iter(iters, || {
            let _ = par.map(f64::tanh, &at, None);
        });
        row(format!("map tanh {n}x{n}^T"), simple_s, par_s);

        let simple_s = time_per_iter(iters, || {
            let _ = SimpleOps.zip(|x, y| x * y + 1.0, &a, &bias);
        });
        let par_s = time_per_iter(iters, || {
            let _ = par.zip(|x, y| x * y + 1.0, &a, &bias);
        });
        row(format!("zip bcast {n}x{n}"), simple_s, par_s);

        let simple_s = time_per_iter(iters, || {
            let _ = SimpleOps.reduce(|x, y| x + y, 0.0, &a, &[1], None);
        });
        let par_s = time_per_iter(iters, || {
            let _ = par.reduce(|x, y| x + y, 0.0, &a, &[1], None);
        });
        row(format!("sum dim1 {n}x{n}"), simple_s, par_s);

        let simple_s = time_per_iter(iters, || {
            let _ = SimpleOps.reduce(f64::max, f64::NEG_INFINITY, &at, &[0], None);
        });
        let par_s = time_per_iter(iters, || {
            let _ = par.reduce(f64::max, f64::NEG_INFINITY, &at, &[0], None);
        });
        row(format!("max dim0 {n}x{n}^T"), simple_s, par_s);
    }
}
