//! Execution backends for the dense matrix work of the gradient trainer.
//!
//! The trainer only needs two primitives per epoch: a matrix product and the
//! masked residual `pred - target` with its sum of squares. Both backends
//! implement the same numeric contract:
//!
//! - [`HostBackend`]: plain ndarray on the calling thread
//! - [`ParallelBackend`]: row-parallel kernels on a dedicated rayon pool
//!
//! Bringing up the parallel pool may fail; [`select_backend`] then logs a
//! warning and hands back the host backend so training proceeds unchanged.

use crate::config::BackendKind;
use crate::error::{FactorizationError, Result};
use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView2, Axis, Zip};
use tracing::{debug, warn};

/// Dense kernels used by the gradient trainer
pub trait ExecutionBackend: Send + Sync {
    /// Short name for logs and the trained model record
    fn name(&self) -> &'static str;

    /// `a @ b`
    fn matmul(&self, a: ArrayView2<'_, f32>, b: ArrayView2<'_, f32>) -> Array2<f32>;

    /// Residual `predicted - target` and its sum of squares.
    ///
    /// With `observed_only` set, cells whose target is not strictly positive
    /// get a zero residual and do not count toward the sum.
    fn masked_residual(
        &self,
        predicted: &Array2<f32>,
        target: ArrayView2<'_, f32>,
        observed_only: bool,
    ) -> (Array2<f32>, f64);
}

#[inline]
fn residual_cell(pred: f32, target: f32, observed_only: bool) -> f32 {
    if observed_only && target <= 0.0 {
        0.0
    } else {
        pred - target
    }
}

/// Single-threaded backend
#[derive(Debug, Default, Clone, Copy)]
pub struct HostBackend;

impl ExecutionBackend for HostBackend {
    fn name(&self) -> &'static str {
        "host"
    }

    fn matmul(&self, a: ArrayView2<'_, f32>, b: ArrayView2<'_, f32>) -> Array2<f32> {
        a.dot(&b)
    }

    fn masked_residual(
        &self,
        predicted: &Array2<f32>,
        target: ArrayView2<'_, f32>,
        observed_only: bool,
    ) -> (Array2<f32>, f64) {
        let residual = Zip::from(predicted)
            .and(&target)
            .map_collect(|&p, &t| residual_cell(p, t, observed_only));
        let sse = residual.iter().map(|&r| (r as f64) * (r as f64)).sum::<f64>();
        (residual, sse)
    }
}

/// Backend running on its own rayon thread pool
pub struct ParallelBackend {
    pool: rayon::ThreadPool,
}

impl ParallelBackend {
    /// Build the worker pool.
    ///
    /// `threads = None` (or `Some(0)`) lets rayon choose.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("mf-worker-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| FactorizationError::DevicePlacement {
                backend: "parallel".to_string(),
                reason: e.to_string(),
            })?;
        debug!("Parallel backend ready with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ExecutionBackend for ParallelBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn matmul(&self, a: ArrayView2<'_, f32>, b: ArrayView2<'_, f32>) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros((a.nrows(), b.ncols()));
        self.pool.install(|| {
            Zip::from(out.axis_iter_mut(Axis(0)))
                .and(a.axis_iter(Axis(0)))
                .par_for_each(|mut out_row, a_row| out_row.assign(&a_row.dot(&b)));
        });
        out
    }

    fn masked_residual(
        &self,
        predicted: &Array2<f32>,
        target: ArrayView2<'_, f32>,
        observed_only: bool,
    ) -> (Array2<f32>, f64) {
        self.pool.install(|| {
            let residual = Zip::from(predicted)
                .and(&target)
                .par_map_collect(|&p, &t| residual_cell(p, t, observed_only));
            let sse = residual
                .par_iter()
                .map(|&r| (r as f64) * (r as f64))
                .sum::<f64>();
            (residual, sse)
        })
    }
}

/// Build the backend named by `kind`, falling back to the host on failure
pub fn select_backend(kind: BackendKind) -> Box<dyn ExecutionBackend> {
    match kind {
        BackendKind::Host => Box::new(HostBackend),
        BackendKind::Parallel { threads } => or_host(ParallelBackend::new(threads)),
    }
}

/// Keep a successfully built backend, otherwise warn and use [`HostBackend`]
pub fn or_host<B>(attempt: Result<B>) -> Box<dyn ExecutionBackend>
where
    B: ExecutionBackend + 'static,
{
    match attempt {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            warn!("{}; continuing on host", e);
            Box::new(HostBackend)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_host_matmul() {
        let a = array![[1.0f32, 2.0], [3.0, 4.0]];
        let b = array![[5.0f32, 6.0], [7.0, 8.0]];

        let c = HostBackend.matmul(a.view(), b.view());
        assert_eq!(c, array![[19.0, 22.0], [43.0, 50.0]]);
    }

    #[test]
    fn test_parallel_matches_host() {
        let a = Array2::from_shape_fn((7, 3), |(i, j)| (i * 3 + j) as f32 * 0.1);
        let b = Array2::from_shape_fn((3, 5), |(i, j)| (i as f32) - (j as f32) * 0.5);
        let parallel = ParallelBackend::new(Some(2)).unwrap();

        let host = HostBackend.matmul(a.view(), b.view());
        let par = parallel.matmul(a.view(), b.view());
        for (h, p) in host.iter().zip(par.iter()) {
            assert!((h - p).abs() < 1e-5);
        }

        let target = Array2::from_shape_fn((7, 5), |(i, j)| if (i + j) % 3 == 0 { 1.0 } else { 0.0 });
        let (host_res, host_sse) = HostBackend.masked_residual(&host, target.view(), true);
        let (par_res, par_sse) = parallel.masked_residual(&host, target.view(), true);
        assert_eq!(host_res, par_res);
        assert!((host_sse - par_sse).abs() < 1e-6);
    }

    #[test]
    fn test_masked_residual_ignores_unobserved() {
        let predicted = array![[0.5f32, 0.5], [0.5, 0.5]];
        let target = array![[1.0f32, 0.0], [0.0, 0.0]];

        let (residual, sse) = HostBackend.masked_residual(&predicted, target.view(), true);
        assert_eq!(residual, array![[-0.5, 0.0], [0.0, 0.0]]);
        assert!((sse - 0.25).abs() < 1e-12);

        let (_, sse_all) = HostBackend.masked_residual(&predicted, target.view(), false);
        assert!((sse_all - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_failed_placement_falls_back_to_host() {
        let failed: Result<ParallelBackend> = Err(FactorizationError::DevicePlacement {
            backend: "parallel".to_string(),
            reason: "no workers".to_string(),
        });

        let backend = or_host(failed);
        assert_eq!(backend.name(), "host");
    }

    #[test]
    fn test_select_backend() {
        assert_eq!(select_backend(BackendKind::Host).name(), "host");
        assert_eq!(
            select_backend(BackendKind::Parallel { threads: Some(2) }).name(),
            "parallel"
        );
    }
}
