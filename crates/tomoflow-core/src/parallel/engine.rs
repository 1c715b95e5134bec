use std::sync::mpsc;
use std::time::Instant;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut2, ArrayViewMut3, Axis};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::error::{Result, TomoError};
use crate::progress::ProgressReporter;

use super::plan::{ExecutionConfig, ExecutionPlan, Strategy};

/// In-place transform of a single image.
pub trait SliceKernel: Send + Sync {
    fn apply(&self, image: ArrayViewMut2<'_, f32>) -> Result<()>;
}

/// Transform of a single image into a new, possibly differently-shaped, image.
pub trait SliceMap: Send + Sync {
    fn map(&self, image: ArrayView2<'_, f32>) -> Result<Array2<f32>>;
}

/// Adapter turning a closure into a [`SliceKernel`].
pub struct FnKernel<F>(F);

impl<F> SliceKernel for FnKernel<F>
where
    F: for<'a> Fn(ArrayViewMut2<'a, f32>) -> Result<()> + Send + Sync,
{
    fn apply(&self, image: ArrayViewMut2<'_, f32>) -> Result<()> {
        (self.0)(image)
    }
}

pub fn slice_kernel<F>(f: F) -> FnKernel<F>
where
    F: for<'a> Fn(ArrayViewMut2<'a, f32>) -> Result<()> + Send + Sync,
{
    FnKernel(f)
}

/// Adapter turning a closure into a [`SliceMap`].
pub struct FnMap<F>(F);

impl<F> SliceMap for FnMap<F>
where
    F: for<'a> Fn(ArrayView2<'a, f32>) -> Result<Array2<f32>> + Send + Sync,
{
    fn map(&self, image: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        (self.0)(image)
    }
}

pub fn slice_map<F>(f: F) -> FnMap<F>
where
    F: for<'a> Fn(ArrayView2<'a, f32>) -> Result<Array2<f32>> + Send + Sync,
{
    FnMap(f)
}

/// Runs per-image transforms over a stack, sequentially or on a worker pool.
///
/// Both paths apply the transform to each image exactly once and in
/// isolation, so their outputs are bit-identical. In parallel mode the
/// stack's single backing buffer is split into disjoint chunks along axis 0;
/// each worker only ever sees its own chunk.
#[derive(Clone, Debug, Default)]
pub struct Executor {
    config: ExecutionConfig,
}

impl Executor {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    pub fn sequential() -> Self {
        Self::new(ExecutionConfig::sequential())
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn plan(&self, len: usize) -> ExecutionPlan {
        ExecutionPlan::new(len, &self.config)
    }

    /// Apply `kernel` to every image of `data`, returning the transformed array.
    ///
    /// On failure `data` is dropped; callers pass a working copy so nothing
    /// partially transformed can leak into a stack.
    pub fn execute<K>(
        &self,
        mut data: Array3<f32>,
        kernel: &K,
        label: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<Array3<f32>>
    where
        K: SliceKernel + ?Sized,
    {
        self.execute_in_place(data.view_mut(), kernel, label, progress)?;
        Ok(data)
    }

    /// Apply `kernel` to every image along axis 0 of a mutable view.
    ///
    /// The view may be a permutation of a larger array, e.g. to process
    /// sinograms instead of projections.
    pub fn execute_in_place<K>(
        &self,
        data: ArrayViewMut3<'_, f32>,
        kernel: &K,
        label: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<()>
    where
        K: SliceKernel + ?Sized,
    {
        let plan = self.plan(data.len_of(Axis(0)));
        log_plan(label, &plan);
        let start = Instant::now();
        progress.begin(label, plan.total_units());
        let result = match plan.strategy {
            Strategy::Sequential => run_sequential(data, kernel, label, progress),
            Strategy::Parallel => run_parallel(data, kernel, &plan, label, progress),
        };
        progress.finish();
        debug!(
            label,
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Operation finished"
        );
        result
    }

    /// Map every image of `data` through `map` and stack the results in
    /// input order.
    pub fn execute_map<M>(
        &self,
        data: ArrayView3<'_, f32>,
        map: &M,
        label: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<Array3<f32>>
    where
        M: SliceMap + ?Sized,
    {
        let plan = self.plan(data.len_of(Axis(0)));
        log_plan(label, &plan);
        let start = Instant::now();
        progress.begin(label, plan.total_units());
        let images = match plan.strategy {
            Strategy::Sequential => map_sequential(data, map, label, progress),
            Strategy::Parallel => map_parallel(data, map, &plan, label, progress),
        };
        progress.finish();
        debug!(
            label,
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = images.is_ok(),
            "Operation finished"
        );
        assemble(images?)
    }
}

fn log_plan(label: &str, plan: &ExecutionPlan) {
    info!(
        label,
        strategy = %plan.strategy,
        workers = plan.workers,
        chunksize = plan.chunksize,
        chunks = plan.chunks.len(),
        "Starting operation"
    );
}

fn chunk_error(label: &str, chunk: usize, source: TomoError) -> TomoError {
    TomoError::OperationExecution {
        label: label.to_string(),
        chunk,
        source: Box::new(source),
    }
}

/// Report the failure of the lowest-indexed chunk, independent of which
/// worker happened to finish first.
fn first_failure(mut failures: Vec<(usize, TomoError)>, label: &str) -> Result<()> {
    failures.sort_by_key(|(index, _)| *index);
    match failures.into_iter().next() {
        Some((index, source)) => Err(chunk_error(label, index, source)),
        None => Ok(()),
    }
}

fn build_pool(workers: usize) -> Result<ThreadPool> {
    Ok(ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("tomoflow-worker-{i}"))
        .build()?)
}

fn run_sequential<K>(
    mut data: ArrayViewMut3<'_, f32>,
    kernel: &K,
    label: &str,
    progress: &dyn ProgressReporter,
) -> Result<()>
where
    K: SliceKernel + ?Sized,
{
    for (index, image) in data.outer_iter_mut().enumerate() {
        kernel
            .apply(image)
            .map_err(|e| chunk_error(label, index, e))?;
        progress.advance(index + 1);
    }
    Ok(())
}

fn apply_chunk<K>(mut chunk: ArrayViewMut3<'_, f32>, kernel: &K) -> Result<()>
where
    K: SliceKernel + ?Sized,
{
    for image in chunk.outer_iter_mut() {
        kernel.apply(image)?;
    }
    Ok(())
}

fn run_parallel<K>(
    mut data: ArrayViewMut3<'_, f32>,
    kernel: &K,
    plan: &ExecutionPlan,
    label: &str,
    progress: &dyn ProgressReporter,
) -> Result<()>
where
    K: SliceKernel + ?Sized,
{
    let pool = build_pool(plan.workers)?;
    let chunks: Vec<ArrayViewMut3<'_, f32>> = data
        .axis_chunks_iter_mut(Axis(0), plan.chunksize)
        .collect();
    let (tx, rx) = mpsc::channel();
    let mut failures = Vec::new();

    pool.in_place_scope(|scope| {
        for (index, chunk) in chunks.into_iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let outcome = apply_chunk(chunk, kernel);
                // The receiver is drained until every sender is gone.
                let _ = tx.send((index, outcome));
            });
        }
        drop(tx);

        for (done, (index, outcome)) in rx.iter().enumerate() {
            if let Err(e) = outcome {
                failures.push((index, e));
            }
            progress.advance(done + 1);
        }
    });

    first_failure(failures, label)
}

fn map_sequential<M>(
    data: ArrayView3<'_, f32>,
    map: &M,
    label: &str,
    progress: &dyn ProgressReporter,
) -> Result<Vec<Array2<f32>>>
where
    M: SliceMap + ?Sized,
{
    let mut images = Vec::with_capacity(data.len_of(Axis(0)));
    for (index, image) in data.outer_iter().enumerate() {
        images.push(map.map(image).map_err(|e| chunk_error(label, index, e))?);
        progress.advance(index + 1);
    }
    Ok(images)
}

fn map_chunk<M>(chunk: ArrayView3<'_, f32>, map: &M) -> Result<Vec<Array2<f32>>>
where
    M: SliceMap + ?Sized,
{
    chunk.outer_iter().map(|image| map.map(image)).collect()
}

fn map_parallel<M>(
    data: ArrayView3<'_, f32>,
    map: &M,
    plan: &ExecutionPlan,
    label: &str,
    progress: &dyn ProgressReporter,
) -> Result<Vec<Array2<f32>>>
where
    M: SliceMap + ?Sized,
{
    let pool = build_pool(plan.workers)?;
    let (tx, rx) = mpsc::channel();
    let mut slots: Vec<Option<Vec<Array2<f32>>>> = vec![None; plan.chunks.len()];
    let mut failures = Vec::new();

    pool.in_place_scope(|scope| {
        for (index, chunk) in data.axis_chunks_iter(Axis(0), plan.chunksize).enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let outcome = map_chunk(chunk, map);
                let _ = tx.send((index, outcome));
            });
        }
        drop(tx);

        for (done, (index, outcome)) in rx.iter().enumerate() {
            match outcome {
                Ok(images) => slots[index] = Some(images),
                Err(e) => failures.push((index, e)),
            }
            progress.advance(done + 1);
        }
    });

    first_failure(failures, label)?;
    // Reassemble by chunk position, never by completion order.
    Ok(slots.into_iter().flatten().flatten().collect())
}

fn assemble(images: Vec<Array2<f32>>) -> Result<Array3<f32>> {
    let views: Vec<ArrayView2<'_, f32>> = images.iter().map(|image| image.view()).collect();
    Ok(ndarray::stack(Axis(0), &views)?)
}
