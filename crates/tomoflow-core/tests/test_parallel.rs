mod common;

use ndarray::{s, Array2, Array3, Axis};
use tomoflow_core::error::TomoError;
use tomoflow_core::filters::median_filter::median_image;
use tomoflow_core::filters::BoundaryMode;
use tomoflow_core::parallel::{
    partition, slice_kernel, slice_map, ExecutionConfig, ExecutionPlan, Executor, Strategy,
};
use tomoflow_core::progress::NoOpReporter;

use common::{make_indexed_volume, make_noise_volume, ProgressEvent, RecordingReporter};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_executor(cores: usize, chunksize: Option<usize>) -> Executor {
    Executor::new(ExecutionConfig {
        cores,
        chunksize,
        parallel: true,
    })
}

fn run_median(executor: &Executor, volume: &Array3<f32>) -> Array3<f32> {
    let kernel = slice_kernel(|mut image| {
        let filtered = median_image(image.view(), 3, BoundaryMode::Reflect);
        image.assign(&filtered);
        Ok(())
    });
    executor
        .execute(volume.clone(), &kernel, "Median", &NoOpReporter)
        .unwrap()
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[test]
fn test_partition_covers_range_in_order() {
    for (len, chunksize) in [(10, 3), (10, 5), (7, 1), (1, 4), (9, 9), (4, 10)] {
        let chunks = partition(len, chunksize);
        let mut expected_start = 0;
        for chunk in &chunks {
            assert_eq!(chunk.start, expected_start);
            assert!(!chunk.is_empty());
            assert!(chunk.len() <= chunksize);
            expected_start = chunk.end;
        }
        assert_eq!(expected_start, len);
    }
}

#[test]
fn test_partition_last_chunk_shorter() {
    assert_eq!(partition(10, 4), vec![0..4, 4..8, 8..10]);
}

#[test]
fn test_plan_sequential_cases() {
    let sequential = ExecutionPlan::new(10, &ExecutionConfig::sequential());
    assert_eq!(sequential.strategy, Strategy::Sequential);
    assert_eq!(sequential.total_units(), 10);

    let one_core = ExecutionPlan::new(10, &ExecutionConfig::with_cores(1));
    assert_eq!(one_core.strategy, Strategy::Sequential);

    let one_image = ExecutionPlan::new(1, &ExecutionConfig::with_cores(4));
    assert_eq!(one_image.strategy, Strategy::Sequential);
}

#[test]
fn test_plan_default_chunksize_splits_evenly() {
    let plan = ExecutionPlan::new(10, &ExecutionConfig::with_cores(4));
    assert_eq!(plan.strategy, Strategy::Parallel);
    assert_eq!(plan.workers, 4);
    assert_eq!(plan.chunksize, 3);
    assert_eq!(plan.chunks, vec![0..3, 3..6, 6..9, 9..10]);
}

#[test]
fn test_plan_chunksize_clamped_to_length() {
    let config = ExecutionConfig {
        cores: 2,
        chunksize: Some(100),
        parallel: true,
    };
    let plan = ExecutionPlan::new(5, &config);
    assert_eq!(plan.chunksize, 5);
    assert_eq!(plan.chunks, vec![0..5]);
}

#[test]
fn test_plan_workers_capped_by_chunk_count() {
    let plan = ExecutionPlan::new(3, &ExecutionConfig::with_cores(10_000));
    assert_eq!(plan.strategy, Strategy::Parallel);
    assert_eq!(plan.chunks.len(), 3);
    assert_eq!(plan.workers, 3);

    let config = ExecutionConfig {
        cores: 8,
        chunksize: Some(4),
        parallel: true,
    };
    assert_eq!(ExecutionPlan::new(10, &config).workers, 3);
}

// ---------------------------------------------------------------------------
// Equivalence
// ---------------------------------------------------------------------------

#[test]
fn test_parallel_matches_sequential() {
    let volume = make_noise_volume(9, 12, 10, 3);
    let expected = run_median(&Executor::sequential(), &volume);

    for cores in [1, 2, 4] {
        for chunksize in [None, Some(1), Some(2), Some(4)] {
            let result = run_median(&make_executor(cores, chunksize), &volume);
            assert_eq!(result, expected, "cores={cores} chunksize={chunksize:?}");
        }
    }
}

#[test]
fn test_each_image_transformed_once() {
    let volume = Array3::<f32>::zeros((11, 2, 2));
    let kernel = slice_kernel(|mut image| {
        image += 1.0;
        Ok(())
    });
    let result = make_executor(3, Some(2))
        .execute(volume, &kernel, "Increment", &NoOpReporter)
        .unwrap();
    assert!(result.iter().all(|&v| v == 1.0));
}

#[test]
fn test_map_preserves_image_order() {
    let volume = make_indexed_volume(13, 6, 5);
    let map = slice_map(|image| Ok(image.slice(s![1..4, ..2]).to_owned()));

    for executor in [Executor::sequential(), make_executor(4, Some(3)), make_executor(3, None)] {
        let result = executor
            .execute_map(volume.view(), &map, "Crop", &NoOpReporter)
            .unwrap();
        assert_eq!(result.dim(), (13, 3, 2));
        for (i, image) in result.outer_iter().enumerate() {
            assert!(image.iter().all(|&v| v == i as f32), "image {i} out of place");
        }
    }
}

#[test]
fn test_execute_in_place_on_permuted_view() {
    let mut volume = make_indexed_volume(4, 3, 5);
    // Row 0 of every sinogram belongs to projection 0.
    let kernel = slice_kernel(|mut sinogram| {
        assert_eq!(sinogram.dim(), (4, 5));
        sinogram.row_mut(0).fill(-1.0);
        Ok(())
    });
    make_executor(2, None)
        .execute_in_place(
            volume.view_mut().permuted_axes([1, 0, 2]),
            &kernel,
            "Sinograms",
            &NoOpReporter,
        )
        .unwrap();
    assert!(volume.index_axis(Axis(0), 0).iter().all(|&v| v == -1.0));
    for i in 1..4 {
        assert_eq!(
            volume.index_axis(Axis(0), i),
            Array2::from_elem((3, 5), i as f32)
        );
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn test_lowest_failing_chunk_reported() {
    let volume = make_indexed_volume(10, 2, 2);
    let kernel = slice_kernel(|image| {
        if image[[0, 0]] >= 5.0 {
            return Err(TomoError::Filter(format!("bad image {}", image[[0, 0]])));
        }
        Ok(())
    });

    // Chunks of 2: images 5..10 live in chunks 2, 3 and 4.
    for _ in 0..5 {
        let err = make_executor(4, Some(2))
            .execute(volume.clone(), &kernel, "Check", &NoOpReporter)
            .unwrap_err();
        match err {
            TomoError::OperationExecution { label, chunk, source } => {
                assert_eq!(label, "Check");
                assert_eq!(chunk, 2);
                assert!(matches!(*source, TomoError::Filter(_)));
            }
            other => panic!("expected OperationExecution, got {other}"),
        }
    }
}

#[test]
fn test_sequential_failure_reports_image_index() {
    let volume = make_indexed_volume(6, 2, 2);
    let kernel = slice_kernel(|image| {
        if image[[0, 0]] == 4.0 {
            return Err(TomoError::Filter("bad".into()));
        }
        Ok(())
    });
    let err = Executor::sequential()
        .execute(volume, &kernel, "Check", &NoOpReporter)
        .unwrap_err();
    assert!(matches!(err, TomoError::OperationExecution { chunk: 4, .. }));
}

#[test]
fn test_map_failure_reported() {
    let volume = make_indexed_volume(8, 2, 2);
    let map = slice_map(|image| {
        if image[[0, 0]] == 7.0 {
            return Err(TomoError::Filter("bad".into()));
        }
        Ok(image.to_owned())
    });
    let err = make_executor(2, Some(3))
        .execute_map(volume.view(), &map, "Map", &NoOpReporter)
        .unwrap_err();
    assert!(matches!(err, TomoError::OperationExecution { chunk: 2, .. }));
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[test]
fn test_progress_sequential_counts_images() {
    let reporter = RecordingReporter::default();
    let kernel = slice_kernel(|_| Ok(()));
    Executor::sequential()
        .execute(make_indexed_volume(3, 2, 2), &kernel, "Noop", &reporter)
        .unwrap();
    assert_eq!(
        reporter.events(),
        vec![
            ProgressEvent::Begin("Noop".to_string(), 3),
            ProgressEvent::Advance(1),
            ProgressEvent::Advance(2),
            ProgressEvent::Advance(3),
            ProgressEvent::Finish,
        ]
    );
}

#[test]
fn test_progress_parallel_counts_chunks() {
    let reporter = RecordingReporter::default();
    let kernel = slice_kernel(|_| Ok(()));
    make_executor(2, Some(4))
        .execute(make_indexed_volume(10, 2, 2), &kernel, "Noop", &reporter)
        .unwrap();
    assert_eq!(
        reporter.events(),
        vec![
            ProgressEvent::Begin("Noop".to_string(), 3),
            ProgressEvent::Advance(1),
            ProgressEvent::Advance(2),
            ProgressEvent::Advance(3),
            ProgressEvent::Finish,
        ]
    );
}

#[test]
fn test_progress_finished_on_failure() {
    let reporter = RecordingReporter::default();
    let kernel = slice_kernel(|_| Err(TomoError::Filter("always".into())));
    let result = make_executor(2, Some(1)).execute(
        make_indexed_volume(4, 2, 2),
        &kernel,
        "Fail",
        &reporter,
    );
    assert!(result.is_err());
    let events = reporter.events();
    assert_eq!(events.first(), Some(&ProgressEvent::Begin("Fail".to_string(), 4)));
    assert_eq!(events.last(), Some(&ProgressEvent::Finish));
}
