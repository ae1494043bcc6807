//! Parallel resizing of many scans.
//!
//! Each volume is resized by an independent single-threaded call; rayon spreads
//! the calls over its thread pool. Volumes never share buffers, so no locking
//! is involved.

use ndarray::{Array3, ArrayView3, ArrayViewMut3};
use rayon::prelude::*;
use tracing::info;

use crate::resampler::{ResampleError, Resampler, ResizeFactor, Shape};

fn check_len(expected: usize, actual: usize) -> Result<(), ResampleError> {
    if expected != actual {
        return Err(ResampleError::BatchLengthMismatch { expected, actual });
    }
    Ok(())
}

/// Resizes every volume in `sources` to `target_shape`.
///
/// `factors`, when given, holds one explicit resize factor per volume.
/// Results keep the order of `sources`. When several volumes fail, the error
/// of any one of them is returned.
pub fn resize_batch(
    resampler: &Resampler,
    sources: &[ArrayView3<'_, f32>],
    target_shape: Shape,
    factors: Option<&[ResizeFactor]>,
) -> Result<Vec<Array3<f32>>, ResampleError> {
    if let Some(factors) = factors {
        check_len(sources.len(), factors.len())?;
    }
    info!(volumes = sources.len(), ?target_shape, "resizing batch");

    sources
        .par_iter()
        .enumerate()
        .map(|(i, source)| resampler.resize(source.view(), target_shape, factors.map(|f| f[i])))
        .collect()
}

/// Resizes `sources[i]` into `destinations[i]` for every `i`.
///
/// The accumulator is lent to every per-volume call and returned unchanged,
/// together with the realized shape of each destination.
///
/// On error the error of any one failing volume is returned, and
/// destinations of volumes that were resized in the meantime keep their new
/// contents. Failing volumes leave their own destination untouched.
pub fn resize_batch_into<R: Sync>(
    resampler: &Resampler,
    sources: &[ArrayView3<'_, f32>],
    destinations: &mut [ArrayViewMut3<'_, f32>],
    factors: Option<&[ResizeFactor]>,
    accumulator: R,
) -> Result<(R, Vec<Shape>), ResampleError> {
    check_len(sources.len(), destinations.len())?;
    if let Some(factors) = factors {
        check_len(sources.len(), factors.len())?;
    }
    info!(volumes = sources.len(), "resizing batch into destinations");

    let shapes = destinations
        .par_iter_mut()
        .zip(sources.par_iter())
        .enumerate()
        .map(|(i, (destination, source))| {
            let factor = factors.map(|f| f[i]);
            resampler
                .resize_into(source.view(), destination.view_mut(), factor, &accumulator)
                .map(|(_, shape)| shape)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((accumulator, shapes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::PaddingMode;
    use ndarray::Array3;

    #[test]
    fn batch_keeps_order_and_shape() {
        let volumes: Vec<_> = (0..4)
            .map(|i| Array3::from_elem((6 + i, 8, 10 - i), i as f32 * 100.0))
            .collect();
        let views: Vec<_> = volumes.iter().map(|v| v.view()).collect();

        let out = resize_batch(&Resampler::default(), &views, (5, 5, 5), None).unwrap();
        assert_eq!(out.len(), 4);
        for (i, volume) in out.iter().enumerate() {
            assert_eq!(volume.dim(), (5, 5, 5));
            assert!(volume.iter().all(|v| (v - i as f32 * 100.0).abs() < 1e-2));
        }
    }

    #[test]
    fn batch_into_threads_the_accumulator() {
        let volumes: Vec<_> = (0..3).map(|_| Array3::from_elem((9, 9, 9), 1.0f32)).collect();
        let views: Vec<_> = volumes.iter().map(|v| v.view()).collect();
        let mut outputs: Vec<_> = (0..3).map(|_| Array3::<f32>::zeros((4, 4, 4))).collect();
        let mut destinations: Vec<_> = outputs.iter_mut().map(|o| o.view_mut()).collect();
        let factors = [(0.5, 0.5, 0.5); 3];

        let resampler = Resampler::default().with_padding(PaddingMode::Constant(0.0));
        let (acc, shapes) = resize_batch_into(
            &resampler,
            &views,
            &mut destinations,
            Some(&factors),
            String::from("batch-7"),
        )
        .unwrap();

        assert_eq!(acc, "batch-7");
        assert_eq!(shapes, vec![(4, 4, 4); 3]);
        // 9 * 0.5 rounds to 4
        assert!(outputs.iter().all(|o| o.iter().all(|v| (v - 1.0).abs() < 1e-3)));
    }

    #[test]
    fn batch_rejects_mismatched_lengths() {
        let volume = Array3::<f32>::zeros((2, 2, 2));
        let views = [volume.view(), volume.view()];
        assert_eq!(
            resize_batch(
                &Resampler::default(),
                &views,
                (2, 2, 2),
                Some(&[(1.0, 1.0, 1.0)])
            ),
            Err(ResampleError::BatchLengthMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn batch_reports_a_failing_volume() {
        let good = Array3::<f32>::zeros((2, 2, 2));
        let empty = Array3::<f32>::zeros((0, 2, 2));
        let views = [good.view(), empty.view()];
        assert_eq!(
            resize_batch(&Resampler::default(), &views, (2, 2, 2), None),
            Err(ResampleError::EmptyVolume)
        );
    }

    #[test]
    fn batch_into_keeps_finished_destinations_on_error() {
        let good = Array3::from_elem((2, 2, 2), 5.0f32);
        let bad = Array3::from_elem((2, 2, 2), 5.0f32);
        let views = [bad.view(), good.view(), bad.view()];
        let mut outputs: Vec<_> = (0..3).map(|_| Array3::from_elem((2, 2, 2), -1.0f32)).collect();
        let mut destinations: Vec<_> = outputs.iter_mut().map(|o| o.view_mut()).collect();
        let factors = [(0.0, 1.0, 1.0), (1.0, 1.0, 1.0), (1.0, -1.0, 1.0)];

        let result = resize_batch_into(
            &Resampler::default(),
            &views,
            &mut destinations,
            Some(&factors),
            (),
        );

        // either failing volume may be the one reported
        let Err(ResampleError::InvalidResizeFactor(factor)) = result else {
            panic!("expected an invalid factor, got {result:?}");
        };
        assert!(factor == factors[0] || factor == factors[2]);
        drop(destinations);
        assert!(outputs[0].iter().all(|v| *v == -1.0));
        assert!(outputs[2].iter().all(|v| *v == -1.0));
        // the valid volume may or may not have been written before the error
        assert!(outputs[1].iter().all(|v| *v == -1.0 || *v == 5.0));
    }
}
