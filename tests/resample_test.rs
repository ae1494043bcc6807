use ct_resample::{
    AxisAdjustment, PaddingMode, ResampleError, Resampler, ShapePlan, resize_batch_into,
    resize_factor, to_shape,
};
use ndarray::{Array3, s};

fn gradient(shape: (usize, usize, usize)) -> Array3<f32> {
    Array3::from_shape_fn(shape, |(z, y, x)| (z * 400 + y * 20 + x) as f32)
}

#[test]
fn test_exact_shape_for_arbitrary_inputs() {
    let resampler = Resampler::default();
    let targets = [(8, 8, 8), (3, 17, 9), (1, 1, 1), (20, 5, 12)];
    let factors = [None, Some((0.37, 1.9, 1.0)), Some((2.0, 0.5, 1.3))];

    for source_shape in [(7, 9, 11), (12, 4, 6)] {
        let source = gradient(source_shape);
        for target in targets {
            for factor in factors {
                let out = resampler.resize(source.view(), target, factor).unwrap();
                assert_eq!(
                    out.dim(),
                    target,
                    "source {source_shape:?}, target {target:?}, factor {factor:?}"
                );
            }
        }
    }
}

#[test]
fn test_identity_when_shape_matches() {
    let data = gradient((6, 7, 8));
    let out = to_shape(data.view(), (6, 7, 8), &PaddingMode::Reflect).unwrap();
    assert_eq!(out, data);
    assert!(ShapePlan::new((6, 7, 8), (6, 7, 8)).is_identity());
}

#[test]
fn test_crop_only_is_centered() {
    let data = gradient((10, 10, 10));
    let plan = ShapePlan::new((10, 10, 10), (8, 8, 8));
    assert_eq!(
        plan.axes,
        [AxisAdjustment::Crop {
            first: 1,
            trailing: 1
        }; 3]
    );

    let out = to_shape(data.view(), (8, 8, 8), &PaddingMode::Edge).unwrap();
    assert_eq!(out, data.slice(s![1..9, 1..9, 1..9]));
}

#[test]
fn test_pad_only_replicates_edges() {
    let data = gradient((8, 8, 8));
    let plan = ShapePlan::new((8, 8, 8), (10, 10, 10));
    assert_eq!(
        plan.axes,
        [AxisAdjustment::Pad {
            first: 1,
            trailing: 1
        }; 3]
    );

    let out = to_shape(data.view(), (10, 10, 10), &PaddingMode::Edge).unwrap();
    assert_eq!(out.slice(s![1..9, 1..9, 1..9]), data);
    for i in 0..10 {
        let inner = i.clamp(1, 8) - 1;
        assert_eq!(out[[0, i, 4]], data[[0, inner, 3]]);
        assert_eq!(out[[9, 4, i]], data[[7, 3, inner]]);
        assert_eq!(out[[i, 9, 0]], data[[inner, 7, 0]]);
    }
}

#[test]
fn test_odd_overshoot_trims_trailing_side() {
    let data = gradient((11, 8, 8));
    let plan = ShapePlan::new((11, 8, 8), (8, 8, 8));
    assert_eq!(
        plan.axes[0],
        AxisAdjustment::Crop {
            first: 1,
            trailing: 2
        }
    );
    assert_eq!(plan.axes[1], AxisAdjustment::NoChange);

    let out = to_shape(data.view(), (8, 8, 8), &PaddingMode::Edge).unwrap();
    assert_eq!(out, data.slice(s![1..9, .., ..]));
}

#[test]
fn test_resize_to_destination_shape() {
    assert_eq!(resize_factor((128, 128, 128), (64, 64, 64)), (0.5, 0.5, 0.5));

    let source = Array3::from_shape_fn((128, 128, 128), |(z, y, x)| {
        (z as f32 * 0.1).sin() + (y as f32 * 0.05).cos() + x as f32 * 0.01
    });
    let mut destination = Array3::<f32>::from_elem((64, 64, 64), f32::NAN);
    let (acc, shape) = Resampler::default()
        .resize_into(source.view(), destination.view_mut(), None, 0usize)
        .unwrap();

    assert_eq!(acc, 0);
    assert_eq!(shape, (64, 64, 64));
    assert!(destination.iter().all(|v| v.is_finite()));
    // corner-aligned: the corners of the source are kept
    assert!((destination[[0, 0, 0]] - source[[0, 0, 0]]).abs() < 1e-4);
    assert!((destination[[63, 63, 63]] - source[[127, 127, 127]]).abs() < 1e-4);
}

#[test]
fn test_explicit_factor_mismatch_is_normalized() {
    let source = Array3::from_elem((64, 64, 64), 250.0f32);
    let resampler = Resampler::default().with_order(1);
    // 64 * 0.984375 = 63, 64 * 1.015625 = 65
    let factor = (0.984375, 1.0, 1.015625);

    let mut destination = Array3::<f32>::zeros((64, 64, 64));
    let (_, shape) = resampler
        .resize_into(source.view(), destination.view_mut(), Some(factor), ())
        .unwrap();

    assert_eq!(shape, (64, 64, 64));
    assert!(destination.iter().all(|v| (v - 250.0).abs() < 1e-3));
}

#[test]
fn test_batch_into_with_accumulator() {
    let scans = [gradient((10, 12, 12)), gradient((14, 10, 10))];
    let views: Vec<_> = scans.iter().map(|s| s.view()).collect();
    let mut outputs = vec![Array3::<f32>::zeros((8, 8, 8)); 2];
    let mut destinations: Vec<_> = outputs.iter_mut().map(|o| o.view_mut()).collect();

    let (acc, shapes) = resize_batch_into(
        &Resampler::default(),
        &views,
        &mut destinations,
        Some(&[(0.8, 0.7, 0.7), (0.6, 0.8, 0.8)]),
        vec!["patient-1", "patient-2"],
    )
    .unwrap();

    assert_eq!(acc, vec!["patient-1", "patient-2"]);
    assert_eq!(shapes, vec![(8, 8, 8); 2]);
    assert!(outputs.iter().all(|o| o.iter().all(|v| v.is_finite())));
}

#[test]
fn test_invalid_parameters_are_typed_errors() {
    let source = gradient((4, 4, 4));
    let resampler = Resampler::default();

    assert_eq!(
        resampler.resize(source.view(), (4, 0, 4), None),
        Err(ResampleError::InvalidTargetShape((4, 0, 4)))
    );
    assert_eq!(
        resampler.resize(source.view(), (4, 4, 4), Some((1.0, 1.0, f64::INFINITY))),
        Err(ResampleError::InvalidResizeFactor((1.0, 1.0, f64::INFINITY)))
    );
    assert_eq!(
        resampler.with_order(9).resize(source.view(), (4, 4, 4), None),
        Err(ResampleError::UnsupportedOrder(9))
    );
}
