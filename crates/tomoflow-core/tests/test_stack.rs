use ndarray::{Array2, Array3, ArrayD, IxDyn};
use tomoflow_core::error::TomoError;
use tomoflow_core::operation::{ParamValue, Roi, StackParameter, StackParameterProvider};
use tomoflow_core::stack::{DataType, ImageStack};

#[test]
fn test_new_stack() {
    let stack = ImageStack::new(Array3::zeros((5, 3, 4))).unwrap();
    assert_eq!(stack.num_images(), 5);
    assert_eq!(stack.image_dim(), (3, 4));
    assert_eq!(stack.dtype(), DataType::Float32);
    assert!(stack.flat().is_none());
    assert!(stack.dark().is_none());
    assert!(stack.operation_history().is_empty());
}

#[test]
fn test_empty_stack_rejected() {
    assert!(matches!(
        ImageStack::new(Array3::zeros((0, 3, 4))),
        Err(TomoError::EmptyStack)
    ));
}

#[test]
fn test_from_dyn_requires_three_dimensions() {
    let flat = ArrayD::<f32>::zeros(IxDyn(&[4, 4]));
    match ImageStack::from_dyn(flat) {
        Err(TomoError::InvalidShape { ndim, shape }) => {
            assert_eq!(ndim, 2);
            assert_eq!(shape, vec![4, 4]);
        }
        other => panic!("expected InvalidShape, got {other:?}"),
    }

    let volume = ArrayD::<f32>::zeros(IxDyn(&[2, 4, 4]));
    assert_eq!(ImageStack::from_dyn(volume).unwrap().num_images(), 2);
}

#[test]
fn test_reference_images_promoted_to_volumes() {
    let stack = ImageStack::new(Array3::zeros((2, 3, 3)))
        .unwrap()
        .with_reference_images(Array2::ones((3, 3)), Array2::zeros((3, 3)))
        .unwrap();
    assert_eq!(stack.flat().unwrap().dim(), (1, 3, 3));
    assert_eq!(stack.dark().unwrap().dim(), (1, 3, 3));
}

#[test]
fn test_empty_reference_rejected() {
    let result = ImageStack::new(Array3::zeros((2, 3, 3)))
        .unwrap()
        .with_references(Array3::zeros((0, 3, 3)), Array3::zeros((1, 3, 3)));
    assert!(matches!(result, Err(TomoError::EmptyStack)));
}

#[test]
fn test_roi_provided_as_stack_parameter() {
    let mut stack = ImageStack::new(Array3::zeros((1, 8, 8))).unwrap();
    assert_eq!(stack.parameter(StackParameter::Roi), None);

    stack.set_roi(Some(Roi::new(1, 2, 3, 4)));
    let value = stack.parameter(StackParameter::Roi).unwrap();
    assert_eq!(
        value,
        ParamValue::List(vec![
            ParamValue::Int(1),
            ParamValue::Int(2),
            ParamValue::Int(3),
            ParamValue::Int(4),
        ])
    );
    assert_eq!(Roi::from_param(&value), Some(Roi::new(1, 2, 3, 4)));
}

#[test]
fn test_roi_geometry() {
    let roi = Roi::new(2, 1, 6, 4);
    assert_eq!(roi.width(), 4);
    assert_eq!(roi.height(), 3);
    assert!(roi.fits(4, 6));
    assert!(!roi.fits(3, 6));
    assert!(Roi::new(3, 0, 3, 4).is_empty());
    assert_eq!(roi.to_string(), "2,1,6,4");
}
