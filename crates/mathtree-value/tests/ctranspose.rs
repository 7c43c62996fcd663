use mathtree_value::{
    DataType, EvalError, Matrix, Nested, Scalar, StorageKind, Value,
};

fn complex_matrix() -> Matrix {
    let rows = Nested::Seq(vec![
        Nested::Seq(vec![
            Nested::Scalar(Scalar::complex(1.0, 2.0)),
            Nested::Scalar(Scalar::Real(3.0)),
            Nested::Scalar(Scalar::complex(0.0, -1.0)),
        ]),
        Nested::Seq(vec![
            Nested::Scalar(Scalar::Real(4.0)),
            Nested::Scalar(Scalar::complex(5.0, 6.0)),
            Nested::Scalar(Scalar::Real(0.0)),
        ]),
    ]);
    Matrix::from_nested(&rows).unwrap()
}

#[test]
fn scalar_and_vector_are_unchanged() {
    assert_eq!(Value::Num(3.0).ctranspose().unwrap(), Value::Num(3.0));

    let v = Matrix::row_vector(vec![1.0, 2.0, 3.0]);
    let t = v.ctranspose().unwrap();
    assert_eq!(t.shape(), vec![3]);
    assert_eq!(t, v);
}

#[test]
fn complex_scalar_is_conjugated() {
    assert_eq!(
        Value::complex(3.0, 4.0).ctranspose().unwrap(),
        Value::complex(3.0, -4.0)
    );
}

#[test]
fn two_dimensional_shape_swap_and_conjugate() {
    let a = complex_matrix();
    let t = a.ctranspose().unwrap();
    assert_eq!(a.shape(), vec![2, 3]);
    assert_eq!(t.shape(), vec![3, 2]);
    for i in 0..2 {
        for j in 0..3 {
            assert_eq!(t.get(&[j, i]).unwrap(), a.get(&[i, j]).unwrap().conj());
        }
    }
}

#[test]
fn rank_three_is_rejected() {
    let cube = Matrix::from_reals(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2, 1]).unwrap();
    assert!(matches!(cube.ctranspose(), Err(EvalError::Dimension(_))));
    assert!(matches!(
        Value::Matrix(cube).ctranspose(),
        Err(EvalError::Dimension(_))
    ));
}

#[test]
fn matrix_without_columns_is_rejected() {
    let degenerate = Matrix::from_reals(Vec::new(), vec![2, 0]).unwrap();
    assert!(matches!(
        degenerate.ctranspose(),
        Err(EvalError::Dimension(_))
    ));
}

#[test]
fn dense_number_stays_dense_number() {
    let a = Matrix::construct(
        Some(&Nested::from(vec![vec![1.0, 2.0], vec![3.0, 4.0]])),
        Some("dense"),
        Some("number"),
    )
    .unwrap();
    let t = a.ctranspose().unwrap();
    assert_eq!(t.storage_kind(), StorageKind::Dense);
    assert_eq!(t.datatype(), Some(DataType::Number));
    assert_eq!(t.get(&[0, 1]).unwrap(), Scalar::Real(3.0));
}

#[test]
fn sparse_keeps_storage_nnz_and_datatype() {
    let a = Matrix::construct(
        Some(&Nested::from(vec![vec![0.0, 2.0, 0.0], vec![5.0, 0.0, 7.0]])),
        Some("sparse"),
        Some("number"),
    )
    .unwrap();
    let t = a.ctranspose().unwrap();
    assert_eq!(t.storage_kind(), StorageKind::Sparse);
    assert_eq!(t.datatype(), Some(DataType::Number));
    assert_eq!(t.nnz(), a.nnz());
    assert_eq!(t.shape(), vec![3, 2]);
    assert_eq!(t.get(&[2, 1]).unwrap(), Scalar::Real(7.0));
    assert_eq!(t.get(&[1, 0]).unwrap(), Scalar::Real(2.0));
}

#[test]
fn sparse_complex_is_conjugated() {
    let a = complex_matrix().into_storage(StorageKind::Sparse).unwrap();
    let t = a.ctranspose().unwrap();
    assert_eq!(t.get(&[1, 1]).unwrap(), Scalar::complex(5.0, -6.0));
    assert_eq!(t.get(&[2, 0]).unwrap(), Scalar::complex(0.0, 1.0));
}

#[test]
fn construction_from_matrix_never_aliases() {
    let mut source = Matrix::from_nested(&Nested::from(vec![vec![1.0, 2.0]])).unwrap();
    let copy = Matrix::copy_from(&source, None, None).unwrap();
    source.set(&[0, 0], Scalar::Real(100.0)).unwrap();
    assert_eq!(copy.get(&[0, 0]).unwrap(), Scalar::Real(1.0));

    let value = Value::Matrix(copy.clone());
    let mut again = value.to_matrix(Some("sparse"), None).unwrap();
    again.set(&[0, 1], Scalar::Real(-1.0)).unwrap();
    assert_eq!(copy.get(&[0, 1]).unwrap(), Scalar::Real(2.0));
}

#[test]
fn empty_construction() {
    let dense = Matrix::construct(None, None, None).unwrap();
    assert!(dense.is_empty());
    let sparse = Matrix::construct(None, Some("sparse"), None).unwrap();
    assert_eq!(sparse.storage_kind(), StorageKind::Sparse);
    assert_eq!(sparse.shape(), vec![0, 0]);
}
