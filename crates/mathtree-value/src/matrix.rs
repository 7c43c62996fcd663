//! Dense and sparse matrix storage.
//!
//! Dense matrices are n-dimensional and stored row-major. Sparse matrices are
//! two-dimensional and stored in compressed sparse column form. Both carry an
//! optional [`DataType`] tag; operations that only rearrange elements keep it.

use crate::error::{EvalError, Result};
use crate::scalar::Scalar;
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Dense,
    Sparse,
}

impl StorageKind {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "dense" => Ok(StorageKind::Dense),
            "sparse" => Ok(StorageKind::Sparse),
            other => Err(EvalError::Argument(format!(
                "Unsupported matrix storage format: {other} (expected \"dense\" or \"sparse\")"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Dense => "dense",
            StorageKind::Sparse => "sparse",
        }
    }
}

/// Element datatype hint used to pick numeric kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Number,
    Complex,
}

impl DataType {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "number" => Ok(DataType::Number),
            "complex" => Ok(DataType::Complex),
            other => Err(EvalError::Argument(format!(
                "Unsupported matrix datatype: {other} (expected \"number\" or \"complex\")"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Number => "number",
            DataType::Complex => "complex",
        }
    }

    pub fn admits(&self, value: &Scalar) -> bool {
        match self {
            DataType::Number => value.is_real(),
            DataType::Complex => true,
        }
    }
}

/// Nested sequence input for matrix construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested {
    Scalar(Scalar),
    Seq(Vec<Nested>),
}

impl From<f64> for Nested {
    fn from(value: f64) -> Self {
        Nested::Scalar(Scalar::Real(value))
    }
}

impl From<Scalar> for Nested {
    fn from(value: Scalar) -> Self {
        Nested::Scalar(value)
    }
}

impl<T: Into<Nested>> From<Vec<T>> for Nested {
    fn from(items: Vec<T>) -> Self {
        Nested::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl Nested {
    fn shape(&self) -> Result<Vec<usize>> {
        match self {
            Nested::Scalar(_) => Ok(Vec::new()),
            Nested::Seq(items) => {
                let Some(first) = items.first() else {
                    return Ok(vec![0]);
                };
                let inner = first.shape()?;
                for item in &items[1..] {
                    let other = item.shape()?;
                    if other != inner {
                        return Err(EvalError::dimension(format!(
                            "Dimension mismatch ({:?} != {:?})",
                            other, inner
                        )));
                    }
                }
                let mut shape = Vec::with_capacity(inner.len() + 1);
                shape.push(items.len());
                shape.extend(inner);
                Ok(shape)
            }
        }
    }

    fn flatten_into(&self, out: &mut Vec<Scalar>) {
        match self {
            Nested::Scalar(v) => out.push(*v),
            Nested::Seq(items) => items.iter().for_each(|item| item.flatten_into(out)),
        }
    }
}

/// Upper bound on the number of elements a dense matrix may grow to.
pub const MAX_ELEMENTS: usize = 1 << 24;

fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Element count of `shape`, or a dimension error when it overflows `usize`
/// or exceeds `limit`.
pub fn checked_element_count(shape: &[usize], limit: usize) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .filter(|&count| count <= limit)
        .ok_or_else(|| {
            EvalError::dimension(format!(
                "Matrix of size {shape:?} exceeds the limit of {limit} elements"
            ))
        })
}

/// Visits every multi-index of `shape` in row-major order.
fn for_each_index(shape: &[usize], mut f: impl FnMut(&[usize])) {
    if shape.iter().any(|&d| d == 0) {
        return;
    }
    let mut idx = vec![0usize; shape.len()];
    loop {
        f(&idx);
        let mut axis = shape.len();
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            idx[axis] += 1;
            if idx[axis] < shape[axis] {
                break;
            }
            idx[axis] = 0;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    data: Vec<Scalar>,
    shape: Vec<usize>,
}

impl DenseMatrix {
    pub fn new(data: Vec<Scalar>, shape: Vec<usize>) -> Result<Self> {
        let expected = element_count(&shape);
        if data.len() != expected {
            return Err(EvalError::dimension(format!(
                "Matrix data length {} doesn't match shape {:?} ({} elements)",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(DenseMatrix { data, shape })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        DenseMatrix {
            data: vec![Scalar::ZERO; element_count(&shape)],
            shape,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[Scalar] {
        &self.data
    }

    fn offset(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.shape.len() {
            return Err(EvalError::Index(format!(
                "Dimension mismatch: index has {} dimensions, matrix has {}",
                index.len(),
                self.shape.len()
            )));
        }
        let mut offset = 0;
        for (axis, (&i, &dim)) in index.iter().zip(&self.shape).enumerate() {
            if i >= dim {
                return Err(EvalError::Index(format!(
                    "Index out of range ({} > {}) in dimension {}",
                    i + 1,
                    dim,
                    axis + 1
                )));
            }
            offset = offset * dim + i;
        }
        Ok(offset)
    }

    pub fn get(&self, index: &[usize]) -> Result<Scalar> {
        self.offset(index).map(|o| self.data[o])
    }

    pub fn set(&mut self, index: &[usize], value: Scalar) -> Result<()> {
        if index.len() == self.shape.len()
            && index.iter().zip(&self.shape).any(|(&i, &d)| i >= d)
        {
            let grown: Vec<usize> = index
                .iter()
                .zip(&self.shape)
                .map(|(&i, &d)| d.max(i.saturating_add(1)))
                .collect();
            checked_element_count(&grown, MAX_ELEMENTS)?;
            self.resize(&grown);
        }
        let offset = self.offset(index)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Grows (or shrinks) to `new_shape`, keeping overlapping elements and
    /// zero-filling the rest. Rank must not change.
    fn resize(&mut self, new_shape: &[usize]) {
        trace!("resizing dense matrix {:?} -> {:?}", self.shape, new_shape);
        let mut resized = DenseMatrix::zeros(new_shape.to_vec());
        let old_shape = self.shape.clone();
        for_each_index(&old_shape, |idx| {
            if idx.iter().zip(new_shape).all(|(&i, &d)| i < d) {
                if let (Ok(src), Ok(dst)) = (self.offset(idx), resized.offset(idx)) {
                    resized.data[dst] = self.data[src];
                }
            }
        });
        *self = resized;
    }

    fn transpose2(&self, conj: bool) -> DenseMatrix {
        let (rows, cols) = (self.shape[0], self.shape[1]);
        let mut out = vec![Scalar::ZERO; self.data.len()];
        for i in 0..rows {
            for j in 0..cols {
                let v = self.data[i * cols + j];
                out[j * rows + i] = if conj { v.conj() } else { v };
            }
        }
        DenseMatrix {
            data: out,
            shape: vec![cols, rows],
        }
    }

    fn map(&self, f: impl Fn(Scalar) -> Scalar) -> DenseMatrix {
        DenseMatrix {
            data: self.data.iter().map(|v| f(*v)).collect(),
            shape: self.shape.clone(),
        }
    }
}

/// Two-dimensional compressed sparse column matrix. Only nonzeros are stored;
/// row indices within each column are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    values: Vec<Scalar>,
    row_index: Vec<usize>,
    col_ptr: Vec<usize>,
}

impl SparseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        SparseMatrix {
            rows,
            cols,
            values: Vec::new(),
            row_index: Vec::new(),
            col_ptr: vec![0; cols + 1],
        }
    }

    /// Builds from dense storage. A vector becomes a single column.
    pub fn from_dense(dense: &DenseMatrix) -> Result<Self> {
        let (rows, cols) = match dense.shape() {
            [n] => (*n, 1),
            [r, c] => (*r, *c),
            shape => {
                return Err(EvalError::dimension(format!(
                    "Sparse matrices must be two dimensional (size: {shape:?})"
                )))
            }
        };
        let mut sparse = SparseMatrix::zeros(rows, cols);
        for c in 0..cols {
            for r in 0..rows {
                let v = dense.data[r * cols + c];
                if !v.is_zero() {
                    sparse.values.push(v);
                    sparse.row_index.push(r);
                }
            }
            sparse.col_ptr[c + 1] = sparse.values.len();
        }
        Ok(sparse)
    }

    pub fn to_dense(&self) -> DenseMatrix {
        let mut dense = DenseMatrix::zeros(vec![self.rows, self.cols]);
        for c in 0..self.cols {
            for k in self.col_ptr[c]..self.col_ptr[c + 1] {
                dense.data[self.row_index[k] * self.cols + c] = self.values[k];
            }
        }
        dense
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Scalar> {
        if row >= self.rows || col >= self.cols {
            return Err(EvalError::Index(format!(
                "Index ({}, {}) out of range for {}x{} sparse matrix",
                row + 1,
                col + 1,
                self.rows,
                self.cols
            )));
        }
        let (start, end) = (self.col_ptr[col], self.col_ptr[col + 1]);
        Ok(match self.row_index[start..end].binary_search(&row) {
            Ok(pos) => self.values[start + pos],
            Err(_) => Scalar::ZERO,
        })
    }

    pub fn set(&mut self, row: usize, col: usize, value: Scalar) {
        if row >= self.rows {
            self.rows = row + 1;
        }
        if col >= self.cols {
            let last = *self.col_ptr.last().unwrap_or(&0);
            self.col_ptr.resize(col + 2, last);
            self.cols = col + 1;
        }
        let (start, end) = (self.col_ptr[col], self.col_ptr[col + 1]);
        match self.row_index[start..end].binary_search(&row) {
            Ok(pos) if value.is_zero() => {
                self.values.remove(start + pos);
                self.row_index.remove(start + pos);
                self.col_ptr[col + 1..].iter_mut().for_each(|p| *p -= 1);
            }
            Ok(pos) => self.values[start + pos] = value,
            Err(_) if value.is_zero() => {}
            Err(pos) => {
                self.values.insert(start + pos, value);
                self.row_index.insert(start + pos, row);
                self.col_ptr[col + 1..].iter_mut().for_each(|p| *p += 1);
            }
        }
    }

    fn transpose(&self, conj: bool) -> SparseMatrix {
        let nnz = self.values.len();
        let mut col_ptr = vec![0usize; self.rows + 1];
        for &r in &self.row_index {
            col_ptr[r + 1] += 1;
        }
        for i in 0..self.rows {
            col_ptr[i + 1] += col_ptr[i];
        }
        let mut next = col_ptr.clone();
        let mut values = vec![Scalar::ZERO; nnz];
        let mut row_index = vec![0usize; nnz];
        for c in 0..self.cols {
            for k in self.col_ptr[c]..self.col_ptr[c + 1] {
                let r = self.row_index[k];
                let dst = next[r];
                next[r] += 1;
                row_index[dst] = c;
                values[dst] = if conj {
                    self.values[k].conj()
                } else {
                    self.values[k]
                };
            }
        }
        SparseMatrix {
            rows: self.cols,
            cols: self.rows,
            values,
            row_index,
            col_ptr,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    storage: Storage,
    datatype: Option<DataType>,
}

impl Matrix {
    pub fn new(storage: Storage) -> Self {
        Matrix {
            storage,
            datatype: None,
        }
    }

    pub fn dense(data: Vec<Scalar>, shape: Vec<usize>) -> Result<Self> {
        DenseMatrix::new(data, shape).map(|d| Matrix::new(Storage::Dense(d)))
    }

    pub fn from_reals(data: Vec<f64>, shape: Vec<usize>) -> Result<Self> {
        Matrix::dense(data.into_iter().map(Scalar::Real).collect(), shape)
    }

    pub fn row_vector(data: Vec<f64>) -> Self {
        let n = data.len();
        Matrix::new(Storage::Dense(DenseMatrix {
            data: data.into_iter().map(Scalar::Real).collect(),
            shape: vec![n],
        }))
    }

    /// The empty matrix (size `[0]`).
    pub fn empty() -> Self {
        Matrix::new(Storage::Dense(DenseMatrix::zeros(vec![0])))
    }

    pub fn from_nested(nested: &Nested) -> Result<Self> {
        if let Nested::Scalar(v) = nested {
            return Err(EvalError::type_error(format!(
                "Cannot create a matrix from a scalar ({v}); expected a nested sequence"
            )));
        }
        let shape = nested.shape()?;
        let mut data = Vec::with_capacity(element_count(&shape));
        nested.flatten_into(&mut data);
        Matrix::dense(data, shape)
    }

    /// Construction surface: nested data, a copy of another matrix, or empty,
    /// with optional storage selector and datatype hint.
    pub fn construct(
        source: Option<&Nested>,
        storage: Option<&str>,
        datatype: Option<&str>,
    ) -> Result<Self> {
        let kind = storage.map(StorageKind::parse).transpose()?;
        let datatype = datatype.map(DataType::parse).transpose()?;
        let base = match source {
            Some(nested) => Matrix::from_nested(nested)?,
            None => match kind {
                Some(StorageKind::Sparse) => {
                    Matrix::new(Storage::Sparse(SparseMatrix::zeros(0, 0)))
                }
                _ => Matrix::empty(),
            },
        };
        base.with_options(kind, datatype)
    }

    /// Deep copy of `other`, optionally re-stored and re-tagged.
    pub fn copy_from(
        other: &Matrix,
        storage: Option<&str>,
        datatype: Option<&str>,
    ) -> Result<Self> {
        let kind = storage.map(StorageKind::parse).transpose()?;
        let datatype = datatype.map(DataType::parse).transpose()?;
        let copy = other.clone();
        let datatype = datatype.or(copy.datatype);
        copy.with_options(kind, datatype)
    }

    fn with_options(self, kind: Option<StorageKind>, datatype: Option<DataType>) -> Result<Self> {
        let converted = match kind {
            Some(kind) => self.into_storage(kind)?,
            None => self,
        };
        match datatype {
            Some(dt) => converted.with_datatype(dt),
            None => Ok(converted),
        }
    }

    pub fn with_datatype(mut self, datatype: DataType) -> Result<Self> {
        if let Some(bad) = self.elements().into_iter().find(|v| !datatype.admits(v)) {
            return Err(EvalError::type_error(format!(
                "Element {bad} does not match datatype {}",
                datatype.as_str()
            )));
        }
        self.datatype = Some(datatype);
        Ok(self)
    }

    pub fn into_storage(self, kind: StorageKind) -> Result<Self> {
        let datatype = self.datatype;
        let storage = match (self.storage, kind) {
            (Storage::Dense(d), StorageKind::Sparse) => {
                Storage::Sparse(SparseMatrix::from_dense(&d)?)
            }
            (Storage::Sparse(s), StorageKind::Dense) => Storage::Dense(s.to_dense()),
            (storage, _) => storage,
        };
        Ok(Matrix { storage, datatype })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_kind(&self) -> StorageKind {
        match self.storage {
            Storage::Dense(_) => StorageKind::Dense,
            Storage::Sparse(_) => StorageKind::Sparse,
        }
    }

    pub fn datatype(&self) -> Option<DataType> {
        self.datatype
    }

    pub fn shape(&self) -> Vec<usize> {
        match &self.storage {
            Storage::Dense(d) => d.shape.clone(),
            Storage::Sparse(s) => vec![s.rows, s.cols],
        }
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    pub fn numel(&self) -> usize {
        element_count(&self.shape())
    }

    pub fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    pub fn to_dense(&self) -> DenseMatrix {
        match &self.storage {
            Storage::Dense(d) => d.clone(),
            Storage::Sparse(s) => s.to_dense(),
        }
    }

    /// All elements in row-major order.
    pub fn elements(&self) -> Vec<Scalar> {
        match &self.storage {
            Storage::Dense(d) => d.data.clone(),
            Storage::Sparse(s) => s.to_dense().data,
        }
    }

    pub fn get(&self, index: &[usize]) -> Result<Scalar> {
        match &self.storage {
            Storage::Dense(d) => d.get(index),
            Storage::Sparse(s) => match index {
                [r, c] => s.get(*r, *c),
                _ => Err(EvalError::Index(format!(
                    "Dimension mismatch: index has {} dimensions, sparse matrix has 2",
                    index.len()
                ))),
            },
        }
    }

    /// Writes one element, growing the matrix when the index lies outside it.
    pub fn set(&mut self, index: &[usize], value: Scalar) -> Result<()> {
        if let Some(dt) = self.datatype {
            if !dt.admits(&value) {
                return Err(EvalError::type_error(format!(
                    "Cannot store {value} in a matrix of datatype {}",
                    dt.as_str()
                )));
            }
        }
        match &mut self.storage {
            Storage::Dense(d) => d.set(index, value),
            Storage::Sparse(s) => match index {
                [_, c] if *c >= MAX_ELEMENTS => Err(EvalError::dimension(format!(
                    "Sparse matrix column {} exceeds the limit of {MAX_ELEMENTS}",
                    c.saturating_add(1)
                ))),
                [r, c] => {
                    s.set(*r, *c, value);
                    Ok(())
                }
                _ => Err(EvalError::Index(format!(
                    "Dimension mismatch: index has {} dimensions, sparse matrix has 2",
                    index.len()
                ))),
            },
        }
    }

    /// Conjugate transpose.
    ///
    /// Rank 0 and 1 keep their shape (only conjugation applies); rank 2 swaps
    /// the dimensions and conjugates. Storage kind and datatype are preserved.
    pub fn ctranspose(&self) -> Result<Matrix> {
        self.transpose_impl(true)
    }

    /// Transpose without conjugation.
    pub fn transpose(&self) -> Result<Matrix> {
        self.transpose_impl(false)
    }

    fn transpose_impl(&self, conj: bool) -> Result<Matrix> {
        let storage = match &self.storage {
            Storage::Dense(d) => match d.shape.len() {
                0 | 1 => Storage::Dense(if conj { d.map(Scalar::conj) } else { d.clone() }),
                2 => {
                    if d.shape[1] == 0 {
                        return Err(EvalError::dimension(format!(
                            "Cannot transpose a 2D matrix with no columns (size: {:?})",
                            d.shape
                        )));
                    }
                    Storage::Dense(d.transpose2(conj))
                }
                _ => {
                    return Err(EvalError::dimension(format!(
                        "Matrix must be a vector or two dimensional (size: {:?})",
                        d.shape
                    )))
                }
            },
            Storage::Sparse(s) => {
                if s.cols == 0 {
                    return Err(EvalError::dimension(format!(
                        "Cannot transpose a 2D matrix with no columns (size: [{}, 0])",
                        s.rows
                    )));
                }
                Storage::Sparse(s.transpose(conj))
            }
        };
        Ok(Matrix {
            storage,
            datatype: self.datatype,
        })
    }

    pub fn conj(&self) -> Matrix {
        self.map(Scalar::conj)
    }

    /// Applies `f` to every element. Sparse inputs stay sparse when `f` maps
    /// zero to zero; the datatype tag is dropped.
    pub fn map(&self, f: impl Fn(Scalar) -> Scalar) -> Matrix {
        match &self.storage {
            Storage::Dense(d) => Matrix::new(Storage::Dense(d.map(f))),
            Storage::Sparse(s) => {
                let dense = s.to_dense().map(&f);
                if f(Scalar::ZERO).is_zero() {
                    match SparseMatrix::from_dense(&dense) {
                        Ok(sparse) => Matrix::new(Storage::Sparse(sparse)),
                        Err(_) => Matrix::new(Storage::Dense(dense)),
                    }
                } else {
                    Matrix::new(Storage::Dense(dense))
                }
            }
        }
    }

    /// Elementwise combination of two equally shaped matrices (dense result).
    pub fn zip_with(&self, other: &Matrix, f: impl Fn(Scalar, Scalar) -> Result<Scalar>) -> Result<Matrix> {
        let (shape_a, shape_b) = (self.shape(), other.shape());
        if shape_a != shape_b {
            return Err(EvalError::dimension(format!(
                "Dimension mismatch ({shape_a:?} != {shape_b:?})"
            )));
        }
        let data = self
            .elements()
            .into_iter()
            .zip(other.elements())
            .map(|(a, b)| f(a, b))
            .collect::<Result<Vec<_>>>()?;
        Matrix::dense(data, shape_a)
    }

    /// Extracts the sub-matrix selected by one zero-based index list per
    /// dimension. The result keeps one dimension per index list.
    pub fn subset(&self, index: &[Vec<usize>]) -> Result<Matrix> {
        let shape = self.shape();
        if index.len() != shape.len() {
            return Err(EvalError::Index(format!(
                "Dimension mismatch: index has {} dimensions, matrix has {}",
                index.len(),
                shape.len()
            )));
        }
        let out_shape: Vec<usize> = index.iter().map(Vec::len).collect();
        let mut data = Vec::with_capacity(element_count(&out_shape));
        let mut failure = None;
        let mut source = vec![0usize; index.len()];
        for_each_index(&out_shape, |idx| {
            if failure.is_some() {
                return;
            }
            for (axis, &i) in idx.iter().enumerate() {
                source[axis] = index[axis][i];
            }
            match self.get(&source) {
                Ok(v) => data.push(v),
                Err(e) => failure = Some(e),
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        let result = Matrix {
            storage: Storage::Dense(DenseMatrix::new(data, out_shape)?),
            datatype: self.datatype,
        };
        match self.storage_kind() {
            StorageKind::Sparse => result.into_storage(StorageKind::Sparse),
            StorageKind::Dense => Ok(result),
        }
    }

    /// Replaces the selected elements with `replacement`, broadcasting a
    /// single-element replacement. Grows the matrix when needed.
    pub fn set_subset(&mut self, index: &[Vec<usize>], replacement: &Matrix) -> Result<()> {
        if index.len() != self.rank() {
            return Err(EvalError::Index(format!(
                "Dimension mismatch: index has {} dimensions, matrix has {}",
                index.len(),
                self.rank()
            )));
        }
        let out_shape: Vec<usize> = index.iter().map(Vec::len).collect();
        let values = replacement.elements();
        let count = checked_element_count(&out_shape, MAX_ELEMENTS)?;
        if values.len() != 1 && values.len() != count {
            return Err(EvalError::dimension(format!(
                "Dimension mismatch: cannot assign {} elements to a selection of {}",
                values.len(),
                count
            )));
        }
        let mut targets = Vec::with_capacity(count);
        for_each_index(&out_shape, |idx| {
            targets.push(
                idx.iter()
                    .enumerate()
                    .map(|(axis, &i)| index[axis][i])
                    .collect::<Vec<_>>(),
            );
        });
        for (n, target) in targets.iter().enumerate() {
            let v = if values.len() == 1 { values[0] } else { values[n] };
            self.set(target, v)?;
        }
        Ok(())
    }

    pub fn nnz(&self) -> usize {
        match &self.storage {
            Storage::Dense(d) => d.data.iter().filter(|v| !v.is_zero()).count(),
            Storage::Sparse(s) => s.nnz(),
        }
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dense = self.to_dense();
        if dense.shape.is_empty() {
            return match dense.data.first() {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "[]"),
            };
        }
        write_nested(f, &dense.data, &dense.shape)
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, data: &[Scalar], shape: &[usize]) -> fmt::Result {
    write!(f, "[")?;
    if shape.len() == 1 {
        for (i, v) in data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
    } else {
        let stride = element_count(&shape[1..]);
        for i in 0..shape[0] {
            if i > 0 {
                write!(f, ", ")?;
            }
            write_nested(f, &data[i * stride..(i + 1) * stride], &shape[1..])?;
        }
    }
    write!(f, "]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: Vec<Vec<f64>>) -> Matrix {
        Matrix::from_nested(&Nested::from(rows)).unwrap()
    }

    #[test]
    fn nested_shape_is_inferred() {
        let a = m(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(a.shape(), vec![2, 3]);
        assert_eq!(a.get(&[1, 0]).unwrap(), Scalar::Real(4.0));
    }

    #[test]
    fn ragged_nested_input_is_rejected() {
        let ragged = Nested::Seq(vec![
            Nested::from(vec![1.0, 2.0]),
            Nested::from(vec![3.0]),
        ]);
        assert!(matches!(
            Matrix::from_nested(&ragged),
            Err(EvalError::Dimension(_))
        ));
    }

    #[test]
    fn dense_set_grows_matrix() {
        let mut a = m(vec![vec![1.0, 2.0]]);
        a.set(&[1, 2], Scalar::Real(9.0)).unwrap();
        assert_eq!(a.shape(), vec![2, 3]);
        assert_eq!(a.get(&[0, 1]).unwrap(), Scalar::Real(2.0));
        assert_eq!(a.get(&[1, 1]).unwrap(), Scalar::ZERO);
        assert_eq!(a.get(&[1, 2]).unwrap(), Scalar::Real(9.0));
    }

    #[test]
    fn sparse_roundtrips_through_dense() {
        let a = m(vec![vec![0.0, 2.0], vec![3.0, 0.0], vec![0.0, 0.0]]);
        let sparse = a.clone().into_storage(StorageKind::Sparse).unwrap();
        assert_eq!(sparse.nnz(), 2);
        assert_eq!(sparse.shape(), vec![3, 2]);
        assert_eq!(sparse.get(&[1, 0]).unwrap(), Scalar::Real(3.0));
        let back = sparse.into_storage(StorageKind::Dense).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn sparse_set_inserts_and_removes() {
        let mut s = SparseMatrix::zeros(2, 2);
        s.set(1, 1, Scalar::Real(4.0));
        s.set(0, 1, Scalar::Real(2.0));
        assert_eq!(s.nnz(), 2);
        assert_eq!(s.get(0, 1).unwrap(), Scalar::Real(2.0));
        s.set(0, 1, Scalar::ZERO);
        assert_eq!(s.nnz(), 1);
        assert_eq!(s.get(1, 1).unwrap(), Scalar::Real(4.0));
    }

    #[test]
    fn sparse_transpose_reindexes() {
        let a = m(vec![vec![1.0, 0.0, 2.0], vec![0.0, 3.0, 0.0]]);
        let sparse = a.clone().into_storage(StorageKind::Sparse).unwrap();
        let t = sparse.transpose().unwrap();
        assert_eq!(t.storage_kind(), StorageKind::Sparse);
        assert_eq!(t.shape(), vec![3, 2]);
        assert_eq!(t.nnz(), 3);
        assert_eq!(t.get(&[2, 0]).unwrap(), Scalar::Real(2.0));
        assert_eq!(t.get(&[1, 1]).unwrap(), Scalar::Real(3.0));
    }

    #[test]
    fn subset_selects_rows_and_columns() {
        let a = m(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let sub = a.subset(&[vec![1], vec![0, 2]]).unwrap();
        assert_eq!(sub.shape(), vec![1, 2]);
        assert_eq!(sub.elements(), vec![Scalar::Real(4.0), Scalar::Real(6.0)]);
    }

    #[test]
    fn subset_out_of_range() {
        let a = Matrix::row_vector(vec![1.0, 2.0]);
        assert!(matches!(a.subset(&[vec![5]]), Err(EvalError::Index(_))));
    }

    #[test]
    fn set_subset_broadcasts_scalar() {
        let mut a = m(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let zero = Matrix::row_vector(vec![0.0]);
        a.set_subset(&[vec![0, 1], vec![1]], &zero).unwrap();
        assert_eq!(a, m(vec![vec![1.0, 0.0], vec![3.0, 0.0]]));
    }

    #[test]
    fn growth_past_element_limit_is_rejected() {
        let mut a = m(vec![vec![1.0, 2.0]]);
        let err = a.set(&[0, 100_000_000_000_000], Scalar::Real(1.0)).unwrap_err();
        assert!(matches!(err, EvalError::Dimension(_)));
        assert_eq!(a, m(vec![vec![1.0, 2.0]]));

        let mut s = a.clone().into_storage(StorageKind::Sparse).unwrap();
        assert!(matches!(
            s.set(&[0, usize::MAX - 1], Scalar::Real(1.0)),
            Err(EvalError::Dimension(_))
        ));
    }

    #[test]
    fn element_counts_are_checked() {
        assert_eq!(checked_element_count(&[2, 3], 6).unwrap(), 6);
        assert_eq!(checked_element_count(&[], 1).unwrap(), 1);
        assert!(checked_element_count(&[2, 4], 6).is_err());
        assert!(checked_element_count(&[usize::MAX, 2], usize::MAX).is_err());
    }

    #[test]
    fn unknown_storage_token_is_descriptive() {
        let err = Matrix::construct(None, Some("banded"), None).unwrap_err();
        assert!(err.to_string().contains("Unsupported matrix storage format: banded"));
    }

    #[test]
    fn number_datatype_rejects_complex_elements() {
        let nested = Nested::Seq(vec![Nested::Scalar(Scalar::complex(1.0, 1.0))]);
        let err = Matrix::construct(Some(&nested), None, Some("number")).unwrap_err();
        assert!(matches!(err, EvalError::Type(_)));
    }

    #[test]
    fn display_is_nested() {
        let a = m(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(a.to_string(), "[[1, 2], [3, 4]]");
        assert_eq!(Matrix::empty().to_string(), "[]");
    }
}
