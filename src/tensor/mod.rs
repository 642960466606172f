//! The tensor primitive (§4.A): a typed, shape-carrying, byte-backed n-D
//! array with zero-copy row/subrange views.
//!
//! Rust has no runtime-tagged aliased-slice type the way the source's
//! `[]byte` subslicing does, so "view" here is a borrow rather than a
//! second owning value: `Tensor` always owns its buffer, and `row`/
//! `sub_range` hand back a `TensorView`/`TensorViewMut` whose lifetime is
//! tied to the borrow of the owner by the compiler. Both implement
//! `TensorLike`, so callers that only need to read/write content don't care
//! which one they hold.

mod elements;
pub use elements::Element;

use crate::types::{dim_product, ElementType};

/// An owning tensor: dims + dtype + a row-major byte buffer.
///
/// Invariant: `data.len() == dim_product(dims) * dtype.element_size()`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    dims: Vec<i64>,
    dtype: ElementType,
    data: Vec<u8>,
}

/// Shared read accessors common to an owning `Tensor` and a borrowed view.
pub trait TensorLike {
    fn dims(&self) -> &[i64];
    fn dtype(&self) -> ElementType;
    fn content(&self) -> &[u8];

    fn ndim(&self) -> usize {
        self.dims().len()
    }

    /// Reinterprets the byte buffer as a typed element slice. Panics if the
    /// buffer length isn't a multiple of `size_of::<T>()` — callers are
    /// expected to check `dtype()` first.
    fn as_elements<T: Element>(&self) -> &[T] {
        bytemuck::cast_slice(self.content())
    }
}

pub trait TensorLikeMut: TensorLike {
    fn content_mut(&mut self) -> &mut [u8];

    fn as_elements_mut<T: Element>(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(self.content_mut())
    }
}

impl TensorLike for Tensor {
    fn dims(&self) -> &[i64] {
        &self.dims
    }
    fn dtype(&self) -> ElementType {
        self.dtype
    }
    fn content(&self) -> &[u8] {
        &self.data
    }
}

impl TensorLikeMut for Tensor {
    fn content_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Tensor {
    /// `NewEmpty`: an owning tensor with a zero-filled buffer.
    pub fn new_empty(dims: Vec<i64>, dtype: ElementType) -> Self {
        let len = dim_product(&dims) as usize * dtype.element_size();
        Tensor {
            dims,
            dtype,
            data: vec![0u8; len],
        }
    }

    /// `NewFromElements`: copies `seq` into a fresh buffer. `None` when
    /// `seq.len() != product(dims)`.
    pub fn new_from_elements<T: Element>(seq: &[T], dims: Vec<i64>) -> Option<Self> {
        if seq.len() as i64 != dim_product(&dims) {
            return None;
        }
        Some(Tensor {
            dims,
            dtype: T::DTYPE,
            data: bytemuck::cast_slice(seq).to_vec(),
        })
    }

    /// Rebuilds a tensor from already-validated dims/dtype/bytes, e.g. when
    /// decoding a wire message. Does not check `data.len()` against
    /// `dim_product(dims) * dtype.element_size()` — callers that got these
    /// three from a `Tensor` via `dims()`/`dtype()`/`content()` uphold the
    /// invariant by construction; callers decoding untrusted input should
    /// verify it themselves first.
    pub fn from_raw_parts(dims: Vec<i64>, dtype: ElementType, data: Vec<u8>) -> Self {
        Tensor { dims, dtype, data }
    }

    pub fn zeros_like(&self) -> Self {
        Tensor {
            dims: self.dims.clone(),
            dtype: self.dtype,
            data: vec![0u8; self.data.len()],
        }
    }

    /// `SubRange`: a read-only view of `[begin, begin+length)` elements.
    /// Precondition: `begin + length <= product(dims)` — a contract
    /// violation, not a recoverable error, so this panics like the source's
    /// unchecked slice subrange would.
    pub fn sub_range(&self, begin: i64, length: i64) -> TensorView<'_> {
        let esz = self.dtype.element_size();
        let total = dim_product(&self.dims);
        assert!(
            begin >= 0 && length >= 0 && begin + length <= total,
            "sub_range out of bounds: begin={begin} length={length} total={total}"
        );
        let start = begin as usize * esz;
        let end = start + length as usize * esz;
        TensorView {
            dims: vec![length],
            dtype: self.dtype,
            data: &self.data[start..end],
        }
    }

    pub fn sub_range_mut(&mut self, begin: i64, length: i64) -> TensorViewMut<'_> {
        let esz = self.dtype.element_size();
        let total = dim_product(&self.dims);
        assert!(
            begin >= 0 && length >= 0 && begin + length <= total,
            "sub_range out of bounds: begin={begin} length={length} total={total}"
        );
        let start = begin as usize * esz;
        let end = start + length as usize * esz;
        TensorViewMut {
            dims: vec![length],
            dtype: self.dtype,
            data: &mut self.data[start..end],
        }
    }

    /// `Row`: a view of row `i` of a 2-D tensor. `None` if `t` isn't 2-D or
    /// `i` is out of range (the source returns a null tensor in this case,
    /// which is a recoverable "no such row" rather than a hard contract
    /// violation for read access).
    pub fn row(&self, i: i64) -> Option<TensorView<'_>> {
        if self.dims.len() != 2 || i < 0 || i >= self.dims[0] {
            return None;
        }
        let width = self.dims[1];
        Some(self.sub_range(i * width, width))
    }

    pub fn row_mut(&mut self, i: i64) -> Option<TensorViewMut<'_>> {
        if self.dims.len() != 2 || i < 0 || i >= self.dims[0] {
            return None;
        }
        let width = self.dims[1];
        Some(self.sub_range_mut(i * width, width))
    }

    /// `SetRow`: copies `v.content()` into row `i`. Panics if `t` isn't 2-D,
    /// `i` is out of range, or the byte lengths differ — all contract
    /// violations per §7.
    pub fn set_row(&mut self, i: i64, v: &impl TensorLike) {
        let width = self.dims.get(1).copied().unwrap_or(0);
        let esz = self.dtype.element_size();
        assert_eq!(
            v.content().len(),
            width as usize * esz,
            "set_row: row width mismatch"
        );
        let mut dest = self
            .row_mut(i)
            .unwrap_or_else(|| panic!("set_row: row {i} out of range"));
        dest.content_mut().copy_from_slice(v.content());
    }

    pub fn copy_from(&mut self, other: &impl TensorLike) {
        assert_eq!(
            self.data.len(),
            other.content().len(),
            "copy_from: byte length mismatch"
        );
        self.data.copy_from_slice(other.content());
    }
}

/// A read-only view: a `dims`/`dtype` pair over a borrowed byte range.
#[derive(Debug)]
pub struct TensorView<'a> {
    dims: Vec<i64>,
    dtype: ElementType,
    data: &'a [u8],
}

impl<'a> TensorLike for TensorView<'a> {
    fn dims(&self) -> &[i64] {
        &self.dims
    }
    fn dtype(&self) -> ElementType {
        self.dtype
    }
    fn content(&self) -> &[u8] {
        self.data
    }
}

/// A mutable view: writes through it are writes to the owner's buffer.
#[derive(Debug)]
pub struct TensorViewMut<'a> {
    dims: Vec<i64>,
    dtype: ElementType,
    data: &'a mut [u8],
}

impl<'a> TensorLike for TensorViewMut<'a> {
    fn dims(&self) -> &[i64] {
        &self.dims
    }
    fn dtype(&self) -> ElementType {
        self.dtype
    }
    fn content(&self) -> &[u8] {
        self.data
    }
}

impl<'a> TensorLikeMut for TensorViewMut<'a> {
    fn content_mut(&mut self) -> &mut [u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_empty_has_zeroed_buffer_of_right_length() {
        let t = Tensor::new_empty(vec![2, 5], ElementType::Float32);
        assert_eq!(t.content().len(), 2 * 5 * 4);
        assert!(t.content().iter().all(|&b| b == 0));
    }

    #[test]
    fn new_from_elements_rejects_length_mismatch() {
        let data = vec![1.0f32, 2.0, 3.0];
        assert!(Tensor::new_from_elements(&data, vec![2, 2]).is_none());
        assert!(Tensor::new_from_elements(&data, vec![3]).is_some());
    }

    #[test]
    fn row_view_aliases_owner_buffer() {
        // Testable property 3: a write through a row view is visible in the
        // owner at the corresponding byte offset.
        let mut t =
            Tensor::new_from_elements(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], vec![3, 2]).unwrap();
        {
            let mut row = t.row_mut(1).unwrap();
            row.as_elements_mut::<f32>()[0] = 42.0;
        }
        assert_eq!(t.as_elements::<f32>(), &[1.0, 2.0, 42.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn row_rejects_non_2d_or_out_of_range() {
        let t = Tensor::new_empty(vec![6], ElementType::Float32);
        assert!(t.row(0).is_none());

        let t2 = Tensor::new_empty(vec![2, 3], ElementType::Float32);
        assert!(t2.row(2).is_none());
        assert!(t2.row(0).is_some());
    }

    #[test]
    fn set_row_copies_bytes_into_place() {
        let mut t = Tensor::new_empty(vec![2, 2], ElementType::Float32);
        let v = Tensor::new_from_elements(&[1.0f32, 2.0], vec![2]).unwrap();
        t.set_row(1, &v);
        assert_eq!(t.as_elements::<f32>(), &[0.0, 0.0, 1.0, 2.0]);
    }
}
