//! Array shapes: an element type plus static dimension sizes.
//!
//! Only dense, statically sized arrays are modelled. Layouts are implicit
//! (row-major), which is all the collective passes need when they reason
//! about contiguous chunks of an array.

use std::fmt;

use itertools::Itertools;
use smallvec::SmallVec;
use tessera_dtype::PrimitiveType;

/// Dimension sizes of a shape.
///
/// Inline capacity of 4 covers the ranks seen in practice without a heap
/// allocation.
pub type Dims = SmallVec<[usize; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    element_type: PrimitiveType,
    dims: Dims,
}

impl Shape {
    pub fn new(element_type: PrimitiveType, dims: &[usize]) -> Self {
        Self { element_type, dims: Dims::from_slice(dims) }
    }

    pub fn scalar(element_type: PrimitiveType) -> Self {
        Self { element_type, dims: Dims::new() }
    }

    pub fn element_type(&self) -> PrimitiveType {
        self.element_type
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Size of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= rank`.
    pub fn dimension(&self, dim: usize) -> usize {
        self.dims[dim]
    }

    /// Overwrite the size of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= rank`.
    pub fn set_dimension(&mut self, dim: usize, size: usize) {
        self.dims[dim] = size;
    }

    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Number of elements preceding dimension `dim` in row-major order,
    /// i.e. the product of all dimensions before it.
    pub fn leading_element_count(&self, dim: usize) -> usize {
        self.dims[..dim].iter().product()
    }

    /// Same dimensions, different element type.
    pub fn with_element_type(&self, element_type: PrimitiveType) -> Self {
        Self { element_type, dims: self.dims.clone() }
    }

    /// Same element type, different dimensions.
    pub fn with_dims(&self, dims: &[usize]) -> Self {
        Self::new(self.element_type, dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.element_type, self.dims.iter().join(","))
    }
}
