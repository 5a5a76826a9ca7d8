//! Small value types shared by operations: binary operators, reduction
//! kinds and constant literals.

use std::fmt;

use itertools::Itertools;
use snafu::ensure;
use tessera_dtype::PrimitiveType;
use tessera_dtype::ext::HasPrimitiveType;

use crate::error::*;
use crate::shape::Shape;

/// Elementwise binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::EnumIter)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Maximum,
    Minimum,
}

impl BinaryOp {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Maximum => "maximum",
            Self::Minimum => "minimum",
        }
    }
}

/// Associative combiner applied by a reduction collective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReductionKind {
    #[default]
    Sum,
    Product,
    Min,
    Max,
}

impl ReductionKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Product => "product",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

// =========================================================================
// Literals
// =========================================================================

/// Flat, row-major literal storage.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralData {
    Pred(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl LiteralData {
    pub fn len(&self) -> usize {
        match self {
            Self::Pred(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Constant array value together with its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    shape: Shape,
    data: LiteralData,
}

impl Literal {
    /// Create a literal, checking element count, storage class and integer range.
    pub fn try_new(shape: Shape, data: LiteralData) -> Result<Self> {
        let element_type = shape.element_type();
        let expected = shape.element_count();
        ensure!(
            data.len() == expected,
            LiteralSizeMismatchSnafu { shape: Box::new(shape.clone()), expected, actual: data.len() }
        );

        let class_matches = match &data {
            LiteralData::Pred(_) => element_type.is_pred(),
            LiteralData::Int(_) => element_type.is_integral(),
            LiteralData::Float(_) => element_type.is_float(),
        };
        ensure!(class_matches, LiteralTypeMismatchSnafu { element_type });

        if let (LiteralData::Int(values), Some((min, max))) = (&data, element_type.integral_range()) {
            if let Some(&value) = values.iter().find(|v| **v < min || **v > max) {
                return LiteralOutOfRangeSnafu { value, element_type }.fail();
            }
        }

        Ok(Self { shape, data })
    }

    pub fn scalar_int(element_type: PrimitiveType, value: i64) -> Result<Self> {
        Self::try_new(Shape::scalar(element_type), LiteralData::Int(vec![value]))
    }

    /// Integer scalar typed after the Rust value, so `Literal::int(3u32)` is a `u32[]`.
    pub fn int<T: HasPrimitiveType + Into<i64>>(value: T) -> Result<Self> {
        Self::try_new(Shape::scalar(T::PRIMITIVE_TYPE), LiteralData::Int(vec![value.into()]))
    }

    pub fn vector_int(element_type: PrimitiveType, values: &[i64]) -> Result<Self> {
        Self::try_new(Shape::new(element_type, &[values.len()]), LiteralData::Int(values.to_vec()))
    }

    pub fn scalar_float(element_type: PrimitiveType, value: f64) -> Result<Self> {
        Self::try_new(Shape::scalar(element_type), LiteralData::Float(vec![value]))
    }

    pub fn scalar_pred(value: bool) -> Self {
        Self { shape: Shape::scalar(PrimitiveType::Pred), data: LiteralData::Pred(vec![value]) }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data(&self) -> &LiteralData {
        &self.data
    }

    /// Integer elements in row-major order, if the literal is integral.
    pub fn int_values(&self) -> Option<&[i64]> {
        match &self.data {
            LiteralData::Int(values) => Some(values),
            _ => None,
        }
    }

    /// The single integer element of a one-element integral literal.
    pub fn as_int_scalar(&self) -> Option<i64> {
        match self.int_values()? {
            [value] => Some(*value),
            _ => None,
        }
    }

    /// True if every element is zero (`false` for predicates).
    pub fn is_zero(&self) -> bool {
        match &self.data {
            LiteralData::Pred(v) => v.iter().all(|x| !*x),
            LiteralData::Int(v) => v.iter().all(|x| *x == 0),
            LiteralData::Float(v) => v.iter().all(|x| *x == 0.0),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = match &self.data {
            LiteralData::Pred(v) => v.iter().join(","),
            LiteralData::Int(v) => v.iter().join(","),
            LiteralData::Float(v) => v.iter().join(","),
        };
        if self.shape.is_scalar() { f.write_str(&values) } else { write!(f, "{{{values}}}") }
    }
}
