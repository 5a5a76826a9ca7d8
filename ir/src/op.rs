//! Operation enum and per-operation shape rules.
//!
//! The [`Op`] enum is closed: every place whose behaviour depends on the kind
//! of instruction matches on it exhaustively. Operands are not stored here;
//! they live on the owning [`Instruction`](crate::Instruction) as arena ids.

use smallvec::SmallVec;
use snafu::ensure;

use crate::collective::CollectiveAttrs;
use crate::error::*;
use crate::shape::Shape;
use crate::types::{BinaryOp, Literal};

#[derive(Debug, Clone, PartialEq)]
#[derive(strum::EnumDiscriminants)]
#[strum_discriminants(name(OpKind), derive(Hash, strum::EnumIter))]
pub enum Op {
    // Leaves
    Parameter { number: usize },
    Constant(Literal),
    Iota { dimension: usize },
    ReplicaId,
    PartitionId,

    // Elementwise / layout
    Convert,
    Reshape,
    Binary(BinaryOp),
    DynamicSlice { slice_sizes: SmallVec<[usize; 4]> },

    // Collectives
    AllReduce(CollectiveAttrs),
    ReduceScatter { attrs: CollectiveAttrs, scatter_dimension: usize },
}

impl Op {
    pub fn kind(&self) -> OpKind {
        OpKind::from(self)
    }

    /// Textual opcode name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Parameter { .. } => "parameter",
            Self::Constant(_) => "constant",
            Self::Iota { .. } => "iota",
            Self::ReplicaId => "replica-id",
            Self::PartitionId => "partition-id",
            Self::Convert => "convert",
            Self::Reshape => "reshape",
            Self::Binary(op) => op.name(),
            Self::DynamicSlice { .. } => "dynamic-slice",
            Self::AllReduce(_) => "all-reduce",
            Self::ReduceScatter { .. } => "reduce-scatter",
        }
    }

    pub fn is_all_reduce(&self) -> bool {
        matches!(self, Self::AllReduce(_))
    }

    /// Slice sizes, if this is a dynamic-slice.
    pub fn as_dynamic_slice(&self) -> Option<&[usize]> {
        match self {
            Self::DynamicSlice { slice_sizes } => Some(slice_sizes.as_slice()),
            _ => None,
        }
    }

    pub fn collective_attrs(&self) -> Option<&CollectiveAttrs> {
        match self {
            Self::AllReduce(attrs) | Self::ReduceScatter { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    /// Collectives bound to a channel synchronize with other programs and
    /// must not be dropped as dead code.
    pub fn has_side_effect(&self) -> bool {
        self.collective_attrs().is_some_and(|attrs| attrs.channel_id.is_some())
    }

    /// Validate `shape` as the result of this op applied to `operands`.
    pub fn check_shape(&self, shape: &Shape, operands: &[&Shape]) -> Result<()> {
        let kind = self.kind();
        match self {
            Self::Parameter { .. } => expect_operands(kind, operands, 0),
            Self::Constant(literal) => {
                expect_operands(kind, operands, 0)?;
                expect_shape(kind, literal.shape(), shape)
            }
            Self::Iota { dimension } => {
                expect_operands(kind, operands, 0)?;
                ensure!(*dimension < shape.rank(), DimensionOutOfRangeSnafu { dim: *dimension, rank: shape.rank() });
                expect_numeric(kind, shape)
            }
            Self::ReplicaId | Self::PartitionId => {
                expect_operands(kind, operands, 0)?;
                expect_shape(kind, &Shape::scalar(tessera_dtype::PrimitiveType::U32), shape)
            }
            Self::Convert => {
                expect_operands(kind, operands, 1)?;
                expect_shape(kind, &operands[0].with_element_type(shape.element_type()), shape)
            }
            Self::Reshape => {
                expect_operands(kind, operands, 1)?;
                let input_size = operands[0].element_count();
                let output_size = shape.element_count();
                ensure!(input_size == output_size, ReshapeSizeMismatchSnafu { input_size, output_size });
                expect_shape(kind, &shape.with_element_type(operands[0].element_type()), shape)
            }
            Self::Binary(_) => {
                expect_operands(kind, operands, 2)?;
                expect_numeric(kind, shape)?;
                expect_shape(kind, operands[0], shape)?;
                expect_shape(kind, operands[1], shape)
            }
            Self::DynamicSlice { slice_sizes } => {
                let Some(input) = operands.first().copied() else {
                    return OperandCountSnafu { kind, expected: 1usize, actual: 0usize }.fail();
                };
                let rank = input.rank();
                expect_operands(kind, operands, rank + 1)?;
                let fits = slice_sizes.len() == rank && slice_sizes.iter().zip(input.dims()).all(|(s, d)| s <= d);
                ensure!(
                    fits,
                    InvalidSliceSizesSnafu { slice_sizes: slice_sizes.to_vec(), dims: input.dims().to_vec() }
                );
                for (index, start) in operands[1..].iter().enumerate() {
                    ensure!(
                        start.is_scalar() && start.element_type().is_integral(),
                        InvalidStartIndexSnafu { index, shape: Box::new((*start).clone()) }
                    );
                }
                expect_shape(kind, &input.with_dims(slice_sizes), shape)
            }
            Self::AllReduce(_) => {
                ensure!(operands.len() <= 1, VariadicCollectiveSnafu { count: operands.len() });
                expect_operands(kind, operands, 1)?;
                expect_shape(kind, operands[0], shape)
            }
            Self::ReduceScatter { scatter_dimension, .. } => {
                ensure!(operands.len() <= 1, VariadicCollectiveSnafu { count: operands.len() });
                expect_operands(kind, operands, 1)?;
                let input = operands[0];
                let dim = *scatter_dimension;
                ensure!(dim < input.rank(), DimensionOutOfRangeSnafu { dim, rank: input.rank() });
                ensure!(shape.rank() == input.rank(), ShapeMismatchSnafu {
                    kind,
                    expected: Box::new(input.clone()),
                    declared: Box::new(shape.clone()),
                });

                let operand_size = input.dimension(dim);
                let result_size = shape.dimension(dim);
                ensure!(
                    result_size > 0 && operand_size % result_size == 0,
                    InvalidScatterSizeSnafu { dim, operand_size, result_size }
                );
                let mut expected = input.clone();
                expected.set_dimension(dim, result_size);
                expect_shape(kind, &expected, shape)
            }
        }
    }
}

fn expect_operands(kind: OpKind, operands: &[&Shape], expected: usize) -> Result<()> {
    ensure!(operands.len() == expected, OperandCountSnafu { kind, expected, actual: operands.len() });
    Ok(())
}

fn expect_shape(kind: OpKind, expected: &Shape, declared: &Shape) -> Result<()> {
    ensure!(
        expected == declared,
        ShapeMismatchSnafu { kind, expected: Box::new(expected.clone()), declared: Box::new(declared.clone()) }
    );
    Ok(())
}

fn expect_numeric(kind: OpKind, shape: &Shape) -> Result<()> {
    let element_type = shape.element_type();
    ensure!(!element_type.is_pred(), UnsupportedElementTypeSnafu { kind, element_type });
    Ok(())
}
