//! Typed constructors that derive result shapes before inserting.

use smallvec::SmallVec;
use tessera_dtype::PrimitiveType;

use super::Computation;
use crate::collective::CollectiveAttrs;
use crate::error::*;
use crate::instruction::InstrId;
use crate::op::Op;
use crate::shape::Shape;
use crate::types::{BinaryOp, Literal};

impl Computation {
    fn shape_of(&self, id: InstrId) -> Result<Shape> {
        Ok(self.instruction(id)?.shape().clone())
    }

    pub fn parameter(&mut self, number: usize, shape: Shape, name: impl Into<String>) -> Result<InstrId> {
        self.add_instruction(name, Op::Parameter { number }, shape, &[])
    }

    pub fn constant(&mut self, literal: Literal, name: impl Into<String>) -> Result<InstrId> {
        let shape = literal.shape().clone();
        self.add_instruction(name, Op::Constant(literal), shape, &[])
    }

    /// Scalar integer constant.
    pub fn constant_int(&mut self, element_type: PrimitiveType, value: i64, name: impl Into<String>) -> Result<InstrId> {
        self.constant(Literal::scalar_int(element_type, value)?, name)
    }

    /// Rank-1 integer constant.
    pub fn constant_table(
        &mut self,
        element_type: PrimitiveType,
        values: &[i64],
        name: impl Into<String>,
    ) -> Result<InstrId> {
        self.constant(Literal::vector_int(element_type, values)?, name)
    }

    pub fn iota(&mut self, shape: Shape, dimension: usize, name: impl Into<String>) -> Result<InstrId> {
        self.add_instruction(name, Op::Iota { dimension }, shape, &[])
    }

    pub fn replica_id(&mut self, name: impl Into<String>) -> Result<InstrId> {
        self.add_instruction(name, Op::ReplicaId, Shape::scalar(PrimitiveType::U32), &[])
    }

    pub fn partition_id(&mut self, name: impl Into<String>) -> Result<InstrId> {
        self.add_instruction(name, Op::PartitionId, Shape::scalar(PrimitiveType::U32), &[])
    }

    pub fn convert(
        &mut self,
        operand: InstrId,
        element_type: PrimitiveType,
        name: impl Into<String>,
    ) -> Result<InstrId> {
        let shape = self.shape_of(operand)?.with_element_type(element_type);
        self.add_instruction(name, Op::Convert, shape, &[operand])
    }

    pub fn reshape(&mut self, operand: InstrId, dims: &[usize], name: impl Into<String>) -> Result<InstrId> {
        let shape = self.shape_of(operand)?.with_dims(dims);
        self.add_instruction(name, Op::Reshape, shape, &[operand])
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: InstrId, rhs: InstrId, name: impl Into<String>) -> Result<InstrId> {
        let shape = self.shape_of(lhs)?;
        self.add_instruction(name, Op::Binary(op), shape, &[lhs, rhs])
    }

    pub fn add(&mut self, lhs: InstrId, rhs: InstrId, name: impl Into<String>) -> Result<InstrId> {
        self.binary(BinaryOp::Add, lhs, rhs, name)
    }

    pub fn multiply(&mut self, lhs: InstrId, rhs: InstrId, name: impl Into<String>) -> Result<InstrId> {
        self.binary(BinaryOp::Multiply, lhs, rhs, name)
    }

    /// `operand[start_indices[i] .. start_indices[i] + slice_sizes[i]]` per dimension.
    pub fn dynamic_slice(
        &mut self,
        operand: InstrId,
        start_indices: &[InstrId],
        slice_sizes: &[usize],
        name: impl Into<String>,
    ) -> Result<InstrId> {
        let shape = self.shape_of(operand)?.with_dims(slice_sizes);
        let mut operands = Vec::with_capacity(start_indices.len() + 1);
        operands.push(operand);
        operands.extend_from_slice(start_indices);
        self.add_instruction(name, Op::DynamicSlice { slice_sizes: SmallVec::from_slice(slice_sizes) }, shape, &operands)
    }

    pub fn all_reduce(&mut self, operand: InstrId, attrs: CollectiveAttrs, name: impl Into<String>) -> Result<InstrId> {
        let shape = self.shape_of(operand)?;
        self.add_instruction(name, Op::AllReduce(attrs), shape, &[operand])
    }

    /// Reduce-scatter whose result keeps `1 / shard_count` of `operand` along
    /// `scatter_dimension`.
    pub fn reduce_scatter(
        &mut self,
        operand: InstrId,
        attrs: CollectiveAttrs,
        scatter_dimension: usize,
        shard_count: usize,
        name: impl Into<String>,
    ) -> Result<InstrId> {
        let mut shape = self.shape_of(operand)?;
        if scatter_dimension < shape.rank() && shard_count > 0 {
            shape.set_dimension(scatter_dimension, shape.dimension(scatter_dimension) / shard_count);
        }
        self.add_instruction(name, Op::ReduceScatter { attrs, scatter_dimension }, shape, &[operand])
    }
}
