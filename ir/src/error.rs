use snafu::Snafu;
use tessera_dtype::PrimitiveType;

use crate::{ChannelId, InstrId, OpKind, shape::Shape};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Instruction id does not refer to a live instruction.
    #[snafu(display("instruction {id} does not exist in computation '{computation}'"))]
    InstructionNotFound { id: InstrId, computation: String },

    /// Instruction still has consumers.
    #[snafu(display("cannot remove '{name}': it still has {user_count} user(s)"))]
    InstructionHasUsers { name: String, user_count: usize },

    /// The root instruction cannot be removed.
    #[snafu(display("cannot remove '{name}': it is the root of computation '{computation}'"))]
    RemoveRoot { name: String, computation: String },

    /// Computation has no root instruction.
    #[snafu(display("computation '{computation}' has no root instruction"))]
    MissingRoot { computation: String },

    /// Replacement value has a different shape.
    #[snafu(display("cannot replace uses of '{name}' ({old}) with a value of shape {new}"))]
    ReplaceShapeMismatch { name: String, old: Box<Shape>, new: Box<Shape> },

    /// Wrong number of operands for an operation.
    #[snafu(display("{kind:?} expects {expected} operand(s), got {actual}"))]
    OperandCount { kind: OpKind, expected: usize, actual: usize },

    /// Declared shape disagrees with the shape implied by the operation.
    #[snafu(display("{kind:?} produces {expected}, but instruction declares {declared}"))]
    ShapeMismatch { kind: OpKind, expected: Box<Shape>, declared: Box<Shape> },

    /// Element type not supported by an operation.
    #[snafu(display("{kind:?} does not support element type {element_type}"))]
    UnsupportedElementType { kind: OpKind, element_type: PrimitiveType },

    /// Reshape must preserve the element count.
    #[snafu(display("reshape size mismatch: input has {input_size} elements, output has {output_size}"))]
    ReshapeSizeMismatch { input_size: usize, output_size: usize },

    /// Dimension index out of range.
    #[snafu(display("dimension {dim} is out of range for rank {rank}"))]
    DimensionOutOfRange { dim: usize, rank: usize },

    /// Dynamic-slice sizes do not fit the operand.
    #[snafu(display("dynamic-slice sizes {slice_sizes:?} do not fit operand dimensions {dims:?}"))]
    InvalidSliceSizes { slice_sizes: Vec<usize>, dims: Vec<usize> },

    /// Dynamic-slice start indices must be integral scalars.
    #[snafu(display("dynamic-slice start index {index} must be an integral scalar, got {shape}"))]
    InvalidStartIndex { index: usize, shape: Box<Shape> },

    /// Reduce-scatter output must evenly divide its operand along the scatter dimension.
    #[snafu(display("reduce-scatter dimension {dim}: operand size {operand_size} is not a multiple of {result_size}"))]
    InvalidScatterSize { dim: usize, operand_size: usize, result_size: usize },

    /// Only single-operand collectives are modelled.
    #[snafu(display("variadic collectives are not supported (got {count} operands)"))]
    VariadicCollective { count: usize },

    /// Literal data does not match its shape.
    #[snafu(display("literal of shape {shape} expects {expected} value(s), got {actual}"))]
    LiteralSizeMismatch { shape: Box<Shape>, expected: usize, actual: usize },

    /// Literal value does not fit its element type.
    #[snafu(display("literal value {value} does not fit element type {element_type}"))]
    LiteralOutOfRange { value: i64, element_type: PrimitiveType },

    /// Literal data class disagrees with its element type.
    #[snafu(display("literal values cannot be stored as {element_type}"))]
    LiteralTypeMismatch { element_type: PrimitiveType },

    /// Operand and user edges are out of sync.
    #[snafu(display("use/def edge between '{user}' and '{operand}' is inconsistent"))]
    BrokenUseDefEdge { user: String, operand: String },

    /// Two collectives share a channel id.
    #[snafu(display("channel id {channel_id} is used by both '{first}' and '{second}'"))]
    DuplicateChannelId { channel_id: ChannelId, first: String, second: String },
}
