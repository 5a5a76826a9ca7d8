//! Common imports for building and inspecting instruction graphs.
//!
//! ```rust,ignore
//! use tessera_ir::prelude::*;
//! ```

// Graph containers
pub use crate::computation::{Computation, ComputationKind};
pub use crate::instruction::{InstrId, Instruction};
pub use crate::module::{ComputationId, Module, ModuleConfig};

// Operations
pub use crate::op::{Op, OpKind};
pub use crate::types::{BinaryOp, Literal, ReductionKind};

// Collectives
pub use crate::collective::{ChannelId, ChannelIdAllocator, CollectiveAttrs, CollectiveGroupMode, ReplicaGroups};

// Shapes
pub use crate::shape::Shape;
pub use tessera_dtype::PrimitiveType;
