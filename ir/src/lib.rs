//! Instruction-graph IR for the tessera compiler.
//!
//! Graphs are stored as arenas: a [`Computation`] owns its [`Instruction`]s
//! and edges are [`InstrId`] indices in both directions (operands and users).
//! This keeps removal and use-redirection cheap and free of reference cycles.
//!
//! # Module Organization
//!
//! - [`shape`] - Element type plus static dimensions
//! - [`types`] - Binary operators, reduction kinds, literals
//! - [`collective`] - Replica groups, channel ids, group modes
//! - [`op`] - Closed operation enum and per-op shape rules
//! - [`instruction`] - Arena nodes
//! - [`computation`] - Arena, typed constructors, mutation and post-order
//! - [`module`] - Computations plus distributed config, verifier
//! - [`display`], [`tree`] - Text and ASCII-tree rendering
//! - [`error`] - Error types and result handling

pub mod collective;
pub mod computation;
pub mod display;
pub mod error;
pub mod instruction;
pub mod module;
pub mod op;
pub mod prelude;
pub mod shape;
pub mod tree;
pub mod types;


pub use collective::{ChannelId, ChannelIdAllocator, CollectiveAttrs, CollectiveGroupMode, ReplicaGroup, ReplicaGroups};
pub use computation::{Computation, ComputationKind};
pub use error::{Error, Result};
pub use instruction::{InstrId, Instruction};
pub use module::{ComputationId, Module, ModuleConfig};
pub use op::{Op, OpKind};
pub use shape::Shape;
pub use types::{BinaryOp, Literal, LiteralData, ReductionKind};

pub use tessera_dtype::PrimitiveType;
