//! Instruction nodes stored in a computation's arena.

use std::fmt;

use smallvec::SmallVec;

use crate::op::{Op, OpKind};
use crate::shape::Shape;

/// Stable index of an instruction inside its computation.
///
/// Ids are never reused, so an id taken before a mutation either still
/// refers to the same instruction or to nothing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId(pub(crate) usize);

impl InstrId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the instruction graph.
///
/// Operand and user edges are arena ids. `users` holds each consumer once,
/// in the order it started using this instruction.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub(crate) id: InstrId,
    pub(crate) name: String,
    pub(crate) op: Op,
    pub(crate) shape: Shape,
    pub(crate) operands: SmallVec<[InstrId; 4]>,
    pub(crate) users: SmallVec<[InstrId; 4]>,
}

impl Instruction {
    pub fn id(&self) -> InstrId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn operands(&self) -> &[InstrId] {
        &self.operands
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn operand(&self, index: usize) -> InstrId {
        self.operands[index]
    }

    pub fn users(&self) -> &[InstrId] {
        &self.users
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub(crate) fn add_user(&mut self, user: InstrId) {
        if !self.users.contains(&user) {
            self.users.push(user);
        }
    }

    pub(crate) fn remove_user(&mut self, user: InstrId) {
        self.users.retain(|u| *u != user);
    }
}
