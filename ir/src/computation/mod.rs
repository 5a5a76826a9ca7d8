//! Computations: arenas of instructions with one designated root.
//!
//! Instructions are owned by the computation and addressed through
//! [`InstrId`]s. Operand edges point from a consumer to its producers and
//! every producer keeps the reverse (user) edge, so both directions can be
//! walked without ownership cycles. Removing an instruction clears its slot
//! but never shifts other ids.

mod constructors;

use std::collections::HashSet;

use itertools::Itertools;
use smallvec::SmallVec;
use snafu::{OptionExt, ensure};
use tracing::trace;

use crate::error::*;
use crate::instruction::{InstrId, Instruction};
use crate::op::{Op, OpKind};
use crate::shape::Shape;

/// Whether a computation is scheduled on its own or inlined into a fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComputationKind {
    #[default]
    Regular,
    Fusion,
}

#[derive(Debug, Clone)]
pub struct Computation {
    name: String,
    kind: ComputationKind,
    slots: Vec<Option<Instruction>>,
    root: Option<InstrId>,
    used_names: HashSet<String>,
}

impl Computation {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, ComputationKind::Regular)
    }

    pub fn with_kind(name: impl Into<String>, kind: ComputationKind) -> Self {
        Self { name: name.into(), kind, slots: Vec::new(), root: None, used_names: HashSet::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ComputationKind {
        self.kind
    }

    pub fn is_fusion(&self) -> bool {
        self.kind == ComputationKind::Fusion
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn root(&self) -> Option<InstrId> {
        self.root
    }

    pub fn root_instruction(&self) -> Result<&Instruction> {
        let root = self.root.context(MissingRootSnafu { computation: self.name.clone() })?;
        self.instruction(root)
    }

    pub fn set_root(&mut self, id: InstrId) -> Result<()> {
        self.instruction(id)?;
        self.root = Some(id);
        Ok(())
    }

    pub fn contains(&self, id: InstrId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: InstrId) -> Option<&Instruction> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn instruction(&self, id: InstrId) -> Result<&Instruction> {
        self.get(id).context(InstructionNotFoundSnafu { id, computation: self.name.clone() })
    }

    fn instruction_mut(&mut self, id: InstrId) -> Result<&mut Instruction> {
        let computation = &self.name;
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .context(InstructionNotFoundSnafu { id, computation: computation.clone() })
    }

    /// Live instructions in creation order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.slots.iter().flatten()
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions().count()
    }

    /// Number of live instructions of the given kind.
    pub fn count(&self, kind: OpKind) -> usize {
        self.instructions().filter(|inst| inst.kind() == kind).count()
    }

    /// Id of the live instruction called `name`.
    pub fn find(&self, name: &str) -> Option<InstrId> {
        self.instructions().find(|inst| inst.name == name).map(|inst| inst.id)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append an instruction after validating its operands and shape.
    ///
    /// Names are made unique within the computation by appending `.N`.
    pub fn add_instruction(
        &mut self,
        name: impl Into<String>,
        op: Op,
        shape: Shape,
        operands: &[InstrId],
    ) -> Result<InstrId> {
        let operand_shapes = operands.iter().map(|id| Ok(&self.instruction(*id)?.shape)).collect::<Result<Vec<_>>>()?;
        op.check_shape(&shape, &operand_shapes)?;

        let id = InstrId(self.slots.len());
        let name = self.uniquify(name.into());
        for operand in operands {
            self.instruction_mut(*operand)?.add_user(id);
        }
        trace!(instruction = %name, op = op.name(), %shape, "add instruction");
        let operands = SmallVec::from_slice(operands);
        self.slots.push(Some(Instruction { id, name, op, shape, operands, users: SmallVec::new() }));
        Ok(id)
    }

    /// Remove an instruction that has no users and is not the root.
    pub fn remove_instruction(&mut self, id: InstrId) -> Result<()> {
        let inst = self.instruction(id)?;
        ensure!(
            inst.users.is_empty(),
            InstructionHasUsersSnafu { name: inst.name.clone(), user_count: inst.users.len() }
        );
        ensure!(
            self.root != Some(id),
            RemoveRootSnafu { name: inst.name.clone(), computation: self.name.clone() }
        );

        let operands = inst.operands.iter().copied().unique().collect::<SmallVec<[InstrId; 4]>>();
        for operand in operands {
            self.instruction_mut(operand)?.remove_user(id);
        }
        if let Some(removed) = self.slots[id.0].take() {
            trace!(instruction = %removed.name, "remove instruction");
        }
        Ok(())
    }

    /// Remove `id`, then every operand that became dead as a result, transitively.
    ///
    /// Parameters, the root and side-effecting instructions are kept even
    /// when they lose their last user.
    pub fn remove_instruction_and_unused_operands(&mut self, id: InstrId) -> Result<()> {
        let mut worklist = vec![id];
        while let Some(current) = worklist.pop() {
            let operands = self.instruction(current)?.operands.clone();
            self.remove_instruction(current)?;
            for operand in operands.into_iter().unique() {
                if self.is_removable_when_dead(operand) && !worklist.contains(&operand) {
                    worklist.push(operand);
                }
            }
        }
        Ok(())
    }

    fn is_removable_when_dead(&self, id: InstrId) -> bool {
        match self.get(id) {
            Some(inst) => {
                inst.users.is_empty()
                    && self.root != Some(id)
                    && !matches!(inst.op, Op::Parameter { .. })
                    && !inst.op.has_side_effect()
            }
            None => false,
        }
    }

    /// Redirect every user of `old` (and root status) to `new`.
    ///
    /// Both must have the same shape. If `new` itself uses `old`, that edge
    /// is left alone.
    pub fn replace_all_uses_with(&mut self, old: InstrId, new: InstrId) -> Result<()> {
        if old == new {
            return Ok(());
        }
        let old_inst = self.instruction(old)?;
        let new_shape = &self.instruction(new)?.shape;
        ensure!(
            old_inst.shape == *new_shape,
            ReplaceShapeMismatchSnafu {
                name: old_inst.name.clone(),
                old: Box::new(old_inst.shape.clone()),
                new: Box::new(new_shape.clone()),
            }
        );

        let users = old_inst.users.iter().copied().filter(|u| *u != new).collect::<SmallVec<[InstrId; 4]>>();
        for user in users {
            for operand in self.instruction_mut(user)?.operands.iter_mut() {
                if *operand == old {
                    *operand = new;
                }
            }
            self.instruction_mut(old)?.remove_user(user);
            self.instruction_mut(new)?.add_user(user);
        }
        if self.root == Some(old) {
            self.root = Some(new);
        }
        Ok(())
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// All live instructions, operands before users.
    ///
    /// Traversal starts from every instruction without users in creation
    /// order, so dead subgraphs are included and the order is deterministic.
    pub fn post_order(&self) -> Vec<InstrId> {
        let mut visited = vec![false; self.slots.len()];
        let mut order = Vec::with_capacity(self.slots.len());
        for inst in self.instructions() {
            if inst.users.is_empty() {
                self.post_order_from(inst.id, &mut visited, &mut order);
            }
        }
        order
    }

    fn post_order_from(&self, start: InstrId, visited: &mut [bool], order: &mut Vec<InstrId>) {
        let mut stack = vec![(start, false)];
        while let Some((id, expanded)) = stack.pop() {
            if visited[id.0] {
                continue;
            }
            if expanded {
                visited[id.0] = true;
                order.push(id);
                continue;
            }

            stack.push((id, true));
            if let Some(inst) = self.get(id) {
                // Reverse so operand 0 is emitted first
                for operand in inst.operands.iter().rev() {
                    if !visited[operand.0] {
                        stack.push((*operand, false));
                    }
                }
            }
        }
    }

    fn uniquify(&mut self, base: String) -> String {
        let mut name = base.clone();
        let mut suffix = 1;
        while self.used_names.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        self.used_names.insert(name.clone());
        name
    }
}
