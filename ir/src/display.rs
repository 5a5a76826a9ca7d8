//! Textual rendering of instructions and computations.
//!
//! The format is one line per instruction:
//!
//! ```text
//! %ar = f32[32,8,128] all-reduce(%param), replica_groups={}, to_apply=sum
//! ```

use std::fmt;

use itertools::Itertools;

use crate::computation::Computation;
use crate::instruction::{InstrId, Instruction};
use crate::op::Op;

/// [`Display`](fmt::Display) adapter that resolves operand names through the
/// owning computation.
pub struct InstructionDisplay<'a> {
    computation: &'a Computation,
    inst: &'a Instruction,
}

impl fmt::Display for InstructionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inst = self.inst;
        if self.computation.root() == Some(inst.id()) {
            f.write_str("ROOT ")?;
        }
        write!(f, "%{} = {} {}(", inst.name(), inst.shape(), inst.op().name())?;

        match inst.op() {
            Op::Parameter { number } => write!(f, "{number}")?,
            Op::Constant(literal) => write!(f, "{literal}")?,
            _ => {
                let operands = inst.operands().iter().map(|id| match self.computation.get(*id) {
                    Some(operand) => format!("%{}", operand.name()),
                    None => format!("%<removed {id}>"),
                });
                write!(f, "{}", operands.format(", "))?;
            }
        }
        f.write_str(")")?;

        match inst.op() {
            Op::Iota { dimension } => write!(f, ", iota_dimension={dimension}"),
            Op::DynamicSlice { slice_sizes } => write!(f, ", dynamic_slice_sizes={{{}}}", slice_sizes.iter().join(",")),
            Op::AllReduce(attrs) | Op::ReduceScatter { attrs, .. } => {
                if let Op::ReduceScatter { scatter_dimension, .. } = inst.op() {
                    write!(f, ", dimensions={{{scatter_dimension}}}")?;
                }
                write!(f, ", replica_groups={}, to_apply={}", attrs.replica_groups, attrs.reduction.name())?;
                if let Some(channel_id) = attrs.channel_id {
                    write!(f, ", channel_id={channel_id}")?;
                }
                if attrs.use_global_device_ids {
                    f.write_str(", use_global_device_ids=true")?;
                }
                if attrs.constrain_layout {
                    f.write_str(", constrain_layout=true")?;
                }
                Ok(())
            }
            Op::Parameter { .. }
            | Op::Constant(_)
            | Op::ReplicaId
            | Op::PartitionId
            | Op::Convert
            | Op::Reshape
            | Op::Binary(_) => Ok(()),
        }
    }
}

impl Computation {
    /// One-line rendering of `id`, or `None` if it was removed.
    pub fn display(&self, id: InstrId) -> Option<InstructionDisplay<'_>> {
        Some(InstructionDisplay { computation: self, inst: self.get(id)? })
    }

    /// Whole computation, one instruction per line in post-order.
    pub fn to_text(&self) -> String {
        let body = self.post_order().into_iter().filter_map(|id| self.display(id)).map(|d| format!("  {d}")).join("\n");
        format!("{} {{\n{}\n}}", self.name(), body)
    }
}
