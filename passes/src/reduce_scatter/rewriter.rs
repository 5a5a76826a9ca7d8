//! Replacement of a matched chain by a single reduce-scatter.

use snafu::{ResultExt, ensure};
use tracing::debug;

use tessera_ir::{ChannelIdAllocator, CollectiveAttrs, Computation, InstrId, Op};

use super::matcher::ReduceScatterMatch;
use crate::error::*;

/// Rewrite `matched` into a reduce-scatter and return the instruction that
/// now stands in for the old slice.
///
/// The new collective takes a fresh channel id from `channels` if the
/// all-reduce had one. The slice, the intervening reshape and the all-reduce
/// are removed, together with operands of the all-reduce that become dead.
pub fn rewrite(
    computation: &mut Computation,
    matched: &ReduceScatterMatch,
    channels: &mut ChannelIdAllocator,
) -> Result<InstrId> {
    let ds = computation.instruction(matched.dynamic_slice).context(IrSnafu)?;
    ensure!(
        matches!(ds.op(), Op::DynamicSlice { .. }),
        UnexpectedInstructionSnafu { name: ds.name(), expected: "a dynamic-slice" }
    );
    let slice_dims = ds.shape().dims().to_vec();

    let ar = computation.instruction(matched.all_reduce).context(IrSnafu)?;
    let Op::AllReduce(attrs) = ar.op() else {
        return UnexpectedInstructionSnafu { name: ar.name(), expected: "an all-reduce" }.fail();
    };

    let dim = matched.split_dim;
    let group_size = matched.group_size;
    let size = ar.shape().dims().get(dim).copied().unwrap_or(0);
    ensure!(group_size > 0 && size > 0 && size % group_size == 0, SplitDimNotDivisibleSnafu { dim, size, group_size });

    // Channel ids are never shared between collectives.
    let attrs = CollectiveAttrs { channel_id: attrs.channel_id.map(|_| channels.allocate()), ..attrs.clone() };
    let channel_id = attrs.channel_id;
    let operand = ar.operand(0);
    let ar_name = ar.name().to_string();

    let scatter = computation.reduce_scatter(operand, attrs, dim, group_size, "reduce-scatter").context(IrSnafu)?;
    let replacement = match matched.reshape {
        Some(_) => computation.reshape(scatter, &slice_dims, "reshape").context(IrSnafu)?,
        None => scatter,
    };

    computation.replace_all_uses_with(matched.dynamic_slice, replacement).context(IrSnafu)?;
    computation.remove_instruction(matched.dynamic_slice).context(IrSnafu)?;
    if let Some(reshape) = matched.reshape {
        computation.remove_instruction(reshape).context(IrSnafu)?;
    }
    computation.remove_instruction_and_unused_operands(matched.all_reduce).context(IrSnafu)?;

    debug!(
        all_reduce = %ar_name,
        split_dim = dim,
        group_size,
        channel_id = ?channel_id.map(|id| id.0),
        "created reduce-scatter"
    );
    Ok(replacement)
}
