//! Recognition of `all-reduce -> [reshape ->] dynamic-slice` chains that
//! implement a reduce-scatter.

use smallvec::SmallVec;
use tracing::{debug, trace};

use tessera_ir::{Computation, InstrId, Instruction, ModuleConfig, Op, Shape};

use super::identity::{ParticipantGroups, resolve_positions};

// ============================================================================
// OPTIONS
// ============================================================================

/// Knobs of [`match_reduce_scatter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, bon::Builder)]
pub struct MatchOptions {
    /// Accept slices that split several dimensions.
    ///
    /// Accepted for interface compatibility only: such slices are still
    /// rejected.
    #[builder(default)]
    pub allow_multiple_split_dims: bool,

    /// Look through one reshape between the all-reduce and the slice.
    #[builder(default = true)]
    pub allow_intervening_reshape: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { allow_multiple_split_dims: false, allow_intervening_reshape: true }
    }
}

impl MatchOptions {
    /// Defaults, adjusted by environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TESSERA_NO_INTERVENING_RESHAPE=1` - Only match slices that read the
    ///   all-reduce directly
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if std::env::var("TESSERA_NO_INTERVENING_RESHAPE").is_ok_and(|value| value != "0") {
            options.allow_intervening_reshape = false;
        }
        options
    }
}

// ============================================================================
// MATCHING
// ============================================================================

/// An all-reduce whose only consumer keeps one participant's slice of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceScatterMatch {
    pub all_reduce: InstrId,
    /// Reshape between the all-reduce and the slice, if any.
    pub reshape: Option<InstrId>,
    pub dynamic_slice: InstrId,
    /// Scattered dimension, in the all-reduce's shape.
    pub split_dim: usize,
    pub group_size: usize,
}

/// Decide whether `all_reduce` feeds a slice that every participant takes at
/// `position_in_group * slice_size`.
///
/// Returns `None` for anything that does not match; the reason is logged at
/// `debug` level.
pub fn match_reduce_scatter(
    computation: &Computation,
    all_reduce: InstrId,
    config: &ModuleConfig,
    options: &MatchOptions,
) -> Option<ReduceScatterMatch> {
    let ar = computation.get(all_reduce)?;
    let Op::AllReduce(attrs) = ar.op() else {
        return None;
    };

    let [user] = ar.users() else {
        return reject(ar, "all-reduce must have exactly one user");
    };
    let mut consumer = computation.get(*user)?;
    let mut reshape = None;
    if matches!(consumer.op(), Op::Reshape) {
        if !options.allow_intervening_reshape {
            return reject(ar, "intervening reshape is not allowed");
        }
        let [next] = consumer.users() else {
            return reject(ar, "reshape must have exactly one user");
        };
        reshape = Some(consumer.id());
        consumer = computation.get(*next)?;
    }

    let Some(slice_sizes) = consumer.op().as_dynamic_slice() else {
        return reject(ar, "result is not consumed by a dynamic-slice");
    };
    let sliced = reshape.unwrap_or(all_reduce);
    if consumer.operand(0) != sliced {
        return reject(ar, "result is used as a slice index");
    }
    let input_shape = computation.get(sliced)?.shape();

    let split_dims = input_shape
        .dims()
        .iter()
        .zip(slice_sizes)
        .enumerate()
        .filter(|(_, (input, slice))| input != slice)
        .map(|(dim, _)| dim)
        .collect::<SmallVec<[usize; 4]>>();
    let split_dim = match split_dims.as_slice() {
        [dim] => *dim,
        [] => return reject(ar, "slice keeps the whole array"),
        dims => {
            debug!(
                instruction = %ar.name(),
                ?dims,
                allow_multiple_split_dims = options.allow_multiple_split_dims,
                reason = "slice splits more than one dimension",
                "cannot match reduce-scatter"
            );
            return None;
        }
    };

    let slice_size = slice_sizes[split_dim];
    let input_size = input_shape.dimension(split_dim);
    if slice_size == 0 || input_size % slice_size != 0 {
        return reject(ar, "split dimension is not a whole number of slices");
    }
    let group_size = input_size / slice_size;

    let Some(groups) = ParticipantGroups::for_collective(attrs, config) else {
        return reject(ar, "unsupported replica groups");
    };
    if groups.group_size() != group_size {
        trace!(expected = groups.group_size(), actual = group_size, mode = ?groups.mode(), "group size mismatch");
        return reject(ar, "slice count differs from group size");
    }

    let offsets = &consumer.operands()[1..];
    let non_zero = offsets.iter().enumerate().any(|(dim, offset)| dim != split_dim && !is_zero(computation, *offset));
    if non_zero {
        return reject(ar, "offset of an unsplit dimension is not constant zero");
    }
    if resolve_positions(computation, offsets[split_dim], &groups, slice_size).is_none() {
        return reject(ar, "slice offsets do not follow group positions");
    }

    let split_dim = match reshape {
        None => split_dim,
        Some(_) => match split_dim_before_reshape(ar.shape(), input_shape, split_dim, group_size) {
            Some(dim) => dim,
            None => return reject(ar, "reshape moves the split across dimensions"),
        },
    };

    debug!(all_reduce = %ar.name(), split_dim, group_size, "matched reduce-scatter");
    Some(ReduceScatterMatch { all_reduce, reshape, dynamic_slice: consumer.id(), split_dim, group_size })
}

/// Dimension of `original` that is scattered in the same contiguous chunks as
/// `split_dim` of `reshaped`.
///
/// Both dimensions must start after the same number of leading elements and
/// the original one must be divisible among the group.
fn split_dim_before_reshape(original: &Shape, reshaped: &Shape, split_dim: usize, group_size: usize) -> Option<usize> {
    let leading = reshaped.leading_element_count(split_dim);
    (0..original.rank()).find(|&dim| {
        original.leading_element_count(dim) == leading && original.dimension(dim) % group_size == 0
    })
}

fn is_zero(computation: &Computation, id: InstrId) -> bool {
    computation.get(id).is_some_and(|inst| match inst.op() {
        Op::Constant(literal) => literal.as_int_scalar() == Some(0),
        _ => false,
    })
}

fn reject<T>(all_reduce: &Instruction, reason: &'static str) -> Option<T> {
    debug!(instruction = %all_reduce.name(), reason, "cannot match reduce-scatter");
    None
}
