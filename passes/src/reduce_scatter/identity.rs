//! Resolution of a participant's position inside its collective group.
//!
//! A dynamic-slice that implements a scatter computes its start offset from
//! the participant's runtime identity (`replica-id`, `partition-id` or both),
//! usually through one or two lookup tables. The resolver evaluates that
//! offset expression for every concrete participant of the collective and
//! turns it into a position, then checks that every group hands out the
//! positions `0..group_size` to its members in declared order.
//!
//! Only tables that are directly materialized (integer constants and iotas)
//! are understood. Anything else is unresolvable.

use itertools::Itertools;
use smallvec::{SmallVec, smallvec};
use tracing::trace;

use tessera_ir::{
    BinaryOp, CollectiveAttrs, CollectiveGroupMode, Computation, InstrId, Instruction, ModuleConfig, Op,
    ReplicaGroup,
};

/// Maximum number of table lookups on any path of an offset expression.
const MAX_LOOKUPS: usize = 2;

/// Runtime identity of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Participant {
    pub replica: usize,
    pub partition: usize,
}

/// One entry of a group.
///
/// A member stands for every participant that shares its id; which axis the
/// id lives on depends on the group mode. All of them must resolve to the
/// same position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: usize,
    pub instances: SmallVec<[Participant; 4]>,
}

/// Concrete membership of a collective, enumerated per group mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantGroups {
    mode: CollectiveGroupMode,
    groups: Vec<Vec<Member>>,
}

impl ParticipantGroups {
    /// Enumerate the participants of a collective with `attrs` under `config`.
    ///
    /// Returns `None` for group layouts the resolver does not model:
    /// global ids without a channel, groups that do not partition their
    /// domain, cross-partition collectives outside SPMD programs, and
    /// cross-partition collectives whose replica groups are not trivial.
    pub fn for_collective(attrs: &CollectiveAttrs, config: &ModuleConfig) -> Option<Self> {
        let replicas = config.replica_count;
        let partitions = config.num_partitions;
        let mode = attrs.group_mode()?;
        if mode != CollectiveGroupMode::CrossReplica && !config.use_spmd_partitioning {
            return None;
        }

        let groups = match mode {
            CollectiveGroupMode::CrossReplica => attrs
                .replica_groups
                .resolve(replicas)?
                .iter()
                .map(|group| {
                    let instances = |replica| (0..partitions).map(move |partition| Participant { replica, partition });
                    group.iter().map(|&id| Member { id, instances: instances(id).collect() }).collect()
                })
                .collect(),
            CollectiveGroupMode::CrossReplicaAndPartition => {
                // Only one replica per group, so a group is exactly the partitions of one replica.
                if !attrs.replica_groups.resolve(replicas)?.iter().all(|group| group.len() == 1) {
                    return None;
                }
                let member = |id| Member {
                    id,
                    instances: (0..replicas).map(|replica| Participant { replica, partition: id }).collect(),
                };
                vec![(0..partitions).map(member).collect()]
            }
            CollectiveGroupMode::FlattenedId => {
                if attrs.replica_groups.is_empty() || partitions == 0 {
                    return None;
                }
                let member = |id: usize| Member {
                    id,
                    instances: smallvec![Participant { replica: id / partitions, partition: id % partitions }],
                };
                attrs
                    .replica_groups
                    .resolve(replicas * partitions)?
                    .iter()
                    .map(|group| group.iter().copied().map(member).collect())
                    .collect()
            }
        };

        Some(Self { mode, groups })
    }

    pub fn mode(&self) -> CollectiveGroupMode {
        self.mode
    }

    /// Number of members per group.
    pub fn group_size(&self) -> usize {
        self.groups.first().map_or(0, Vec::len)
    }

    pub fn groups(&self) -> &[Vec<Member>] {
        &self.groups
    }
}

// =========================================================================
// Resolution
// =========================================================================

/// Position of every member of every group, in declared order.
///
/// The offset computed by `offset` for a member must be a non-negative
/// multiple of `slice_size`, and all instances of the member must agree.
/// No check is made that positions form a bijection; see
/// [`resolve_positions`].
pub fn evaluate_positions(
    computation: &Computation,
    offset: InstrId,
    groups: &ParticipantGroups,
    slice_size: usize,
) -> Option<Vec<ReplicaGroup>> {
    let slice_size = i64::try_from(slice_size).ok().filter(|size| *size > 0)?;
    groups
        .groups()
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|member| {
                    let offsets = member
                        .instances
                        .iter()
                        .map(|participant| evaluate(computation, offset, *participant))
                        .collect::<Option<SmallVec<[i64; 4]>>>()?;
                    let Ok(offset) = offsets.into_iter().all_equal_value() else {
                        trace!(member = member.id, "participants sharing an id disagree on the offset");
                        return None;
                    };
                    if offset < 0 || offset % slice_size != 0 {
                        trace!(member = member.id, offset, slice_size, "offset is not a slice boundary");
                        return None;
                    }
                    usize::try_from(offset / slice_size).ok()
                })
                .collect::<Option<ReplicaGroup>>()
        })
        .collect()
}

/// Like [`evaluate_positions`], but also require that every group assigns
/// the positions `0, 1, .., n-1` to its members in declared order.
pub fn resolve_positions(
    computation: &Computation,
    offset: InstrId,
    groups: &ParticipantGroups,
    slice_size: usize,
) -> Option<Vec<ReplicaGroup>> {
    let positions = evaluate_positions(computation, offset, groups, slice_size)?;
    for (group, members) in positions.iter().zip(groups.groups()) {
        if let Some(index) = group.iter().enumerate().position(|(index, position)| index != *position) {
            trace!(member = members[index].id, expected = index, actual = group[index], "position out of order");
            return None;
        }
    }
    Some(positions)
}

/// Value of the scalar integer expression `id` as seen by `participant`.
pub fn evaluate(computation: &Computation, id: InstrId, participant: Participant) -> Option<i64> {
    let value = Evaluator { computation, participant }.eval(id, 0);
    if value.is_none() {
        trace!(instruction = ?computation.get(id).map(|inst| inst.name()), ?participant, "unresolvable offset");
    }
    value
}

/// `value` if the integral element type of `inst` holds it.
///
/// Results that would wrap at runtime are unresolvable.
fn representable(inst: &Instruction, value: i64) -> Option<i64> {
    let (min, max) = inst.shape().element_type().integral_range()?;
    if !(min..=max).contains(&value) {
        trace!(instruction = %inst.name(), value, element_type = %inst.shape().element_type(), "value wraps");
        return None;
    }
    Some(value)
}

struct Evaluator<'a> {
    computation: &'a Computation,
    participant: Participant,
}

impl Evaluator<'_> {
    fn eval(&self, id: InstrId, lookups: usize) -> Option<i64> {
        let inst = self.computation.get(id)?;
        match inst.op() {
            Op::Constant(literal) => literal.as_int_scalar(),
            Op::ReplicaId => i64::try_from(self.participant.replica).ok(),
            Op::PartitionId => i64::try_from(self.participant.partition).ok(),
            Op::Reshape => {
                if inst.shape().element_count() != 1 {
                    return None;
                }
                self.eval(inst.operand(0), lookups)
            }
            Op::Convert => {
                if inst.shape().element_count() != 1 {
                    return None;
                }
                representable(inst, self.eval(inst.operand(0), lookups)?)
            }
            Op::Binary(op) => {
                let lhs = self.eval(inst.operand(0), lookups)?;
                let rhs = self.eval(inst.operand(1), lookups)?;
                let value = match op {
                    BinaryOp::Add => lhs.checked_add(rhs),
                    BinaryOp::Subtract => lhs.checked_sub(rhs),
                    BinaryOp::Multiply => lhs.checked_mul(rhs),
                    BinaryOp::Divide | BinaryOp::Maximum | BinaryOp::Minimum => None,
                }?;
                representable(inst, value)
            }
            Op::DynamicSlice { slice_sizes } => {
                if lookups >= MAX_LOOKUPS || slice_sizes.as_slice() != [1] {
                    return None;
                }
                let index = self.eval(*inst.operands().get(1)?, lookups + 1)?;
                self.lookup(inst.operand(0), index)
            }
            Op::Parameter { .. } | Op::Iota { .. } | Op::AllReduce(_) | Op::ReduceScatter { .. } => None,
        }
    }

    /// Element `index` of a rank-1 integer table, clamped like a dynamic-slice start.
    fn lookup(&self, table: InstrId, index: i64) -> Option<i64> {
        let table = self.computation.get(table)?;
        let shape = table.shape();
        if shape.rank() != 1 || shape.dimension(0) == 0 || !shape.element_type().is_integral() {
            return None;
        }
        let last = i64::try_from(shape.dimension(0) - 1).ok()?;
        let index = index.clamp(0, last);
        match table.op() {
            Op::Constant(literal) => literal.int_values()?.get(usize::try_from(index).ok()?).copied(),
            Op::Iota { .. } => Some(index),
            _ => None,
        }
    }
}
