use test_case::test_case;

use tessera_ir::prelude::*;

use crate::reduce_scatter::identity::*;
use crate::test::helpers::*;

fn config(replicas: usize, partitions: usize) -> ModuleConfig {
    ModuleConfig::builder().replica_count(replicas).num_partitions(partitions).build()
}

fn member_ids(groups: &ParticipantGroups) -> Vec<Vec<usize>> {
    groups.groups().iter().map(|group| group.iter().map(|member| member.id).collect()).collect()
}

// ============================================================================
// Participant enumeration
// ============================================================================

#[test]
fn test_cross_replica_evaluates_every_partition() {
    let attrs = CollectiveAttrs::builder().build();
    let groups = ParticipantGroups::for_collective(&attrs, &config(4, 2)).unwrap();
    assert_eq!(groups.mode(), CollectiveGroupMode::CrossReplica);
    assert_eq!(groups.group_size(), 4);
    assert_eq!(member_ids(&groups), vec![vec![0, 1, 2, 3]]);

    let member = &groups.groups()[0][3];
    let expected = [Participant { replica: 3, partition: 0 }, Participant { replica: 3, partition: 1 }];
    assert_eq!(member.instances.as_slice(), &expected);
}

#[test]
fn test_cross_partition_groups_partitions() {
    let attrs = CollectiveAttrs::builder().replica_groups([[0], [1]]).channel_id(ChannelId(1)).build();
    let groups = ParticipantGroups::for_collective(&attrs, &config(2, 4)).unwrap();
    assert_eq!(groups.mode(), CollectiveGroupMode::CrossReplicaAndPartition);
    assert_eq!(member_ids(&groups), vec![vec![0, 1, 2, 3]]);

    let member = &groups.groups()[0][2];
    let expected = [Participant { replica: 0, partition: 2 }, Participant { replica: 1, partition: 2 }];
    assert_eq!(member.instances.as_slice(), &expected);
}

#[test]
fn test_flattened_ids_split_into_replica_and_partition() {
    let attrs = CollectiveAttrs::builder()
        .replica_groups([[1, 3, 2, 0], [5, 7, 6, 4]])
        .channel_id(ChannelId(1))
        .use_global_device_ids(true)
        .build();
    let groups = ParticipantGroups::for_collective(&attrs, &config(2, 4)).unwrap();
    assert_eq!(groups.mode(), CollectiveGroupMode::FlattenedId);
    assert_eq!(member_ids(&groups), vec![vec![1, 3, 2, 0], vec![5, 7, 6, 4]]);
    assert_eq!(groups.groups()[1][1].instances.as_slice(), &[Participant { replica: 1, partition: 3 }]);
}

#[test_case(CollectiveAttrs::builder().use_global_device_ids(true).build(), config(4, 1) ; "global ids without channel")]
#[test_case(CollectiveAttrs::builder().replica_groups([[0, 1], [1, 2]]).build(), config(4, 1) ; "overlapping groups")]
#[test_case(CollectiveAttrs::builder().replica_groups([[0, 1]]).build(), config(4, 1) ; "groups miss replicas")]
#[test_case(
    CollectiveAttrs::builder().channel_id(ChannelId(1)).build(),
    ModuleConfig::builder().num_partitions(4).use_spmd_partitioning(false).build()
    ; "cross partition outside spmd"
)]
#[test_case(
    CollectiveAttrs::builder().replica_groups([[0, 1]]).channel_id(ChannelId(1)).build(),
    config(2, 4)
    ; "cross partition spanning replicas"
)]
#[test_case(
    CollectiveAttrs::builder().channel_id(ChannelId(1)).use_global_device_ids(true).build(),
    config(2, 4)
    ; "global ids without groups"
)]
fn test_unsupported_layouts(attrs: CollectiveAttrs, config: ModuleConfig) {
    assert_eq!(ParticipantGroups::for_collective(&attrs, &config), None);
}

// ============================================================================
// Evaluation
// ============================================================================

fn at(replica: usize, partition: usize) -> Participant {
    Participant { replica, partition }
}

#[test]
fn test_arithmetic_on_identities() {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let rid = graph.replica_id();
    let pid = graph.partition_id();
    let four = graph.comp.constant_int(PrimitiveType::U32, 4, "four").unwrap();
    let scaled = graph.comp.multiply(rid, four, "scaled").unwrap();
    let gid = graph.comp.add(scaled, pid, "gid").unwrap();
    let one = graph.comp.constant_int(PrimitiveType::U32, 1, "one").unwrap();
    let prev = graph.comp.binary(BinaryOp::Subtract, gid, one, "prev").unwrap();

    assert_eq!(evaluate(&graph.comp, gid, at(1, 3)), Some(7));
    assert_eq!(evaluate(&graph.comp, prev, at(1, 3)), Some(6));
    // u32 arithmetic below zero wraps on device.
    assert_eq!(evaluate(&graph.comp, prev, at(0, 0)), None);
}

#[test_case(PrimitiveType::S32, 0, 1, Some(-1) ; "signed result below zero")]
#[test_case(PrimitiveType::U32, 0, 1, None ; "unsigned result below zero")]
#[test_case(PrimitiveType::U32, 5, 1, Some(4) ; "unsigned result in range")]
#[test_case(PrimitiveType::S8, -100, 100, None ; "signed result below type minimum")]
fn test_subtraction_stays_in_element_type(element_type: PrimitiveType, lhs: i64, rhs: i64, expected: Option<i64>) {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let lhs = graph.comp.constant_int(element_type, lhs, "lhs").unwrap();
    let rhs = graph.comp.constant_int(element_type, rhs, "rhs").unwrap();
    let diff = graph.comp.binary(BinaryOp::Subtract, lhs, rhs, "diff").unwrap();
    assert_eq!(evaluate(&graph.comp, diff, at(0, 0)), expected);
}

#[test]
fn test_wrapping_index_is_not_clamped() {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let rid = graph.replica_id();
    let one = graph.comp.constant_int(PrimitiveType::U32, 1, "one").unwrap();
    let prev = graph.comp.binary(BinaryOp::Subtract, rid, one, "prev").unwrap();
    let value = graph.lookup(&[0, 8, 16, 24], prev);
    assert_eq!(evaluate(&graph.comp, value, at(2, 0)), Some(8));
    assert_eq!(evaluate(&graph.comp, value, at(0, 0)), None);
}

#[test_case(2, 16 ; "in range")]
#[test_case(9, 24 ; "clamped high")]
#[test_case(-3, 0 ; "clamped low")]
fn test_table_lookup_clamps_index(index: i64, expected: i64) {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let index = graph.s32(index);
    let value = graph.lookup(&[0, 8, 16, 24], index);
    assert_eq!(evaluate(&graph.comp, value, at(0, 0)), Some(expected));
}

#[test]
fn test_iota_lookup() {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let table = graph.comp.iota(Shape::new(PrimitiveType::S32, &[8]), 0, "iota").unwrap();
    let rid = graph.replica_id();
    let value = graph.lookup_in(table, rid);
    assert_eq!(evaluate(&graph.comp, value, at(5, 0)), Some(5));
    assert_eq!(evaluate(&graph.comp, value, at(11, 0)), Some(7));
}

#[test]
fn test_two_lookups_resolve_but_three_do_not() {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let rid = graph.replica_id();
    let first = graph.lookup(&[1, 2, 3, 0], rid);
    let second = graph.lookup(&[10, 20, 30, 40], first);
    let third = graph.lookup(&[0, 1, 2, 3], second);

    assert_eq!(evaluate(&graph.comp, second, at(3, 0)), Some(10));
    assert_eq!(evaluate(&graph.comp, third, at(3, 0)), None);
}

#[test]
fn test_unsupported_expressions() {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let rid = graph.replica_id();
    let two = graph.comp.constant_int(PrimitiveType::U32, 2, "two").unwrap();
    let half = graph.comp.binary(BinaryOp::Divide, rid, two, "half").unwrap();
    assert_eq!(evaluate(&graph.comp, half, at(4, 0)), None);

    // Table computed by arithmetic instead of materialized.
    let base = graph.comp.iota(Shape::new(PrimitiveType::S32, &[4]), 0, "base").unwrap();
    let doubled = graph.comp.add(base, base, "doubled").unwrap();
    let value = graph.lookup_in(doubled, rid);
    assert_eq!(evaluate(&graph.comp, value, at(1, 0)), None);

    let param = graph.comp.parameter(1, Shape::scalar(PrimitiveType::S32), "index").unwrap();
    assert_eq!(evaluate(&graph.comp, param, at(0, 0)), None);
}

#[test]
fn test_convert_rejects_values_out_of_range() {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let minus_one = graph.s32(-1);
    let unsigned = graph.comp.convert(minus_one, PrimitiveType::U32, "unsigned").unwrap();
    assert_eq!(evaluate(&graph.comp, unsigned, at(0, 0)), None);

    let rid = graph.replica_id();
    let signed = graph.to_s32(rid);
    assert_eq!(evaluate(&graph.comp, signed, at(6, 0)), Some(6));
}

// ============================================================================
// Positions
// ============================================================================

fn subgroups() -> ParticipantGroups {
    let attrs = CollectiveAttrs::builder().replica_groups([[1, 3, 2, 0], [4, 5, 6, 7]]).build();
    ParticipantGroups::for_collective(&attrs, &config(8, 2)).unwrap()
}

#[test]
fn test_composed_lookup_matches_flattened_table() {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let rid = graph.replica_id();
    let position = graph.lookup(&[3, 0, 2, 1, 0, 1, 2, 3], rid);
    let composed = graph.lookup(&[0, 8, 16, 24], position);
    let flattened = graph.lookup(&[24, 0, 16, 8, 0, 8, 16, 24], rid);

    let groups = subgroups();
    let expected = evaluate_positions(&graph.comp, flattened, &groups, 8).unwrap();
    assert_eq!(evaluate_positions(&graph.comp, composed, &groups, 8), Some(expected.clone()));
    assert_eq!(resolve_positions(&graph.comp, composed, &groups, 8), Some(expected));
}

#[test]
fn test_out_of_order_positions_are_rejected() {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let rid = graph.replica_id();
    let id = graph.lookup(&[0, 1, 2, 3, 0, 1, 2, 3], rid);
    let offset = graph.scaled(id, 8);

    let groups = subgroups();
    let positions = evaluate_positions(&graph.comp, offset, &groups, 8).unwrap();
    assert_eq!(positions[0].as_slice(), &[1, 3, 2, 0]);
    assert_eq!(positions[1].as_slice(), &[0, 1, 2, 3]);
    assert_eq!(resolve_positions(&graph.comp, offset, &groups, 8), None);
}

#[test]
fn test_offsets_must_be_slice_boundaries() {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let rid = graph.replica_id();
    let id = graph.to_s32(rid);
    let offset = graph.scaled(id, 3);
    let attrs = CollectiveAttrs::builder().build();
    let groups = ParticipantGroups::for_collective(&attrs, &config(4, 1)).unwrap();

    assert!(resolve_positions(&graph.comp, offset, &groups, 3).is_some());
    assert_eq!(evaluate_positions(&graph.comp, offset, &groups, 2), None);
    assert_eq!(evaluate_positions(&graph.comp, offset, &groups, 0), None);
}

#[test]
fn test_instances_must_agree() {
    let mut graph = GraphBuilder::cross_replica(&[8]);
    let pid = graph.partition_id();
    let id = graph.to_s32(pid);
    let attrs = CollectiveAttrs::builder().build();

    // Cross-replica positions may not depend on the partition.
    let groups = ParticipantGroups::for_collective(&attrs, &config(2, 2)).unwrap();
    assert_eq!(evaluate_positions(&graph.comp, id, &groups, 1), None);

    let groups = ParticipantGroups::for_collective(&attrs, &config(2, 1)).unwrap();
    assert!(evaluate_positions(&graph.comp, id, &groups, 1).is_some());
}
