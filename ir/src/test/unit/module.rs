use crate::{
    ChannelId, ChannelIdAllocator, CollectiveAttrs, Computation, ComputationKind, Error, Module, ModuleConfig, Shape,
};
use tessera_dtype::PrimitiveType;

fn computation_with_channel(name: &str, channel_id: Option<u64>) -> Computation {
    let mut comp = Computation::new(name);
    let p = comp.parameter(0, Shape::new(PrimitiveType::F32, &[4]), "p").unwrap();
    let attrs = CollectiveAttrs::builder().maybe_channel_id(channel_id.map(ChannelId)).build();
    let ar = comp.all_reduce(p, attrs, "ar").unwrap();
    comp.set_root(ar).unwrap();
    comp
}

#[test]
fn test_config_builder_defaults() {
    let config = ModuleConfig::builder().build();
    assert_eq!(config, ModuleConfig::default());

    let config = ModuleConfig::builder().replica_count(2).num_partitions(4).build();
    assert!(config.use_spmd_partitioning);

    let config = ModuleConfig::builder().num_partitions(4).use_spmd_partitioning(false).build();
    assert!(!config.use_spmd_partitioning);
}

#[test]
fn test_channel_allocation_starts_past_max() {
    let module = Module::new("m", ModuleConfig::default(), computation_with_channel("entry", None));
    assert_eq!(module.max_channel_id(), None);
    assert_eq!(ChannelIdAllocator::for_module(&module).peek(), ChannelId(1));

    let mut module = Module::new("m", ModuleConfig::default(), computation_with_channel("entry", Some(7)));
    module.add_computation(computation_with_channel("other", Some(2)));
    assert_eq!(module.max_channel_id(), Some(ChannelId(7)));
    assert_eq!(ChannelIdAllocator::for_module(&module).allocate(), ChannelId(8));
}

#[test]
fn test_non_fusion_computations() {
    let mut module = Module::new("m", ModuleConfig::default(), computation_with_channel("entry", None));
    let fused = module.add_computation(Computation::with_kind("fused", ComputationKind::Fusion));
    let other = module.add_computation(Computation::new("other"));
    let ids = module.non_fusion_computations();
    assert_eq!(ids, vec![module.entry_id(), other]);
    assert!(!ids.contains(&fused));
}

#[test]
fn test_verify_rejects_duplicate_channels() {
    let mut module = Module::new("m", ModuleConfig::default(), computation_with_channel("entry", Some(1)));
    assert!(module.verify().is_ok());
    module.add_computation(computation_with_channel("other", Some(1)));
    let err = module.verify().unwrap_err();
    assert!(matches!(err, Error::DuplicateChannelId { channel_id: ChannelId(1), .. }));
}

#[test]
fn test_verify_requires_root() {
    let module = Module::new("m", ModuleConfig::default(), Computation::new("entry"));
    assert_eq!(module.verify().unwrap_err(), Error::MissingRoot { computation: "entry".into() });
}
