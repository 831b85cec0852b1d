use crate::{
    registry::{ObjectRegistry, UnresolvedName},
    usage::ROOT,
};

#[test]
pub fn resolves_registered_and_root() {
    let mut registry = ObjectRegistry::new();
    registry.register("ff1", 16384);

    assert_eq!(registry.resolve("ff1"), Ok(16384));
    assert_eq!(registry.resolve_parent(None), Ok(ROOT));
    assert_eq!(registry.resolve_parent(Some("ff1")), Ok(16384));
    assert_eq!(
        registry.resolve("ff9"),
        Err(UnresolvedName("ff9".to_owned()))
    );
}

#[test]
pub fn re_registering_replaces_oid() {
    let mut registry = ObjectRegistry::new();
    registry.register("ff1", 16384);
    registry.register("ff1", 16390);

    assert_eq!(registry.resolve("ff1"), Ok(16390));
    assert_eq!(registry.len(), 1);
}
