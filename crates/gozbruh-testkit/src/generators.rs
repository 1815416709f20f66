//! Proptest generators for property-based testing.

use proptest::prelude::*;

use gozbruh_core::{DurableId, ManifestEntry, ObjectName, TransferManifest};

/// A valid host object name.
pub fn object_name() -> impl Strategy<Value = ObjectName> {
    "[A-Za-z][A-Za-z0-9_]{0,15}".prop_filter_map("invalid object name", |s| ObjectName::new(s).ok())
}

/// Parameters for a generated batch: distinct names, how many of them
/// are roots, and the order entries are pushed in.
#[derive(Debug, Clone)]
pub struct ManifestParams {
    pub names: Vec<ObjectName>,
    pub roots: usize,
    pub push_order: Vec<usize>,
}

impl Arbitrary for ManifestParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop::collection::btree_set("[A-Za-z][A-Za-z0-9_]{0,15}", 1..12)
            .prop_flat_map(|names| {
                let names: Vec<ObjectName> = names
                    .into_iter()
                    .filter_map(|n| ObjectName::new(n).ok())
                    .collect();
                let len = names.len();
                let order: Vec<usize> = (0..len).collect();
                (
                    Just(names),
                    1..=len.max(1),
                    Just(order).prop_shuffle(),
                )
            })
            .prop_map(|(names, roots, push_order)| ManifestParams {
                names,
                roots,
                push_order,
            })
            .boxed()
    }
}

/// Build a manifest: the first `roots` names are their own parents, every
/// other name is parented to one of them. Entries are pushed in
/// `push_order`.
pub fn manifest_from_params(params: &ManifestParams, extension: &str) -> TransferManifest {
    let roots = params.roots.min(params.names.len()).max(1);
    let mut manifest = TransferManifest::new();
    for &idx in &params.push_order {
        let Some(name) = params.names.get(idx) else {
            continue;
        };
        let parent = match params.names.get(idx % roots) {
            Some(root) => DurableId::from_name(root),
            None => DurableId::from_name(name),
        };
        manifest.push(ManifestEntry::new(
            name.clone(),
            DurableId::from_name(name),
            parent,
            extension,
        ));
    }
    manifest
}

/// A manifest built from arbitrary [`ManifestParams`].
pub fn manifest() -> impl Strategy<Value = TransferManifest> {
    any::<ManifestParams>().prop_map(|params| manifest_from_params(&params, "ma"))
}
