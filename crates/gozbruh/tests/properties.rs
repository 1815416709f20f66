//! Property tests over generated batches.

use gozbruh::core::{ReadySet, TransferManifest};
use gozbruh_testkit::generators::{manifest, object_name};
use gozbruh_testkit::{manifest_from_params, ManifestParams};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_generated_manifests_validate(m in manifest()) {
        prop_assert!(m.validate().is_ok());
    }

    #[test]
    fn test_roots_precede_children(m in manifest()) {
        for (_, entries) in m.groups() {
            prop_assert!(entries[0].is_root());
            prop_assert!(entries[1..].iter().all(|e| !e.is_root()));
        }
    }

    #[test]
    fn test_wire_form_is_stable(m in manifest()) {
        let data = m.to_obj_data();
        prop_assert_eq!(data.object_count(), m.len());

        let decoded = TransferManifest::from_obj_data(&data, "ma").unwrap();
        prop_assert!(decoded.validate().is_ok());
        prop_assert_eq!(decoded.to_obj_data(), data);
    }

    #[test]
    fn test_push_order_does_not_change_groups(params in any::<ManifestParams>()) {
        let shuffled = manifest_from_params(&params, "ma");
        let mut sorted_params = params.clone();
        sorted_params.push_order.sort_unstable();
        let sorted = manifest_from_params(&sorted_params, "ma");

        let roots = |m: &TransferManifest| {
            let mut roots: Vec<String> = m
                .iter()
                .filter(|e| e.is_root())
                .map(|e| e.object_name.to_string())
                .collect();
            roots.sort();
            roots
        };
        prop_assert_eq!(roots(&shuffled), roots(&sorted));
        prop_assert_eq!(shuffled.len(), sorted.len());
    }

    #[test]
    fn test_ready_set_replace_keeps_position(
        names in prop::collection::btree_set(object_name(), 2..8),
        pick in any::<prop::sample::Index>(),
        renamed in object_name(),
    ) {
        let names: Vec<_> = names.into_iter().collect();
        prop_assume!(!names.contains(&renamed));

        let mut ready = ReadySet::new();
        for name in &names {
            ready.insert(name.clone());
        }
        let old = pick.get(&names).clone();
        let position = names.iter().position(|n| *n == old).unwrap();

        ready.replace(&old, renamed.clone());
        ready.replace(&old, renamed.clone());

        prop_assert_eq!(ready.len(), names.len());
        prop_assert!(!ready.contains(&old));
        prop_assert_eq!(ready.iter().nth(position), Some(&renamed));
    }
}
