use crate::{MaterializationMap, MissingMaterializationItem};
use materializations::ReadResult;

/// Returns true if `item` is already answered by `map`.
pub fn is_satisfied(map: &MaterializationMap, item: &MissingMaterializationItem) -> bool {
    map.get(&item.unit)
        .and_then(|infos| infos.get(&item.materialization))
        .map(|info| info.rule_to_variant.contains_key(&item.rule))
        .unwrap_or_default()
}

/// Merge store `results` into `map`, returning true if `map` was changed.
///
/// Only results which carry a variant are merged. Merges are additive:
/// a rule which is already mapped keeps its variant, and a unit which is
/// already `unit_in_info` remains so.
pub fn merge_read_results(map: &mut MaterializationMap, results: &[ReadResult]) -> bool {
    let mut changed = false;

    for result in results {
        let Some(variant) = result.variant() else {
            continue;
        };

        let info = map
            .entry(result.unit.clone())
            .or_default()
            .entry(result.materialization.clone())
            .or_default();

        if !info.unit_in_info {
            info.unit_in_info = true;
            changed = true;
        }
        if !info.rule_to_variant.contains_key(&result.rule) {
            info.rule_to_variant
                .insert(result.rule.clone(), variant.to_string());
            changed = true;
        }
    }

    changed
}
