use std::collections::{BTreeSet, HashMap};

use forgelens_core::{CellValue, Table};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AggError;
use crate::flatten::{ValueMode, leaf_value};
use crate::tree::BucketTree;

/// Collapse-and-accumulate rules for [`flatten_cumulative`].
///
/// Every top-level group key folds into one of two output buckets: keys in
/// `canonical_groups` become `canonical_label`, everything else becomes
/// `fallback_label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeMergeSpec {
    pub canonical_groups: BTreeSet<String>,
    pub canonical_label: String,
    pub fallback_label: String,
    pub group_field: String,
    pub subgroup_field: String,
    pub value_mode: ValueMode,
    pub group_column: String,
    pub subgroup_column: String,
    pub value_column: String,
}

/// Flattens a two-level tree while remapping group keys onto the two
/// canonical labels and summing values for repeated (label, subgroup) pairs
/// into a single row.
///
/// The accumulator is keyed, so cost stays linear in the leaf count, and the
/// output holds at most one row per pair, in first-seen order. Totals are
/// invariant to traversal order; the row set is only observable once
/// complete.
pub fn flatten_cumulative(
    tree: &BucketTree,
    spec: &CumulativeMergeSpec,
) -> Result<Table, AggError> {
    let groups = tree
        .buckets(&spec.group_field)
        .ok_or_else(|| AggError::ShapeMismatch {
            level: 0,
            field: spec.group_field.clone(),
        })?;

    let mut table = Table::new(vec![
        spec.group_column.clone(),
        spec.subgroup_column.clone(),
        spec.value_column.clone(),
    ]);
    let mut slots: HashMap<(String, String), usize> = HashMap::new();

    for group in groups {
        // The raw key decides membership; formatted keys only affect display.
        let label = if spec.canonical_groups.contains(&group.key) {
            spec.canonical_label.as_str()
        } else {
            spec.fallback_label.as_str()
        };
        debug!(raw = group.key.as_str(), label, "group remapped");

        let subgroups =
            group
                .buckets(&spec.subgroup_field)
                .ok_or_else(|| AggError::ShapeMismatch {
                    level: 1,
                    field: spec.subgroup_field.clone(),
                })?;

        for subgroup in subgroups {
            let value = leaf_value(subgroup, &spec.value_mode)?;
            let slot_key = (label.to_owned(), subgroup.label().to_owned());

            match slots.get(&slot_key) {
                Some(&row_index) => {
                    if let Some(row) = table.row_mut(row_index) {
                        let updated = accumulate(&row[2], &value);
                        row[2] = updated;
                    }
                }
                None => {
                    slots.insert(slot_key, table.len());
                    table.push(vec![
                        CellValue::from(label),
                        CellValue::from(subgroup.label()),
                        value,
                    ]);
                }
            }
        }
    }

    Ok(table)
}

fn accumulate(current: &CellValue, incoming: &CellValue) -> CellValue {
    match (current, incoming) {
        (CellValue::Count(current), CellValue::Count(incoming)) => {
            CellValue::Count(current + incoming)
        }
        (current, incoming) => CellValue::Number(current.as_number() + incoming.as_number()),
    }
}
