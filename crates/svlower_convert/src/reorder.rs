//! Use-before-definition reordering of item lists.

use std::collections::{BTreeMap, BTreeSet};

use svlower_ast::Identifier;

/// Reorders `items` so that every locally-satisfiable use follows its
/// defining item, pulling definitions forward on demand.
///
/// The result is a stable permutation: items keep their relative order
/// except where a later definition must move ahead of a use, and an item
/// pulled forward is suppressed at its original position. Dependencies
/// among items that form a cycle are emitted in source order.
pub fn reorder_items<T, N, U>(items: Vec<T>, declared: N, used: U) -> Vec<T>
where
    N: Fn(&T) -> Vec<Identifier>,
    U: Fn(&T) -> BTreeSet<Identifier>,
{
    let declared: Vec<Vec<Identifier>> = items.iter().map(&declared).collect();
    let used: Vec<BTreeSet<Identifier>> = items.iter().map(&used).collect();

    // First definition of each name wins.
    let mut defs: BTreeMap<Identifier, usize> = BTreeMap::new();
    for (idx, names) in declared.iter().enumerate() {
        for name in names {
            defs.entry(name.clone()).or_insert(idx);
        }
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut visiting = vec![false; slots.len()];
    let mut satisfied: BTreeSet<Identifier> = BTreeSet::new();
    let mut out: Vec<T> = Vec::with_capacity(slots.len());

    for index in 0..slots.len() {
        emit(
            index,
            &defs,
            &declared,
            &used,
            &mut slots,
            &mut visiting,
            &mut satisfied,
            &mut out,
        );
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn emit<T>(
    index: usize,
    defs: &BTreeMap<Identifier, usize>,
    declared: &[Vec<Identifier>],
    used: &[BTreeSet<Identifier>],
    slots: &mut Vec<Option<T>>,
    visiting: &mut [bool],
    satisfied: &mut BTreeSet<Identifier>,
    out: &mut Vec<T>,
) {
    if slots[index].is_none() || visiting[index] {
        return;
    }
    visiting[index] = true;
    for name in &used[index] {
        if satisfied.contains(name) {
            continue;
        }
        if let Some(&def_index) = defs.get(name) {
            if def_index != index {
                emit(def_index, defs, declared, used, slots, visiting, satisfied, out);
            }
        }
    }
    visiting[index] = false;
    if let Some(item) = slots[index].take() {
        out.push(item);
        for name in &declared[index] {
            satisfied.insert(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tiny stand-in item: (declared names, used names).
    type Item = (Vec<&'static str>, Vec<&'static str>);

    fn run(items: Vec<Item>) -> Vec<Item> {
        reorder_items(
            items,
            |item: &Item| item.0.iter().map(|s| s.to_string()).collect(),
            |item: &Item| item.1.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn already_ordered_is_untouched() {
        let items = vec![
            (vec!["a"], vec![]),
            (vec!["b"], vec!["a"]),
            (vec!["c"], vec!["b"]),
        ];
        assert_eq!(run(items.clone()), items);
    }

    #[test]
    fn definition_is_pulled_forward() {
        let items = vec![(vec!["b"], vec!["a"]), (vec!["a"], vec![])];
        let out = run(items);
        assert_eq!(out[0].0, vec!["a"]);
        assert_eq!(out[1].0, vec!["b"]);
    }

    #[test]
    fn pulled_definition_is_not_duplicated() {
        let items = vec![
            (vec!["b"], vec!["a"]),
            (vec!["a"], vec![]),
            (vec!["c"], vec!["a"]),
        ];
        let out = run(items);
        assert_eq!(out.len(), 3);
        let a_count = out.iter().filter(|item| item.0 == vec!["a"]).count();
        assert_eq!(a_count, 1);
    }

    #[test]
    fn chains_are_resolved_transitively() {
        let items = vec![
            (vec!["c"], vec!["b"]),
            (vec!["b"], vec!["a"]),
            (vec!["a"], vec![]),
        ];
        let out = run(items);
        assert_eq!(out[0].0, vec!["a"]);
        assert_eq!(out[1].0, vec!["b"]);
        assert_eq!(out[2].0, vec!["c"]);
    }

    #[test]
    fn external_uses_are_ignored() {
        let items = vec![(vec!["a"], vec!["external"]), (vec!["b"], vec![])];
        assert_eq!(run(items.clone()), items);
    }

    #[test]
    fn cycles_fall_back_to_source_order() {
        let items = vec![(vec!["a"], vec!["b"]), (vec!["b"], vec!["a"])];
        let out = run(items.clone());
        // b is pulled ahead of a; the cycle guard stops the recursion.
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0, vec!["b"]);
    }

    #[test]
    fn self_reference_does_not_recurse() {
        let items = vec![(vec!["a"], vec!["a"]), (vec!["b"], vec![])];
        assert_eq!(run(items.clone()), items);
    }
}
