//! Environment variable reconciliation.
//!
//! An environment can declare a variable with the sentinel value to
//! mean "do not manage this variable from configuration". On update the
//! remote value is preserved for sentinel-valued keys, so secrets
//! rotated out-of-band survive a redeploy. On first-time creation the
//! sentinel itself is shipped as a visible placeholder.

use std::collections::BTreeMap;

/// The placeholder marking a variable as managed outside configuration.
pub const SENTINEL: &str = "HIDDEN";

/// Merge desired variables with the remote function's current ones.
///
/// For each desired key: if the value is the sentinel and the key
/// exists remotely, the remote value is kept; otherwise the desired
/// value wins. Keys present only remotely are dropped: the result is
/// driven by the desired keys, not a full merge.
pub fn reconcile(
    desired: &BTreeMap<String, String>,
    existing: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    desired
        .iter()
        .map(|(key, value)| match existing.get(key) {
            Some(current) if value == SENTINEL => (key.clone(), current.clone()),
            _ => (key.clone(), value.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn sentinel_preserves_existing_value() {
        let desired = map(&[("A", SENTINEL), ("B", "new")]);
        let existing = map(&[("A", "secret123"), ("C", "old")]);

        let reconciled = reconcile(&desired, &existing);
        assert_eq!(reconciled, map(&[("A", "secret123"), ("B", "new")]));
    }

    #[test]
    fn non_sentinel_value_always_wins() {
        let desired = map(&[("A", "explicit")]);
        let existing = map(&[("A", "remote")]);

        let reconciled = reconcile(&desired, &existing);
        assert_eq!(reconciled, map(&[("A", "explicit")]));
    }

    #[test]
    fn sentinel_without_existing_key_ships_the_placeholder() {
        let desired = map(&[("NEW_SECRET", SENTINEL)]);
        let existing = map(&[]);

        let reconciled = reconcile(&desired, &existing);
        assert_eq!(reconciled, map(&[("NEW_SECRET", SENTINEL)]));
    }

    #[test]
    fn keys_only_present_remotely_are_dropped() {
        let desired = map(&[("KEEP", "1")]);
        let existing = map(&[("KEEP", "0"), ("ORPHAN", "x")]);

        let reconciled = reconcile(&desired, &existing);
        assert!(!reconciled.contains_key("ORPHAN"));
        assert_eq!(reconciled.len(), 1);
    }

    #[test]
    fn empty_desired_drops_everything() {
        let reconciled = reconcile(&map(&[]), &map(&[("A", "1")]));
        assert!(reconciled.is_empty());
    }
}
