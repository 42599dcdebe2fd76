//! Small helpers shared by every differ.

use std::collections::{BTreeMap, BTreeSet};

use crate::crd::ManagedFields;

/// What to do with one optional spec field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent<'a, T> {
    Set(&'a T),
    /// Absent now but set before: reset it in AWS.
    Clear,
    /// Never managed by the controller; leave AWS alone.
    Ignore,
}

pub fn intent<'a, T>(
    desired: Option<&'a T>,
    managed: &ManagedFields,
    field: &str,
) -> Intent<'a, T> {
    match desired {
        Some(v) => Intent::Set(v),
        None if managed.contains(field) => Intent::Clear,
        None => Intent::Ignore,
    }
}

/// A desired scalar that AWS does not currently report.
pub fn drifted<T: PartialEq>(desired: Option<&T>, observed: Option<&T>) -> bool {
    match desired {
        Some(d) => observed != Some(d),
        None => false,
    }
}

/// Order-insensitive list comparison.
pub fn same_set(a: &[String], b: &[String]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapDelta {
    pub upsert: BTreeMap<String, String>,
    pub remove: Vec<String>,
}

impl MapDelta {
    pub fn is_empty(&self) -> bool {
        self.upsert.is_empty() && self.remove.is_empty()
    }
}

pub fn map_delta(
    desired: &BTreeMap<String, String>,
    observed: &BTreeMap<String, String>,
) -> MapDelta {
    MapDelta {
        upsert: desired
            .iter()
            .filter(|(k, v)| observed.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        remove: observed
            .keys()
            .filter(|k| !desired.contains_key(*k))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn intent_distinguishes_cleared_from_unmanaged() {
        let managed: ManagedFields = ["description".to_string()].into();
        assert_eq!(intent(Some(&1), &managed, "timeout"), Intent::Set(&1));
        assert_eq!(intent::<i32>(None, &managed, "description"), Intent::Clear);
        assert_eq!(intent::<i32>(None, &managed, "timeout"), Intent::Ignore);
    }

    #[test]
    fn map_delta_upserts_changes_and_removes_extras() {
        let d = map_delta(
            &map(&[("a", "1"), ("b", "2")]),
            &map(&[("a", "1"), ("b", "3"), ("c", "4")]),
        );
        assert_eq!(d.upsert, map(&[("b", "2")]));
        assert_eq!(d.remove, vec!["c".to_string()]);
        assert!(map_delta(&map(&[("a", "1")]), &map(&[("a", "1")])).is_empty());
    }

    #[test]
    fn unset_fields_never_drift() {
        assert!(!drifted::<i32>(None, Some(&3)));
        assert!(drifted(Some(&3), None));
        assert!(!drifted(Some(&3), Some(&3)));
        assert!(same_set(
            &["a".into(), "b".into()],
            &["b".into(), "a".into()]
        ));
    }
}
