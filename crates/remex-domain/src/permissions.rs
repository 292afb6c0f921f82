//! Read-permission propagation for derived values.
//!
//! A permission map pairs each reader identity with the id of the object
//! whose provenance granted that reader access. A value derived from several
//! inputs may only be read by identities every input agrees on.

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::trace;

use crate::ids::ObjectId;
use crate::key::VerifyKey;

pub type PermissionMap = BTreeMap<VerifyKey, ObjectId>;

/// Keep the identities present in both maps with the same provenance id.
///
/// A key mapped to different ids on each side is dropped, never reported as
/// an error.
#[must_use]
pub fn intersect(left: &PermissionMap, right: &PermissionMap) -> PermissionMap {
    let mut out = PermissionMap::new();
    for (key, left_id) in left {
        match right.get(key) {
            Some(right_id) if right_id == left_id => {
                out.insert(*key, *left_id);
            }
            Some(right_id) => {
                trace!(key = ?key, left = %left_id, right = %right_id, "permission provenance mismatch");
            }
            None => {}
        }
    }
    out
}

/// Keep the identities present in both maps regardless of provenance.
///
/// The left-hand id is retained for shared keys.
#[must_use]
pub fn intersect_keys_only(left: &PermissionMap, right: &PermissionMap) -> PermissionMap {
    left.iter()
        .filter(|(key, _)| right.contains_key(key))
        .map(|(key, id)| (*key, *id))
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PermissionPolicy {
    /// Exclude identities whose provenance ids disagree.
    #[default]
    Strict,
    /// Exclude identities only when absent from one side.
    KeysOnly,
}

impl PermissionPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::KeysOnly => "keys-only",
        }
    }

    #[must_use]
    pub fn combine(self, left: &PermissionMap, right: &PermissionMap) -> PermissionMap {
        match self {
            Self::Strict => intersect(left, right),
            Self::KeysOnly => intersect_keys_only(left, right),
        }
    }
}

impl FromStr for PermissionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "keys-only" | "keys_only" => Ok(Self::KeysOnly),
            other => Err(format!(
                "unknown permission policy '{other}' (expected 'strict' or 'keys-only')"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use proptest::prelude::*;

    fn key(seed: u8) -> VerifyKey {
        SigningKey::from_bytes(&[seed; 32]).verifying_key().into()
    }

    fn map(entries: &[(u8, u128)]) -> PermissionMap {
        entries
            .iter()
            .map(|(seed, id)| (key(*seed), ObjectId::from_u128(*id)))
            .collect()
    }

    #[test]
    fn keeps_only_shared_matching_entries() {
        let left = map(&[(1, 10), (2, 20), (3, 30)]);
        let right = map(&[(2, 20), (3, 31), (4, 40)]);
        assert_eq!(intersect(&left, &right), map(&[(2, 20)]));
    }

    #[test]
    fn empty_side_yields_empty() {
        let left = map(&[(1, 10)]);
        assert!(intersect(&left, &PermissionMap::new()).is_empty());
        assert!(intersect(&PermissionMap::new(), &left).is_empty());
    }

    #[test]
    fn keys_only_ignores_provenance_mismatch() {
        let left = map(&[(1, 10), (2, 20)]);
        let right = map(&[(1, 11), (3, 30)]);
        assert_eq!(intersect_keys_only(&left, &right), map(&[(1, 10)]));
        assert!(intersect(&left, &right).is_empty());
    }

    #[test]
    fn policy_dispatches_to_matching_rule() {
        let left = map(&[(1, 10)]);
        let right = map(&[(1, 11)]);
        assert!(PermissionPolicy::Strict.combine(&left, &right).is_empty());
        assert_eq!(PermissionPolicy::KeysOnly.combine(&left, &right), left);
    }

    #[test]
    fn policy_parses_known_names() {
        assert_eq!(
            "strict".parse::<PermissionPolicy>(),
            Ok(PermissionPolicy::Strict)
        );
        assert_eq!(
            "Keys-Only".parse::<PermissionPolicy>(),
            Ok(PermissionPolicy::KeysOnly)
        );
        assert!("loose".parse::<PermissionPolicy>().is_err());
    }

    fn arb_map() -> impl Strategy<Value = PermissionMap> {
        prop::collection::vec((1_u8..6, 0_u128..3), 0..6).prop_map(|entries| map(&entries))
    }

    proptest! {
        #[test]
        fn intersect_is_commutative(a in arb_map(), b in arb_map()) {
            prop_assert_eq!(intersect(&a, &b), intersect(&b, &a));
        }

        #[test]
        fn intersect_is_idempotent(a in arb_map()) {
            prop_assert_eq!(intersect(&a, &a), a);
        }

        #[test]
        fn intersect_never_widens(a in arb_map(), b in arb_map()) {
            let out = intersect(&a, &b);
            prop_assert!(out.iter().all(|(k, v)| a.get(k) == Some(v) && b.get(k) == Some(v)));
        }

        #[test]
        fn keys_only_keeps_every_shared_key(a in arb_map(), b in arb_map()) {
            let out = intersect_keys_only(&a, &b);
            let shared = a.keys().filter(|k| b.contains_key(*k)).count();
            prop_assert_eq!(out.len(), shared);
        }
    }
}
