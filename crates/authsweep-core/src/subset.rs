//! Permission universe and exhaustive subset enumeration.
//!
//! A subset is an integer mask over the sorted universe: bit `i` set means
//! `universe[i]` is granted. Iterating `0..2^n` therefore visits every
//! subset exactly once, in a deterministic order.

use crate::catalog::Operation;
use crate::permission::Permission;
use std::collections::BTreeSet;
use std::ops::Range;

/// Sorted, deduplicated set of permissions referenced by a catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionUniverse {
    permissions: Vec<Permission>,
}

/// A subset of a [`PermissionUniverse`], encoded as a bitmask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermissionSubset(u64);

impl PermissionSubset {
    pub fn from_mask(mask: u64) -> Self {
        Self(mask)
    }

    pub fn mask(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether the permission at sorted index `index` is part of the subset.
    pub fn contains_index(self, index: usize) -> bool {
        index < 64 && self.0 & (1 << index) != 0
    }
}

impl PermissionUniverse {
    /// Collect every permission any operation requires, sorted by token.
    pub fn derive(catalog: &[Operation]) -> Self {
        let set: BTreeSet<Permission> = catalog.iter().flat_map(Operation::required).collect();
        let mut permissions: Vec<Permission> = set.into_iter().collect();
        permissions.sort_by_key(|p| p.as_str());
        Self { permissions }
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn as_slice(&self) -> &[Permission] {
        &self.permissions
    }

    /// Number of subsets, `2^len`.
    pub fn subset_count(&self) -> u64 {
        1u64 << self.permissions.len()
    }

    /// Every subset, from the empty one (mask 0) to the full one.
    pub fn subsets(&self) -> Subsets {
        Subsets {
            masks: 0..self.subset_count(),
        }
    }

    /// Permissions selected by `subset`, in universe order.
    pub fn permissions(&self, subset: PermissionSubset) -> Vec<Permission> {
        self.permissions
            .iter()
            .enumerate()
            .filter(|(index, _)| subset.contains_index(*index))
            .map(|(_, permission)| *permission)
            .collect()
    }

    /// Same as [`PermissionUniverse::permissions`], as a set.
    pub fn permission_set(&self, subset: PermissionSubset) -> BTreeSet<Permission> {
        self.permissions(subset).into_iter().collect()
    }

    /// Encode `permissions` as a subset. Returns `None` if any permission is
    /// outside the universe.
    pub fn subset_of(&self, permissions: &[Permission]) -> Option<PermissionSubset> {
        let mut mask = 0u64;
        for permission in permissions {
            let index = self.permissions.iter().position(|p| p == permission)?;
            mask |= 1 << index;
        }
        Some(PermissionSubset(mask))
    }
}

/// Lazy iterator over all subsets of a universe.
#[derive(Clone, Debug)]
pub struct Subsets {
    masks: Range<u64>,
}

impl Iterator for Subsets {
    type Item = PermissionSubset;

    fn next(&mut self) -> Option<Self::Item> {
        self.masks.next().map(PermissionSubset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.masks.size_hint()
    }
}

impl ExactSizeIterator for Subsets {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CATALOG;
    use crate::permission::Permission::*;
    use std::collections::HashSet;

    #[test]
    fn universe_is_sorted_and_complete() {
        let universe = PermissionUniverse::derive(CATALOG);
        assert_eq!(
            universe.as_slice(),
            &[Auth, Create, Delete, Index, Match, Merge, Remove, Set, Stream]
        );
    }

    #[test]
    fn universe_only_contains_referenced_permissions() {
        let catalog = [
            Operation {
                query: "MATCH (n) SET n.value = 0 RETURN n",
                requires: &[Set, Match],
            },
            Operation {
                query: "MATCH (n) RETURN n",
                requires: &[Match],
            },
        ];
        let universe = PermissionUniverse::derive(&catalog);
        assert_eq!(universe.as_slice(), &[Match, Set]);
        assert_eq!(universe.subset_count(), 4);
    }

    #[test]
    fn nine_permissions_give_512_distinct_subsets() {
        let universe = PermissionUniverse::derive(CATALOG);
        let subsets: Vec<_> = universe.subsets().collect();
        assert_eq!(subsets.len(), 512);
        assert_eq!(universe.subsets().len(), 512);

        let distinct: HashSet<_> = subsets.iter().map(|s| universe.permission_set(*s)).collect();
        assert_eq!(distinct.len(), 512);
    }

    #[test]
    fn enumeration_starts_empty_and_ends_full() {
        let universe = PermissionUniverse::derive(CATALOG);
        let first = universe.subsets().next().unwrap();
        let last = universe.subsets().last().unwrap();
        assert!(first.is_empty());
        assert!(universe.permissions(first).is_empty());
        assert_eq!(universe.permissions(last), universe.as_slice());
    }

    #[test]
    fn bit_i_selects_universe_index_i() {
        let universe = PermissionUniverse::derive(CATALOG);
        assert_eq!(universe.permissions(PermissionSubset::from_mask(0b1)), vec![Auth]);
        assert_eq!(universe.permissions(PermissionSubset::from_mask(0b1_0000)), vec![Match]);
        assert_eq!(
            universe.permissions(PermissionSubset::from_mask(0b1_0000_0110)),
            vec![Create, Delete, Stream]
        );
    }

    #[test]
    fn subset_of_round_trips_through_mask() {
        let universe = PermissionUniverse::derive(CATALOG);
        let subset = universe.subset_of(&[Match, Create]).unwrap();
        assert_eq!(subset.mask(), 0b1_0010);
        assert_eq!(universe.permissions(subset), vec![Create, Match]);
    }

    #[test]
    fn subset_of_rejects_foreign_permission() {
        let catalog = [Operation {
            query: "MATCH (n) RETURN n",
            requires: &[Match],
        }];
        let universe = PermissionUniverse::derive(&catalog);
        assert_eq!(universe.subset_of(&[Stream]), None);
    }

    #[test]
    fn empty_catalog_has_only_the_empty_subset() {
        let universe = PermissionUniverse::derive(&[]);
        assert!(universe.is_empty());
        let subsets: Vec<_> = universe.subsets().collect();
        assert_eq!(subsets, vec![PermissionSubset::from_mask(0)]);
    }
}
