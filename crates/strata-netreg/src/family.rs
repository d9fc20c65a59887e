//! # RAT Family Table
//!
//! Groups radio technologies into ratcheting families, e.g. all HSPA
//! variants. Each carrier config string lists one family in ascending
//! priority: `"3,11,9,10,15"` ranks UMTS lowest and HSPAP highest.
//!
//! The table is immutable. [`RatFamilies`] holds the current table behind an
//! [`ArcSwap`]; a config change builds a fresh table and swaps it in, so a
//! reader always works against one complete table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::config::CarrierConfigStore;
use crate::error::{FamilyFault, NetRegError};
use crate::tech::RadioTechnology;

/// One ratcheting family. Rank is the member's position in the config string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatFamily {
    id: usize,
    members: Vec<RadioTechnology>,
}

impl RatFamily {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Members, lowest rank first.
    pub fn members(&self) -> &[RadioTechnology] {
        &self.members
    }

    pub fn rank(&self, rat: RadioTechnology) -> Option<usize> {
        self.members.iter().position(|&m| m == rat)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatFamilyTable {
    families: Vec<RatFamily>,
    by_rat: HashMap<RadioTechnology, usize>,
}

impl RatFamilyTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from family strings.
    ///
    /// Trailing empty entries are dropped, then groups with fewer than two
    /// entries are ignored. A bad entry ends its group: members accepted
    /// before it stay in the table, the rest of the group is dropped and the
    /// fault is returned alongside the table.
    pub fn build<S: AsRef<str>>(groups: &[S]) -> (Self, Vec<NetRegError>) {
        let mut table = Self::default();
        let mut faults = Vec::new();

        for group in groups {
            let group = group.as_ref();
            let mut entries: Vec<&str> = group.split(',').collect();
            while entries.last().is_some_and(|e| e.is_empty()) {
                entries.pop();
            }
            if entries.len() < 2 {
                continue;
            }

            let id = table.families.len();
            let mut members = Vec::with_capacity(entries.len());
            for entry in entries {
                match table.parse_entry(entry) {
                    Ok(rat) => {
                        table.by_rat.insert(rat, id);
                        members.push(rat);
                    }
                    Err(reason) => {
                        warn!(group, entry, %reason, "abandoning RAT family group");
                        faults.push(NetRegError::MalformedFamilyGroup {
                            group: group.to_string(),
                            entry: entry.trim().to_string(),
                            reason,
                        });
                        break;
                    }
                }
            }

            if !members.is_empty() {
                table.families.push(RatFamily { id, members });
            }
        }

        (table, faults)
    }

    fn parse_entry(&self, entry: &str) -> Result<RadioTechnology, FamilyFault> {
        let code: i64 = entry.trim().parse().map_err(|_| FamilyFault::Unparseable)?;
        let rat = u8::try_from(code)
            .ok()
            .and_then(|c| RadioTechnology::try_from(c).ok())
            .ok_or(FamilyFault::UnknownTechnology)?;
        if self.by_rat.contains_key(&rat) {
            return Err(FamilyFault::Duplicate);
        }
        Ok(rat)
    }

    pub fn family_of(&self, rat: RadioTechnology) -> Option<&RatFamily> {
        self.by_rat.get(&rat).map(|&id| &self.families[id])
    }

    /// Rank of `rat` within `family`; `None` (lowest) when not a member.
    pub fn rank(&self, family: &RatFamily, rat: RadioTechnology) -> Option<usize> {
        family.rank(rat)
    }

    /// Both technologies belong to the same family.
    pub fn same_family(&self, a: RadioTechnology, b: RadioTechnology) -> bool {
        match (self.by_rat.get(&a), self.by_rat.get(&b)) {
            (Some(fa), Some(fb)) => fa == fb,
            _ => false,
        }
    }

    pub fn families(&self) -> &[RatFamily] {
        &self.families
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

/// Process-wide, swappable family table shared by every slot.
#[derive(Debug, Default)]
pub struct RatFamilies {
    current: ArcSwap<RatFamilyTable>,
    writer: Mutex<()>,
}

impl RatFamilies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups<S: AsRef<str>>(groups: &[S]) -> Self {
        let families = Self::new();
        families.rebuild(groups);
        families
    }

    /// Snapshot of the current table.
    pub fn load(&self) -> Arc<RatFamilyTable> {
        self.current.load_full()
    }

    /// Replaces the table with one built from `groups`. Returns the faults
    /// of any abandoned groups.
    pub fn rebuild<S: AsRef<str>>(&self, groups: &[S]) -> Vec<NetRegError> {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let (table, faults) = RatFamilyTable::build(groups);
        debug!(families = table.len(), faults = faults.len(), "RAT family table rebuilt");
        self.current.store(Arc::new(table));
        faults
    }

    pub fn clear(&self) {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        self.current.store(Arc::new(RatFamilyTable::empty()));
    }

    /// Rebuilds from the carrier config of `sub_id`. Without a bundle the
    /// table degrades to empty and `ConfigUnavailable` is returned.
    pub fn reload(
        &self,
        store: &dyn CarrierConfigStore,
        sub_id: i32,
    ) -> Result<Vec<NetRegError>, NetRegError> {
        match store.config_for_subscription(sub_id) {
            Some(config) => Ok(self.rebuild(config.rat_families())),
            None => {
                warn!(sub_id, "no carrier config, RAT families cleared");
                self.clear();
                Err(NetRegError::ConfigUnavailable {
                    sub_id,
                    reason: "no carrier config bundle".into(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CarrierConfig, InMemoryConfigStore};
    use crate::tech::RadioTechnology::*;

    #[test]
    fn ranks_follow_config_order() {
        let (table, faults) = RatFamilyTable::build(&["3,11,9,10,15"]);
        assert!(faults.is_empty());

        let family = table.family_of(Hsdpa).unwrap();
        assert_eq!(table.rank(family, Umts), Some(0));
        assert_eq!(table.rank(family, Hspa), Some(1));
        assert_eq!(table.rank(family, Hspap), Some(4));
        assert_eq!(table.rank(family, Lte), None);
    }

    #[test]
    fn unlisted_rat_has_no_family() {
        let (table, _) = RatFamilyTable::build(&["1,2"]);
        assert!(table.family_of(Lte).is_none());
        assert!(!table.same_family(Lte, Lte));
    }

    #[test]
    fn single_entry_groups_are_ignored() {
        let (table, faults) = RatFamilyTable::build(&["14", "1,2"]);
        assert!(faults.is_empty());
        assert_eq!(table.len(), 1);
        assert!(table.family_of(Lte).is_none());
    }

    #[test]
    fn trailing_commas_are_dropped() {
        let (table, faults) = RatFamilyTable::build(&["1,2,", "14,,"]);
        assert!(faults.is_empty());
        assert_eq!(table.family_of(Gprs).unwrap().members(), &[Gprs, Edge]);
        assert!(table.family_of(Lte).is_none(), "single entry once trimmed");
    }

    #[test]
    fn families_are_disjoint() {
        let (table, _) = RatFamilyTable::build(&["1,2", "7,8,12"]);
        assert!(table.same_family(Gprs, Edge));
        assert!(table.same_family(Evdo0, EvdoB));
        assert!(!table.same_family(Edge, EvdoA));
    }

    #[test]
    fn bad_entry_keeps_earlier_members() {
        let (table, faults) = RatFamilyTable::build(&["9,10,x,11", "1,2"]);

        let family = table.family_of(Hsdpa).unwrap();
        assert_eq!(family.members(), &[Hsdpa, Hsupa]);
        assert!(table.family_of(Hspa).is_none());
        assert!(table.family_of(Gprs).is_some(), "later groups still load");

        assert_eq!(faults.len(), 1);
        assert!(matches!(
            &faults[0],
            NetRegError::MalformedFamilyGroup { entry, reason: FamilyFault::Unparseable, .. }
                if entry == "x"
        ));
    }

    #[test]
    fn duplicate_rat_abandons_rest_of_group() {
        let (table, faults) = RatFamilyTable::build(&["1,2", "16,2,3"]);

        assert!(table.same_family(Gprs, Edge));
        let gsm = table.family_of(Gsm).unwrap();
        assert_eq!(gsm.members(), &[Gsm]);
        assert!(table.family_of(Umts).is_none());
        assert!(matches!(
            faults[0],
            NetRegError::MalformedFamilyGroup { reason: FamilyFault::Duplicate, .. }
        ));
    }

    #[test]
    fn out_of_range_code_is_rejected() {
        let (table, faults) = RatFamilyTable::build(&["14,99"]);
        assert_eq!(table.family_of(Lte).unwrap().members(), &[Lte]);
        assert!(matches!(
            faults[0],
            NetRegError::MalformedFamilyGroup { reason: FamilyFault::UnknownTechnology, .. }
        ));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let groups = ["1,2", "3,11,9,10,15", "14,19"];
        let families = RatFamilies::from_groups(&groups);
        let first = families.load();
        families.rebuild(&groups);
        let second = families.load();

        assert_eq!(*first, *second);
        assert!(!Arc::ptr_eq(&first, &second), "rebuild swaps in a new table");
    }

    #[test]
    fn old_snapshot_survives_rebuild() {
        let families = RatFamilies::from_groups(&["1,2"]);
        let before = families.load();
        families.rebuild(&["14,19"]);

        assert!(before.same_family(Gprs, Edge));
        assert!(!families.load().same_family(Gprs, Edge));
        assert!(families.load().same_family(Lte, LteCa));
    }

    #[test]
    fn reload_without_bundle_degrades_to_empty() {
        let families = RatFamilies::from_groups(&["1,2"]);
        let store = InMemoryConfigStore::new();

        let err = families.reload(&store, 1).unwrap_err();
        assert!(matches!(err, NetRegError::ConfigUnavailable { sub_id: 1, .. }));
        assert!(families.load().is_empty());

        store.insert(1, CarrierConfig::with_rat_families(&["9,10,11"]));
        let faults = families.reload(&store, 1).unwrap();
        assert!(faults.is_empty());
        assert!(families.load().same_family(Hsdpa, Hspa));
    }
}
