//! Record store and the per-region tally derived from it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::Record;

/// Number of records per region code. Only ever derived from records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionTally(BTreeMap<String, usize>);

impl RegionTally {
    /// Rebuilds the tally from scratch by replaying `records`.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut tally = Self::default();
        for record in records {
            tally.count(&record.region);
        }
        tally
    }

    fn count(&mut self, region: &str) {
        *self.0.entry(region.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, region: &str) -> usize {
        self.0.get(region).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(region, n)| (region.as_str(), *n))
    }
}

/// Appends `new` to `records` in arrival order and counts every new record
/// towards its region.
pub fn merge(
    mut records: Vec<Record>,
    mut tally: RegionTally,
    new: Vec<Record>,
) -> (Vec<Record>, RegionTally) {
    records.reserve(new.len());
    for record in new {
        tally.count(&record.region);
        records.push(record);
    }
    (records, tally)
}

/// All records harvested so far, in insertion order, plus their tally.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    tally: RegionTally,
}

impl RecordStore {
    /// Seeds a store from previously saved records. The tally is recomputed.
    pub fn from_records(records: Vec<Record>) -> Self {
        let (records, tally) = merge(Vec::new(), RegionTally::default(), records);
        Self { records, tally }
    }

    pub fn merge(&mut self, new: Vec<Record>) {
        let records = std::mem::take(&mut self.records);
        let tally = std::mem::take(&mut self.tally);
        (self.records, self.tally) = merge(records, tally, new);
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.tally = RegionTally::default();
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn tally(&self) -> &RegionTally {
        &self.tally
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, region: &str) -> Record {
        Record {
            name: name.into(),
            address: String::new(),
            website: String::new(),
            contact: None,
            region: region.into(),
        }
    }

    fn assert_consistent(store: &RecordStore) {
        assert_eq!(store.tally().total(), store.len());
        for (region, n) in store.tally().iter() {
            let actual = store.records().iter().filter(|r| r.region == region).count();
            assert_eq!(n, actual, "region {region}");
        }
    }

    #[test]
    fn merge_appends_in_order_and_counts() {
        let (records, tally) = merge(
            vec![rec("a", "IL")],
            RegionTally::from_records(&[rec("a", "IL")]),
            vec![rec("b", "DC"), rec("c", "IL")],
        );
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(tally.get("IL"), 2);
        assert_eq!(tally.get("DC"), 1);
        assert_eq!(tally.get("TX"), 0);
    }

    #[test]
    fn merge_with_nothing_is_identity() {
        let (records, tally) = merge(Vec::new(), RegionTally::default(), Vec::new());
        assert!(records.is_empty());
        assert!(tally.is_empty());
    }

    #[test]
    fn store_keeps_duplicates_and_stays_consistent() {
        let mut store = RecordStore::default();
        store.merge(vec![rec("Same", "IL"), rec("Other", "Unknown")]);
        store.merge(vec![rec("Same", "IL")]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.tally().get("IL"), 2);
        assert_consistent(&store);

        store.clear();
        assert!(store.is_empty());
        assert!(store.tally().is_empty());
    }

    #[test]
    fn from_records_rederives_tally() {
        let store = RecordStore::from_records(vec![rec("a", "NY"), rec("b", "NY"), rec("c", "CA")]);
        assert_eq!(store.tally().get("NY"), 2);
        assert_consistent(&store);
    }
}
