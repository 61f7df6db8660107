use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use super::data::{Metadata, Rating, Record, RecordId};

/// Per-actor statistics derived from the records they appear in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActorStats {
    /// Number of records listing this actor
    pub count: usize,
    /// Newest parseable release date among those records
    pub latest_release: Option<NaiveDate>,
    /// Sum of the ratings of those records
    pub rating_sum: u32,
}

impl ActorStats {
    /// Mean rating over the actor's records (0.0 if there are none)
    pub fn average_rating(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.rating_sum as f64 / self.count as f64
        }
    }
}

/// Everything derived from the record set. Never edited on its own,
/// only rebuilt or extended from records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub tags: BTreeSet<String>,
    pub actors: BTreeSet<String>,
    pub series: BTreeSet<String>,
    pub ratings: BTreeSet<Rating>,
    pub actor_stats: HashMap<String, ActorStats>,
}

impl Aggregates {
    /// Compute all aggregates in a single pass
    pub fn build<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut aggregates = Self::default();
        for record in records {
            aggregates.absorb(&record.meta);
        }
        aggregates
    }

    /// Fold one more record into the aggregates
    fn absorb(&mut self, meta: &Metadata) {
        self.tags.extend(meta.tags.iter().cloned());
        self.actors.extend(meta.actors.iter().cloned());
        if let Some(series) = meta.series.as_ref().filter(|s| !s.is_empty()) {
            self.series.insert(series.clone());
        }
        self.ratings.insert(meta.rating);

        let release = meta.release_date();
        for actor in &meta.actors {
            let stats = self.actor_stats.entry(actor.clone()).or_default();
            stats.count += 1;
            stats.rating_sum += meta.rating.get() as u32;
            // Unparseable or missing dates simply don't take part
            if let Some(date) = release {
                stats.latest_release = stats.latest_release.max(Some(date));
            }
        }
    }
}

/// How the actor facet is ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActorOrder {
    Alphabetical,
    LatestRelease,
    #[default]
    Appearances,
    AverageRating,
}

impl ActorOrder {
    pub const ALL: [ActorOrder; 4] = [
        ActorOrder::Alphabetical,
        ActorOrder::LatestRelease,
        ActorOrder::Appearances,
        ActorOrder::AverageRating,
    ];
}

impl fmt::Display for ActorOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActorOrder::Alphabetical => "A to Z",
            ActorOrder::LatestRelease => "Latest release",
            ActorOrder::Appearances => "Most videos",
            ActorOrder::AverageRating => "Highest rated",
        };
        f.write_str(label)
    }
}

/// Counts reported after reconciling a rescan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanDelta {
    pub added: usize,
    pub removed: usize,
}

/// The Library holds every record of the scanned directory in scan order,
/// plus the aggregates that drive the facet panel.
#[derive(Debug, Default)]
pub struct Library {
    records: Vec<Record>,
    positions: HashMap<RecordId, usize>,
    aggregates: Aggregates,
}

impl Library {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from a freshly scanned record set
    pub fn build(records: Vec<Record>) -> Self {
        let mut library = Self {
            records,
            ..Self::default()
        };
        library.rebuild();
        library
    }

    /// All records in index order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    /// Index of a record by id
    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Find a record by id
    pub fn lookup(&self, id: &RecordId) -> Option<&Record> {
        self.position(id).map(|i| &self.records[i])
    }

    /// Replace one record after its file was renamed.
    /// The new record takes the old one's position.
    /// Returns false (and changes nothing) if the old id is unknown.
    pub fn apply_edit(&mut self, old_id: &RecordId, new_record: Record) -> bool {
        let Some(index) = self.position(old_id) else {
            return false;
        };
        self.records[index] = new_record;
        // Removing a value can't be undone incrementally (latest date, set
        // membership), so edits rebuild from scratch
        self.rebuild();
        true
    }

    /// Drop the removed ids and append the added records
    pub fn apply_scan_delta(&mut self, added: Vec<Record>, removed: &[RecordId]) {
        if !removed.is_empty() {
            let removed: HashSet<&RecordId> = removed.iter().collect();
            self.records.retain(|r| !removed.contains(&r.id));
            let mut known: HashSet<RecordId> = self.records.iter().map(|r| r.id.clone()).collect();
            self.records
                .extend(added.into_iter().filter(|r| known.insert(r.id.clone())));
            self.rebuild();
            return;
        }

        // Pure additions can be folded in incrementally
        for record in added {
            if self.positions.contains_key(&record.id) {
                continue;
            }
            self.aggregates.absorb(&record.meta);
            self.positions.insert(record.id.clone(), self.records.len());
            self.records.push(record);
        }
    }

    /// Reconcile a rescan of the same directory: survivors keep their
    /// position (with refreshed covers), new files go to the end.
    pub fn reconcile(&mut self, scanned: Vec<Record>) -> ScanDelta {
        let scanned_ids: HashSet<RecordId> = scanned.iter().map(|r| r.id.clone()).collect();
        let removed: Vec<RecordId> = self
            .records
            .iter()
            .filter(|r| !scanned_ids.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();

        let mut added = Vec::new();
        for record in scanned {
            match self.position(&record.id) {
                Some(index) => self.records[index].thumbnail = record.thumbnail,
                None => added.push(record),
            }
        }

        let delta = ScanDelta {
            added: added.len(),
            removed: removed.len(),
        };
        self.apply_scan_delta(added, &removed);
        delta
    }

    /// Actor names ordered for the facet panel.
    /// Ties keep alphabetical order.
    pub fn sorted_actors(&self, order: ActorOrder) -> Vec<&str> {
        let mut actors: Vec<&str> = self.aggregates.actors.iter().map(String::as_str).collect();
        let stats = |actor: &str| self.aggregates.actor_stats.get(actor).copied().unwrap_or_default();

        match order {
            ActorOrder::Alphabetical => {}
            ActorOrder::LatestRelease => {
                // None sorts below every date, so undated actors land last
                actors.sort_by(|a, b| stats(b).latest_release.cmp(&stats(a).latest_release));
            }
            ActorOrder::Appearances => {
                actors.sort_by(|a, b| stats(b).count.cmp(&stats(a).count));
            }
            ActorOrder::AverageRating => {
                actors.sort_by(|a, b| {
                    stats(b)
                        .average_rating()
                        .total_cmp(&stats(a).average_rating())
                });
            }
        }
        actors
    }

    /// The given ids in index order, skipping unknown ones
    pub fn ordered_ids(&self, selection: &HashSet<RecordId>) -> Vec<RecordId> {
        self.records
            .iter()
            .filter(|r| selection.contains(&r.id))
            .map(|r| r.id.clone())
            .collect()
    }

    fn rebuild(&mut self) {
        self.positions = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        self.aggregates = Aggregates::build(&self.records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::codec::decode;
    use std::path::PathBuf;

    fn record(file: &str) -> Record {
        Record::new(PathBuf::from(format!("/v/{}.mp4", file)), decode(file), None)
    }

    fn sample() -> Vec<Record> {
        vec![
            record("A[x, y]{Ann, Bob}(S1)~2020-01-01@5"),
            record("B[y]{Bob}~2022-06-01@3"),
            record("C{Cat}~not a date@2"),
            record("D[z]{Ann}(S2)~2019-03-03@1"),
        ]
    }

    #[test]
    fn test_build_aggregates() {
        let library = Library::build(sample());
        let agg = library.aggregates();

        assert_eq!(agg.tags.iter().collect::<Vec<_>>(), vec!["x", "y", "z"]);
        assert_eq!(agg.actors.len(), 3);
        assert_eq!(agg.series.iter().collect::<Vec<_>>(), vec!["S1", "S2"]);
        assert_eq!(agg.ratings.len(), 4);

        let bob = agg.actor_stats["Bob"];
        assert_eq!(bob.count, 2);
        assert_eq!(bob.latest_release, NaiveDate::from_ymd_opt(2022, 6, 1));
        assert_eq!(bob.average_rating(), 4.0);

        let ann = agg.actor_stats["Ann"];
        assert_eq!(ann.latest_release, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(ann.average_rating(), 3.0);

        // Only an unparseable date: counted, but no latest release
        let cat = agg.actor_stats["Cat"];
        assert_eq!(cat.count, 1);
        assert_eq!(cat.latest_release, None);
    }

    #[test]
    fn test_lookup_and_position() {
        let library = Library::build(sample());
        let id = PathBuf::from("/v/B[y]{Bob}~2022-06-01@3.mp4");
        assert_eq!(library.position(&id), Some(1));
        assert_eq!(library.lookup(&id).unwrap().meta.name, "B");
        assert!(library.lookup(&PathBuf::from("/v/missing.mp4")).is_none());
    }

    #[test]
    fn test_apply_edit_matches_rebuild() {
        let mut library = Library::build(sample());
        let old_id = library.records()[0].id.clone();
        let edited = record("A2[w]{Dan}@4");

        assert!(library.apply_edit(&old_id, edited.clone()));
        assert_eq!(library.records()[0], edited);
        assert!(library.lookup(&old_id).is_none());

        let fresh = Library::build(library.records().to_vec());
        assert_eq!(library.aggregates(), fresh.aggregates());
        assert!(!library.aggregates().tags.contains("x"));
        assert_eq!(library.aggregates().actor_stats["Bob"].count, 1);
    }

    #[test]
    fn test_apply_edit_unknown_id_is_noop() {
        let mut library = Library::build(sample());
        let before = library.aggregates().clone();
        assert!(!library.apply_edit(&PathBuf::from("/v/nope.mp4"), record("X@1")));
        assert_eq!(library.aggregates(), &before);
        assert_eq!(library.len(), 4);
    }

    #[test]
    fn test_scan_delta_matches_rebuild() {
        let mut records = sample();
        let last = records.pop().unwrap();
        let mut library = Library::build(records);

        // Additions only: incremental path
        library.apply_scan_delta(vec![last.clone(), record("E[q]{Eve}~2024-01-01@2")], &[]);
        let fresh = Library::build(library.records().to_vec());
        assert_eq!(library.aggregates(), fresh.aggregates());
        assert_eq!(library.position(&last.id), Some(3));

        // Removals: rebuild path
        let gone = library.records()[0].id.clone();
        library.apply_scan_delta(vec![], &[gone.clone()]);
        let fresh = Library::build(library.records().to_vec());
        assert_eq!(library.aggregates(), fresh.aggregates());
        assert!(library.lookup(&gone).is_none());
        assert!(!library.aggregates().series.contains("S1"));
    }

    #[test]
    fn test_reconcile_keeps_survivor_order() {
        let mut library = Library::build(sample());
        let mut rescanned = sample();
        rescanned.remove(1);
        rescanned.insert(0, record("New[n]@2"));

        let delta = library.reconcile(rescanned);
        assert_eq!(delta, ScanDelta { added: 1, removed: 1 });

        let names: Vec<&str> = library.records().iter().map(|r| r.meta.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "D", "New"]);
        let fresh = Library::build(library.records().to_vec());
        assert_eq!(library.aggregates(), fresh.aggregates());
    }

    #[test]
    fn test_sorted_actors() {
        let library = Library::build(sample());
        assert_eq!(library.sorted_actors(ActorOrder::Alphabetical), vec!["Ann", "Bob", "Cat"]);
        assert_eq!(library.sorted_actors(ActorOrder::LatestRelease), vec!["Bob", "Ann", "Cat"]);
        // Ann and Bob both have two videos; alphabetical order breaks the tie
        assert_eq!(library.sorted_actors(ActorOrder::Appearances), vec!["Ann", "Bob", "Cat"]);
        assert_eq!(library.sorted_actors(ActorOrder::AverageRating), vec!["Bob", "Ann", "Cat"]);
    }

    #[test]
    fn test_ordered_ids() {
        let library = Library::build(sample());
        let selection: HashSet<RecordId> = [
            library.records()[3].id.clone(),
            library.records()[0].id.clone(),
            PathBuf::from("/v/ghost.mp4"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            library.ordered_ids(&selection),
            vec![library.records()[0].id.clone(), library.records()[3].id.clone()]
        );
    }
}
