/// Filtering and sorting of the catalog
///
/// `query` turns the library plus the current `ViewState` into an ordered
/// list of record positions. That list is what the render scheduler walks.
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use super::data::{Rating, Record, RecordId};
use super::library::{ActorOrder, Library};

/// Ordering applied after filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortMode {
    /// Keep index (or override) order
    None,
    /// Reverse whatever order filtering produced
    Reverse,
    RatingDesc,
    RatingAsc,
    ActorCountDesc,
    ActorCountAsc,
    #[default]
    NewestFirst,
    OldestFirst,
    Shuffle,
}

impl SortMode {
    pub const ALL: [SortMode; 9] = [
        SortMode::None,
        SortMode::Reverse,
        SortMode::RatingDesc,
        SortMode::RatingAsc,
        SortMode::ActorCountDesc,
        SortMode::ActorCountAsc,
        SortMode::NewestFirst,
        SortMode::OldestFirst,
        SortMode::Shuffle,
    ];
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SortMode::None => "None",
            SortMode::Reverse => "Reversed",
            SortMode::RatingDesc => "Rating, high to low",
            SortMode::RatingAsc => "Rating, low to high",
            SortMode::ActorCountDesc => "Most actors",
            SortMode::ActorCountAsc => "Fewest actors",
            SortMode::NewestFirst => "Newest first",
            SortMode::OldestFirst => "Oldest first",
            SortMode::Shuffle => "Shuffle",
        };
        f.write_str(label)
    }
}

/// Where the unsorted list comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplaySource {
    /// Facet filtering over the whole library
    #[default]
    Normal,
    /// An explicit ad-hoc list, e.g. similarity results
    Override(Vec<RecordId>),
}

impl DisplaySource {
    /// Ids of an override list (empty for the normal view)
    pub fn ids(&self) -> &[RecordId] {
        match self {
            DisplaySource::Normal => &[],
            DisplaySource::Override(ids) => ids,
        }
    }
}

/// Everything that decides what the grid shows. Snapshots of this are
/// what undo/redo moves between.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// Search keyword, stored trimmed and lower-cased
    pub keyword: String,
    pub tags: BTreeSet<String>,
    pub actors: BTreeSet<String>,
    pub series: BTreeSet<String>,
    pub ratings: BTreeSet<Rating>,
    pub sort: SortMode,
    pub source: DisplaySource,
}

impl ViewState {
    /// The state "reset filters" goes to: nothing selected, no sorting
    pub fn cleared() -> Self {
        Self {
            sort: SortMode::None,
            ..Self::default()
        }
    }

    pub fn set_keyword(&mut self, raw: &str) {
        self.keyword = raw.trim().to_lowercase();
    }

    pub fn is_override(&self) -> bool {
        matches!(self.source, DisplaySource::Override(_))
    }

    /// Keyword and facet test for one record (ignores the display source)
    pub fn matches(&self, record: &Record) -> bool {
        let meta = &record.meta;

        if !self.keyword.is_empty() {
            let hit = |s: &str| s.to_lowercase().contains(&self.keyword);
            let found = hit(&meta.name)
                || meta.tags.iter().any(|t| hit(t))
                || meta.actors.iter().any(|a| hit(a))
                || hit(meta.series_str());
            if !found {
                return false;
            }
        }

        // AND across facet groups, OR within one
        (self.tags.is_empty() || meta.tags.iter().any(|t| self.tags.contains(t)))
            && (self.actors.is_empty() || meta.actors.iter().any(|a| self.actors.contains(a)))
            && (self.series.is_empty()
                || meta.series.as_ref().is_some_and(|s| self.series.contains(s)))
            && (self.ratings.is_empty() || self.ratings.contains(&meta.rating))
    }
}

/// Positions of the records the view admits, in index or override order
pub fn filter(library: &Library, view: &ViewState) -> Vec<usize> {
    match &view.source {
        // Override lists skip facet filtering entirely
        DisplaySource::Override(ids) => ids.iter().filter_map(|id| library.position(id)).collect(),
        DisplaySource::Normal => library
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| view.matches(record))
            .map(|(i, _)| i)
            .collect(),
    }
}

/// Reorder a list of positions. Every mode but shuffle is stable.
pub fn sort(list: &mut [usize], records: &[Record], mode: SortMode) {
    let meta = move |i: usize| &records[i].meta;
    match mode {
        SortMode::None => {}
        SortMode::Reverse => list.reverse(),
        SortMode::RatingDesc => list.sort_by(|&a, &b| meta(b).rating.cmp(&meta(a).rating)),
        SortMode::RatingAsc => list.sort_by_key(|&i| meta(i).rating),
        SortMode::ActorCountDesc => {
            list.sort_by(|&a, &b| meta(b).actors.len().cmp(&meta(a).actors.len()))
        }
        SortMode::ActorCountAsc => list.sort_by_key(|&i| meta(i).actors.len()),
        SortMode::NewestFirst => list.sort_by(|&a, &b| {
            dated_last(meta(a).release_date(), meta(b).release_date(), |x, y| y.cmp(x))
        }),
        SortMode::OldestFirst => list.sort_by(|&a, &b| {
            dated_last(meta(a).release_date(), meta(b).release_date(), |x, y| x.cmp(y))
        }),
        SortMode::Shuffle => list.shuffle(&mut rand::rng()),
    }
}

/// Compare two optional keys, sending missing ones to the end
fn dated_last<T, F>(a: Option<T>, b: Option<T>, cmp: F) -> Ordering
where
    F: Fn(&T, &T) -> Ordering,
{
    match (a, b) {
        (Some(a), Some(b)) => cmp(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Filter then sort: the list the grid displays
pub fn query(library: &Library, view: &ViewState) -> Vec<usize> {
    let mut list = filter(library, view);
    sort(&mut list, library.records(), view.sort);
    list
}

/// Rank every other record by how many tags it shares with `records[target]`
/// and keep the best `k`. Ties keep corpus order.
pub fn find_similar(records: &[Record], target: usize, k: usize) -> DisplaySource {
    let Some(source) = records.get(target) else {
        return DisplaySource::Override(Vec::new());
    };
    let wanted: HashSet<&str> = source.meta.tags.iter().map(String::as_str).collect();

    let mut ranked: Vec<(usize, usize)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.id != source.id)
        .map(|(i, r)| {
            let shared = r
                .meta
                .tags
                .iter()
                .filter(|t| wanted.contains(t.as_str()))
                .count();
            (i, shared)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    DisplaySource::Override(
        ranked
            .into_iter()
            .take(k)
            .map(|(i, _)| records[i].id.clone())
            .collect(),
    )
}

/// One checkbox in the facet panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetEntry<T> {
    pub value: T,
    pub selected: bool,
}

/// Facet value → selected, rebuilt from the index whenever it changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetPanel {
    pub tags: Vec<FacetEntry<String>>,
    pub actors: Vec<FacetEntry<String>>,
    pub series: Vec<FacetEntry<String>>,
    pub ratings: Vec<FacetEntry<Rating>>,
}

impl FacetPanel {
    pub fn from_index(library: &Library, view: &ViewState, actor_order: ActorOrder) -> Self {
        let aggregates = library.aggregates();
        let entries = |values: &BTreeSet<String>, selected: &BTreeSet<String>| -> Vec<FacetEntry<String>> {
            values
                .iter()
                .map(|v| FacetEntry {
                    value: v.clone(),
                    selected: selected.contains(v),
                })
                .collect()
        };

        Self {
            tags: entries(&aggregates.tags, &view.tags),
            actors: library
                .sorted_actors(actor_order)
                .into_iter()
                .map(|a| FacetEntry {
                    value: a.to_string(),
                    selected: view.actors.contains(a),
                })
                .collect(),
            series: entries(&aggregates.series, &view.series),
            // Every rating is offered, observed or not
            ratings: Rating::all()
                .map(|r| FacetEntry {
                    value: r,
                    selected: view.ratings.contains(&r),
                })
                .collect(),
        }
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

    fn library() -> Library {
        Library::build(vec![
            record("Alpha[Beach, Sun]{Amy, Bo}(Summer)~2023-05-01@4"),
            record("Bravo[Beach]{Cy}~2021-01-01@2"),
            record("Charlie[Snow]{Amy}(Winter)@4"),
            record("Delta[Sun, Snow]{Bo, Cy, Dee}~2022-07-07@5"),
            record("Echo~soon@2"),
            record("Foxtrot[Beach, Sun, Snow]{Dee}(Summer)~2021-01-01@1"),
        ])
    }

    fn names(library: &Library, list: &[usize]) -> Vec<String> {
        list.iter()
            .map(|&i| library.records()[i].meta.name.clone())
            .collect()
    }

    fn set<T: Ord + Clone>(items: &[T]) -> BTreeSet<T> {
        items.iter().cloned().collect()
    }

    #[test]
    fn test_empty_view_keeps_everything_in_order() {
        let lib = library();
        let view = ViewState::cleared();
        assert_eq!(query(&lib, &view), (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_keyword_matches_any_field_case_insensitively() {
        let lib = library();
        let mut view = ViewState::cleared();

        view.set_keyword("  ALPHA ");
        assert_eq!(view.keyword, "alpha");
        assert_eq!(names(&lib, &filter(&lib, &view)), vec!["Alpha"]);

        view.set_keyword("snow");
        assert_eq!(names(&lib, &filter(&lib, &view)), vec!["Charlie", "Delta", "Foxtrot"]);

        view.set_keyword("dee");
        assert_eq!(names(&lib, &filter(&lib, &view)), vec!["Delta", "Foxtrot"]);

        view.set_keyword("wint");
        assert_eq!(names(&lib, &filter(&lib, &view)), vec!["Charlie"]);
    }

    #[test]
    fn test_facets_and_across_or_within() {
        let lib = library();
        let mut view = ViewState::cleared();
        view.tags = set(&["Beach".to_string(), "Snow".to_string()]);
        view.actors = set(&["Amy".to_string(), "Dee".to_string()]);
        assert_eq!(
            names(&lib, &filter(&lib, &view)),
            vec!["Alpha", "Charlie", "Delta", "Foxtrot"]
        );

        view.series = set(&["Summer".to_string()]);
        assert_eq!(names(&lib, &filter(&lib, &view)), vec!["Alpha", "Foxtrot"]);

        view.ratings = set(&[Rating::clamped(4)]);
        assert_eq!(names(&lib, &filter(&lib, &view)), vec!["Alpha"]);
    }

    #[test]
    fn test_filter_result_is_exactly_the_matching_records() {
        let lib = library();
        let mut view = ViewState::cleared();
        view.tags = set(&["Sun".to_string()]);
        view.ratings = set(&[Rating::clamped(1), Rating::clamped(5)]);

        let kept = filter(&lib, &view);
        for (i, record) in lib.records().iter().enumerate() {
            let tag_ok = record.meta.tags.iter().any(|t| t == "Sun");
            let rating_ok = [1, 5].contains(&record.meta.rating.get());
            assert_eq!(kept.contains(&i), tag_ok && rating_ok, "record {}", record.meta.name);
        }
    }

    #[test]
    fn test_override_bypasses_filters() {
        let lib = library();
        let mut view = ViewState::cleared();
        view.set_keyword("nothing matches this");
        view.source = DisplaySource::Override(vec![
            lib.records()[3].id.clone(),
            PathBuf::from("/v/gone.mp4"),
            lib.records()[0].id.clone(),
        ]);
        assert_eq!(query(&lib, &view), vec![3, 0]);

        view.sort = SortMode::RatingAsc;
        assert_eq!(query(&lib, &view), vec![0, 3]);
    }

    #[test]
    fn test_sorts_are_stable() {
        let lib = library();
        let all: Vec<usize> = (0..6).collect();
        let sorted = |mode| {
            let mut list = all.clone();
            sort(&mut list, lib.records(), mode);
            names(&lib, &list)
        };

        assert_eq!(
            sorted(SortMode::RatingDesc),
            vec!["Delta", "Alpha", "Charlie", "Bravo", "Echo", "Foxtrot"]
        );
        assert_eq!(
            sorted(SortMode::RatingAsc),
            vec!["Foxtrot", "Bravo", "Echo", "Alpha", "Charlie", "Delta"]
        );
        assert_eq!(
            sorted(SortMode::ActorCountDesc),
            vec!["Delta", "Alpha", "Bravo", "Charlie", "Foxtrot", "Echo"]
        );
        assert_eq!(
            sorted(SortMode::ActorCountAsc),
            vec!["Echo", "Bravo", "Charlie", "Foxtrot", "Alpha", "Delta"]
        );
    }

    #[test]
    fn test_date_sorts_put_undated_last() {
        let lib = library();
        let all: Vec<usize> = (0..6).collect();

        let mut newest = all.clone();
        sort(&mut newest, lib.records(), SortMode::NewestFirst);
        assert_eq!(
            names(&lib, &newest),
            vec!["Alpha", "Delta", "Bravo", "Foxtrot", "Charlie", "Echo"]
        );

        let mut oldest = all.clone();
        sort(&mut oldest, lib.records(), SortMode::OldestFirst);
        assert_eq!(
            names(&lib, &oldest),
            vec!["Bravo", "Foxtrot", "Delta", "Alpha", "Charlie", "Echo"]
        );
    }

    #[test]
    fn test_reverse_and_none() {
        let lib = library();
        let mut list = vec![2, 0, 5];
        sort(&mut list, lib.records(), SortMode::None);
        assert_eq!(list, vec![2, 0, 5]);
        sort(&mut list, lib.records(), SortMode::Reverse);
        assert_eq!(list, vec![5, 0, 2]);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let lib = library();
        let mut list: Vec<usize> = (0..6).collect();
        sort(&mut list, lib.records(), SortMode::Shuffle);
        let mut back = list.clone();
        back.sort();
        assert_eq!(back, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_find_similar_ranks_by_shared_tags() {
        let lib = library();
        // Foxtrot: Beach, Sun, Snow
        let similar = find_similar(lib.records(), 5, 4);
        let ids = similar.ids();
        assert_eq!(ids.len(), 4);
        let ranked: Vec<&str> = ids
            .iter()
            .map(|id| lib.lookup(id).unwrap().meta.name.as_str())
            .collect();
        // Alpha and Delta share two, then Bravo and Charlie share one (corpus order)
        assert_eq!(ranked, vec!["Alpha", "Delta", "Bravo", "Charlie"]);
    }

    #[test]
    fn test_find_similar_caps_at_corpus_size() {
        let lib = library();
        assert_eq!(find_similar(lib.records(), 0, 15).ids().len(), 5);
        assert_eq!(find_similar(lib.records(), 0, 0).ids().len(), 0);
        assert!(!find_similar(lib.records(), 0, 15).ids().contains(&lib.records()[0].id));
        assert_eq!(find_similar(lib.records(), 99, 3), DisplaySource::Override(vec![]));
    }

    #[test]
    fn test_facet_panel_reflects_selection() {
        let lib = library();
        let mut view = ViewState::cleared();
        view.tags.insert("Sun".into());
        view.ratings.insert(Rating::clamped(2));

        let panel = FacetPanel::from_index(&lib, &view, ActorOrder::Alphabetical);
        let tags: Vec<(&str, bool)> = panel
            .tags
            .iter()
            .map(|e| (e.value.as_str(), e.selected))
            .collect();
        assert_eq!(tags, vec![("Beach", false), ("Snow", false), ("Sun", true)]);
        assert_eq!(panel.actors[0].value, "Amy");
        assert_eq!(panel.series.len(), 2);
        assert_eq!(panel.ratings.len(), 5);
        assert!(panel.ratings[1].selected);
    }

    #[test]
    fn test_view_state_snapshot_serializes() {
        let mut view = ViewState::default();
        view.tags.insert("Beach".into());
        view.source = DisplaySource::Override(vec![PathBuf::from("/v/a.mp4")]);
        let json = serde_json::to_string(&view).unwrap();
        let back: ViewState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, view);
    }
}
