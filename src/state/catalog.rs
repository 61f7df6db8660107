/// The catalog controller
///
/// `Catalog` owns the whole application state: the library, the current
/// view, its history, the incremental renderer and the cover pipeline.
/// The window shell holds exactly one and only talks to it through the
/// methods below, so every view change goes through history and every
/// index change refreshes the grid.
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::data::{Metadata, Rating, Record, RecordId};
use super::edit::{self, BatchEdit};
use super::history::HistoryStack;
use super::library::{ActorOrder, Library, ScanDelta};
use super::query::{self, DisplaySource, FacetPanel, SortMode, ViewState};
use super::scan::ScanReport;
use super::scheduler::RenderScheduler;
use crate::config::AppConfig;
use crate::error::{LaunchError, RenameError, ScanError};
use crate::media::player;
use crate::media::thumbnail::{Cover, ThumbnailPipeline};

/// Space under a cover for title, chips and buttons
const TILE_INFO_HEIGHT: f32 = 150.0;

/// Cover status of one materialized grid slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverState {
    /// The record has no cover, or covers are switched off
    None,
    Loading,
    /// Decoded; the pixels were handed out by `tick`
    Ready,
    /// A cover exists but could not be decoded
    Missing,
}

/// One materialized grid cell
#[derive(Debug, Clone, Copy)]
pub struct Tile<'a> {
    pub slot: usize,
    pub record: &'a Record,
    pub cover: CoverState,
    pub selected: bool,
}

/// What a tick changed
#[derive(Debug, Default)]
pub struct TickReport {
    /// Slots materialized by this tick
    pub materialized: Range<usize>,
    /// Newly decoded covers, keyed by cover path
    pub covers: Vec<(PathBuf, Cover)>,
}

/// Result of one item of an edit
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub old_id: RecordId,
    pub result: Result<RecordId, RenameError>,
}

pub struct Catalog {
    config: AppConfig,
    library: Library,
    view: ViewState,
    history: HistoryStack<ViewState>,
    /// Query result: positions into the library's records
    list: Vec<usize>,
    scheduler: RenderScheduler,
    pipeline: Option<ThumbnailPipeline>,
    /// One entry per materialized slot
    covers: Vec<CoverState>,
    /// Cover paths whose pixels the shell already holds
    decoded: HashSet<PathBuf>,
    /// Cover paths that did not decode; not retried until the next scan
    failed: HashSet<PathBuf>,
    /// Set when `decoded` lost entries the shell must drop too
    covers_pruned: bool,
    facets: FacetPanel,
    actor_order: ActorOrder,
    batch_mode: bool,
    selection: HashSet<RecordId>,
    root: Option<PathBuf>,
    scanning: bool,
    viewport_height: f32,
    scroll_reset: bool,
}

impl Catalog {
    pub fn new(config: AppConfig) -> Self {
        let scheduler = RenderScheduler::new(
            config.batch_size,
            config.scroll_threshold,
            config.check_delay(),
        );
        let pipeline = config
            .show_thumbnails
            .then(|| ThumbnailPipeline::new(config.decode_workers, config.cover_box()));

        Self {
            config,
            library: Library::new(),
            view: ViewState::default(),
            history: HistoryStack::new(),
            list: Vec::new(),
            scheduler,
            pipeline,
            covers: Vec::new(),
            decoded: HashSet::new(),
            failed: HashSet::new(),
            covers_pruned: false,
            facets: FacetPanel::default(),
            actor_order: ActorOrder::default(),
            batch_mode: false,
            selection: HashSet::new(),
            root: None,
            scanning: false,
            viewport_height: 0.0,
            scroll_reset: false,
        }
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn facets(&self) -> &FacetPanel {
        &self.facets
    }

    pub fn actor_order(&self) -> ActorOrder {
        self.actor_order
    }

    pub fn root(&self) -> Option<&PathBuf> {
        self.root.as_ref()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of records the current view admits
    pub fn result_count(&self) -> usize {
        self.list.len()
    }

    pub fn rendered_count(&self) -> usize {
        self.scheduler.rendered_count()
    }

    pub fn columns(&self) -> usize {
        self.scheduler.columns()
    }

    pub fn is_batch_mode(&self) -> bool {
        self.batch_mode
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    /// Materialized tiles in display order
    pub fn tiles(&self) -> impl Iterator<Item = Tile<'_>> + '_ {
        let records = self.library.records();
        self.covers.iter().enumerate().map(move |(slot, &cover)| {
            let record = &records[self.list[slot]];
            Tile {
                slot,
                record,
                cover,
                selected: self.selection.contains(&record.id),
            }
        })
    }

    /// True once after every grid reset; the shell scrolls back to the top
    pub fn take_scroll_reset(&mut self) -> bool {
        std::mem::take(&mut self.scroll_reset)
    }

    /// Whether the shell should still hold pixels for this cover
    pub fn has_cover(&self, path: &Path) -> bool {
        self.decoded.contains(path)
    }

    /// True once after covers were forgotten; the shell then keeps only
    /// the paths `has_cover` still accepts
    pub fn take_covers_pruned(&mut self) -> bool {
        std::mem::take(&mut self.covers_pruned)
    }

    // ========== Scanning ==========

    /// Claim the scanner. `None` rescans the current directory.
    pub fn begin_scan(&mut self, root: Option<PathBuf>) -> Result<PathBuf, ScanError> {
        if self.scanning {
            warn!("scan requested while another is running");
            return Err(ScanError::AlreadyRunning);
        }
        let root = root
            .or_else(|| self.root.clone())
            .ok_or(ScanError::NoDirectory)?;
        self.scanning = true;
        Ok(root)
    }

    /// Apply a finished scan. On failure the previous index stays as it was.
    pub fn finish_scan(&mut self, result: Result<ScanReport, ScanError>) -> Result<ScanDelta, ScanError> {
        self.scanning = false;
        let report = result?;
        // Files may have been fixed on disk since
        self.failed.clear();

        let delta = if self.root.as_ref() == Some(&report.root) {
            let delta = self.library.reconcile(report.records);
            info!("rescan: {} added, {} removed", delta.added, delta.removed);
            delta
        } else {
            let delta = ScanDelta {
                added: report.records.len(),
                removed: self.library.len(),
            };
            info!("opened {} with {} videos", report.root.display(), delta.added);
            self.library = Library::build(report.records);
            self.view = ViewState::default();
            self.history.clear();
            self.selection.clear();
            self.batch_mode = false;
            self.decoded.clear();
            self.covers_pruned = true;
            self.root = Some(report.root);
            delta
        };

        self.after_index_change();
        Ok(delta)
    }

    // ========== View state ==========

    /// Apply `change` to the view; if it changed anything, record the old
    /// view in history and refresh the grid.
    fn mutate<F>(&mut self, change: F) -> bool
    where
        F: FnOnce(&mut ViewState),
    {
        let before = self.view.clone();
        change(&mut self.view);
        // Re-picking shuffle is a real change: it deals a new order
        if self.view == before && self.view.sort != SortMode::Shuffle {
            return false;
        }
        self.history.push(before);
        self.refresh_facets();
        self.refresh_list();
        true
    }

    pub fn set_keyword(&mut self, raw: &str) -> bool {
        self.mutate(|view| view.set_keyword(raw))
    }

    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        self.mutate(|view| toggle(&mut view.tags, tag.to_string()))
    }

    pub fn toggle_actor(&mut self, actor: &str) -> bool {
        self.mutate(|view| toggle(&mut view.actors, actor.to_string()))
    }

    pub fn toggle_series(&mut self, series: &str) -> bool {
        self.mutate(|view| toggle(&mut view.series, series.to_string()))
    }

    pub fn toggle_rating(&mut self, rating: Rating) -> bool {
        self.mutate(|view| toggle(&mut view.ratings, rating))
    }

    /// Show only records with this tag. Leaves any ad-hoc list.
    pub fn filter_by_tag(&mut self, tag: &str) -> bool {
        self.mutate(|view| {
            view.tags = BTreeSet::from([tag.to_string()]);
            view.source = DisplaySource::Normal;
        })
    }

    pub fn filter_by_actor(&mut self, actor: &str) -> bool {
        self.mutate(|view| {
            view.actors = BTreeSet::from([actor.to_string()]);
            view.source = DisplaySource::Normal;
        })
    }

    pub fn filter_by_series(&mut self, series: &str) -> bool {
        self.mutate(|view| {
            view.series = BTreeSet::from([series.to_string()]);
            view.source = DisplaySource::Normal;
        })
    }

    pub fn filter_by_rating(&mut self, rating: Rating) -> bool {
        self.mutate(|view| {
            view.ratings = BTreeSet::from([rating]);
            view.source = DisplaySource::Normal;
        })
    }

    pub fn set_sort(&mut self, mode: SortMode) -> bool {
        self.mutate(|view| view.sort = mode)
    }

    /// Clear keyword and facets, drop any ad-hoc list, stop sorting
    pub fn reset_filters(&mut self) -> bool {
        self.mutate(|view| *view = ViewState::cleared())
    }

    /// Replace the grid with the records sharing most tags with `id`
    pub fn find_similar(&mut self, id: &RecordId) -> bool {
        let Some(target) = self.library.position(id) else {
            return false;
        };
        let similar = query::find_similar(self.library.records(), target, self.config.similar_count);
        debug!("{} similar to {}", similar.ids().len(), id.display());
        self.mutate(|view| {
            view.sort = SortMode::None;
            view.source = similar;
        })
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&self.view) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&self.view) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, view: ViewState) {
        self.view = view;
        self.refresh_facets();
        self.refresh_list();
    }

    /// Facet panel ordering only; not part of the view history
    pub fn set_actor_order(&mut self, order: ActorOrder) {
        self.actor_order = order;
        self.refresh_facets();
    }

    // ========== Rendering ==========

    /// The visible area of the grid changed size
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport_height = height;
        let columns = RenderScheduler::columns_for_width(width, self.config.tile_width, self.config.tile_gap);
        if self.scheduler.set_columns(columns) {
            debug!("grid now has {} columns", columns);
            self.restart_rendering();
        }
    }

    /// Bottom edge of the viewport as a fraction of the grid height
    pub fn on_scroll(&mut self, fraction: f32, now: Instant) {
        self.scheduler.on_scroll(fraction, now);
    }

    /// Periodic work: collect decoded covers and let the scheduler load more
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        if let Some(pipeline) = self.pipeline.as_mut() {
            for (slot, cover) in pipeline.drain() {
                let Some(state) = self.covers.get_mut(slot) else {
                    continue;
                };
                let path = self.library.records()[self.list[slot]].thumbnail.clone();
                match (cover, path) {
                    (Some(cover), Some(path)) => {
                        *state = CoverState::Ready;
                        self.decoded.insert(path.clone());
                        report.covers.push((path, cover));
                    }
                    (None, Some(path)) => {
                        *state = CoverState::Missing;
                        self.failed.insert(path);
                    }
                    _ => *state = CoverState::Missing,
                }
            }
        }

        // A grid shorter than the viewport never scrolls, so keep filling it
        if self.content_fits_viewport() {
            self.scheduler.on_scroll(1.0, now);
        }

        let batch = self.scheduler.poll(now);
        self.materialize(batch.clone());
        report.materialized = batch;
        report
    }

    fn content_fits_viewport(&self) -> bool {
        if self.viewport_height <= 0.0 || self.scheduler.is_complete() {
            return false;
        }
        let rows = self.scheduler.rendered_count().div_ceil(self.scheduler.columns());
        let (_, cover_height) = self.config.cover_box();
        let cover_height = if self.config.show_thumbnails { cover_height as f32 } else { 0.0 };
        let tile_height = cover_height + TILE_INFO_HEIGHT + 4.0 * self.config.tile_gap;
        rows as f32 * tile_height <= self.viewport_height
    }

    /// Turn covers on or off, restarting the grid
    pub fn set_show_thumbnails(&mut self, show: bool) {
        if self.config.show_thumbnails == show {
            return;
        }
        self.config.show_thumbnails = show;
        self.pipeline = show.then(|| ThumbnailPipeline::new(self.config.decode_workers, self.config.cover_box()));
        self.decoded.clear();
        self.covers_pruned = true;
        self.restart_rendering();
    }

    fn refresh_facets(&mut self) {
        self.facets = FacetPanel::from_index(&self.library, &self.view, self.actor_order);
    }

    fn refresh_list(&mut self) {
        self.list = query::query(&self.library, &self.view);
        self.restart_rendering();
    }

    fn restart_rendering(&mut self) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.discard_all();
        }
        self.covers.clear();
        self.scroll_reset = true;
        let first = self.scheduler.restart(self.list.len());
        self.prune_decoded(first.clone());
        self.materialize(first);
    }

    /// Keep only the covers the given slots will show again
    fn prune_decoded(&mut self, slots: Range<usize>) {
        let records = self.library.records();
        let wanted: HashSet<&PathBuf> = self.list[slots]
            .iter()
            .filter_map(|&i| records[i].thumbnail.as_ref())
            .collect();
        let before = self.decoded.len();
        self.decoded.retain(|path| wanted.contains(path));
        if self.decoded.len() < before {
            debug!("forgot {} decoded covers", before - self.decoded.len());
            self.covers_pruned = true;
        }
    }

    fn materialize(&mut self, slots: Range<usize>) {
        let records = self.library.records();
        for slot in slots {
            let record = &records[self.list[slot]];
            let state = match (self.pipeline.as_mut(), &record.thumbnail) {
                (Some(_), Some(path)) if self.decoded.contains(path) => CoverState::Ready,
                (Some(_), Some(path)) if self.failed.contains(path) => CoverState::Missing,
                (Some(pipeline), Some(path)) => {
                    pipeline.request(slot, path.clone());
                    CoverState::Loading
                }
                _ => CoverState::None,
            };
            self.covers.push(state);
        }
    }

    // ========== Index changes ==========

    /// Drop selected facet values the index no longer has, then redraw.
    /// Not a view mutation from the user's point of view, so no history.
    fn after_index_change(&mut self) {
        let aggregates = self.library.aggregates();
        self.view.tags.retain(|t| aggregates.tags.contains(t));
        self.view.actors.retain(|a| aggregates.actors.contains(a));
        self.view.series.retain(|s| aggregates.series.contains(s));
        let library = &self.library;
        self.selection.retain(|id| library.position(id).is_some());
        self.refresh_facets();
        self.refresh_list();
    }

    fn apply_committed(&mut self, old_id: &RecordId, record: Record) -> bool {
        let new_id = record.id.clone();
        if !self.library.apply_edit(old_id, record) {
            return false;
        }
        if let DisplaySource::Override(ids) = &mut self.view.source {
            for id in ids.iter_mut().filter(|id| **id == *old_id) {
                *id = new_id.clone();
            }
        }
        if self.selection.remove(old_id) {
            self.selection.insert(new_id);
        }
        true
    }

    fn commit_one(&mut self, old_id: &RecordId, meta: &Metadata) -> Result<RecordId, RenameError> {
        let record = self
            .library
            .lookup(old_id)
            .ok_or_else(|| RenameError::NotInIndex(old_id.clone()))?;
        let updated = edit::commit(record, meta, &self.config.cover_dir)?;
        let new_id = updated.id.clone();
        self.apply_committed(old_id, updated);
        Ok(new_id)
    }

    /// Rename one record's file to encode `meta`. The index changes only
    /// if the rename succeeded. Refused while a scan is in flight, since
    /// its report would resurrect the old name.
    pub fn edit_record(&mut self, id: &RecordId, meta: &Metadata) -> Result<RecordId, RenameError> {
        if self.scanning {
            warn!("edit of {} refused during scan", id.display());
            return Err(RenameError::ScanInProgress);
        }
        let result = self.commit_one(id, meta);
        match &result {
            Ok(new_id) => {
                debug!("edited {} -> {}", id.display(), new_id.display());
                self.after_index_change();
            }
            Err(e) => warn!("edit failed: {}", e),
        }
        result
    }

    /// Apply `batch` to every selected record, in index order. Each item
    /// succeeds or fails on its own; batch mode ends afterwards. During a
    /// scan every item is refused and the selection is kept.
    pub fn batch_edit(&mut self, batch: &BatchEdit) -> Vec<EditOutcome> {
        let ids = self.library.ordered_ids(&self.selection);
        if self.scanning {
            warn!("batch edit of {} videos refused during scan", ids.len());
            return ids
                .into_iter()
                .map(|old_id| EditOutcome {
                    old_id,
                    result: Err(RenameError::ScanInProgress),
                })
                .collect();
        }
        let mut outcomes = Vec::with_capacity(ids.len());

        for old_id in ids {
            let result = match self.library.lookup(&old_id) {
                Some(record) => {
                    let meta = batch.apply_to(&record.meta);
                    self.commit_one(&old_id, &meta)
                }
                None => Err(RenameError::NotInIndex(old_id.clone())),
            };
            if let Err(e) = &result {
                warn!("batch edit of {} failed: {}", old_id.display(), e);
            }
            outcomes.push(EditOutcome { old_id, result });
        }

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!("batch edit: {} renamed, {} failed", outcomes.len() - failed, failed);

        self.set_batch_mode(false);
        self.after_index_change();
        outcomes
    }

    // ========== Batch selection ==========

    /// Leaving batch mode forgets the selection
    pub fn set_batch_mode(&mut self, on: bool) {
        self.batch_mode = on;
        if !on {
            self.selection.clear();
        }
    }

    pub fn toggle_selected(&mut self, id: &RecordId) {
        if !self.batch_mode || self.library.position(id).is_none() {
            return;
        }
        if !self.selection.remove(id) {
            self.selection.insert(id.clone());
        }
    }

    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selection.contains(id)
    }

    /// Selected ids in index order
    pub fn selection_in_order(&self) -> Vec<RecordId> {
        self.library.ordered_ids(&self.selection)
    }

    // ========== Playback ==========

    pub fn set_player_path(&mut self, path: &str) {
        self.config.player_path = path.trim().to_string();
    }

    pub fn play(&self, id: &RecordId) -> Result<usize, LaunchError> {
        player::play_separately(&self.config.player_path, std::slice::from_ref(id))
    }

    /// Play the selection, one player per file or a single playlist
    pub fn play_selection(&self, together: bool) -> Result<usize, LaunchError> {
        let ids = self.selection_in_order();
        if together {
            player::play_together(&self.config.player_path, &ids)
        } else {
            player::play_separately(&self.config.player_path, &ids)
        }
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) {
    if !set.remove(&value) {
        set.insert(value);
    }
}
