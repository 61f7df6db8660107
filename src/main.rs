use iced::widget::image::Handle;
use iced::widget::scrollable::{self, AbsoluteOffset};
use iced::widget::{column, container, row};
use iced::{window, Element, Length, Size, Subscription, Task, Theme};
use rfd::FileDialog;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod error;
mod media;
mod state;
mod ui;

use config::AppConfig;
use error::ScanError;
use state::catalog::Catalog;
use state::data::{Rating, RecordId};
use state::edit::RecordEdit;
use state::library::ActorOrder;
use state::query::SortMode;
use state::scan::{self, ScanReport};
use ui::editor::{BatchForm, EditMessage, Editor};

/// How often the grid is polled and covers are collected
const TICK: Duration = Duration::from_millis(16);

/// Width of the facet sidebar, subtracted from the window for the grid
const SIDEBAR_WIDTH: f32 = 280.0;
/// Height of the toolbar and status line above and below the grid
const CHROME_HEIGHT: f32 = 110.0;

/// Main application state
struct Tagshelf {
    catalog: Catalog,
    /// Decoded covers, uploaded once and reused by every tile showing them
    covers: HashMap<PathBuf, Handle>,
    /// Search box contents; applied on submit
    keyword: String,
    player_path: String,
    editor: Option<Editor>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    PickDirectory,
    Refresh,
    ScanFinished(Result<ScanReport, ScanError>),

    KeywordChanged(String),
    SearchSubmitted,
    ToggleTag(String),
    ToggleActor(String),
    ToggleSeries(String),
    ToggleRating(Rating),
    FilterTag(String),
    FilterActor(String),
    FilterSeries(String),
    FilterRating(Rating),
    SortSelected(SortMode),
    ActorOrderSelected(ActorOrder),
    Undo,
    Redo,
    ResetFilters,

    FindSimilar(RecordId),
    Play(RecordId),
    Reveal(RecordId),
    BatchMode(bool),
    ToggleSelected(RecordId),
    PlaySelection { together: bool },

    EditRecord(RecordId),
    EditSelection,
    Edit(EditMessage),
    SaveEdit,
    CancelEdit,

    PlayerPathChanged(String),
    SavePlayerPath,
    ShowThumbnails(bool),

    GridScrolled(scrollable::Viewport),
    WindowResized(Size),
    Tick(Instant),
}

impl Tagshelf {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = AppConfig::load();
        let last_directory = config.last_directory.clone().filter(|dir| dir.is_dir());
        let player_path = config.player_path.clone();

        let mut app = Tagshelf {
            catalog: Catalog::new(config),
            covers: HashMap::new(),
            keyword: String::new(),
            player_path,
            editor: None,
            status: "Open a folder to start.".to_string(),
        };

        let size_task = window::get_latest()
            .and_then(window::get_size)
            .map(Message::WindowResized);

        let scan_task = match last_directory {
            Some(dir) => app.start_scan(Some(dir)),
            None => Task::none(),
        };

        (app, Task::batch([size_task, scan_task]))
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        let task = self.handle(message);
        if self.catalog.take_covers_pruned() {
            let catalog = &self.catalog;
            self.covers.retain(|path, _| catalog.has_cover(path));
        }
        if self.catalog.take_scroll_reset() {
            Task::batch([
                task,
                scrollable::scroll_to(ui::grid::grid_id(), AbsoluteOffset::default()),
            ])
        } else {
            task
        }
    }

    /// Handle application messages and update state
    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickDirectory => {
                let folder = FileDialog::new()
                    .set_title("Select a video folder")
                    .pick_folder();
                if let Some(folder) = folder {
                    return self.start_scan(Some(folder));
                }
            }
            Message::Refresh => return self.start_scan(None),
            Message::ScanFinished(result) => {
                let previous_root = self.catalog.root().cloned();
                match self.catalog.finish_scan(result) {
                    Ok(delta) => {
                        if self.catalog.root() != previous_root.as_ref() {
                            self.covers.clear();
                            self.editor = None;
                            self.save_config();
                        }
                        self.keyword = self.catalog.view().keyword.clone();
                        self.status = format!(
                            "{} videos ({} added, {} removed).",
                            self.catalog.library().len(),
                            delta.added,
                            delta.removed
                        );
                    }
                    Err(e) => {
                        warn!("scan failed: {}", e);
                        self.status = format!("Scan failed: {}", e);
                    }
                }
            }

            Message::KeywordChanged(keyword) => self.keyword = keyword,
            Message::SearchSubmitted => {
                let keyword = self.keyword.clone();
                self.catalog.set_keyword(&keyword);
            }
            Message::ToggleTag(tag) => {
                self.catalog.toggle_tag(&tag);
            }
            Message::ToggleActor(actor) => {
                self.catalog.toggle_actor(&actor);
            }
            Message::ToggleSeries(series) => {
                self.catalog.toggle_series(&series);
            }
            Message::ToggleRating(rating) => {
                self.catalog.toggle_rating(rating);
            }
            Message::FilterTag(tag) => {
                self.catalog.filter_by_tag(&tag);
            }
            Message::FilterActor(actor) => {
                self.catalog.filter_by_actor(&actor);
            }
            Message::FilterSeries(series) => {
                self.catalog.filter_by_series(&series);
            }
            Message::FilterRating(rating) => {
                self.catalog.filter_by_rating(rating);
            }
            Message::SortSelected(mode) => {
                self.catalog.set_sort(mode);
            }
            Message::ActorOrderSelected(order) => self.catalog.set_actor_order(order),
            Message::Undo => {
                if self.catalog.undo() {
                    self.keyword = self.catalog.view().keyword.clone();
                }
            }
            Message::Redo => {
                if self.catalog.redo() {
                    self.keyword = self.catalog.view().keyword.clone();
                }
            }
            Message::ResetFilters => {
                self.catalog.reset_filters();
                self.keyword.clear();
            }

            Message::FindSimilar(id) => {
                if self.catalog.find_similar(&id) {
                    self.status = format!("{} similar videos.", self.catalog.result_count());
                }
            }
            Message::Play(id) => {
                if let Err(e) = self.catalog.play(&id) {
                    self.status = e.to_string();
                }
            }
            Message::Reveal(id) => {
                if let Err(e) = media::player::reveal(&id) {
                    self.status = e.to_string();
                }
            }
            Message::BatchMode(on) => self.catalog.set_batch_mode(on),
            Message::ToggleSelected(id) => self.catalog.toggle_selected(&id),
            Message::PlaySelection { together } => match self.catalog.play_selection(together) {
                Ok(count) => self.status = format!("Playing {} videos.", count),
                Err(e) => self.status = e.to_string(),
            },

            Message::EditRecord(id) => {
                if let Some(record) = self.catalog.library().lookup(&id) {
                    self.editor = Some(Editor::Single {
                        form: RecordEdit::from_metadata(&record.meta),
                        id,
                    });
                }
            }
            Message::EditSelection => {
                if self.catalog.selection_len() == 0 {
                    self.status = "Select at least one video first.".to_string();
                } else {
                    self.editor = Some(Editor::Batch(BatchForm::default()));
                }
            }
            Message::Edit(edit) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.update(edit);
                }
            }
            Message::SaveEdit => self.save_edit(),
            Message::CancelEdit => self.editor = None,

            Message::PlayerPathChanged(path) => self.player_path = path,
            Message::SavePlayerPath => {
                let path = self.player_path.clone();
                self.catalog.set_player_path(&path);
                self.save_config();
                self.status = format!("Player set to {}.", self.catalog.config().player_path);
            }
            Message::ShowThumbnails(show) => {
                self.catalog.set_show_thumbnails(show);
                self.save_config();
            }

            Message::GridScrolled(viewport) => {
                let content = viewport.content_bounds().height;
                let bottom = viewport.absolute_offset().y + viewport.bounds().height;
                let fraction = if content > 0.0 { bottom / content } else { 1.0 };
                self.catalog.on_scroll(fraction, Instant::now());
            }
            Message::WindowResized(size) => {
                self.catalog.set_viewport(
                    (size.width - SIDEBAR_WIDTH).max(0.0),
                    (size.height - CHROME_HEIGHT).max(0.0),
                );
            }
            Message::Tick(now) => {
                let report = self.catalog.tick(now);
                for (path, cover) in report.covers {
                    self.covers
                        .insert(path, Handle::from_rgba(cover.width, cover.height, cover.rgba));
                }
            }
        }

        Task::none()
    }

    /// Claim the scanner and run the walk off the UI thread
    fn start_scan(&mut self, root: Option<PathBuf>) -> Task<Message> {
        match self.catalog.begin_scan(root) {
            Ok(root) => {
                self.status = format!("Scanning {}...", root.display());
                Task::perform(
                    scan::scan_directory_async(root, self.catalog.config().clone()),
                    Message::ScanFinished,
                )
            }
            Err(e) => {
                self.status = e.to_string();
                Task::none()
            }
        }
    }

    fn save_edit(&mut self) {
        if self.catalog.is_scanning() {
            self.status = "Wait for the scan to finish before saving.".to_string();
            return;
        }
        let Some(editor) = self.editor.take() else {
            return;
        };
        match editor {
            Editor::Single { id, form } => match self.catalog.edit_record(&id, &form.to_metadata()) {
                Ok(new_id) => {
                    let name = new_id.file_name().map(|n| n.to_string_lossy().into_owned());
                    self.status = format!("Saved as {}.", name.unwrap_or_default());
                }
                Err(e) => {
                    self.status = format!("Save failed: {}", e);
                    // Keep the form so the user can fix it
                    self.editor = Some(Editor::Single { id, form });
                }
            },
            Editor::Batch(form) => {
                let outcomes = self.catalog.batch_edit(&form.to_edit());
                let failures: Vec<_> = outcomes
                    .iter()
                    .filter_map(|o| o.result.as_ref().err())
                    .collect();
                self.status = match failures.first() {
                    None => format!("Renamed {} videos.", outcomes.len()),
                    Some(first) => format!(
                        "Renamed {} videos, {} failed (first: {}).",
                        outcomes.len() - failures.len(),
                        failures.len(),
                        first
                    ),
                };
            }
        }
    }

    fn save_config(&self) {
        let mut config = self.catalog.config().clone();
        config.last_directory = self.catalog.root().cloned();
        if let Err(e) = config.save() {
            warn!("could not save configuration: {}", e);
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let main: Element<'_, Message> = match &self.editor {
            Some(editor) => ui::editor::view(editor, self.catalog.library(), self.catalog.is_scanning()),
            None => ui::grid::view(&self.catalog, &self.covers),
        };

        let content = column![
            ui::sidebar::toolbar(&self.catalog, &self.keyword),
            main,
            ui::sidebar::status_line(&self.status, &self.catalog),
        ]
        .spacing(8)
        .width(Length::Fill);

        container(
            row![
                ui::sidebar::view(&self.catalog, &self.player_path, SIDEBAR_WIDTH),
                content,
            ]
            .spacing(8),
        )
        .padding(8)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(TICK).map(Message::Tick),
            window::resize_events().map(|(_id, size)| Message::WindowResized(size)),
        ])
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting tagshelf {}", env!("CARGO_PKG_VERSION"));

    iced::application("tagshelf", Tagshelf::update, Tagshelf::view)
        .subscription(Tagshelf::subscription)
        .theme(Tagshelf::theme)
        .window_size((1280.0, 860.0))
        .centered()
        .run_with(Tagshelf::new)
}
