use iced::widget::image::Handle;
use iced::widget::{button, checkbox, container, image, row, scrollable, text, Column, Row};
use iced::{ContentFit, Element, Length, Theme};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::state::catalog::{Catalog, CoverState, Tile};
use crate::Message;

/// Chips per line under a cover
const CHIPS_PER_ROW: usize = 3;

pub fn grid_id() -> scrollable::Id {
    scrollable::Id::new("grid")
}

/// The scroll-driven tile grid. Only materialized tiles are built.
pub fn view<'a>(catalog: &'a Catalog, covers: &'a HashMap<PathBuf, Handle>) -> Element<'a, Message> {
    if catalog.result_count() == 0 {
        let label = if catalog.library().is_empty() {
            "No videos loaded."
        } else {
            "No videos match the current filters."
        };
        return container(text(label).size(18))
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into();
    }

    let config = catalog.config();
    let gap = config.tile_gap;
    let batch = catalog.is_batch_mode();

    let tiles: Vec<Element<'a, Message>> = catalog
        .tiles()
        .map(|t| tile(t, config, covers, batch))
        .collect();

    let mut rows: Vec<Element<'a, Message>> = Vec::new();
    let mut tiles = tiles.into_iter().peekable();
    while tiles.peek().is_some() {
        let line: Vec<_> = tiles.by_ref().take(catalog.columns()).collect();
        rows.push(Row::with_children(line).spacing(2.0 * gap).into());
    }

    scrollable(Column::with_children(rows).spacing(2.0 * gap).padding(gap))
        .id(grid_id())
        .on_scroll(Message::GridScrolled)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn placeholder<'a>(label: &'a str, width: f32, height: f32) -> Element<'a, Message> {
    container(text(label).size(14))
        .center_x(Length::Fixed(width))
        .center_y(Length::Fixed(height))
        .style(container::bordered_box)
        .into()
}

fn chip<'a>(label: String, message: Message) -> Element<'a, Message> {
    button(text(label).size(12))
        .padding([2, 6])
        .style(button::secondary)
        .on_press(message)
        .into()
}

fn tile<'a>(
    tile: Tile<'a>,
    config: &AppConfig,
    covers: &'a HashMap<PathBuf, Handle>,
    batch: bool,
) -> Element<'a, Message> {
    let record = tile.record;
    let meta = &record.meta;
    let (cover_width, cover_height) = config.cover_box();
    let (w, h) = (cover_width as f32, cover_height as f32);

    let mut content = Column::new().spacing(4);

    if config.show_thumbnails {
        let cover = match tile.cover {
            CoverState::Ready => match record.thumbnail.as_ref().and_then(|p| covers.get(p)) {
                Some(handle) => image(handle.clone())
                    .width(Length::Fixed(w))
                    .height(Length::Fixed(h))
                    .content_fit(ContentFit::Contain)
                    .into(),
                None => placeholder("Loading...", w, h),
            },
            CoverState::Loading => placeholder("Loading...", w, h),
            CoverState::Missing | CoverState::None => placeholder("(no cover)", w, h),
        };
        content = content.push(cover);
    }

    let title_action = if batch {
        Message::ToggleSelected(record.id.clone())
    } else {
        Message::Play(record.id.clone())
    };
    content = content.push(
        button(text(&meta.name).size(16))
            .style(button::text)
            .padding(0)
            .on_press(title_action),
    );

    let mut details = Vec::new();
    if !meta.release_str().is_empty() {
        details.push(meta.release_str().to_string());
    }
    if !meta.feature_str().is_empty() {
        details.push(meta.feature_str().to_string());
    }
    if !details.is_empty() {
        content = content.push(text(details.join("  ")).size(12));
    }

    let mut chips: Vec<Element<'a, Message>> = Vec::new();
    chips.push(chip(meta.rating.stars(), Message::FilterRating(meta.rating)));
    if let Some(series) = &meta.series {
        chips.push(chip(format!("({})", series), Message::FilterSeries(series.clone())));
    }
    for actor in &meta.actors {
        chips.push(chip(actor.clone(), Message::FilterActor(actor.clone())));
    }
    for tag in &meta.tags {
        chips.push(chip(format!("#{}", tag), Message::FilterTag(tag.clone())));
    }
    let mut chips = chips.into_iter().peekable();
    while chips.peek().is_some() {
        let line: Vec<_> = chips.by_ref().take(CHIPS_PER_ROW).collect();
        content = content.push(Row::with_children(line).spacing(4));
    }

    let id = record.id.clone();
    let primary: Element<'a, Message> = if batch {
        checkbox("Select", tile.selected)
            .on_toggle(move |_| Message::ToggleSelected(id.clone()))
            .into()
    } else {
        button(text("Play").size(13))
            .on_press(Message::Play(id))
            .into()
    };
    content = content.push(
        row![
            primary,
            button(text("Similar").size(13))
                .style(button::secondary)
                .on_press(Message::FindSimilar(record.id.clone())),
            button(text("Edit").size(13))
                .style(button::secondary)
                .on_press(Message::EditRecord(record.id.clone())),
            button(text("Folder").size(13))
                .style(button::secondary)
                .on_press(Message::Reveal(record.id.clone())),
        ]
        .spacing(4),
    );

    let style: fn(&Theme) -> container::Style = if tile.selected {
        container::rounded_box
    } else {
        container::bordered_box
    };
    container(content)
        .width(Length::Fixed(config.tile_width))
        .padding(config.tile_gap)
        .style(style)
        .into()
}
