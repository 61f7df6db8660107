use iced::widget::{
    button, checkbox, column, container, horizontal_space, pick_list, row, scrollable, text, text_input, Column,
};
use iced::{Alignment, Element, Length};

use crate::state::catalog::Catalog;
use crate::state::library::ActorOrder;
use crate::state::query::{FacetEntry, SortMode};
use crate::Message;

/// Search box, sort picker and history controls above the grid
pub fn toolbar<'a>(catalog: &'a Catalog, keyword: &'a str) -> Element<'a, Message> {
    row![
        text_input("Search titles, tags, actors, series", keyword)
            .on_input(Message::KeywordChanged)
            .on_submit(Message::SearchSubmitted)
            .width(Length::Fill),
        button("Search").on_press(Message::SearchSubmitted),
        pick_list(SortMode::ALL, Some(catalog.view().sort), Message::SortSelected),
        button("Undo")
            .style(button::secondary)
            .on_press_maybe(catalog.can_undo().then_some(Message::Undo)),
        button("Redo")
            .style(button::secondary)
            .on_press_maybe(catalog.can_redo().then_some(Message::Redo)),
        button("Reset")
            .style(button::secondary)
            .on_press(Message::ResetFilters),
    ]
    .spacing(8)
    .align_y(Alignment::Center)
    .into()
}

pub fn status_line<'a>(status: &'a str, catalog: &'a Catalog) -> Element<'a, Message> {
    let counts = format!(
        "{} of {} videos, {} shown",
        catalog.result_count(),
        catalog.library().len(),
        catalog.rendered_count()
    );
    row![text(status).size(14), horizontal_space(), text(counts).size(14)]
        .spacing(8)
        .into()
}

fn section<'a, T, F>(title: &'a str, entries: &'a [FacetEntry<T>], label: impl Fn(&T) -> String, on_toggle: F) -> Column<'a, Message>
where
    T: Clone + 'a,
    F: Fn(T) -> Message + Copy + 'a,
{
    let mut list = Column::new().spacing(4).push(text(title).size(18));
    if entries.is_empty() {
        return list.push(text("(none)").size(13));
    }
    for entry in entries {
        let value = entry.value.clone();
        list = list.push(
            checkbox(label(&entry.value), entry.selected)
                .on_toggle(move |_| on_toggle(value.clone()))
                .size(14)
                .text_size(14),
        );
    }
    list
}

/// Directory, player and batch controls plus the facet lists
pub fn view<'a>(catalog: &'a Catalog, player_path: &'a str, width: f32) -> Element<'a, Message> {
    let scanning = catalog.is_scanning();
    let root = catalog
        .root()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "No folder opened".to_string());

    let folder = column![
        row![
            button("Open folder").on_press_maybe((!scanning).then_some(Message::PickDirectory)),
            button("Refresh")
                .style(button::secondary)
                .on_press_maybe((!scanning && catalog.root().is_some()).then_some(Message::Refresh)),
        ]
        .spacing(8),
        text(root).size(12),
    ]
    .spacing(6);

    let player = column![
        text("Player").size(18),
        row![
            text_input("Player executable", player_path)
                .on_input(Message::PlayerPathChanged)
                .on_submit(Message::SavePlayerPath),
            button("Save")
                .style(button::secondary)
                .on_press(Message::SavePlayerPath),
        ]
        .spacing(6),
        checkbox("Show covers", catalog.config().show_thumbnails).on_toggle(Message::ShowThumbnails),
    ]
    .spacing(6);

    let batch: Element<'a, Message> = if catalog.is_batch_mode() {
        let any = catalog.selection_len() > 0;
        column![
            text(format!("{} selected", catalog.selection_len())),
            button("Edit selected").on_press_maybe(any.then_some(Message::EditSelection)),
            button("Play together").on_press_maybe(any.then_some(Message::PlaySelection { together: true })),
            button("Play separately").on_press_maybe(any.then_some(Message::PlaySelection { together: false })),
            button("Done")
                .style(button::secondary)
                .on_press(Message::BatchMode(false)),
        ]
        .spacing(6)
        .into()
    } else {
        button("Select several")
            .style(button::secondary)
            .on_press(Message::BatchMode(true))
            .into()
    };

    let facets = catalog.facets();
    let actors = section("Actors", &facets.actors, String::clone, Message::ToggleActor);

    let content = column![
        folder,
        player,
        batch,
        section("Ratings", &facets.ratings, |r| r.stars(), Message::ToggleRating),
        section("Tags", &facets.tags, String::clone, Message::ToggleTag),
        pick_list(ActorOrder::ALL, Some(catalog.actor_order()), Message::ActorOrderSelected),
        actors,
        section("Series", &facets.series, String::clone, Message::ToggleSeries),
    ]
    .spacing(16)
    .padding(10);

    container(scrollable(content))
        .width(Length::Fixed(width))
        .height(Length::Fill)
        .into()
}
