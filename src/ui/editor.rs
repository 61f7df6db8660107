use iced::widget::{button, checkbox, column, pick_list, row, scrollable, text, text_input, Column, Row};
use iced::{Alignment, Element, Length, Theme};

use crate::state::codec;
use crate::state::data::{Rating, RecordId};
use crate::state::edit::{BatchEdit, RecordEdit};
use crate::state::library::Library;
use crate::Message;

const LABEL_WIDTH: f32 = 140.0;
const TAGS_PER_ROW: usize = 6;

/// Form field addressed by an edit message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Tags,
    Actors,
    Series,
    Release,
    Feature,
}

#[derive(Debug, Clone)]
pub enum EditMessage {
    Text(Field, String),
    Rating(Rating),
    /// Opt a batch field in or out
    Apply(Field, bool),
    ApplyRating(bool),
    /// Flip a known tag in the single-record form
    ToggleTag(String),
}

/// A batch field that is only written when `apply` is set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Optional {
    pub apply: bool,
    pub value: String,
}

impl Optional {
    fn to_edit(&self) -> Option<String> {
        self.apply.then(|| self.value.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchForm {
    pub add_tags: String,
    pub actors: Optional,
    pub series: Optional,
    pub release: Optional,
    pub feature: Optional,
    pub apply_rating: bool,
    pub rating: Rating,
}

impl BatchForm {
    pub fn to_edit(&self) -> BatchEdit {
        BatchEdit {
            add_tags: self.add_tags.clone(),
            actors: self.actors.to_edit(),
            series: self.series.to_edit(),
            release: self.release.to_edit(),
            rating: self.apply_rating.then_some(self.rating),
            feature: self.feature.to_edit(),
        }
    }

    fn optional_mut(&mut self, field: Field) -> Option<&mut Optional> {
        match field {
            Field::Actors => Some(&mut self.actors),
            Field::Series => Some(&mut self.series),
            Field::Release => Some(&mut self.release),
            Field::Feature => Some(&mut self.feature),
            Field::Name | Field::Tags => None,
        }
    }
}

/// The open editor, replacing the grid while active
pub enum Editor {
    Single { id: RecordId, form: RecordEdit },
    Batch(BatchForm),
}

impl Editor {
    pub fn update(&mut self, message: EditMessage) {
        match self {
            Editor::Single { form, .. } => match message {
                EditMessage::Text(field, value) => {
                    let slot = match field {
                        Field::Name => &mut form.name,
                        Field::Tags => &mut form.tags,
                        Field::Actors => &mut form.actors,
                        Field::Series => &mut form.series,
                        Field::Release => &mut form.release,
                        Field::Feature => &mut form.feature,
                    };
                    *slot = value;
                }
                EditMessage::Rating(rating) => form.rating = rating,
                EditMessage::ToggleTag(tag) => form.toggle_tag(&tag),
                EditMessage::Apply(..) | EditMessage::ApplyRating(_) => {}
            },
            Editor::Batch(form) => match message {
                EditMessage::Text(Field::Tags, value) => form.add_tags = value,
                EditMessage::Text(field, value) => {
                    if let Some(optional) = form.optional_mut(field) {
                        optional.value = value;
                    }
                }
                EditMessage::Apply(field, apply) => {
                    if let Some(optional) = form.optional_mut(field) {
                        optional.apply = apply;
                    }
                }
                EditMessage::Rating(rating) => form.rating = rating,
                EditMessage::ApplyRating(apply) => form.apply_rating = apply,
                EditMessage::ToggleTag(_) => {}
            },
        }
    }
}

fn field_input<'a>(label: &'a str, placeholder: &'a str, value: &'a str, field: Field) -> Element<'a, Message> {
    row![
        text(label).width(Length::Fixed(LABEL_WIDTH)),
        text_input(placeholder, value)
            .on_input(move |s| Message::Edit(EditMessage::Text(field, s)))
            .on_submit(Message::SaveEdit),
    ]
    .spacing(8)
    .align_y(Alignment::Center)
    .into()
}

fn optional_input<'a>(label: &'a str, optional: &'a Optional, field: Field) -> Element<'a, Message> {
    let input = text_input("(empty clears)", &optional.value);
    let input = if optional.apply {
        input.on_input(move |s| Message::Edit(EditMessage::Text(field, s)))
    } else {
        input
    };
    row![
        checkbox(label, optional.apply)
            .on_toggle(move |on| Message::Edit(EditMessage::Apply(field, on)))
            .width(Length::Fixed(LABEL_WIDTH)),
        input,
    ]
    .spacing(8)
    .align_y(Alignment::Center)
    .into()
}

fn rating_picker<'a>(rating: Rating) -> Element<'a, Message> {
    pick_list(Rating::all().collect::<Vec<_>>(), Some(rating), |r| {
        Message::Edit(EditMessage::Rating(r))
    })
    .into()
}

fn actions<'a>(scanning: bool) -> Element<'a, Message> {
    let save = if scanning { "Save (scanning...)" } else { "Save" };
    row![
        button(save).on_press_maybe((!scanning).then_some(Message::SaveEdit)),
        button("Cancel")
            .style(button::secondary)
            .on_press(Message::CancelEdit),
    ]
    .spacing(8)
    .into()
}

/// Saving is disabled while a scan runs
pub fn view<'a>(editor: &'a Editor, library: &'a Library, scanning: bool) -> Element<'a, Message> {
    let content = match editor {
        Editor::Single { id, form } => single(id, form, library, scanning),
        Editor::Batch(form) => batch(form, scanning),
    };
    scrollable(content.padding(20).spacing(12).width(Length::Fill))
        .height(Length::Fill)
        .into()
}

fn single<'a>(id: &'a RecordId, form: &'a RecordEdit, library: &'a Library, scanning: bool) -> Column<'a, Message> {
    let file_name = id
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let current = codec::split_list(&form.tags);
    let chips: Vec<Element<'a, Message>> = library
        .aggregates()
        .tags
        .iter()
        .map(|tag| {
            let style: fn(&Theme, button::Status) -> button::Style = if current.contains(tag) {
                button::primary
            } else {
                button::secondary
            };
            button(text(tag.as_str()).size(12))
                .padding([2, 6])
                .style(style)
                .on_press(Message::Edit(EditMessage::ToggleTag(tag.clone())))
                .into()
        })
        .collect();
    let mut known = Column::new().spacing(4);
    let mut chips = chips.into_iter().peekable();
    while chips.peek().is_some() {
        let line: Vec<_> = chips.by_ref().take(TAGS_PER_ROW).collect();
        known = known.push(Row::with_children(line).spacing(4));
    }

    column![
        text("Edit video").size(24),
        text(file_name).size(13),
        field_input("Title", "Title", &form.name, Field::Name),
        field_input("Tags", "tag1, tag2", &form.tags, Field::Tags),
        known,
        field_input("Actors", "actor1, actor2", &form.actors, Field::Actors),
        field_input("Series", "Series", &form.series, Field::Series),
        field_input("Release", "YYYY-MM-DD", &form.release, Field::Release),
        row![text("Rating").width(Length::Fixed(LABEL_WIDTH)), rating_picker(form.rating)]
            .spacing(8)
            .align_y(Alignment::Center),
        field_input("Feature", "Feature", &form.feature, Field::Feature),
        actions(scanning),
    ]
}

fn batch(form: &BatchForm, scanning: bool) -> Column<'_, Message> {
    column![
        text("Edit selected videos").size(24),
        text("Tags are added to every video. Checked fields replace existing values.").size(13),
        field_input("Add tags", "tag1, tag2", &form.add_tags, Field::Tags),
        optional_input("Actors", &form.actors, Field::Actors),
        optional_input("Series", &form.series, Field::Series),
        optional_input("Release", &form.release, Field::Release),
        row![
            checkbox("Rating", form.apply_rating)
                .on_toggle(|on| Message::Edit(EditMessage::ApplyRating(on)))
                .width(Length::Fixed(LABEL_WIDTH)),
            rating_picker(form.rating),
        ]
        .spacing(8)
        .align_y(Alignment::Center),
        optional_input("Feature", &form.feature, Field::Feature),
        actions(scanning),
    ]
}
