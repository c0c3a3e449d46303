//! Widget resolution.
//!
//! [`resolve`] maps a sanitized box to exactly one control kind. The
//! procedure is a fixed precedence ladder; the first rule that matches wins:
//!
//! ```text
//! items ─► options ─► actions ─► mode ─► numeric range ─► text field
//! ```

use serde::Serialize;
use std::fmt;

use crate::protocol::{BoxKind, FormBox, Mode};

/// Option labels longer than this rule out a multi-select dropdown.
const LONG_LABEL: usize = 75;
/// Above this many options, multi-select uses a dropdown.
const MULTI_DROPDOWN_MIN: usize = 10;
/// Above this many options, single-select uses a dropdown.
const DROPDOWN_MIN: usize = 7;
/// Above this many options, single-select uses a choice group.
const CHOICE_GROUP_MIN: usize = 3;
/// Above this many actions, a menu is used.
const MENU_MIN: usize = 5;
/// Maximum number of discrete positions a slider offers.
const SLIDER_MAX_STEPS: f64 = 16.0;

/// Which list a button group renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonSource {
    Options,
    Actions,
}

/// Granularity of a calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSpan {
    Day,
    Week,
    Month,
}

/// Refinement of a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextVariant {
    SingleLine,
    Password,
    Masked,
    Multiline,
}

/// The concrete control chosen for a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// Container of nested items.
    Composite,
    /// Display-only text.
    Text,
    MultiComboBox,
    MultiDropdown,
    CheckList,
    TagPicker,
    SwatchPicker,
    ComboBox,
    Dropdown,
    ChoiceGroup,
    ButtonGroup(ButtonSource),
    Menu,
    Rating,
    Calendar(DateSpan),
    TimePicker,
    ColorPicker,
    Slider,
    SpinButton,
    TextField(TextVariant),
}

impl WidgetKind {
    /// Whether this kind writes into the capture buffer.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        !matches!(self, WidgetKind::Composite | WidgetKind::Text)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WidgetKind::ButtonGroup(source) => write!(f, "ButtonGroup({:?})", source),
            WidgetKind::Calendar(span) => write!(f, "Calendar({:?})", span),
            WidgetKind::TextField(variant) => write!(f, "TextField({:?})", variant),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Pick the control for a box.
#[must_use]
pub fn resolve(node: &FormBox) -> WidgetKind {
    if !node.items.is_empty() {
        return WidgetKind::Composite;
    }
    if node.kind == BoxKind::Output {
        return WidgetKind::Text;
    }

    if !node.options.is_empty() {
        return resolve_options(node);
    }

    if !node.actions.is_empty() {
        return if node.actions.len() > MENU_MIN {
            WidgetKind::Menu
        } else {
            WidgetKind::ButtonGroup(ButtonSource::Actions)
        };
    }

    match node.mode {
        Some(Mode::Rating) => return WidgetKind::Rating,
        Some(Mode::Day) => return WidgetKind::Calendar(DateSpan::Day),
        Some(Mode::Week) => return WidgetKind::Calendar(DateSpan::Week),
        Some(Mode::Month) => return WidgetKind::Calendar(DateSpan::Month),
        Some(Mode::Time) => return WidgetKind::TimePicker,
        Some(Mode::Color) => return WidgetKind::ColorPicker,
        _ => {}
    }

    let bounds = numeric_bounds(node);
    let numeric_value = node.scalar().is_some_and(|v| v.is_number());

    if numeric_value || bounds.is_some() {
        if !node.editable
            && let Some((min, max)) = bounds
        {
            let steps = (max - min) / node.step.unwrap_or(1.0);
            if steps <= SLIDER_MAX_STEPS {
                return WidgetKind::Slider;
            }
        }
        return WidgetKind::SpinButton;
    }

    WidgetKind::TextField(text_variant(node))
}

fn resolve_options(node: &FormBox) -> WidgetKind {
    let options = &node.options;

    if node.multiple {
        if node.editable {
            return WidgetKind::MultiComboBox;
        }
        let has_long_labels = options.iter().any(|c| c.text.chars().count() > LONG_LABEL);
        if !has_long_labels && options.len() > MULTI_DROPDOWN_MIN {
            return WidgetKind::MultiDropdown;
        }
        return WidgetKind::CheckList;
    }

    match node.mode {
        Some(Mode::Tag) => WidgetKind::TagPicker,
        Some(Mode::Color) => WidgetKind::SwatchPicker,
        _ if node.editable => WidgetKind::ComboBox,
        _ if options.iter().any(|c| c.is_group()) || options.len() > DROPDOWN_MIN => {
            WidgetKind::Dropdown
        }
        _ if options.len() > CHOICE_GROUP_MIN => WidgetKind::ChoiceGroup,
        _ => WidgetKind::ButtonGroup(ButtonSource::Options),
    }
}

/// `(min, max)` when both are numbers and `min < max`.
pub(crate) fn numeric_bounds(node: &FormBox) -> Option<(f64, f64)> {
    let min = node.min.as_ref()?.as_f64()?;
    let max = node.max.as_ref()?.as_f64()?;
    (min < max).then_some((min, max))
}

fn text_variant(node: &FormBox) -> TextVariant {
    if node.password {
        TextVariant::Password
    } else if node.mask.is_some() {
        TextVariant::Masked
    } else if node.lines.is_some_and(|n| n >= 1) {
        TextVariant::Multiline
    } else {
        TextVariant::SingleLine
    }
}
