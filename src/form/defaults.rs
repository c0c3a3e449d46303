//! Mount-time default values.
//!
//! Every capturing control seeds its slot when mounted, so a submit issued
//! before any interaction still carries one entry per control.

use chrono::Local;
use serde::Serialize;

use super::widget::WidgetKind;
use crate::protocol::{Choice, FieldValue, FormBox, Value};

/// Default color of a color picker with no value.
pub const DEFAULT_COLOR: &str = "#ff0000";
/// Default time of a time picker with no value.
pub const DEFAULT_TIME: &str = "00:00";

/// Compute the value a freshly mounted control holds.
pub fn default_value(kind: WidgetKind, node: &FormBox) -> FieldValue {
    match kind {
        WidgetKind::Composite | WidgetKind::Text => FieldValue::Null,
        WidgetKind::Dropdown
        | WidgetKind::ChoiceGroup
        | WidgetKind::SwatchPicker
        | WidgetKind::ButtonGroup(_)
        | WidgetKind::Menu => single_choice(choices_for(kind, node), node)
            .map(FieldValue::Scalar)
            .unwrap_or_default(),
        WidgetKind::ComboBox => single_choice(&node.options, node)
            .or_else(|| node.scalar().cloned())
            .map(FieldValue::Scalar)
            .unwrap_or_default(),
        WidgetKind::MultiComboBox
        | WidgetKind::MultiDropdown
        | WidgetKind::CheckList
        | WidgetKind::TagPicker => FieldValue::List(multi_choice(&node.options, node)),
        WidgetKind::Slider => numeric_pair(node)
            .map(FieldValue::List)
            .unwrap_or_else(|| FieldValue::Scalar(numeric_default(node))),
        WidgetKind::SpinButton => {
            FieldValue::Scalar(node.scalar().cloned().unwrap_or_else(|| numeric_default(node)))
        }
        WidgetKind::Rating => FieldValue::Scalar(
            node.scalar()
                .filter(|v| v.is_number())
                .cloned()
                .unwrap_or_else(|| Value::from(0)),
        ),
        WidgetKind::Calendar(_) => {
            FieldValue::Scalar(string_or(node, || Local::now().format("%Y-%m-%d").to_string()))
        }
        WidgetKind::TimePicker => FieldValue::Scalar(string_or(node, || DEFAULT_TIME.to_string())),
        WidgetKind::ColorPicker => FieldValue::Scalar(string_or(node, || DEFAULT_COLOR.to_string())),
        WidgetKind::TextField(_) => {
            let text = match node.scalar() {
                Some(v @ (Value::String(_) | Value::Number(_))) => v.to_string(),
                _ => String::new(),
            };
            FieldValue::Scalar(Value::String(text))
        }
    }
}

/// The choice list a kind renders: actions for menus and action buttons,
/// options otherwise.
pub fn choices_for(kind: WidgetKind, node: &FormBox) -> &[Choice] {
    match kind {
        WidgetKind::Menu | WidgetKind::ButtonGroup(super::widget::ButtonSource::Actions) => {
            &node.actions
        }
        _ => &node.options,
    }
}

/// Depth-first walk over a choice list, group members included.
fn flatten(choices: &[Choice]) -> Vec<&Choice> {
    let mut out = Vec::new();
    for c in choices {
        out.push(c);
        out.extend(flatten(&c.options));
    }
    out
}

fn single_choice(choices: &[Choice], node: &FormBox) -> Option<Value> {
    let all = flatten(choices);
    if let Some(c) = all.iter().find(|c| c.is_selected()) {
        return Some(c.value.clone());
    }
    let wanted = node.scalar()?;
    all.iter().find(|c| &c.value == wanted).map(|c| c.value.clone())
}

fn multi_choice(choices: &[Choice], node: &FormBox) -> Vec<Value> {
    let named: &[Value] = match &node.value {
        Some(FieldValue::Scalar(v)) => std::slice::from_ref(v),
        Some(FieldValue::List(vs)) => vs,
        _ => &[],
    };
    flatten(choices)
        .into_iter()
        .filter(|c| c.is_selected() || named.contains(&c.value))
        .map(|c| c.value.clone())
        .collect()
}

fn numeric_pair(node: &FormBox) -> Option<Vec<Value>> {
    match node.value.as_ref()?.as_list()? {
        [lo, hi] if lo.is_number() && hi.is_number() => Some(vec![lo.clone(), hi.clone()]),
        _ => None,
    }
}

/// Numeric value, else the bound nearest zero, else zero.
fn numeric_default(node: &FormBox) -> Value {
    let zero = Value::from(0);
    if let Some(v) = node.scalar().filter(|v| v.is_number()) {
        return v.clone();
    }
    if let Some(min) = node.min.as_ref().filter(|v| v.is_number()) {
        return if min.as_f64().is_some_and(|m| m > 0.0) { min.clone() } else { zero };
    }
    if let Some(max) = node.max.as_ref().filter(|v| v.is_number()) {
        return if max.as_f64().is_some_and(|m| m < 0.0) { max.clone() } else { zero };
    }
    zero
}

fn string_or(node: &FormBox, fallback: impl FnOnce() -> String) -> Value {
    match node.scalar() {
        Some(Value::String(s)) => Value::String(s.clone()),
        _ => Value::String(fallback()),
    }
}

/// Half of a 12-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Meridiem {
    Am,
    Pm,
}

/// A loosely parsed time of day.
///
/// Components that fail to parse are `None`; the rendering side hides the
/// matching spinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeOfDay {
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meridiem: Option<Meridiem>,
}

impl TimeOfDay {
    /// Whether this is a 24-hour clock reading.
    #[must_use]
    pub fn is_24h(&self) -> bool {
        self.meridiem.is_none()
    }

    /// Inclusive bounds of the hour spinner.
    #[must_use]
    pub fn hour_bounds(&self) -> (u32, u32) {
        if self.is_24h() { (0, 23) } else { (1, 12) }
    }
}

/// Parse `hh[:mm[:ss]]` with an optional `am`/`pm` suffix.
pub fn parse_time(raw: &str) -> TimeOfDay {
    let t = raw.to_lowercase();
    let meridiem = if t.ends_with("am") {
        Some(Meridiem::Am)
    } else if t.ends_with("pm") {
        Some(Meridiem::Pm)
    } else {
        None
    };
    let clock = match meridiem {
        Some(_) => &t[..t.len() - 2],
        None => t.as_str(),
    };

    let mut parts = clock.split(':').map(leading_int);
    TimeOfDay {
        hour: parts.next().flatten(),
        minute: parts.next().flatten(),
        second: parts.next().flatten(),
        meridiem,
    }
}

/// Integer prefix of a token, ignoring leading whitespace.
fn leading_int(token: &str) -> Option<u32> {
    let token = token.trim_start();
    let end = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    token[..end].parse().ok()
}
