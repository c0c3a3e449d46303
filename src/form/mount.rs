//! Mounting: resolve, index and seed a box tree.
//!
//! Mounting walks the tree depth-first, children in listed order. Each
//! capturing leaf advances the capture context by one slot, records that slot
//! and writes its default value. The result is a [`MountedNode`] tree, which
//! is everything a renderer needs to draw the form and route interactions
//! back through [`CaptureContext::bind`].

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::trace;

use super::capture::CaptureContext;
use super::defaults::{choices_for, default_value, parse_time, TimeOfDay};
use super::widget::{resolve, WidgetKind};
use crate::protocol::{Choice, FieldValue, FormBox, Value};

/// Placeholder shown in text fields with neither label nor placeholder.
pub const DEFAULT_PLACEHOLDER: &str = "Message...";

/// Everything a renderer needs to draw one control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// The seeded value.
    pub value: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Options, or actions for menus and action buttons.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<u32>,
    pub inline: bool,
    /// Parsed time of day, for time pickers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeOfDay>,
    /// Layout attributes, passed through untouched.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub layout: Map<String, JsonValue>,
}

impl WidgetProps {
    fn build(kind: WidgetKind, node: &FormBox) -> Self {
        let value = default_value(kind, node);

        let placeholder = match kind {
            WidgetKind::TextField(_) if node.text.is_none() && node.placeholder.is_none() => {
                Some(DEFAULT_PLACEHOLDER.to_string())
            }
            _ => node.placeholder.clone(),
        };

        let time = match (kind, &value) {
            (WidgetKind::TimePicker, FieldValue::Scalar(Value::String(s))) => Some(parse_time(s)),
            _ => None,
        };

        Self {
            label: node.text.clone(),
            name: node.name.clone(),
            placeholder,
            value,
            min: node.min.clone(),
            max: node.max.clone(),
            step: node.step,
            precision: node.precision,
            required: node.required,
            error: node.error.clone(),
            choices: choices_for(kind, node).to_vec(),
            icon: node.icon.clone(),
            prefix: node.prefix.clone(),
            suffix: node.suffix.clone(),
            mask: node.mask.clone(),
            lines: node.lines,
            inline: node.inline,
            time,
            layout: node.extra.clone(),
        }
    }
}

/// A resolved, indexed node of a mounted form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MountedNode {
    pub xid: String,
    pub kind: WidgetKind,
    /// Assigned capture slot, or `-1`.
    pub index: i32,
    pub props: WidgetProps,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MountedNode>,
}

impl MountedNode {
    /// Depth-first iterator over this node and its descendants.
    pub fn walk(&self) -> Box<dyn Iterator<Item = &MountedNode> + '_> {
        Box::new(std::iter::once(self).chain(self.children.iter().flat_map(MountedNode::walk)))
    }
}

/// Mount one box tree.
///
/// Returns the mounted tree and the context bound to the last slot used, which
/// is where mounting of a following sibling continues.
pub fn mount(root: &FormBox, ctx: CaptureContext) -> (MountedNode, CaptureContext) {
    let kind = resolve(root);
    let mut ctx = ctx;
    let mut index = -1;
    let mut children = Vec::with_capacity(root.items.len());

    if kind == WidgetKind::Composite {
        for item in &root.items {
            let (child, last) = mount(item, ctx);
            ctx = last;
            children.push(child);
        }
    } else if kind.is_capturing() && root.index != -1 {
        ctx = ctx.next();
        index = ctx.index();
    }

    let props = WidgetProps::build(kind, root);
    if index >= 0 {
        ctx.capture(index, props.value.clone());
    }
    trace!("Mounted {} '{}' at {}", kind, root.xid, index);

    let node = MountedNode {
        xid: root.xid.clone(),
        kind,
        index,
        props,
        children,
    };
    (node, ctx)
}

/// Mount a list of sibling trees, threading one context through all of them.
pub fn mount_all(roots: &[FormBox], ctx: CaptureContext) -> (Vec<MountedNode>, CaptureContext) {
    let mut ctx = ctx;
    let mut mounted = Vec::with_capacity(roots.len());
    for root in roots {
        let (node, last) = mount(root, ctx);
        ctx = last;
        mounted.push(node);
    }
    (mounted, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::capture::Outbox;
    use crate::form::widget::TextVariant;
    use serde_json::json;

    fn ctx() -> CaptureContext {
        CaptureContext::new(Outbox::Discard)
    }

    fn indices(node: &MountedNode) -> Vec<(String, i32)> {
        node.walk()
            .filter(|n| n.kind.is_capturing())
            .map(|n| (n.xid.clone(), n.index))
            .collect()
    }

    fn nested() -> FormBox {
        FormBox::sanitize(json!({"t": 3, "items": [
            {"t": 1, "xid": "A"},
            {"t": 3, "items": [
                {"t": 1, "xid": "B", "mode": "rating"},
                {"t": 1, "xid": "C", "options": "x y"},
            ]},
            {"t": 1, "xid": "D", "range": [0, 10]},
        ]}))
    }

    #[test]
    fn test_depth_first_indices() {
        let (node, _) = mount(&nested(), ctx());
        assert_eq!(
            indices(&node),
            vec![
                ("A".to_string(), 0),
                ("B".to_string(), 1),
                ("C".to_string(), 2),
                ("D".to_string(), 3),
            ]
        );
        assert_eq!(node.index, -1);
        assert_eq!(node.children[1].index, -1);
    }

    #[test]
    fn test_remount_is_stable() {
        let tree = nested();
        let (first, _) = mount(&tree, ctx());
        let (second, _) = mount(&tree, ctx());
        assert_eq!(indices(&first), indices(&second));
    }

    #[test]
    fn test_buffer_covers_every_leaf() {
        let (_, last) = mount(&nested(), ctx());
        let buffer = last.snapshot();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer[0], FieldValue::Scalar(Value::from("")));
        assert_eq!(buffer[1], FieldValue::Scalar(Value::from(0)));
        assert_eq!(buffer[2], FieldValue::Null);
        assert_eq!(buffer[3], FieldValue::Scalar(Value::from(0)));
    }

    #[test]
    fn test_opted_out_leaf_takes_no_slot() {
        let tree = FormBox::sanitize(json!({"t": 3, "items": [
            {"t": 1, "xid": "a"},
            {"t": 1, "xid": "skip", "index": -1},
            {"t": 1, "xid": "b"},
        ]}));
        let (node, last) = mount(&tree, ctx());
        assert_eq!(node.children[1].index, -1);
        assert_eq!(node.children[2].index, 1);
        assert_eq!(last.snapshot().len(), 2);
    }

    #[test]
    fn test_mount_all_threads_context() {
        let roots = vec![
            FormBox::sanitize(json!({"t": 1, "xid": "p"})),
            FormBox::sanitize(json!({"t": 3, "text": "between"})),
            FormBox::sanitize(json!({"t": 1, "xid": "q"})),
        ];
        let (mounted, last) = mount_all(&roots, ctx());
        assert_eq!(mounted[0].index, 0);
        assert_eq!(mounted[1].index, -1);
        assert_eq!(mounted[2].index, 1);
        assert_eq!(last.index(), 1);
    }

    #[test]
    fn test_text_field_placeholder() {
        let (node, _) = mount(&FormBox::sanitize(json!({"t": 1})), ctx());
        assert_eq!(node.kind, WidgetKind::TextField(TextVariant::SingleLine));
        assert_eq!(node.props.placeholder.as_deref(), Some(DEFAULT_PLACEHOLDER));

        let (node, _) = mount(&FormBox::sanitize(json!({"t": 1, "text": "Name"})), ctx());
        assert_eq!(node.props.placeholder, None);
        assert_eq!(node.props.label.as_deref(), Some("Name"));
    }

    #[test]
    fn test_menu_props_carry_actions() {
        let raw = json!({"t": 1, "actions": "a b c d e f", "align": "left"});
        let (node, _) = mount(&FormBox::sanitize(raw), ctx());
        assert_eq!(node.kind, WidgetKind::Menu);
        assert_eq!(node.props.choices.len(), 6);
        assert_eq!(node.props.layout.get("align"), Some(&json!("left")));
    }

    #[test]
    fn test_time_picker_props() {
        let raw = json!({"t": 1, "mode": "time", "value": "3:45 pm"});
        let (node, _) = mount(&FormBox::sanitize(raw), ctx());
        let time = node.props.time.unwrap();
        assert_eq!((time.hour, time.minute), (Some(3), Some(45)));
        assert_eq!(time.hour_bounds(), (1, 12));
    }
}
