use boxform::form::{Applied, FormSession, Outbox, WidgetKind};
use boxform::protocol::{decode_frames, FieldValue, Message, Value};
use tokio::sync::mpsc;

fn apply_frames(session: &mut FormSession, payload: &str) -> Vec<Applied> {
    decode_frames(payload)
        .into_iter()
        .map(|frame| session.apply(frame.unwrap()))
        .collect()
}

#[test]
fn test_nested_form_indices_and_submit() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = FormSession::new(Outbox::Channel(tx));

    let payload = concat!(
        r#"{"t":14,"d":{"title":"Signup"}}"#,
        "\n",
        r#"{"t":11,"d":{"t":1,"xid":"root","items":["#,
        r#"{"t":1,"xid":"a","text":"Name","value":"Ada"},"#,
        r#"{"t":1,"xid":"bc","items":["#,
        r#"{"t":1,"xid":"b","min":0,"max":10,"value":4},"#,
        r#"{"t":1,"xid":"c","mode":"time","value":"10:30"}"#,
        r#"]},"#,
        r#"{"t":1,"xid":"d","options":["red","green","blue"]}"#,
        r#"]}}"#,
        "\n",
    );

    let applied = apply_frames(&mut session, payload);
    assert_eq!(applied[0], Applied::Configured);
    assert_eq!(session.conf().title.as_deref(), Some("Signup"));

    let tree = match &applied[1] {
        Applied::Mounted(tree) => tree,
        other => panic!("unexpected result: {:?}", other),
    };
    let indexed: Vec<(&str, i32)> = tree[0]
        .walk()
        .filter(|n| n.index >= 0)
        .map(|n| (n.xid.as_str(), n.index))
        .collect();
    assert_eq!(indexed, [("a", 0), ("b", 1), ("c", 2), ("d", 3)]);

    let kinds: Vec<WidgetKind> = tree[0].walk().map(|n| n.kind).collect();
    assert_eq!(kinds[0], WidgetKind::Composite);
    assert_eq!(kinds[2], WidgetKind::Composite);
    assert_eq!(kinds[3], WidgetKind::Slider);
    assert_eq!(kinds[4], WidgetKind::TimePicker);

    let values = session.values();
    assert_eq!(values.len(), 4);
    assert_eq!(values[0], FieldValue::Scalar(Value::from("Ada")));
    assert_eq!(values[1], FieldValue::Scalar(Value::from(4)));
    assert_eq!(values[2], FieldValue::Scalar(Value::from("10:30")));
    assert_eq!(values[3], FieldValue::Null);

    session.submit();
    match rx.try_recv().unwrap() {
        Message::Input(sent) => assert_eq!(sent, values),
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn test_interaction_through_bound_context() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = FormSession::new(Outbox::Channel(tx));
    apply_frames(
        &mut session,
        concat!(
            r#"{"t":11,"d":{"t":1,"xid":"x","value":"one"}}"#,
            "\n",
            r#"{"t":11,"d":{"t":1,"xid":"y","value":"two"}}"#,
        ),
    );

    let index = session
        .mounted()
        .iter()
        .find(|n| n.xid == "y")
        .map(|n| n.index)
        .unwrap();
    assert_eq!(index, 1);

    session.context().bind(index).submit(Value::from("changed"), true);
    match rx.try_recv().unwrap() {
        Message::Input(sent) => assert_eq!(
            sent,
            vec![
                FieldValue::Scalar(Value::from("one")),
                FieldValue::Scalar(Value::from("changed")),
            ]
        ),
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn test_remove_and_remote_error() {
    let mut session = FormSession::new(Outbox::Discard);
    let applied = apply_frames(
        &mut session,
        concat!(
            r#"{"t":11,"d":{"t":1,"xid":"x","value":"one"}}"#,
            "\n",
            r#"{"t":13,"d":{"t":1,"xid":"x"}}"#,
            "\n",
            r#"{"t":1,"e":"boom","c":7}"#,
        ),
    );

    assert_eq!(applied[1], Applied::Mounted(Vec::new()));
    assert!(session.values().is_empty());
    assert_eq!(
        applied[2],
        Applied::RemoteError {
            text: "boom".to_string(),
            code: Some(7)
        }
    );
}
