//! Subcommand handling for boxform.
//!
//! `connect` runs the live client; `resolve` mounts a box tree from a file.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::cli::Commands;
use crate::config::Config;
use crate::form::{mount_all, Applied, CaptureContext, FormSession, MountedNode, Outbox};
use crate::protocol::{FieldValue, FormBox};
use crate::transport::{Transport, TransportEvent};

/// A mounted form as printed to stdout.
#[derive(Debug, Serialize)]
pub struct Rendered<'a> {
    pub tree: &'a [MountedNode],
    pub values: Vec<FieldValue>,
}

/// Handle a parsed subcommand with the merged configuration.
pub fn handle_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Connect { .. } => run_connect(config),
        Commands::Resolve { file } => run_resolve(&file),
    }
}

/// Connect to the form server and mount everything it sends until the
/// transport stops or the process is interrupted.
fn run_connect(config: Config) -> Result<()> {
    let options = config
        .transport_options()
        .context("Invalid server configuration")?;
    let auto_submit = config.form.auto_submit;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(async move {
        info!("Connecting to {}", options.url);
        let mut transport = Transport::spawn(options);
        let mut session = FormSession::new(Outbox::Transport(transport.handle()));

        loop {
            tokio::select! {
                event = transport.recv() => match event {
                    Some(event) => on_event(&mut session, event, auto_submit)?,
                    None => break,
                },
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        warn!("Failed to listen for interrupt: {}", e);
                    }
                    info!("Interrupted; shutting down");
                    break;
                }
            }
        }

        transport.stop().await.context("Transport did not stop cleanly")?;
        Ok::<_, anyhow::Error>(())
    })
}

fn on_event(session: &mut FormSession, event: TransportEvent, auto_submit: bool) -> Result<()> {
    match event {
        TransportEvent::Connected => info!("Connected"),
        TransportEvent::Disconnected { retry } => {
            warn!("Disconnected; retrying in {}s", retry);
        }
        TransportEvent::Error(e) => error!("Transport error: {}", e),
        TransportEvent::Message(msg) => match session.apply(msg) {
            Applied::Mounted(tree) => {
                print_form(&tree, session.values())?;
                if auto_submit {
                    debug!("Submitting defaults");
                    session.submit();
                }
            }
            Applied::Configured => {
                if let Some(title) = &session.conf().title {
                    info!("Page title: {}", title);
                }
            }
            Applied::Switched(view) => info!("Switched to {}", view),
            Applied::RemoteError { text, code } => {
                error!("Server error (code {:?}): {}", code, text);
            }
            Applied::Ignored => {}
        },
    }
    Ok(())
}

/// Mount the box tree stored at `path` and print it.
fn run_resolve(path: &Path) -> Result<()> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let raw: JsonValue = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {:?} as JSON", path))?;

    let roots = load_boxes(raw);
    let ctx = CaptureContext::new(Outbox::Discard);
    let (tree, last) = mount_all(&roots, ctx);
    print_form(&tree, last.snapshot())
}

/// One box, or an array of root boxes.
pub fn load_boxes(raw: JsonValue) -> Vec<FormBox> {
    match raw {
        JsonValue::Array(items) => items.into_iter().map(FormBox::sanitize).collect(),
        other => vec![FormBox::sanitize(other)],
    }
}

fn print_form(tree: &[MountedNode], values: Vec<FieldValue>) -> Result<()> {
    let rendered = Rendered { tree, values };
    let line = serde_json::to_string(&rendered).context("Failed to serialize form")?;
    println!("{}", line);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Message, Value};
    use serde_json::json;

    #[test]
    fn test_load_boxes_single_and_array() {
        assert_eq!(load_boxes(json!({"t": 1, "xid": "a"})).len(), 1);
        let roots = load_boxes(json!([{"t": 1, "xid": "a"}, "hello"]));
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[1].text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_rendered_shape() {
        let roots = load_boxes(json!({"t": 1, "xid": "n", "value": 3}));
        let (tree, last) = mount_all(&roots, CaptureContext::new(Outbox::Discard));
        let rendered = Rendered {
            tree: &tree,
            values: last.snapshot(),
        };
        let out = serde_json::to_value(&rendered).unwrap();
        assert_eq!(out["values"], json!([3]));
        assert_eq!(out["tree"][0]["xid"], "n");
    }

    #[test]
    fn test_on_event_auto_submit() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut session = FormSession::new(Outbox::Channel(tx));
        let msg = Message::Insert {
            node: FormBox::sanitize(json!({"t": 1, "xid": "a", "value": "x"})),
            position: None,
        };

        on_event(&mut session, TransportEvent::Message(msg), true).unwrap();
        match rx.try_recv().unwrap() {
            Message::Input(values) => {
                assert_eq!(values, vec![FieldValue::Scalar(Value::from("x"))]);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_on_event_without_submit() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut session = FormSession::new(Outbox::Channel(tx));
        on_event(&mut session, TransportEvent::Connected, true).unwrap();
        on_event(
            &mut session,
            TransportEvent::Message(Message::Insert {
                node: FormBox::sanitize(json!({"t": 1, "xid": "a"})),
                position: None,
            }),
            false,
        )
        .unwrap();
        assert!(rx.try_recv().is_err());
    }
}
