//! The form currently shown to the user.
//!
//! A session owns the page (its root boxes), the page configuration and the
//! capture buffer of the mounted page. Inbound messages mutate the page; each
//! mutation re-mounts it onto a fresh buffer.

use tracing::{debug, info, warn};

use super::capture::{CaptureContext, Outbox};
use super::mount::{mount_all, MountedNode};
use crate::protocol::{Conf, FieldValue, FormBox, Message, Value};

/// What applying a message did.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The page changed and was re-mounted.
    Mounted(Vec<MountedNode>),
    /// Page configuration was replaced.
    Configured,
    /// The remote asked to switch to another view.
    Switched(Value),
    /// The remote reported an error.
    RemoteError { text: String, code: Option<i64> },
    /// Nothing to do.
    Ignored,
}

/// One form session.
#[derive(Debug)]
pub struct FormSession {
    outbox: Outbox,
    page: Vec<FormBox>,
    mounted: Vec<MountedNode>,
    context: CaptureContext,
    conf: Conf,
    switch: Option<Value>,
}

impl FormSession {
    /// Create an empty session submitting to `outbox`.
    pub fn new(outbox: Outbox) -> Self {
        Self {
            context: CaptureContext::new(outbox.clone()),
            outbox,
            page: Vec::new(),
            mounted: Vec::new(),
            conf: Conf::default(),
            switch: None,
        }
    }

    /// Root boxes of the current page.
    #[must_use]
    pub fn page(&self) -> &[FormBox] {
        &self.page
    }

    /// The mounted page.
    #[must_use]
    pub fn mounted(&self) -> &[MountedNode] {
        &self.mounted
    }

    /// Current page configuration.
    #[must_use]
    pub fn conf(&self) -> &Conf {
        &self.conf
    }

    /// Last view requested through a switch message.
    #[must_use]
    pub fn switched_to(&self) -> Option<&Value> {
        self.switch.as_ref()
    }

    /// A context on the current buffer, for routing interactions.
    #[must_use]
    pub fn context(&self) -> &CaptureContext {
        &self.context
    }

    /// Current buffer contents.
    #[must_use]
    pub fn values(&self) -> Vec<FieldValue> {
        self.context.snapshot()
    }

    /// Ship the current buffer.
    pub fn submit(&self) {
        self.context.send();
    }

    /// Apply one inbound message.
    pub fn apply(&mut self, msg: Message) -> Applied {
        match msg {
            Message::Update {
                node,
                position: None,
            } => {
                self.page = vec![node];
                self.remount()
            }
            Message::Update {
                node,
                position: Some(p),
            } => {
                match slot(p, self.page.len()) {
                    Some(i) => self.page[i] = node,
                    None => self.page.push(node),
                }
                self.remount()
            }
            Message::Insert { node, position } => {
                let at = position.map_or(self.page.len(), |p| clamp(p, self.page.len()));
                self.page.insert(at, node);
                self.remount()
            }
            Message::Remove(node) => {
                remove_xid(&mut self.page, &node.xid);
                self.remount()
            }
            Message::Conf(conf) => {
                debug!("Page configuration: {:?}", conf.title);
                self.conf = conf;
                Applied::Configured
            }
            Message::Switch(value) => {
                info!("Switching to {}", value);
                self.switch = Some(value.clone());
                Applied::Switched(value)
            }
            Message::Input(values) => {
                info!("Remote acknowledged {} values", values.len());
                Applied::Ignored
            }
            Message::Error { text, code } => {
                warn!("Remote error (code {:?}): {}", code, text);
                Applied::RemoteError { text, code }
            }
            other => {
                debug!("Ignoring {:?} message", other.kind());
                Applied::Ignored
            }
        }
    }

    fn remount(&mut self) -> Applied {
        let (mounted, last) = mount_all(&self.page, CaptureContext::new(self.outbox.clone()));
        self.context = last.bind(-1);
        self.mounted = mounted.clone();
        debug!(
            "Mounted {} root boxes, {} values",
            self.mounted.len(),
            self.context.snapshot().len()
        );
        Applied::Mounted(mounted)
    }
}

fn slot(p: i64, len: usize) -> Option<usize> {
    usize::try_from(p).ok().filter(|&i| i < len)
}

fn clamp(p: i64, len: usize) -> usize {
    usize::try_from(p).map_or(0, |i| i.min(len))
}

fn remove_xid(nodes: &mut Vec<FormBox>, xid: &str) {
    nodes.retain(|n| n.xid != xid);
    for n in nodes.iter_mut() {
        remove_xid(&mut n.items, xid);
    }
}
