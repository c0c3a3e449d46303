//! Form model: widget resolution, value capture and the live session.
//!
//! ```text
//!  FormBox tree ──► widget::resolve ──► mount ──► MountedNode tree
//!                                         │
//!                                         ▼
//!                              CaptureContext / buffer ──► Outbox
//! ```

pub mod capture;
pub mod defaults;
pub mod mount;
pub mod session;
pub mod widget;

pub use capture::{CaptureBuffer, CaptureContext, Outbox};
pub use defaults::{default_value, parse_time, TimeOfDay};
pub use mount::{mount, mount_all, MountedNode, WidgetProps};
pub use session::{Applied, FormSession};
pub use widget::{resolve, ButtonSource, DateSpan, TextVariant, WidgetKind};
