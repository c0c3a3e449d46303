//! boxform: a headless client for box-protocol form servers.
//!
//! A form server describes its UI as a tree of boxes and streams changes to
//! that tree over a WebSocket. This crate decodes the stream, picks a widget
//! for every box, seeds each capturing widget's slot in a flat value buffer
//! and ships the buffer back on submit.
//!
//! # Architecture
//!
//! - **Protocol**: wire values, box sanitization and message framing
//! - **Form**: widget resolution, default values, capture buffer, session
//! - **Transport**: reconnecting WebSocket with capped backoff
//! - **Config**: hierarchical TOML configuration

#![warn(clippy::all)]

pub mod cli;
pub mod cli_handler;
pub mod config;
pub mod form;
pub mod protocol;
pub mod transport;
