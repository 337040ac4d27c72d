//! SSE HTTP handler for the web layer.
//!
//! The connection registry, frame types and the dispatcher live in the `sse`
//! crate; this module only adapts a registered connection into a response body.

pub(crate) mod handler;
