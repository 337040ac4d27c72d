use axum::response::sse::Event;
use serde_json::{Map, Value};

/// Element id of the standing notification list on the client.
pub const NOTIFICATION_LIST_SELECTOR: &str = "#sse-notification-list";
/// Element id of the container that hosts transient toasts.
pub const TOAST_CONTAINER_SELECTOR: &str = "#sse-toast-container";

/// Trait for getting the SSE event type name
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

/// One push to a connected client, in the Datastar SSE dialect the
/// frontend listens for.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Append a markup fragment to the element matched by `selector`.
    PatchElements { selector: String, elements: String },
    /// Merge a small key/value map into the client's signal store.
    PatchSignals(Map<String, Value>),
}

impl EventType for Frame {
    fn event_type(&self) -> &'static str {
        match self {
            Frame::PatchElements { .. } => "datastar-patch-elements",
            Frame::PatchSignals(_) => "datastar-patch-signals",
        }
    }
}

impl Frame {
    pub fn append_to(selector: &str, elements: impl Into<String>) -> Self {
        Frame::PatchElements {
            selector: selector.to_string(),
            elements: elements.into(),
        }
    }

    pub fn signals<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Frame::PatchSignals(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The `data:` payload lines of this frame, without the `data: ` prefix.
    ///
    /// Fragments are split on every line terminator, lone `\r` included, so no
    /// returned line ever contains `\r` or `\n`.
    pub fn data_lines(&self) -> Vec<String> {
        match self {
            Frame::PatchElements { selector, elements } => {
                let mut lines = vec![
                    format!("selector {selector}"),
                    "mode append".to_string(),
                ];
                lines.extend(
                    elements
                        .split(['\n', '\r'])
                        .filter(|line| !line.trim().is_empty())
                        .map(|line| format!("elements {line}")),
                );
                lines
            }
            Frame::PatchSignals(signals) => {
                vec![format!("signals {}", Value::Object(signals.clone()))]
            }
        }
    }

    pub fn into_event(self) -> Event {
        Event::default()
            .event(self.event_type())
            .data(self.data_lines().join("\n"))
    }
}
