//! Markup fragments for live notifications.
//!
//! Everything here is pure: the same event always yields the same fragments.
//! Fragments are pushed verbatim into the client DOM, so any user supplied
//! text goes through [`escape_html`] first.
//!
//! The list item shows a kind specific icon; toasts always show the bell.

use chrono::{DateTime, Utc};
use events::{NotificationEvent, NotificationKind};

/// The two fragments produced for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotification {
    /// Persistent entry for the standing notification list.
    pub list_item: String,
    /// Transient popup; carries no timestamp.
    pub toast: String,
}

pub fn render(event: &NotificationEvent) -> RenderedNotification {
    RenderedNotification {
        list_item: render_list_item(event),
        toast: render_toast(event),
    }
}

/// Marker name and glyph shown next to the message.
fn icon(kind: NotificationKind) -> (&'static str, &'static str) {
    match kind {
        NotificationKind::MemoComment => ("comment", "\u{1F4AC}"),
        NotificationKind::TicketComment => ("ticket", "\u{1F3AB}"),
        NotificationKind::Unknown => ("bell", "\u{1F514}"),
    }
}

/// Human readable, already escaped, one-line description of the event.
pub fn message(event: &NotificationEvent) -> String {
    let sender = escape_html(&event.sender_display_name);
    match event.kind {
        NotificationKind::MemoComment => format!("{sender} mentioned you in a memo"),
        NotificationKind::TicketComment => format!(
            "{sender} mentioned you in ticket #{}",
            event.ticket_id.unwrap_or_default()
        ),
        NotificationKind::Unknown => format!("{sender} sent you a notification"),
    }
}

/// Short wall-clock time, e.g. `3:04 PM`. Always UTC, never locale dependent.
pub fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%-I:%M %p").to_string()
}

fn render_list_item(event: &NotificationEvent) -> String {
    let (marker, glyph) = icon(event.kind);
    format!(
        r#"
<div id="notification-{id}" class="sse-notification-item unread" data-kind="{marker}" onclick="window.location='/notifications'">
  <div class="sse-notification-icon sse-icon-{marker}">{glyph}</div>
  <div class="sse-notification-content">
    <p class="sse-notification-message">{message}</p>
    <span class="sse-notification-time">{time}</span>
  </div>
</div>
"#,
        id = event.id,
        message = message(event),
        time = format_time(&event.occurred_at),
    )
}

fn render_toast(event: &NotificationEvent) -> String {
    let (marker, glyph) = icon(NotificationKind::Unknown);
    format!(
        r#"
<div id="notification-toast-{id}" class="sse-notification-toast" data-kind="{marker}">
  <div class="sse-toast-icon sse-icon-{marker}">{glyph}</div>
  <div class="sse-toast-content">{message}</div>
  <button class="sse-toast-close" onclick="this.parentElement.remove()">&times;</button>
</div>
"#,
        id = event.id,
        message = message(event),
    )
}

/// Escape the five characters that are significant in HTML text and
/// attribute values, plus line terminators so a name never breaks a
/// fragment across SSE lines.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            '\r' => escaped.push_str("&#13;"),
            '\n' => escaped.push_str("&#10;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
