//! Lifecycle pane, right panel of the viewer.
//!
//! Shows, for the selected purchase order, one section per transaction type
//! in PO → ACK → ASN → INV → FA order. The loading, not-found, transport
//! failure and empty states each render differently.

use docket_core::{
  event::EventType,
  lifecycle::{CompletenessFlags, LifecycleEvent, LifecycleResponse},
};
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};
use strum::IntoEnumIterator;

use crate::{app::App, client::FetchError};

// ─── Public entry ─────────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let title = app
    .viewer
    .selected_po()
    .map(|id| format!(" {id} "))
    .unwrap_or_else(|| " Lifecycle ".to_string());

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let viewer = &app.viewer;
  let lines = if viewer.is_loading_list() {
    vec![dim("Loading…")]
  } else if viewer.is_loading_lifecycle() {
    vec![dim("Loading lifecycle…")]
  } else if let Some(error) = viewer.error() {
    error_lines(error)
  } else if let Some(lifecycle) = viewer.lifecycle() {
    lifecycle_lines(lifecycle)
  } else {
    vec![dim("Select a purchase order and press Enter.")]
  };

  f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

// ─── States ───────────────────────────────────────────────────────────────────

fn dim(text: &str) -> Line<'static> {
  Line::from(Span::styled(text.to_string(), Style::default().fg(Color::DarkGray)))
}

fn error_lines(error: &FetchError) -> Vec<Line<'static>> {
  match error {
    FetchError::NotFound { detail } => vec![
      Line::from(Span::styled(
        "Not found",
        Style::default()
          .fg(Color::Yellow)
          .add_modifier(Modifier::BOLD),
      )),
      Line::from(detail.clone().unwrap_or_else(|| "The backend has no such record.".into())),
    ],
    FetchError::Transport(message) => vec![
      Line::from(Span::styled(
        "Could not reach the backend",
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
      )),
      Line::from(message.clone()),
      dim("Press r to reload."),
    ],
  }
}

fn lifecycle_lines(lifecycle: &LifecycleResponse) -> Vec<Line<'static>> {
  let mut lines = vec![completeness_line(lifecycle), Line::from("")];

  if lifecycle.events.is_empty() {
    lines.push(dim("No lifecycle events recorded."));
    return lines;
  }

  for event_type in EventType::iter() {
    lines.push(Line::from(vec![
      Span::styled(
        format!("{:<5}", event_type.to_string()),
        Style::default()
          .fg(Color::Cyan)
          .add_modifier(Modifier::BOLD),
      ),
      Span::styled(event_type.description(), Style::default().fg(Color::DarkGray)),
    ]));

    let mut events = lifecycle.events_of_type(event_type).peekable();
    if events.peek().is_none() {
      lines.push(Line::from(Span::styled(
        "  missing",
        Style::default().fg(Color::Red),
      )));
    }
    for (i, event) in events.enumerate() {
      lines.push(event_line(event, i == 0));
    }
    lines.push(Line::from(""));
  }
  lines
}

/// One badge per transaction type, green when present, then overall progress.
fn completeness_line(lifecycle: &LifecycleResponse) -> Line<'static> {
  let mut spans: Vec<Span> = EventType::iter()
    .flat_map(|t| {
      let (mark, color) = if lifecycle.completeness.has(t) {
        ("✓", Color::Green)
      } else {
        ("✗", Color::Red)
      };
      [
        Span::styled(format!("{mark} {t}"), Style::default().fg(color)),
        Span::raw("  "),
      ]
    })
    .collect();
  spans.push(progress(&lifecycle.completeness));
  Line::from(spans)
}

/// `complete`, or the earliest step not seen yet.
fn progress(flags: &CompletenessFlags) -> Span<'static> {
  if flags.is_complete() {
    return Span::styled(
      "complete",
      Style::default()
        .fg(Color::Green)
        .add_modifier(Modifier::BOLD),
    );
  }
  let step = flags
    .first_missing()
    .map(|t| t.to_string())
    .unwrap_or_default();
  Span::styled(format!("awaiting {step}"), Style::default().fg(Color::Yellow))
}

/// A single event; the preferred (first) one of its type is highlighted.
fn event_line(event: &LifecycleEvent, preferred: bool) -> Line<'static> {
  let style = if preferred {
    Style::default().add_modifier(Modifier::BOLD)
  } else {
    Style::default().fg(Color::Gray)
  };

  let mut spans = vec![
    Span::raw("  "),
    Span::styled(event.document_id.clone().unwrap_or_else(|| "—".into()), style),
  ];
  if let Some(status) = &event.status {
    spans.push(Span::raw(format!("  {status}")));
  }
  spans.push(Span::styled(
    event
      .event_date
      .map(|d| format!("  {d}"))
      .unwrap_or_else(|| "  undated".into()),
    Style::default().fg(Color::DarkGray),
  ));
  if let Some(partner) = &event.partner {
    spans.push(Span::styled(
      format!("  {partner}"),
      Style::default().fg(Color::DarkGray),
    ));
  }
  Line::from(spans)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn flags(types: &[EventType]) -> CompletenessFlags {
    let events: Vec<_> = types.iter().copied().map(LifecycleEvent::bare).collect();
    CompletenessFlags::from_events(&events)
  }

  #[test]
  fn progress_names_the_earliest_missing_step() {
    let span = progress(&flags(&[EventType::Po, EventType::Asn]));
    assert_eq!(span.content, "awaiting ACK");
    assert_eq!(span.style.fg, Some(Color::Yellow));
  }

  #[test]
  fn progress_reports_a_full_chain_as_complete() {
    let all: Vec<_> = EventType::iter().collect();
    assert_eq!(progress(&flags(&all)).content, "complete");
  }

  #[test]
  fn completeness_line_ends_with_progress() {
    let resp = LifecycleResponse::new("PO-1", vec![LifecycleEvent::bare(EventType::Po)]);
    let line = completeness_line(&resp);
    assert_eq!(line.spans.first().unwrap().content, "✓ PO");
    assert_eq!(line.spans.last().unwrap().content, "awaiting ACK");
  }
}
