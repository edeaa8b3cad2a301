//! TUI rendering: header, body panes and status bar.

pub mod chat;
pub mod lifecycle;
pub mod po_list;

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::app::App;

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);
  if app.viewer.is_open() {
    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
      .split(rows[1]);
    po_list::draw(f, cols[0], app);
    lifecycle::draw(f, cols[1], app);
  } else {
    chat::draw(f, rows[1], app);
  }
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let left = Span::styled(
    " docket",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );

  let file = match &app.pending_file {
    Some(path) if app.session.has_uploaded(path) => format!("{} (uploaded) ", path.display()),
    Some(path) => format!("{} ", path.display()),
    None => "no file attached ".to_string(),
  };
  let right = Span::styled(file, Style::default().fg(Color::Gray));

  let pad = area
    .width
    .saturating_sub(left.width() as u16)
    .saturating_sub(right.width() as u16);

  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, hints) = if !app.viewer.is_open() {
    let hints = if app.viewer_enabled {
      "Enter send  /attach <file>  /detach  ^L lifecycle  ^C quit"
    } else {
      "Enter send  /attach <file>  /detach  ^C quit"
    };
    ("CHAT", hints)
  } else if app.filter_active {
    ("SEARCH", "Type to filter  Esc cancel  Enter select")
  } else {
    (
      "LIFECYCLE",
      "↑↓/jk navigate  Enter load  / search  r reload  Esc close",
    )
  };

  let status = if app.uploading {
    "Uploading CSV…".to_string()
  } else if app.thinking {
    "Waiting for answer…".to_string()
  } else if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(format!("  {status}"), Style::default().fg(Color::DarkGray));

  f.render_widget(
    Paragraph::new(Line::from(vec![mode_span, hint_span])).style(Style::default().bg(Color::Black)),
    area,
  );
}
