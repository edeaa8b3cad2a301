//! Chat pane: transcript above, input line below.

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::{app::App, session::Role};

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Min(0), Constraint::Length(3)])
    .split(area);

  draw_transcript(f, rows[0], app);
  draw_input(f, rows[1], app);
}

fn draw_transcript(f: &mut Frame, area: Rect, app: &App) {
  let block = Block::default()
    .title(" Chat ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  if app.transcript.is_empty() {
    f.render_widget(
      Paragraph::new("Attach a CSV with /attach <file>, then ask a question.")
        .style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  let mut lines: Vec<Line> = Vec::new();
  for msg in &app.transcript {
    let (label, color) = match msg.role {
      Role::User => ("you", Color::Cyan),
      Role::Assistant => ("docket", Color::Green),
    };
    lines.push(Line::from(Span::styled(
      label,
      Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));
    lines.extend(msg.content.lines().map(|l| Line::from(l.to_string())));
    lines.push(Line::from(""));
  }

  let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
  let scroll = bottom_scroll(&paragraph, inner);
  f.render_widget(paragraph.scroll((scroll, 0)), inner);
}

/// Rows to scroll so the last wrapped line of `paragraph` sits at the bottom
/// of `area`.
fn bottom_scroll(paragraph: &Paragraph, area: Rect) -> u16 {
  let rows = u16::try_from(paragraph.line_count(area.width)).unwrap_or(u16::MAX);
  rows.saturating_sub(area.height)
}

fn draw_input(f: &mut Frame, area: Rect, app: &App) {
  let border = if app.is_busy() { Color::DarkGray } else { Color::Yellow };
  let block = Block::default()
    .title(" Ask ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));
  f.render_widget(Paragraph::new(format!("{}_", app.input)).block(block), area);
}

#[cfg(test)]
mod tests {
  use super::*;

  fn area(width: u16, height: u16) -> Rect { Rect::new(0, 0, width, height) }

  #[test]
  fn short_transcripts_do_not_scroll() {
    let paragraph =
      Paragraph::new(vec![Line::from("hi"), Line::from("")]).wrap(Wrap { trim: false });
    assert_eq!(bottom_scroll(&paragraph, area(20, 5)), 0);
  }

  #[test]
  fn wrapped_rows_count_towards_scroll() {
    // One logical line that wraps onto three rows.
    let paragraph = Paragraph::new(vec![Line::from("a".repeat(30))]).wrap(Wrap { trim: false });
    assert_eq!(bottom_scroll(&paragraph, area(10, 2)), 1);
  }

  #[test]
  fn very_long_transcripts_saturate() {
    let lines = vec![Line::from("x"); 70_000];
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    assert_eq!(bottom_scroll(&paragraph, area(10, 10)), u16::MAX - 10);
  }
}
