//! Purchase order list, left panel of the viewer.

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::{app::App, viewer::PoList};

/// Render the PO list into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let filtered = app.filtered_pos();
  let total = app.viewer.pos().len();

  let title = if app.filter_active || !app.filter.is_empty() {
    format!(" Purchase orders ({}/{}) ", filtered.len(), total)
  } else {
    format!(" Purchase orders ({total}) ")
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let mut inner = block.inner(area);
  f.render_widget(block, area);

  let placeholder = match app.viewer.list() {
    None => Some(("Loading purchase orders…", Color::DarkGray)),
    Some(PoList::Failed(_)) => Some(("Could not load purchase orders.", Color::Red)),
    Some(PoList::Loaded(list)) if !list.csv_loaded => Some(("No CSV loaded.", Color::DarkGray)),
    Some(PoList::Loaded(list)) if list.pos.is_empty() => {
      Some(("The CSV has no purchase orders.", Color::DarkGray))
    }
    Some(PoList::Loaded(_)) => None,
  };
  if let Some((text, color)) = placeholder {
    f.render_widget(Paragraph::new(text).style(Style::default().fg(color)), inner);
    return;
  }

  if (app.filter_active || !app.filter.is_empty()) && inner.height > 2 {
    let filter_area = Rect {
      x:      inner.x,
      y:      inner.y + inner.height - 1,
      width:  inner.width,
      height: 1,
    };
    inner.height = inner.height.saturating_sub(1);

    let filter_text = if app.filter_active {
      format!("/{}_", app.filter)
    } else {
      format!("/{}", app.filter)
    };
    f.render_widget(
      Paragraph::new(filter_text).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  let selected = app.viewer.selected_po();
  let items: Vec<ListItem> = filtered
    .iter()
    .map(|po| {
      let marker = if selected == Some(po.document_id.as_str()) { "▸ " } else { "  " };
      let mut spans = vec![Span::raw(marker), Span::raw(po.document_id.clone())];
      if let Some(partner) = &po.partner {
        spans.push(Span::styled(
          format!("  {partner}"),
          Style::default().fg(Color::DarkGray),
        ));
      }
      ListItem::new(Line::from(spans))
    })
    .collect();

  let mut state = ListState::default();
  state.select((!filtered.is_empty()).then_some(app.po_cursor));

  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner,
    &mut state,
  );
}
