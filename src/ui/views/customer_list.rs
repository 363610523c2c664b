use crate::db::Customer;
use crate::ui::renderfns::truncate;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

pub fn draw_customer_list(
  frame: &mut Frame,
  area: Rect,
  customers: &[&Customer],
  selected: usize,
  filter: &str,
  loading: bool,
) {
  let title = match (loading, filter.is_empty()) {
    (true, _) => " Customers (loading...) ".to_string(),
    (false, true) => format!(" Customers ({}) ", customers.len()),
    (false, false) => format!(" Customers /{} ({}) ", filter, customers.len()),
  };

  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if customers.is_empty() && !loading {
    let content = if filter.is_empty() {
      "No customers found. Add your first customer!"
    } else {
      "No customers match the search."
    };
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = customers
    .iter()
    .map(|c| {
      ListItem::new(Line::from(vec![
        Span::styled(
          format!("{:<24}", truncate(&c.name, 24)),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::raw(format!("{:<32}", truncate(&c.email, 32))),
        Span::raw(" "),
        Span::styled(
          c.phone.as_deref().unwrap_or("-").to_string(),
          Style::default().fg(Color::Yellow),
        ),
      ]))
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default().with_selected(Some(selected));
  frame.render_stateful_widget(list, area, &mut state);
}

/// y/n prompt before deleting `customer`
pub fn draw_confirm_delete(frame: &mut Frame, area: Rect, customer: &Customer) {
  let width = 50.min(area.width);
  let height = 5.min(area.height);
  let popup = Rect::new(
    area.x + area.width.saturating_sub(width) / 2,
    area.y + area.height.saturating_sub(height) / 2,
    width,
    height,
  );

  frame.render_widget(Clear, popup);

  let block = Block::default()
    .title(" Delete Customer ")
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Red));

  let text = vec![
    Line::from(format!("Delete {} <{}>?", customer.name, customer.email)),
    Line::from(vec![
      Span::styled("y", Style::default().fg(Color::Red).bold()),
      Span::raw(" delete   "),
      Span::styled("n", Style::default().fg(Color::Cyan).bold()),
      Span::raw(" keep"),
    ]),
  ];

  frame.render_widget(
    Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
    popup,
  );
}
