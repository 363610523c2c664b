use crate::event::GenerationSummary;
use crate::ui::renderfns::format_bytes;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

pub fn draw_generations(frame: &mut Frame, area: Rect, generations: &[GenerationSummary], loading: bool) {
  let title = if loading {
    " Cache Generations (loading...) ".to_string()
  } else {
    format!(" Cache Generations ({}) ", generations.len())
  };

  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Magenta));

  if generations.is_empty() && !loading {
    let paragraph = Paragraph::new("Nothing cached yet. Run :sync to install the app shell.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = generations
    .iter()
    .map(|g| {
      let (marker, style) = if g.active {
        ("* ", Style::default().fg(Color::Green).bold())
      } else {
        ("  ", Style::default().fg(Color::DarkGray))
      };
      ListItem::new(Line::from(vec![
        Span::styled(marker, style),
        Span::styled(format!("{:<28}", g.name), style),
        Span::raw(format!("{:>5} entries  ", g.entries)),
        Span::styled(format_bytes(g.bytes), Style::default().fg(Color::Yellow)),
      ]))
    })
    .collect();

  frame.render_widget(List::new(items).block(block), area);
}
