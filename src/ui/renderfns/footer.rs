use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the status line: the latest message, or key hints when there is none
pub fn draw_footer(frame: &mut Frame, area: Rect, message: Option<(&str, bool)>, hints: &[(&str, &str)]) {
  let line = match message {
    Some((text, is_error)) => {
      let color = if is_error { Color::Red } else { Color::Green };
      Line::from(Span::styled(format!(" {}", text), Style::default().fg(color)))
    }
    None => {
      let mut spans = vec![Span::raw(" ")];
      for (i, (key, label)) in hints.iter().enumerate() {
        if i > 0 {
          spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
        spans.push(Span::styled(format!(" {}", label), Style::default().fg(Color::DarkGray)));
      }
      Line::from(spans)
    }
  };

  let paragraph = Paragraph::new(line).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
