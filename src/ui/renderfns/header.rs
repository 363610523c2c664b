use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar: app name, origin, worker state and record count
pub fn draw_header(frame: &mut Frame, area: Rect, origin: &str, worker: &str, customers: usize) {
  let sep = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let header = Line::from(vec![
    Span::styled(" custmgr ", Style::default().fg(Color::Cyan).bold()),
    sep(),
    Span::styled(format!(" {} ", origin_host(origin)), Style::default().fg(Color::White)),
    sep(),
    Span::styled(format!(" {} ", worker), Style::default().fg(Color::Yellow)),
    sep(),
    Span::styled(
      format!(" {} customers ", customers),
      Style::default().fg(Color::White).bold(),
    ),
    Span::raw("  "),
    Span::styled("<:>", Style::default().fg(Color::Cyan)),
    Span::styled(" command", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("</>", Style::default().fg(Color::Cyan)),
    Span::styled(" search", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("<q>", Style::default().fg(Color::Cyan)),
    Span::styled(" quit", Style::default().fg(Color::DarkGray)),
  ]);

  let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host and port of an origin URL, for compact display
fn origin_host(url: &str) -> &str {
  let rest = url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url);
  rest.split('/').next().unwrap_or(rest)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_origin_host() {
    assert_eq!(origin_host("http://localhost:8080"), "localhost:8080");
    assert_eq!(
      origin_host("https://customers.example.com/app/"),
      "customers.example.com"
    );
    assert_eq!(origin_host("localhost"), "localhost");
  }
}
