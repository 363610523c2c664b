pub mod components;
pub mod renderfns;
mod views;

use crate::app::{App, Overlay, Screen};
use ratatui::prelude::*;

const LIST_HINTS: &[(&str, &str)] = &[
  ("j/k", "move"),
  ("a", "add"),
  ("e", "edit"),
  ("d", "delete"),
  ("/", "search"),
  ("r", "reload"),
  (":", "command"),
  ("q", "quit"),
];

const GENERATION_HINTS: &[(&str, &str)] = &[("r", "reload"), (":", "command"), ("q", "back")];

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status line
    ])
    .split(frame.area());

  renderfns::draw_header(
    frame,
    chunks[0],
    app.origin(),
    app.worker_status(),
    app.customer_count(),
  );

  let content = chunks[1];
  let hints = match app.screen() {
    Screen::Customers => {
      views::draw_customer_list(
        frame,
        content,
        &app.visible_customers(),
        app.selected(),
        app.search().query(),
        app.is_loading(),
      );
      app.search().render_overlay(frame, content);
      LIST_HINTS
    }
    Screen::Generations => {
      let (generations, loading) = app.generations();
      views::draw_generations(frame, content, generations, loading);
      GENERATION_HINTS
    }
  };

  match app.overlay() {
    Some(Overlay::Form(form)) => form.render(frame, content),
    Some(Overlay::ConfirmDelete(customer)) => views::draw_confirm_delete(frame, content, customer),
    None => {}
  }

  app.command().render_overlay(frame, content);

  let message = app.status().map(|s| (s.text.as_str(), s.is_error));
  renderfns::draw_footer(frame, chunks[2], message, hints);
}
