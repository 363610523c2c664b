use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::db::{Customer, CustomerDraft};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

const LABELS: [&str; 4] = ["Name", "Email", "Phone", "Notes"];
const NAME: usize = 0;
const EMAIL: usize = 1;
const PHONE: usize = 2;
const NOTES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  Save(CustomerDraft),
  Cancelled,
}

/// Add/edit overlay with name, email, phone and notes fields
#[derive(Debug, Clone, Default)]
pub struct CustomerForm {
  /// Id of the record being edited; `None` when adding
  editing: Option<i64>,
  fields: [TextInput; 4],
  focus: usize,
}

impl CustomerForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn edit(customer: &Customer) -> Self {
    Self {
      editing: Some(customer.id),
      fields: [
        TextInput::with_value(&customer.name),
        TextInput::with_value(&customer.email),
        TextInput::with_value(customer.phone.as_deref().unwrap_or_default()),
        TextInput::with_value(customer.notes.as_deref().unwrap_or_default()),
      ],
      focus: NAME,
    }
  }

  pub fn editing(&self) -> Option<i64> {
    self.editing
  }

  pub fn draft(&self) -> CustomerDraft {
    let optional = |input: &TextInput| Some(input.value().to_string()).filter(|v| !v.trim().is_empty());
    CustomerDraft {
      name: self.fields[NAME].value().to_string(),
      email: self.fields[EMAIL].value().to_string(),
      phone: optional(&self.fields[PHONE]),
      notes: optional(&self.fields[NOTES]),
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Esc => return KeyResult::Event(FormEvent::Cancelled),
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        return KeyResult::Event(FormEvent::Save(self.draft()));
      }
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % LABELS.len();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = (self.focus + LABELS.len() - 1) % LABELS.len();
        return KeyResult::Handled;
      }
      KeyCode::Enter if self.focus == NOTES => {
        return KeyResult::Event(FormEvent::Save(self.draft()));
      }
      KeyCode::Enter => {
        self.focus += 1;
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.fields[self.focus].handle_key(key) {
      InputResult::NotHandled => KeyResult::NotHandled,
      _ => KeyResult::Handled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = (area.width * 70 / 100).clamp(40, 72).min(area.width);
    let height = (LABELS.len() as u16 + 4).min(area.height);
    let popup = Rect::new(
      area.x + (area.width.saturating_sub(width)) / 2,
      area.y + (area.height.saturating_sub(height)) / 2,
      width,
      height,
    );

    frame.render_widget(Clear, popup);

    let title = match self.editing {
      Some(_) => " Edit Customer ",
      None => " Add Customer ",
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));

    let mut lines: Vec<Line> = LABELS
      .iter()
      .zip(self.fields.iter())
      .enumerate()
      .map(|(i, (label, input))| {
        let focused = i == self.focus;
        let label_style = if focused {
          Style::default().fg(Color::Yellow).bold()
        } else {
          Style::default().fg(Color::DarkGray)
        };
        let mut spans = vec![
          Span::styled(format!("{:>6}: ", label), label_style),
          Span::raw(input.value().to_string()),
        ];
        if focused {
          spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        }
        Line::from(spans)
      })
      .collect();

    lines.push(Line::raw(""));
    lines.push(Line::styled(
      " Tab next  Enter/Ctrl-S save  Esc cancel",
      Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(lines).block(block), popup);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(form: &mut CustomerForm, s: &str) {
    for c in s.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_fill_and_save_on_last_field() {
    let mut form = CustomerForm::new();
    type_str(&mut form, "Ada");
    form.handle_key(key(KeyCode::Tab));
    type_str(&mut form, "ada@example.com");
    form.handle_key(key(KeyCode::Enter));
    form.handle_key(key(KeyCode::Enter));

    let KeyResult::Event(FormEvent::Save(draft)) = form.handle_key(key(KeyCode::Enter)) else {
      panic!("expected save on the notes field");
    };
    assert_eq!(draft.name, "Ada");
    assert_eq!(draft.email, "ada@example.com");
    assert_eq!(draft.phone, None);
    assert_eq!(draft.notes, None);
  }

  #[test]
  fn test_ctrl_s_saves_from_any_field() {
    let mut form = CustomerForm::new();
    type_str(&mut form, "Ada");
    let result = form.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
    assert!(matches!(result, KeyResult::Event(FormEvent::Save(d)) if d.name == "Ada"));
  }

  #[test]
  fn test_edit_prefills() {
    let customer = Customer {
      id: 7,
      name: "Grace".to_string(),
      email: "grace@example.com".to_string(),
      phone: Some("555".to_string()),
      notes: None,
      last_updated: None,
    };
    let mut form = CustomerForm::edit(&customer);
    assert_eq!(form.editing(), Some(7));
    assert_eq!(form.draft(), customer.draft());

    form.handle_key(key(KeyCode::BackTab));
    form.handle_key(key(KeyCode::BackTab));
    type_str(&mut form, "-0100");
    assert_eq!(form.draft().phone.as_deref(), Some("555-0100"));
  }

  #[test]
  fn test_escape_cancels() {
    let mut form = CustomerForm::new();
    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancelled)
    );
  }
}
