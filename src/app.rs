use crate::cache::CacheStorage;
use crate::config::Config;
use crate::db::{Customer, CustomerDraft, CustomerStore};
use crate::event::{Event, EventHandler, GenerationSummary, ShellEvent, StoreEvent};
use crate::ui;
use crate::ui::components::{
  CommandEvent, CommandInput, CustomerForm, FormEvent, KeyResult, SearchEvent, SearchInput,
};
use crate::worker::{CacheWorker, ClientRegistry, WorkerHost};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// Which list fills the main area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  Customers,
  Generations,
}

/// Modal on top of the customer list
#[derive(Debug)]
pub enum Overlay {
  Form(CustomerForm),
  ConfirmDelete(Customer),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
  pub text: String,
  pub is_error: bool,
}

/// Main application state
pub struct App {
  config: Config,
  store: CustomerStore,
  host: Arc<Mutex<WorkerHost>>,

  screen: Screen,
  customers: Vec<Customer>,
  loading: bool,
  /// Index into the filtered list
  selected: usize,
  search: SearchInput,
  command: CommandInput,
  overlay: Option<Overlay>,

  generations: Vec<GenerationSummary>,
  generations_loading: bool,

  worker_status: String,
  status: Option<StatusMessage>,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config, store: CustomerStore) -> Self {
    let (tx, _rx) = mpsc::unbounded_channel();

    Self {
      config,
      store,
      host: Arc::new(Mutex::new(WorkerHost::new())),
      screen: Screen::Customers,
      customers: Vec::new(),
      loading: true,
      selected: 0,
      search: SearchInput::new(),
      command: CommandInput::new(),
      overlay: None,
      generations: Vec::new(),
      generations_loading: false,
      worker_status: "worker starting".to_string(),
      status: None,
      event_tx: tx,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    self.start_worker(false);
    self.load_customers();

    let result = self.main_loop(&mut terminal, &mut events).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    // Let pending cache writes land before the process exits
    self.host.lock().await.idle().await;

    result
  }

  async fn main_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  // ==========================================================================
  // Background work
  // ==========================================================================

  fn send(tx: &mpsc::UnboundedSender<Event>, event: Event) {
    // Receiver is gone only while shutting down
    let _ = tx.send(event);
  }

  /// Bring the cache worker up: restore the existing generation, or with
  /// `reinstall` fetch the whole app shell again.
  fn start_worker(&mut self, reinstall: bool) {
    self.worker_status = if reinstall {
      "worker installing".to_string()
    } else {
      "worker starting".to_string()
    };

    let config = self.config.clone();
    let host = self.host.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let event = match bring_up_worker(&config, &host, reinstall).await {
        Ok(event) => event,
        Err(e) => {
          warn!(error = %e, "Cache worker failed to start");
          ShellEvent::Failed(e.to_string())
        }
      };
      Self::send(&tx, Event::Shell(event));
    });
  }

  fn load_generations(&mut self) {
    self.screen = Screen::Generations;
    self.generations_loading = true;

    let host = self.host.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let event = match generation_summaries(&host).await {
        Ok(list) => ShellEvent::Generations(list),
        Err(e) => ShellEvent::Failed(e.to_string()),
      };
      Self::send(&tx, Event::Shell(event));
    });
  }

  fn load_customers(&mut self) {
    self.loading = true;
    let store = self.store.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let event = match store.get_all().await {
        Ok(customers) => StoreEvent::Loaded(customers),
        Err(e) => StoreEvent::Failed(format!("Failed to load customers: {}", e)),
      };
      Self::send(&tx, Event::Store(event));
    });
  }

  fn save_customer(&mut self, editing: Option<i64>, draft: CustomerDraft) {
    let store = self.store.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let saved = match editing {
        Some(id) => store.update(id, draft).await,
        None => store.add(draft).await,
      };
      let event = match saved {
        Ok(customer) => StoreEvent::Saved(customer),
        Err(e) => StoreEvent::Failed(e.to_string()),
      };
      Self::send(&tx, Event::Store(event));
    });
  }

  fn delete_customer(&mut self, id: i64) {
    let store = self.store.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let event = match store.delete(id).await {
        Ok(_) => StoreEvent::Deleted(id),
        Err(e) => StoreEvent::Failed(format!("Failed to delete customer: {}", e)),
      };
      Self::send(&tx, Event::Store(event));
    });
  }

  // ==========================================================================
  // Events
  // ==========================================================================

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {}
      Event::Store(event) => self.handle_store_event(event),
      Event::Shell(event) => self.handle_shell_event(event),
    }
  }

  fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
    self.status = Some(StatusMessage {
      text: text.into(),
      is_error,
    });
  }

  fn handle_store_event(&mut self, event: StoreEvent) {
    match event {
      StoreEvent::Loaded(customers) => {
        self.customers = customers;
        self.loading = false;
        self.clamp_selection();
      }
      StoreEvent::Saved(customer) => {
        info!(id = customer.id, "Saved customer");
        if matches!(self.overlay, Some(Overlay::Form(_))) {
          self.overlay = None;
        }
        let id = customer.id;
        match self.customers.iter_mut().find(|c| c.id == id) {
          Some(existing) => *existing = customer,
          None => {
            self.customers.push(customer);
            self.customers.sort_by_key(|c| c.id);
          }
        }
        if let Some(idx) = self.visible_customers().iter().position(|c| c.id == id) {
          self.selected = idx;
        }
        self.set_status("Customer saved successfully", false);
      }
      StoreEvent::Deleted(id) => {
        self.customers.retain(|c| c.id != id);
        self.clamp_selection();
        self.set_status("Customer deleted successfully", false);
      }
      StoreEvent::Failed(message) => {
        self.loading = false;
        self.set_status(message, true);
      }
    }
  }

  fn handle_shell_event(&mut self, event: ShellEvent) {
    match event {
      ShellEvent::Ready {
        cache_name,
        registration,
      } => {
        self.worker_status = format!("offline ready ({})", cache_name);
        match registration {
          Some(reg) => {
            let total = reg.install.cached.len() + reg.install.failed.len();
            let text = format!(
              "Installed {}: {} of {} assets cached",
              reg.cache_name,
              reg.install.cached.len(),
              total
            );
            self.set_status(text, !reg.install.is_complete());
          }
          None => self.set_status(format!("Using cached app shell {}", cache_name), false),
        }
      }
      ShellEvent::Generations(list) => {
        self.generations = list;
        self.generations_loading = false;
      }
      ShellEvent::Failed(message) => {
        self.worker_status = "worker offline".to_string();
        self.generations_loading = false;
        self.set_status(format!("Cache worker: {}", message), true);
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    self.status = None;

    if let Some(overlay) = self.overlay.take() {
      self.overlay = self.handle_overlay_key(overlay, key);
      return;
    }

    match self.command.handle_key(key) {
      KeyResult::Event(CommandEvent::Run(cmd)) => return self.execute_command(cmd.name),
      KeyResult::Event(CommandEvent::Unknown(typed)) => {
        return self.set_status(format!("Unknown command: {}", typed), true);
      }
      KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    if self.screen == Screen::Customers {
      match self.search.handle_key(key) {
        KeyResult::Event(SearchEvent::Changed(_)) => {
          self.selected = 0;
          return;
        }
        KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    match self.screen {
      Screen::Customers => self.handle_list_key(key),
      Screen::Generations => match key.code {
        KeyCode::Char('q') | KeyCode::Esc => self.screen = Screen::Customers,
        KeyCode::Char('r') => self.load_generations(),
        _ => {}
      },
    }
  }

  /// Returns the overlay to keep showing, if any.
  fn handle_overlay_key(&mut self, overlay: Overlay, key: KeyEvent) -> Option<Overlay> {
    match overlay {
      Overlay::Form(mut form) => match form.handle_key(key) {
        KeyResult::Event(FormEvent::Cancelled) => None,
        KeyResult::Event(FormEvent::Save(draft)) => {
          // The form closes once the store confirms
          self.save_customer(form.editing(), draft);
          Some(Overlay::Form(form))
        }
        KeyResult::Handled | KeyResult::NotHandled => Some(Overlay::Form(form)),
      },
      Overlay::ConfirmDelete(customer) => match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
          self.delete_customer(customer.id);
          None
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => None,
        _ => Some(Overlay::ConfirmDelete(customer)),
      },
    }
  }

  fn handle_list_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Esc => self.search.clear(),
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
      KeyCode::Char('r') => self.load_customers(),
      KeyCode::Char('a') => self.overlay = Some(Overlay::Form(CustomerForm::new())),
      KeyCode::Char('e') | KeyCode::Enter => {
        if let Some(customer) = self.selected_customer() {
          self.overlay = Some(Overlay::Form(CustomerForm::edit(customer)));
        }
      }
      KeyCode::Char('d') => {
        if let Some(customer) = self.selected_customer() {
          self.overlay = Some(Overlay::ConfirmDelete(customer.clone()));
        }
      }
      _ => {}
    }
  }

  fn execute_command(&mut self, name: &str) {
    match name {
      "customers" => {
        self.screen = Screen::Customers;
        self.load_customers();
      }
      "add" => {
        self.screen = Screen::Customers;
        self.overlay = Some(Overlay::Form(CustomerForm::new()));
      }
      "sync" => self.start_worker(true),
      "generations" => self.load_generations(),
      "quit" => self.should_quit = true,
      other => self.set_status(format!("Unknown command: {}", other), true),
    }
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.visible_customers().len();
    if len > 0 {
      self.selected = (self.selected as i32 + delta).rem_euclid(len as i32) as usize;
    }
  }

  fn clamp_selection(&mut self) {
    let len = self.visible_customers().len();
    self.selected = self.selected.min(len.saturating_sub(1));
  }

  fn selected_customer(&self) -> Option<&Customer> {
    self.visible_customers().get(self.selected).copied()
  }

  // Accessors for UI rendering

  /// Customers matching the search filter, in id order
  pub fn visible_customers(&self) -> Vec<&Customer> {
    let term = self.search.query();
    self.customers.iter().filter(|c| c.matches(term)).collect()
  }

  pub fn customer_count(&self) -> usize {
    self.customers.len()
  }

  pub fn screen(&self) -> Screen {
    self.screen
  }

  pub fn selected(&self) -> usize {
    self.selected
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn search(&self) -> &SearchInput {
    &self.search
  }

  pub fn command(&self) -> &CommandInput {
    &self.command
  }

  pub fn overlay(&self) -> Option<&Overlay> {
    self.overlay.as_ref()
  }

  pub fn generations(&self) -> (&[GenerationSummary], bool) {
    (&self.generations, self.generations_loading)
  }

  pub fn origin(&self) -> &str {
    &self.config.origin
  }

  pub fn worker_status(&self) -> &str {
    &self.worker_status
  }

  pub fn status(&self) -> Option<&StatusMessage> {
    self.status.as_ref()
  }
}

async fn bring_up_worker(
  config: &Config,
  host: &Mutex<WorkerHost>,
  reinstall: bool,
) -> Result<ShellEvent> {
  // No browser windows to open from a terminal UI
  let worker = CacheWorker::from_config(config, Arc::new(ClientRegistry::new(false)))?;
  let cache_name = worker.cache_name().to_string();

  let mut host = host.lock().await;
  let registration = if reinstall {
    // Same version again: install into a fresh host so the shell is refetched
    host.idle().await;
    let mut fresh = WorkerHost::new();
    let registration = fresh.register(worker).await?;
    if let Some(previous) = host.active() {
      previous.retire();
    }
    *host = fresh;
    registration
  } else {
    host.resume(worker).await?
  };

  Ok(ShellEvent::Ready {
    cache_name,
    registration,
  })
}

async fn generation_summaries(host: &Mutex<WorkerHost>) -> Result<Vec<GenerationSummary>> {
  let (storage, active) = {
    let host = host.lock().await;
    let worker = host
      .active()
      .ok_or_else(|| color_eyre::eyre::eyre!("not active yet"))?;
    (worker.storage().clone(), worker.cache_name().to_string())
  };

  tokio::task::spawn_blocking(move || summarize(storage.as_ref(), &active)).await?
}

fn summarize(storage: &dyn CacheStorage, active: &str) -> Result<Vec<GenerationSummary>> {
  storage
    .keys()?
    .into_iter()
    .map(|name| {
      Ok(GenerationSummary {
        entries: storage.entries(&name)?.len(),
        bytes: storage.size(&name)?,
        active: name == active,
        name,
      })
    })
    .collect()
}
