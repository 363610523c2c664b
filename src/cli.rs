//! Non-interactive subcommands for scripting the store and the worker.

use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::db::{Customer, CustomerDraft, CustomerStore, Database, StoreError};
use crate::http::{Method, Request};
use crate::worker::{
  CacheWorker, ClickOutcome, ClientRegistry, FetchDisposition, Registration, Services, WorkerHost,
};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Manage customer records
  #[command(subcommand)]
  Customer(CustomerCommand),

  /// Drive the offline cache worker
  #[command(subcommand)]
  Worker(WorkerCommand),
}

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
  /// Add a customer
  Add(AddArgs),

  /// List every customer
  List(JsonArg),

  /// Show one customer
  Get {
    id: i64,
    #[arg(long)]
    json: bool,
  },

  /// Change fields of an existing customer
  Edit(EditArgs),

  /// Delete a customer
  Delete {
    id: i64,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
  },

  /// Find customers by name, email or phone
  Search {
    term: String,
    #[arg(long)]
    json: bool,
  },
}

#[derive(Args, Debug)]
pub struct JsonArg {
  /// Print JSON instead of a table
  #[arg(long)]
  pub json: bool,
}

#[derive(Args, Debug)]
pub struct AddArgs {
  #[arg(long)]
  pub name: String,
  #[arg(long)]
  pub email: String,
  #[arg(long)]
  pub phone: Option<String>,
  #[arg(long)]
  pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
  pub id: i64,
  #[arg(long)]
  pub name: Option<String>,
  #[arg(long)]
  pub email: Option<String>,
  /// Pass an empty string to clear
  #[arg(long)]
  pub phone: Option<String>,
  /// Pass an empty string to clear
  #[arg(long)]
  pub notes: Option<String>,
}

impl EditArgs {
  fn apply(self, mut draft: CustomerDraft) -> CustomerDraft {
    if let Some(name) = self.name {
      draft.name = name;
    }
    if let Some(email) = self.email {
      draft.email = email;
    }
    if self.phone.is_some() {
      draft.phone = self.phone;
    }
    if self.notes.is_some() {
      draft.notes = self.notes;
    }
    draft
  }
}

#[derive(Subcommand, Debug)]
pub enum WorkerCommand {
  /// Install and activate the configured worker version
  Install,

  /// Show the configured version and what is cached for it
  Status,

  /// List cache generations and their entries
  Generations,

  /// Request a URL through the worker
  Fetch {
    /// Absolute URL, or a path resolved against the origin
    url: String,
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,
    /// Write the body here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Deliver a push message (read from stdin when PAYLOAD is omitted)
  Push {
    payload: Option<String>,
    /// Click the resulting notification
    #[arg(long)]
    click: bool,
  },
}

pub async fn run(command: Command, config: &Config) -> Result<()> {
  match command {
    Command::Customer(cmd) => run_customer(cmd, config).await,
    Command::Worker(cmd) => run_worker(cmd, config).await,
  }
}

// ============================================================================
// Customers
// ============================================================================

fn open_store(config: &Config) -> Result<CustomerStore> {
  let db = Database::open(&config.customers_db_path()?)?;
  Ok(CustomerStore::new(db))
}

async fn run_customer(cmd: CustomerCommand, config: &Config) -> Result<()> {
  let store = open_store(config)?;

  match cmd {
    CustomerCommand::Add(args) => {
      let customer = store
        .add(CustomerDraft {
          name: args.name,
          email: args.email,
          phone: args.phone,
          notes: args.notes,
        })
        .await?;
      info!(id = customer.id, "Added customer");
      println!("Added customer {} ({})", customer.id, customer.name);
    }
    CustomerCommand::List(JsonArg { json }) => {
      print_customers(&store.get_all().await?, json)?;
    }
    CustomerCommand::Get { id, json } => {
      let customer = store.get(id).await?.ok_or(StoreError::NotFound(id))?;
      if json {
        println!("{}", serde_json::to_string_pretty(&customer)?);
      } else {
        print_details(&customer);
      }
    }
    CustomerCommand::Edit(args) => {
      let id = args.id;
      let existing = store.get(id).await?.ok_or(StoreError::NotFound(id))?;
      let customer = store.update(id, args.apply(existing.draft())).await?;
      info!(id, "Updated customer");
      println!("Updated customer {} ({})", customer.id, customer.name);
    }
    CustomerCommand::Delete { id, yes } => {
      let customer = store.get(id).await?.ok_or(StoreError::NotFound(id))?;
      if !yes && !confirm(&format!("Delete {} <{}>?", customer.name, customer.email))? {
        println!("Cancelled");
        return Ok(());
      }
      store.delete(id).await?;
      info!(id, "Deleted customer");
      println!("Deleted customer {}", id);
    }
    CustomerCommand::Search { term, json } => {
      print_customers(&store.search(&term).await?, json)?;
    }
  }

  Ok(())
}

fn print_customers(customers: &[Customer], json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(customers)?);
    return Ok(());
  }

  if customers.is_empty() {
    println!("No customers found. Add your first customer!");
    return Ok(());
  }

  println!("{:>5}  {:<24}  {:<32}  PHONE", "ID", "NAME", "EMAIL");
  for c in customers {
    println!(
      "{:>5}  {:<24}  {:<32}  {}",
      c.id,
      c.name,
      c.email,
      c.phone.as_deref().unwrap_or("-")
    );
  }
  Ok(())
}

fn print_details(customer: &Customer) {
  println!("ID:      {}", customer.id);
  println!("Name:    {}", customer.name);
  println!("Email:   {}", customer.email);
  println!("Phone:   {}", customer.phone.as_deref().unwrap_or("-"));
  println!("Notes:   {}", customer.notes.as_deref().unwrap_or("-"));
  if let Some(ts) = customer.last_updated {
    println!("Updated: {}", ts.format("%Y-%m-%d %H:%M:%S UTC"));
  }
}

fn confirm(prompt: &str) -> Result<bool> {
  print!("{} [y/N] ", prompt);
  std::io::stdout().flush()?;
  let mut answer = String::new();
  std::io::stdin().read_line(&mut answer)?;
  Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

// ============================================================================
// Worker
// ============================================================================

async fn run_worker(cmd: WorkerCommand, config: &Config) -> Result<()> {
  // The terminal stands in for a browser, so opening a window always succeeds
  let services = Services::from_config(config, Arc::new(ClientRegistry::new(true)))?;
  let network = services.network.clone();
  let worker = CacheWorker::new(config.worker.clone(), config.scope()?, services)?;
  let mut host = WorkerHost::new();

  match cmd {
    WorkerCommand::Install => {
      if let Some(registration) = host.register(worker).await? {
        print_registration(&registration);
      }
    }
    WorkerCommand::Status => {
      let storage = worker.storage().clone();
      println!("Version: {}", worker.cache_name());
      println!("Scope:   {}", worker.scope());
      if worker.restore()? {
        println!("State:   {}", worker.state());
        println!(
          "Cached:  {} entries, {} bytes",
          storage.entries(worker.cache_name())?.len(),
          storage.size(worker.cache_name())?
        );
      } else {
        println!("State:   not installed (run `custmgr worker install`)");
      }
      let stale: Vec<String> = storage
        .keys()?
        .into_iter()
        .filter(|k| k != worker.cache_name())
        .collect();
      if !stale.is_empty() {
        println!("Stale:   {}", stale.join(", "));
      }
    }
    WorkerCommand::Generations => {
      let storage = worker.storage().clone();
      let names = storage.keys()?;
      if names.is_empty() {
        println!("No cache generations");
      }
      for name in names {
        let marker = if name == worker.cache_name() { "*" } else { " " };
        println!("{} {} ({} bytes)", marker, name, storage.size(&name)?);
        for url in storage.entries(&name)? {
          println!("    {}", url);
        }
      }
    }
    WorkerCommand::Fetch {
      url,
      method,
      output,
    } => {
      let method: Method = method.parse()?;
      let url = worker
        .scope()
        .join(&url)
        .map_err(|e| eyre!("Invalid URL '{}': {}", url, e))?;
      let request = Request::new(method, url);

      host.resume(worker).await?;
      let served = match host.fetch(&request).await {
        FetchDisposition::Respond(served) => Some(served),
        FetchDisposition::Passthrough => None,
        FetchDisposition::Failed => {
          host.idle().await;
          return Err(eyre!("Offline and {} is not cached", request.url));
        }
      };
      host.idle().await;

      let (response, source) = match served {
        Some(served) => (served.response, served.source.label()),
        None => (network.fetch(&request).await?, "network, not intercepted"),
      };

      eprintln!(
        "{} {} {} ({}, from {})",
        request.method,
        response.url,
        response.status,
        response.kind.as_str(),
        source
      );

      match output {
        Some(path) => std::fs::write(&path, &response.body)
          .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?,
        None => std::io::stdout().write_all(&response.body)?,
      }
    }
    WorkerCommand::Push { payload, click } => {
      let data = match payload {
        Some(p) => p.into_bytes(),
        None => {
          let mut buf = Vec::new();
          std::io::stdin().read_to_end(&mut buf)?;
          buf
        }
      };

      host.resume(worker).await?;
      let Some(notification) = host.push(Some(&data)).await else {
        return Err(eyre!("No active worker to receive the push message"));
      };

      if click {
        match host.notification_click(&notification).await {
          ClickOutcome::Closed => println!("Notification closed"),
          ClickOutcome::Focused(id) => println!("Focused window {}", id),
          ClickOutcome::Opened(window) => println!("Opened window {} at {}", window.id, window.url),
        }
      }
      host.idle().await;
    }
  }

  Ok(())
}

fn print_registration(registration: &Registration) {
  let install = &registration.install;
  println!("Installed {}", registration.cache_name);
  for url in &install.cached {
    println!("  cached  {}", url);
  }
  for failed in &install.failed {
    println!("  failed  {} ({})", failed.url, failed.reason);
  }
  for name in &registration.activate.evicted {
    println!("  evicted {}", name);
  }
  println!(
    "Activated {} ({} of {} assets cached, {} windows claimed)",
    registration.cache_name,
    install.cached.len(),
    install.cached.len() + install.failed.len(),
    registration.activate.claimed
  );
}
