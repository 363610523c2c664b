//! Customer records: add/get/put/delete/get_all over SQLite.
//!
//! Every operation runs on the blocking pool and resolves to a result, so
//! callers in the UI or CLI simply `.await` them.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::Database;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("{0} is required")]
  Missing(&'static str),

  #[error("A customer with email {0} already exists")]
  DuplicateEmail(String),

  #[error("Customer {0} not found")]
  NotFound(i64),

  #[error("Database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("Customer database lock poisoned")]
  LockPoisoned,

  #[error("Store task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

/// A stored customer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
  pub id: i64,
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
  pub notes: Option<String>,
  pub last_updated: Option<DateTime<Utc>>,
}

impl Customer {
  /// Case-insensitive substring match on name and email; phone is matched
  /// as written.
  pub fn matches(&self, term: &str) -> bool {
    let term = term.to_lowercase();
    self.name.to_lowercase().contains(&term)
      || self.email.to_lowercase().contains(&term)
      || self.phone.as_deref().is_some_and(|p| p.contains(&term))
  }

  /// The editable fields of this record.
  pub fn draft(&self) -> CustomerDraft {
    CustomerDraft {
      name: self.name.clone(),
      email: self.email.clone(),
      phone: self.phone.clone(),
      notes: self.notes.clone(),
    }
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    let last_updated: Option<String> = row.get(5)?;
    Ok(Self {
      id: row.get(0)?,
      name: row.get(1)?,
      email: row.get(2)?,
      phone: row.get(3)?,
      notes: row.get(4)?,
      last_updated: last_updated
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc)),
    })
  }
}

/// User-entered fields for a new or edited customer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerDraft {
  pub name: String,
  pub email: String,
  pub phone: Option<String>,
  pub notes: Option<String>,
}

impl CustomerDraft {
  /// Trim every field, drop blank optionals, require name and email.
  fn normalized(self) -> Result<Self, StoreError> {
    let name = self.name.trim().to_string();
    let email = self.email.trim().to_string();
    if name.is_empty() {
      return Err(StoreError::Missing("Name"));
    }
    if email.is_empty() {
      return Err(StoreError::Missing("Email"));
    }

    let optional = |v: Option<String>| {
      v.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    };

    Ok(Self {
      name,
      email,
      phone: optional(self.phone),
      notes: optional(self.notes),
    })
  }
}

/// Async handle over the customers table. Cheap to clone.
#[derive(Clone)]
pub struct CustomerStore {
  conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = "SELECT id, name, email, phone, notes, last_updated FROM customers";

impl CustomerStore {
  pub fn new(db: Database) -> Self {
    Self {
      conn: Arc::new(Mutex::new(db.into_connection())),
    }
  }

  async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
  {
    let conn = Arc::clone(&self.conn);
    tokio::task::spawn_blocking(move || {
      let conn = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
      op(&conn)
    })
    .await?
  }

  /// Insert a new customer; the id is assigned by the database.
  pub async fn add(&self, draft: CustomerDraft) -> Result<Customer, StoreError> {
    let draft = draft.normalized()?;
    self
      .run(move |conn| {
        let now = Utc::now();
        conn
          .execute(
            "INSERT INTO customers (name, email, phone, notes, last_updated)
             VALUES (?, ?, ?, ?, ?)",
            params![draft.name, draft.email, draft.phone, draft.notes, now.to_rfc3339()],
          )
          .map_err(|e| write_error(e, &draft.email))?;

        Ok(Customer {
          id: conn.last_insert_rowid(),
          name: draft.name,
          email: draft.email,
          phone: draft.phone,
          notes: draft.notes,
          last_updated: Some(now),
        })
      })
      .await
  }

  pub async fn get(&self, id: i64) -> Result<Option<Customer>, StoreError> {
    self
      .run(move |conn| {
        let customer = conn
          .query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Customer::from_row,
          )
          .optional()?;
        Ok(customer)
      })
      .await
  }

  /// Insert or replace the record with `customer.id`.
  pub async fn put(&self, customer: Customer) -> Result<Customer, StoreError> {
    let id = customer.id;
    let draft = customer.draft().normalized()?;
    self
      .run(move |conn| {
        let now = Utc::now();
        conn
          .execute(
            "INSERT INTO customers (id, name, email, phone, notes, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               email = excluded.email,
               phone = excluded.phone,
               notes = excluded.notes,
               last_updated = excluded.last_updated",
            params![id, draft.name, draft.email, draft.phone, draft.notes, now.to_rfc3339()],
          )
          .map_err(|e| write_error(e, &draft.email))?;

        Ok(Customer {
          id,
          name: draft.name,
          email: draft.email,
          phone: draft.phone,
          notes: draft.notes,
          last_updated: Some(now),
        })
      })
      .await
  }

  /// Apply `draft` to an existing record.
  pub async fn update(&self, id: i64, draft: CustomerDraft) -> Result<Customer, StoreError> {
    if self.get(id).await?.is_none() {
      return Err(StoreError::NotFound(id));
    }
    self
      .put(Customer {
        id,
        name: draft.name,
        email: draft.email,
        phone: draft.phone,
        notes: draft.notes,
        last_updated: None,
      })
      .await
  }

  /// Returns false when there was no such record.
  pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
    self
      .run(move |conn| {
        let removed = conn.execute("DELETE FROM customers WHERE id = ?", params![id])?;
        Ok(removed > 0)
      })
      .await
  }

  /// Every customer, ordered by id.
  pub async fn get_all(&self) -> Result<Vec<Customer>, StoreError> {
    self.run(|conn| query_all(conn)).await
  }

  pub async fn search(&self, term: &str) -> Result<Vec<Customer>, StoreError> {
    let term = term.to_string();
    self
      .run(move |conn| {
        Ok(
          query_all(conn)?
            .into_iter()
            .filter(|c| c.matches(&term))
            .collect(),
        )
      })
      .await
  }
}

fn query_all(conn: &Connection) -> Result<Vec<Customer>, StoreError> {
  let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))?;
  let customers = stmt
    .query_map([], Customer::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(customers)
}

fn write_error(e: rusqlite::Error, email: &str) -> StoreError {
  match &e {
    rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
      StoreError::DuplicateEmail(email.to_string())
    }
    _ => StoreError::Database(e),
  }
}
