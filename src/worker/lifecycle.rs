use color_eyre::{eyre::eyre, Result};
use std::fmt;

/// Lifecycle state of a worker version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
  /// Constructed, not yet installing
  #[default]
  Parsed,
  Installing,
  /// Installed and waiting to take over
  Installed,
  Activating,
  /// Serving fetch, push and notification events
  Activated,
  /// Replaced by a newer version
  Redundant,
}

impl WorkerState {
  pub fn can_transition_to(self, next: WorkerState) -> bool {
    use WorkerState::*;
    match (self, next) {
      (Parsed, Installing) => true,
      (Installing, Installed) => true,
      (Installed, Activating) => true,
      (Activating, Activated) => true,
      // Adopting an existing generation skips the install steps
      (Parsed, Activated) => true,
      (Redundant, _) => false,
      (_, Redundant) => true,
      _ => false,
    }
  }

  /// Move to `next`, or explain why that is not allowed.
  pub fn transition(&mut self, next: WorkerState) -> Result<()> {
    if !self.can_transition_to(next) {
      return Err(eyre!("Invalid worker transition: {} -> {}", self, next));
    }
    *self = next;
    Ok(())
  }

  pub fn is_active(self) -> bool {
    self == WorkerState::Activated
  }

  pub fn label(self) -> &'static str {
    match self {
      WorkerState::Parsed => "parsed",
      WorkerState::Installing => "installing",
      WorkerState::Installed => "installed",
      WorkerState::Activating => "activating",
      WorkerState::Activated => "activated",
      WorkerState::Redundant => "redundant",
    }
  }
}

impl fmt::Display for WorkerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_happy_path() {
    let mut state = WorkerState::default();
    state.transition(WorkerState::Installing).unwrap();
    state.transition(WorkerState::Installed).unwrap();
    state.transition(WorkerState::Activating).unwrap();
    state.transition(WorkerState::Activated).unwrap();
    assert!(state.is_active());
    state.transition(WorkerState::Redundant).unwrap();
    assert!(!state.is_active());
  }

  #[test]
  fn test_cannot_skip_install() {
    let mut state = WorkerState::Parsed;
    assert!(state.transition(WorkerState::Activating).is_err());
    assert_eq!(state, WorkerState::Parsed);
  }

  #[test]
  fn test_cannot_install_twice() {
    let mut state = WorkerState::Installed;
    assert!(state.transition(WorkerState::Installing).is_err());
  }

  #[test]
  fn test_redundant_is_terminal() {
    let mut state = WorkerState::Redundant;
    assert!(state.transition(WorkerState::Activated).is_err());
    assert!(state.transition(WorkerState::Redundant).is_err());
  }

  #[test]
  fn test_restore_from_parsed() {
    let mut state = WorkerState::Parsed;
    state.transition(WorkerState::Activated).unwrap();
    assert!(state.is_active());
  }
}
