/// `:` commands and autocomplete

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

pub const COMMANDS: &[Command] = &[
  Command {
    name: "customers",
    aliases: &["c", "list", "ls"],
    description: "Show all customers",
  },
  Command {
    name: "add",
    aliases: &["a", "new"],
    description: "Add a customer",
  },
  Command {
    name: "sync",
    aliases: &["s", "refresh", "install"],
    description: "Re-install the offline app shell",
  },
  Command {
    name: "generations",
    aliases: &["g", "gen", "cache"],
    description: "Show cache generations",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit custmgr",
  },
];

/// Commands matching `input`, best match first.
///
/// Ranking: exact name, exact alias, name prefix, alias prefix, then
/// substring of name or alias.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let rank = |cmd: &Command| -> Option<u8> {
    if cmd.name == input {
      Some(0)
    } else if cmd.aliases.contains(&input.as_str()) {
      Some(1)
    } else if cmd.name.starts_with(&input) {
      Some(2)
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input)) {
      Some(3)
    } else if cmd.name.contains(&input) {
      Some(4)
    } else if cmd.aliases.iter().any(|a| a.contains(&input)) {
      Some(5)
    } else {
      None
    }
  };

  let mut matches: Vec<(&'static Command, u8)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd).map(|r| (cmd, r)))
    .collect();

  // Stable, so ties keep declaration order
  matches.sort_by_key(|(_, r)| *r);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
