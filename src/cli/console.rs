use super::Workspace;
use crate::state::Store;
use crate::ui::{render, Cursor};
use crate::Result;
use colored::Colorize;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use std::io::{BufRead, IsTerminal, Write};

/// One line of console input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    NextFeature,
    PrevFeature,
    NextCategory,
    PrevCategory,
    Verify,
    Unverify,
    /// Toggle a checklist item (1-based)
    Toggle(usize),
    Check,
    Refresh,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let command = match parts.next()? {
            "n" => Self::NextFeature,
            "p" => Self::PrevFeature,
            "]" => Self::NextCategory,
            "[" => Self::PrevCategory,
            "v" => Self::Verify,
            "u" => Self::Unverify,
            "t" => Self::Toggle(parts.next()?.parse().ok()?),
            "c" => Self::Check,
            "r" => Self::Refresh,
            "q" => Self::Quit,
            _ => return None,
        };
        Some(command)
    }
}

/// Console state between commands
struct Session<'w> {
    workspace: &'w Workspace,
    store: Store,
    cursor: Cursor,
    actor: String,
}

impl<'w> Session<'w> {
    fn open(workspace: &'w Workspace) -> Result<Self> {
        Ok(Self {
            workspace,
            store: workspace.open_store()?,
            cursor: Cursor::default(),
            actor: workspace.config.actor(),
        })
    }

    fn screen(&self) -> String {
        let groups = self.store.document().grouped(&self.workspace.config.categories);
        render(
            self.store.document(),
            &groups,
            self.cursor,
            self.store.project_root(),
        )
    }

    /// Apply one command; returns a status line to show under the screen
    fn apply(&mut self, command: ConsoleCommand) -> Result<Option<String>> {
        let groups = self.store.document().grouped(&self.workspace.config.categories);
        let selected = self.cursor.selected(&groups).map(str::to_string);

        match command {
            ConsoleCommand::NextFeature => self.cursor = self.cursor.next_feature(&groups),
            ConsoleCommand::PrevFeature => self.cursor = self.cursor.prev_feature(&groups),
            ConsoleCommand::NextCategory => self.cursor = self.cursor.next_category(&groups),
            ConsoleCommand::PrevCategory => self.cursor = self.cursor.prev_category(&groups),
            ConsoleCommand::Verify => {
                let Some(id) = selected else { return Ok(None) };
                self.store.state_machine().verify(&id, &self.actor)?;
                self.store.save()?;
                return Ok(Some(format!("Verified '{}'", id)));
            }
            ConsoleCommand::Unverify => {
                let Some(id) = selected else { return Ok(None) };
                self.store.state_machine().unverify(&id, &self.actor, None)?;
                self.store.save()?;
                return Ok(Some(format!("Unverified '{}'", id)));
            }
            ConsoleCommand::Toggle(number) => {
                let Some(id) = selected else { return Ok(None) };
                let completed = self
                    .store
                    .document()
                    .feature(&id)
                    .and_then(|f| f.checklist.get(number.wrapping_sub(1)))
                    .map(|item| item.completed)
                    .unwrap_or(false);
                self.store.state_machine().set_checklist_item(
                    &id,
                    number.wrapping_sub(1),
                    !completed,
                    &self.actor,
                )?;
                self.store.save()?;
                return Ok(Some(format!("Toggled item {} of '{}'", number, id)));
            }
            ConsoleCommand::Check => {
                let demoted = self.store.state_machine().sweep();
                if demoted.is_empty() {
                    return Ok(Some("No changes detected".to_string()));
                }
                self.store.save()?;
                return Ok(Some(format!("Invalidated: {}", demoted.join(", "))));
            }
            ConsoleCommand::Refresh => {
                self.store = self.workspace.open_store()?;
            }
            ConsoleCommand::Quit => {}
        }
        Ok(None)
    }
}

/// `console`: blocking read loop over stdin
pub fn run(workspace: &Workspace) -> Result<()> {
    let stdin = std::io::stdin();
    let clear = std::io::stdout().is_terminal();
    session(workspace, stdin.lock(), clear)
}

fn session(workspace: &Workspace, input: impl BufRead, clear: bool) -> Result<()> {
    let mut session = Session::open(workspace)?;
    let mut stdout = std::io::stdout();
    let mut status: Option<String> = None;
    let mut lines = input.lines();

    loop {
        if clear {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        print!("{}", session.screen());
        if let Some(message) = status.take() {
            println!("{}", message.yellow());
        }
        print!("> ");
        stdout.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        let Some(command) = ConsoleCommand::parse(&line) else {
            if !line.trim().is_empty() {
                status = Some(format!("Unknown command: {}", line.trim()));
            }
            continue;
        };
        if command == ConsoleCommand::Quit {
            break;
        }

        // Errors are shown and the loop keeps going
        status = match session.apply(command) {
            Ok(message) => message,
            Err(e) => Some(format!("Error: {}", e)),
        };
    }

    println!();
    Ok(())
}
