//! Address dialog state, rendering and event loop.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use talkmeta_core::schema::SOURCE_ADDRESS_PROPERTY;
use talkmeta_core::{AddressEditor, EditOutcome, parse_source_address};
use talkmeta_shared::{Result, TalkMetaError};
use tracing::debug;

use crate::widgets::{centered_rect, status_bar, text_input};

/// State of the address dialog.
pub(crate) struct AddressDialog {
    /// Value being edited.
    input: String,
    /// Value the dialog was opened with.
    original: String,
    /// Set once the user accepts or cancels.
    outcome: Option<EditOutcome>,
}

impl AddressDialog {
    pub(crate) fn new(current: &str) -> Self {
        Self {
            input: current.to_string(),
            original: current.to_string(),
            outcome: None,
        }
    }

    pub(crate) fn outcome(&self) -> Option<&EditOutcome> {
        self.outcome.as_ref()
    }

    fn into_outcome(self) -> EditOutcome {
        self.outcome.unwrap_or(EditOutcome::Cancelled)
    }

    /// One line describing the current input.
    pub(crate) fn hint(&self) -> &'static str {
        let value = self.input.trim();
        if value.is_empty() {
            "The address is required before the stage can run."
        } else if parse_source_address(value).is_none() {
            "Not a valid URI yet."
        } else if value == self.original {
            "Valid URI (unchanged)."
        } else {
            "Valid URI."
        }
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if self.outcome.is_some() {
            return;
        }

        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.outcome = Some(EditOutcome::Cancelled);
            }
            KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.clear();
            }
            KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.push(c);
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter => {
                self.outcome = Some(EditOutcome::Accepted(self.input.trim().to_string()));
            }
            KeyCode::Esc => {
                self.outcome = Some(EditOutcome::Cancelled);
            }
            _ => {}
        }
    }

    fn draw(&self, f: &mut Frame) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(f.area());

        let area = centered_rect(70, 9, outer[0]);
        f.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Talk Lookup ")
            .title_style(Style::default().add_modifier(Modifier::BOLD));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Address input
                Constraint::Length(1), // Validity hint
                Constraint::Min(0),
            ])
            .split(inner);

        let title = format!(" {SOURCE_ADDRESS_PROPERTY} ");
        f.render_widget(text_input(&title, &self.input), chunks[0]);

        let hint_style = if parse_source_address(self.input.trim()).is_some() {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Red)
        };
        f.render_widget(Paragraph::new(self.hint()).style(hint_style), chunks[1]);

        f.render_widget(
            status_bar("Enter accept · Esc cancel · Ctrl-U clear"),
            outer[1],
        );
    }
}

/// The address dialog on the real terminal.
pub(crate) struct TerminalDialog;

impl AddressEditor for TerminalDialog {
    fn edit_address(&mut self, current: &str) -> Result<EditOutcome> {
        run(AddressDialog::new(current)).map_err(|e| TalkMetaError::io("<terminal>", e))
    }
}

/// Sets up terminal, runs event loop, restores terminal.
fn run(dialog: AddressDialog) -> io::Result<EditOutcome> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_dialog(&mut terminal, dialog);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_dialog(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut dialog: AddressDialog,
) -> io::Result<EditOutcome> {
    loop {
        terminal.draw(|f| dialog.draw(f))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    dialog.handle_key(key.code, key.modifiers);
                }
            }
        }

        if let Some(outcome) = dialog.outcome() {
            debug!(?outcome, "address dialog closed");
            return Ok(dialog.into_outcome());
        }
    }
}
