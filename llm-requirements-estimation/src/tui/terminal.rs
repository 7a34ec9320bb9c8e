use std::io::{stdout, Stdout};

use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use super::BoxError;

pub type Tty = Terminal<CrosstermBackend<Stdout>>;

pub(super) fn setup_terminal() -> Result<Tty, BoxError> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(stdout(), crossterm::terminal::EnterAlternateScreen)?;
    terminal.clear()?;
    Ok(terminal)
}

pub(super) fn restore_terminal(terminal: &mut Tty) -> Result<(), BoxError> {
    crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    crossterm::terminal::disable_raw_mode()?;
    terminal.show_cursor()?;
    Ok(())
}
