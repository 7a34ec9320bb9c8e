mod app;
mod terminal;
mod ui;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use log::info;
use requirements_estimation::{HuggingFaceDirectory, Settings};
use tokio::runtime::Handle;

use app::App;

type BoxError = Box<dyn Error + Send + Sync>;

const TICK_RATE: Duration = Duration::from_millis(80);

/// Runs the interactive explorer until the user quits.
pub fn run(settings: &Settings, runtime: &Handle) -> Result<(), BoxError> {
    let directory = Arc::new(HuggingFaceDirectory::new(&settings.api_url, settings.request_timeout)?);
    let mut app = App::new(settings.clone(), directory, runtime.clone());
    app.fetch_models();

    let mut terminal = terminal::setup_terminal()?;
    let result = event_loop(&mut terminal, &mut app);
    terminal::restore_terminal(&mut terminal)?;
    info!("explorer closed");
    result
}

fn event_loop(terminal: &mut terminal::Tty, app: &mut App) -> Result<(), BoxError> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if event::poll(TICK_RATE)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                _ => {}
            }
        }
        app.tick();
    }
    Ok(())
}
