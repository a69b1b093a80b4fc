mod app;
mod event;
mod timeline;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self as ct_event, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;

use crate::store::Store;
use crate::timeline::TimelineConfig;
use crate::watch::DbWatcher;
use app::App;
use event::KeyAction;

pub fn run(
    db_path: &str,
    store: &mut Store,
    config: TimelineConfig,
    poll_interval: u64,
) -> Result<()> {
    let mut app = App::new(store, config);

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, db_path, store, poll_interval);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    db_path: &str,
    store: &mut Store,
    poll_interval: u64,
) -> Result<()> {
    let poll_duration = Duration::from_millis(poll_interval);
    let watcher = DbWatcher::new(db_path)?;

    loop {
        terminal.draw(|frame| timeline::render(frame, app))?;

        if ct_event::poll(poll_duration)? {
            if let Event::Key(key) = ct_event::read()? {
                if key.kind == KeyEventKind::Press {
                    match event::handle_key(app, key) {
                        KeyAction::Quit => return Ok(()),
                        KeyAction::Refresh => {
                            store.reload()?;
                            app.refresh(store);
                        }
                        KeyAction::Reselect => app.load_history(store),
                        KeyAction::Continue => {}
                    }
                }
            }
        }

        if watcher.changed() {
            log::debug!("database changed on disk, reloading");
            store.reload()?;
            app.refresh(store);
        }
    }
}
