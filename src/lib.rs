pub mod app;
pub mod config;
pub mod counts;
pub mod fleet;
pub mod inputs;
pub mod io;
pub mod listing;

use app::{ui, App, AppReturn};
use eyre::Result;
use inputs::{events::Events, InputEvent};
use io::IoEvent;
use std::{io::stdout, sync::Arc, time::Duration};

pub async fn start_ui(app: &Arc<tokio::sync::Mutex<App>>) -> Result<()> {
    let mut stdout = stdout();
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = tui::backend::CrosstermBackend::new(stdout);
    let mut terminal = tui::Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    // Ticks redraw the refresh countdown
    let tick_rate = Duration::from_millis(500);
    let mut events = Events::new(tick_rate);

    {
        let mut app = app.lock().await;
        app.dispatch(IoEvent::Initialize).await;
    }

    loop {
        {
            let app = app.lock().await;
            terminal.draw(|rect| ui::draw(rect, &app))?;
        }

        // The IO worker needs the lock while we wait for input
        let event = events.next().await;
        let mut app = app.lock().await;
        let result = match event {
            InputEvent::Input(key) => app.do_action(key).await,
            InputEvent::Tick => app.update_on_tick().await,
        };

        if result == AppReturn::Exit {
            events.close();
            break;
        }
    }

    terminal.clear()?;
    terminal.show_cursor()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    crossterm::terminal::disable_raw_mode()?;

    Ok(())
}
