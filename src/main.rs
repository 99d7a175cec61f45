use std::sync::Arc;

use anyhow::Result;

use company_chat::app::App;
use company_chat::chat::ChatController;
use company_chat::client::QaClient;
use company_chat::config::Config;
use company_chat::tui::{self, EventHandler, Tui};
use company_chat::{handler, ui};

/// Route log output to a file under the cache dir; the terminal itself is
/// the UI, so logging to stderr would corrupt the screen.
fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));

    if let Some(cache_dir) = dirs::cache_dir() {
        let log_dir = cache_dir.join("company-chat");
        if std::fs::create_dir_all(&log_dir).is_ok() {
            if let Ok(file) = std::fs::File::create(log_dir.join("cchat.log")) {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
        }
    }

    let _ = builder.try_init();
}

async fn run(app: &mut App, terminal: &mut Tui) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::from_env();
    log::info!("using QA service at {}", config.api_url);

    let client = QaClient::new(&config.api_url);
    let mut app = App::new(ChatController::new(Arc::new(client)));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut app, &mut terminal).await;

    tui::restore()?;
    result
}
