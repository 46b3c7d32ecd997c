//! Binary entry point — wires the assistant together and runs a line-based
//! command loop on stdin as the stand-in transport. A real deployment hangs
//! the same `Request` surface off a chat platform instead.

use std::io::{self, BufRead, Write};

use chrono::Local;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use agendabot::assistant::{Assistant, Request};
use agendabot::config::{self, Settings};
use agendabot::db::AppointmentStore;
use agendabot::llm::OllamaClient;

/// The stand-in transport serves one local user.
const LOCAL_OWNER: i64 = 1;

fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    info!("{} v{} starting", config::APP_NAME, config::APP_VERSION);

    let settings = Settings::from_env();
    if let Err(e) = run(settings) {
        error!("fatal: {e}");
        std::process::exit(1);
    }
}

fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = settings.db_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let store = AppointmentStore::open(&settings.db_path)?;
    let backend = OllamaClient::from_settings(&settings);
    info!(
        "ledger at {}, backend {} ({})",
        settings.db_path.display(),
        settings.backend_url,
        settings.model
    );

    let mut assistant = Assistant::new(store, backend);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("Agendabot ready. /help for commands, Ctrl-D to quit.");
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let request = Request::parse(&line);
        let reply = assistant.handle(LOCAL_OWNER, request, Local::now().naive_local());
        println!("{reply}");
    }
    Ok(())
}
