use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use godot_assistant::config::AppConfig;
use godot_assistant::console::{ConsoleOutput, APP_TITLE};
use godot_assistant::container::bootstrap::bootstrap;
use godot_assistant::{cli, logger, web};

#[derive(Parser, Debug)]
#[command(name = "godot-assistant", version)]
#[command(about = APP_TITLE)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Default)]
enum Mode {
    /// Interactive chat in the terminal
    #[default]
    Chat,
    /// Serve the assistant over HTTP
    Serve {
        /// Port to listen on (overrides WEB_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logger::init();

    let args = Cli::parse();

    let mut config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            ConsoleOutput::new().print_error(&e);
            std::process::exit(1);
        }
    };
    if let Some(Mode::Serve { port: Some(port) }) = args.mode {
        config.web.port = port;
    }

    let container = bootstrap(config);
    container
        .verify()
        .context("Failed to initialize services")?;

    match args.mode.unwrap_or_default() {
        Mode::Chat => cli::run_chat(&container).await?,
        Mode::Serve { .. } => web::serve(&container).await?,
    }

    Ok(())
}
