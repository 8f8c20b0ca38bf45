use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::Stylize,
    terminal::{Clear, ClearType},
};
use promtior_core::{ChatRole, ChatView, Config, RagClient, SendPipeline, TYPING_TEXT};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "promtior-chat", version)]
#[command(about = "Terminal chat client for the Promtior RAG assistant")]
struct Cli {
    /// Base URL of the RAG service (overrides PROMTIOR_BASE_URL and the config file;
    /// with `config` it is saved instead)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Send one question and print the reply
    Ask {
        /// Your question
        question: String,
    },
    /// Save settings and show the effective configuration
    Config {
        /// Log level or filter directive, e.g. "debug"
        #[arg(long)]
        log_level: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = load_config_or_default();
            let base_url = cli.base_url.unwrap_or_else(|| config.base_url());
            let _guard = logging::init_tui(&config.log_level());
            run_tui(&base_url).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ask { question } => {
            let config = load_config_or_default();
            let base_url = cli.base_url.unwrap_or_else(|| config.base_url());
            logging::init_stderr(&config.log_level());
            Ok(ask(&base_url, &question).await)
        }
        Commands::Config { log_level } => {
            update_config(&Config::config_path()?, cli.base_url, log_level)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_tui(base_url: &str) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(RagClient::new(base_url), events.sender());
    tracing::info!(base_url, "chat started");

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

/// Prints the bot reply on stdout and everything else on stderr.
struct PrintView {
    interactive: bool,
}

impl ChatView for PrintView {
    fn append_message(&mut self, role: ChatRole, text: &str) {
        match role {
            ChatRole::Bot => println!("{}", text),
            ChatRole::System => eprintln!("{}", text.dark_grey()),
            ChatRole::User => {}
        }
    }

    fn set_typing(&mut self, typing: bool) {
        if !self.interactive {
            return;
        }
        let mut stderr = io::stderr();
        if typing {
            let _ = write!(stderr, "{}", format!("{}...", TYPING_TEXT).dark_grey().italic());
            let _ = stderr.flush();
        } else {
            let _ = execute!(stderr, Clear(ClearType::CurrentLine), MoveToColumn(0));
        }
    }

    fn set_error(&mut self, text: &str) {
        eprintln!("{}", text.red());
    }

    fn clear_error(&mut self) {}

    fn clear_input(&mut self) {}

    fn set_input_enabled(&mut self, _enabled: bool) {}

    fn focus_input(&mut self) {}
}

async fn ask(base_url: &str, question: &str) -> ExitCode {
    let mut pipeline = SendPipeline::new(RagClient::new(base_url));
    let mut view = PrintView {
        interactive: io::stderr().is_terminal(),
    };

    match pipeline.send(&mut view, question).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) if err.is_silent() => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

/// Chat and ask still run on defaults when the config file is unreadable.
/// Logging is not up yet, so the warning goes straight to stderr.
fn load_config_or_default() -> Config {
    Config::load().unwrap_or_else(|err| {
        eprintln!("{} config ignored, using defaults: {:#}", "warning:".yellow().bold(), err);
        Config::new()
    })
}

/// Never saves over a file it could not parse.
fn update_config(path: &Path, base_url: Option<String>, log_level: Option<String>) -> Result<()> {
    let mut config = Config::load_from(path)
        .with_context(|| format!("could not read {}; fix or remove it first", path.display()))?;

    let changed = base_url.is_some() || log_level.is_some();
    if let Some(url) = base_url {
        config.base_url = Some(url);
    }
    if let Some(level) = log_level {
        config.log_level = Some(level);
    }

    if changed {
        config.save_to(path)?;
        println!("{} {}", "Saved".green().bold(), path.display());
    }

    println!("config file: {}", path.display());
    println!("base_url:    {}", config.base_url());
    println!("log_level:   {}", config.log_level());
    println!("logs:        {}", logging::log_dir().display());
    Ok(())
}
