//! jira-peek — a terminal popup for a JIRA instance.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐ Action ┌──────────┐ Pipeline ┌─────────────┐ ActionMsg ┌──────────┐
//! │ input.rs │ ─────► │  app.rs  │ ───────► │ dispatch.rs │ ────────► │  app.rs  │
//! └──────────┘        │ (state)  │          │ (tokio task)│ (channel) └────┬─────┘
//!                     └──────────┘          └──────┬──────┘                │ draw()
//!                                  fetch.rs ◄──────┘                  ┌────▼─────┐
//!                                  pipeline/ (url + render)           │  ui.rs   │
//!                                                                     └──────────┘
//! ```
//!
//! * **`pipeline/`** — the `Pipeline` trait, URL builders and renderers for
//!   the JQL search and the activity feed.
//! * **`fetch`** — the GET wrapper that classifies every response.
//! * **`dispatch`** — runs pipelines on the runtime and reports back.
//! * **`app`** — owns all view state (form, status line, results).
//! * **`ui`** — pure rendering: reads `App` state and draws widgets.
//! * **`input`** — maps key events to `App` edits and actions.
//! * **`settings`** — the layered settings store.
//! * **`main`** — wires everything together: parse args, load settings,
//!   set up logging and the terminal, run the event loop.

mod app;
mod dispatch;
mod error;
mod fetch;
mod input;
mod pipeline;
mod settings;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use reqwest::Client;
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app::App;
use dispatch::{run_pipeline, Dispatcher};
use fetch::{fetch, ResponseType};
use pipeline::{probe_url, FeedPipeline, Pipeline, QueryStyle, SearchPipeline};
use settings::{Overrides, Settings, APP_NAME};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "jira-peek", version, about = "Saved JIRA searches and activity in your terminal")]
struct Args {
    /// Settings file to read (and write with `config`).
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,
    /// Base URL of the JIRA instance.
    #[arg(long, global = true)]
    host: Option<String>,
    /// Project to search.
    #[arg(short, long, global = true)]
    project: Option<String>,
    /// User whose activity feed is shown.
    #[arg(short, long, global = true)]
    user: Option<String>,
    /// Build URLs exactly like the old browser popup did.
    #[arg(long, global = true)]
    legacy_queries: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the user's activity feed as HTML.
    Feed,
    /// Run the project search once and print the results as HTML.
    Search {
        /// Workflow status the issues are in.
        #[arg(long, default_value = "Open")]
        status: String,
        /// Minimum number of days the issues have been in that status.
        #[arg(short, long, default_value = app::DEFAULT_DAYS_PAST)]
        days: String,
    },
    /// Save the given options to the settings file.
    Config {
        /// Raw `Cookie` header of a logged-in JIRA session.
        #[arg(long)]
        session_cookie: Option<String>,
    },
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            project: self.project.clone(),
            user: self.user.clone(),
            host: self.host.clone(),
            query_style: self.legacy_queries.then_some(QueryStyle::Legacy),
        }
    }
}

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before the default hook prints the panic.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn log_path() -> PathBuf {
    let file = format!("{APP_NAME}.log");
    xdg::BaseDirectories::with_prefix(APP_NAME)
        .ok()
        .and_then(|dirs| dirs.place_state_file(&file).ok())
        .unwrap_or_else(|| std::env::temp_dir().join(file))
}

/// The TUI owns stdout, so it logs to a file; one-shot commands log to
/// stderr.
fn init_logging(to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jira_peek=info,warn"));

    if to_file {
        let path = log_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    info!("{APP_NAME} v{} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.command.is_none())?;

    let path = args.settings.clone().or_else(settings::default_path);

    if let Some(Command::Config { session_cookie }) = &args.command {
        let path = path.ok_or_else(|| anyhow!("no settings path; pass --settings"))?;
        let stored = Settings::load_stored(Some(&path), &args.overrides()).context("loading settings")?;
        let stored = Settings {
            session_cookie: session_cookie.clone().or(stored.session_cookie),
            ..stored
        };
        stored.save(&path)?;
        println!("Saved settings to {}", path.display());
        return Ok(());
    }

    let settings = Settings::load(path.as_deref(), &args.overrides()).context("loading settings")?;

    let rt = Runtime::new().context("starting tokio runtime")?;
    let client = fetch::build_client(settings.session_cookie.as_deref())?;

    match args.command {
        None => run_tui(&rt, client, &settings),
        Some(Command::Feed) => {
            let pipeline = FeedPipeline::new(&settings.host, Some(&settings.user), settings.query_style)
                .ok_or_else(|| anyhow!("no user configured"))?;
            run_once(&rt, &client, &settings, &pipeline)
        }
        Some(Command::Search { status, days }) => {
            let pipeline = SearchPipeline::new(
                &settings.host,
                &settings.project,
                &status,
                &days,
                settings.query_style,
            );
            run_once(&rt, &client, &settings, &pipeline)
        }
        Some(Command::Config { .. }) => Ok(()),
    }
}

/// Probe the session, run one pipeline and print its markup.
fn run_once(rt: &Runtime, client: &Client, settings: &Settings, pipeline: &dyn Pipeline) -> Result<()> {
    let probe = probe_url(&settings.host, &settings.probe_project);
    if let Err(e) = rt.block_on(fetch(client, &probe, ResponseType::Json)) {
        bail!("ERROR. {e}");
    }

    info!("{}", pipeline.pending_status());
    let view = rt
        .block_on(run_pipeline(client, pipeline))
        .map_err(|e| anyhow!("ERROR. {e}"))?;

    match view.empty_message() {
        Some(msg) => eprintln!("{msg}"),
        None => eprintln!("{}", pipeline.done_status()),
    }
    println!("{}", view.to_markup());
    Ok(())
}

fn run_tui(rt: &Runtime, client: Client, settings: &Settings) -> Result<()> {
    install_panic_hook();

    // -- background work -----------------------------------------------------
    let (dispatcher, rx) = Dispatcher::new(rt.handle().clone(), client);
    dispatcher.check_reachability(probe_url(&settings.host, &settings.probe_project));

    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(settings);

    // -- main event loop -----------------------------------------------------
    // Each ~100 ms tick drains finished requests, renders, then waits for a
    // key press.
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(msg) = rx.try_recv() {
            if let dispatch::ActionMsg::Unreachable(e) = &msg {
                warn!(error = %e, "JIRA session check failed");
            }
            app.apply(msg);
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if let Some(action) = input::handle_key_event(&mut app, key) {
                    if let Some(pipeline) = app.start(action) {
                        dispatcher.run(pipeline);
                    }
                }
            }
        }

        if app.quit {
            break;
        }
    }

    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
