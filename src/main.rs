// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use bingo_ledger::{
    Config, EconomyLedger, Identity, SessionController, SqliteStore, SystemClock, UserStore,
};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bingo", version, about = "Bingo with a coin economy")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play in the terminal (guest when no user is given)
    Play {
        #[arg(long)]
        user: Option<String>,
    },
    /// Create an account with the starting coins
    Register { username: String },
    /// Show an account's coins, wins and resets
    Stats {
        username: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.store.path = db;
    }
    init_logging(&config)?;

    match cli.command.unwrap_or(Command::Play { user: None }) {
        Command::Play { user } => run_play(&config, user.as_deref())?,
        Command::Register { username } => run_register(&config, &username)?,
        Command::Stats { username, json } => run_stats(&config, &username, json)?,
    }

    Ok(())
}

/// Log to a file so the terminal UI stays clean; RUST_LOG wins over config
fn init_logging(config: &Config) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log.file)
        .with_context(|| format!("Failed to open log file: {:?}", config.log.file))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

fn run_register(config: &Config, username: &str) -> Result<()> {
    let identity = Identity::from_name(username);
    if identity.is_guest() {
        anyhow::bail!("{:?} is reserved for guests", username);
    }

    let store = SqliteStore::open(&config.store.path)?;
    if store.user_exists(identity.name())? {
        anyhow::bail!("User {} already exists", identity.name());
    }
    store.insert_user(identity.name(), config.economy.starting_coins)?;

    println!(
        "✓ Registered {} with {} coins",
        identity.name(),
        config.economy.starting_coins
    );
    Ok(())
}

fn run_stats(config: &Config, username: &str, json: bool) -> Result<()> {
    let store: Rc<dyn UserStore> = Rc::new(SqliteStore::open(&config.store.path)?);
    let ledger = EconomyLedger::open(username, config.economy, store, Rc::new(SystemClock))?;

    if json {
        println!("{}", serde_json::to_string_pretty(ledger.state())?);
        return Ok(());
    }

    let state = ledger.state();
    println!("👤 {}", username);
    println!("   Coins:       {}", state.coins);
    println!("   Wins:        {}", state.wins);
    println!("   Resets left: {}", ledger.resets_left());
    if !state.last_reset_date.is_empty() {
        println!("   Last reset:  {}", state.last_reset_date);
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_play(config: &Config, user: Option<&str>) -> Result<()> {
    let identity = Identity::from_name(user.unwrap_or_default());
    let store: Rc<dyn UserStore> = Rc::new(SqliteStore::open(&config.store.path)?);

    let controller = SessionController::start(
        identity,
        config.economy,
        config.accrual,
        store,
        Rc::new(SystemClock),
        StdRng::from_entropy(),
    )?;

    let mut app = ui::App::new(controller, config.accrual.tick_ms);
    ui::run_ui(&mut app)?;

    println!("\n✅ Game saved. See you next time!");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_play(_config: &Config, _user: Option<&str>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}
