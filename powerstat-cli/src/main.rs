mod display;
mod import;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::display::{
    display_candidates, display_clusters, display_disclaimer, display_draws, display_features,
    display_heat, display_import_summary, display_patterns,
};
use crate::import::{parse_date, parse_multiplier, parse_numbers};
use powerstat_db::db::{count_draws, db_path, fetch_draws, fetch_last_draws, insert_draw, migrate, open_db};
use powerstat_db::models::Draw;
use powerstat_db::rusqlite::Connection;
use powerstat_engine::cluster::cluster_draws;
use powerstat_engine::config::EngineConfig;
use powerstat_engine::features::extract_all;
use powerstat_engine::heat::{DEFAULT_COLD_THRESHOLD, DEFAULT_HOT_THRESHOLD, compute_heat};
use powerstat_engine::patterns::{self, DEFAULT_RECENT_WINDOW, POSITION_TOP_N};
use powerstat_engine::strategy::{StrategyKind, StrategyOrchestrator};

const EMPTY_DB: &str = "Database is empty. Run first: powerstat import --file <csv>";

#[derive(Parser)]
#[command(name = "powerstat", about = "Statistical analysis of Powerball draw history")]
struct Cli {
    /// Engine configuration file (JSON); defaults apply when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import draws from a CSV file (Draw Date, Winning Numbers, Multiplier)
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the database path
    DbPath,

    /// List the latest draws
    List {
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Frequency, z-score and heat index of every number
    Heat {
        /// Rows shown per domain
        #[arg(short, long, default_value = "20")]
        top: usize,

        #[arg(long, default_value_t = DEFAULT_HOT_THRESHOLD)]
        hot: f64,

        #[arg(long, default_value_t = DEFAULT_COLD_THRESHOLD)]
        cold: f64,
    },

    /// Per-draw features of the latest draws
    Features {
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Cluster draws by their features, choosing k by silhouette
    Cluster,

    /// Gaps, runs, positions, temporal groups, correlations and sum bands
    Patterns {
        /// Draws counted for recent frequency
        #[arg(short, long, default_value_t = DEFAULT_RECENT_WINDOW)]
        recent: usize,

        /// Entries shown per ranking
        #[arg(short, long, default_value_t = POSITION_TOP_N)]
        top: usize,
    },

    /// Generate candidate sets (all strategies in turn unless one is given)
    Generate {
        /// hot, cold, balanced, frequency, position or random
        #[arg(short, long)]
        strategy: Option<StrategyKind>,

        #[arg(short = 'n', long, default_value = "5")]
        count: usize,

        /// Seed for reproducibility (defaults to today's date)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List the available strategies
    Strategies,

    /// Write the effective configuration as JSON
    Config {
        /// Destination (defaults to the configuration path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add a draw by hand
    Add,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file } => cmd_import(&conn, &file),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { last } => cmd_list(&conn, last),
        Command::Heat { top, hot, cold } => cmd_heat(&conn, top, hot, cold),
        Command::Features { last } => cmd_features(&conn, last),
        Command::Cluster => cmd_cluster(&conn, &config_path),
        Command::Patterns { recent, top } => cmd_patterns(&conn, recent, top),
        Command::Generate { strategy, count, seed } => cmd_generate(&conn, &config_path, strategy, count, seed),
        Command::Strategies => {
            for kind in StrategyKind::ALL {
                println!("{:<10} {}", kind.name(), kind.description());
            }
            Ok(())
        }
        Command::Config { output } => cmd_config(&config_path, output.as_deref()),
        Command::Add => cmd_add(&conn),
    }
}

fn default_config_path() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("powerstat.json");
    path
}

/// YYYYMMDD of the local date, e.g. 20261018.
fn date_seed() -> u64 {
    let today = chrono::Local::now().date_naive();
    today.year() as u64 * 10_000 + today.month() as u64 * 100 + today.day() as u64
}

/// All draws, oldest first, or `None` after telling the user the database is empty.
fn load_draws(conn: &Connection) -> Result<Option<Vec<Draw>>> {
    if count_draws(conn)? == 0 {
        println!("{EMPTY_DB}");
        return Ok(None);
    }
    Ok(Some(fetch_draws(conn)?))
}

fn cmd_import(conn: &Connection, file: &Path) -> Result<()> {
    let result = import::import_csv(conn, file)?;
    info!("imported {} new draws from {:?}", result.inserted, file);
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, last: u32) -> Result<()> {
    if count_draws(conn)? == 0 {
        println!("{EMPTY_DB}");
        return Ok(());
    }
    let draws = fetch_last_draws(conn, last)?;
    display_draws(&draws);
    Ok(())
}

fn cmd_heat(conn: &Connection, top: usize, hot: f64, cold: f64) -> Result<()> {
    let Some(draws) = load_draws(conn)? else {
        return Ok(());
    };
    let report = compute_heat(&draws)?;
    display_heat(&report, top, hot, cold);
    display_disclaimer();
    Ok(())
}

fn cmd_features(conn: &Connection, last: usize) -> Result<()> {
    let Some(draws) = load_draws(conn)? else {
        return Ok(());
    };
    let features = extract_all(&draws)?;
    let start = features.len().saturating_sub(last);
    display_features(&features[start..]);
    Ok(())
}

fn cmd_cluster(conn: &Connection, config_path: &Path) -> Result<()> {
    let config = EngineConfig::load_or_default(config_path)?;
    let Some(draws) = load_draws(conn)? else {
        return Ok(());
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message(format!(
        "k-means over {} draws, k = {}..{}",
        draws.len(),
        config.cluster.k_min,
        config.cluster.k_max
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = cluster_draws(&draws, &config.cluster);
    spinner.finish_and_clear();

    display_clusters(&report?);
    display_disclaimer();
    Ok(())
}

fn cmd_patterns(conn: &Connection, recent: usize, top: usize) -> Result<()> {
    let Some(draws) = load_draws(conn)? else {
        return Ok(());
    };
    let report = patterns::analyze(&draws, recent)?;
    display_patterns(&report, top);
    display_disclaimer();
    Ok(())
}

fn cmd_generate(
    conn: &Connection,
    config_path: &Path,
    strategy: Option<StrategyKind>,
    count: usize,
    seed: Option<u64>,
) -> Result<()> {
    let config = EngineConfig::load_or_default(config_path)?;
    let Some(draws) = load_draws(conn)? else {
        return Ok(());
    };

    let seed = seed.unwrap_or_else(|| {
        let ds = date_seed();
        println!("(Seed of the day: {ds})");
        ds
    });
    let mut rng = StdRng::seed_from_u64(seed);

    let orchestrator = StrategyOrchestrator::from_draws(&draws, &config)?;
    let candidates = match strategy {
        Some(kind) => orchestrator.generate_with(kind, count, &mut rng)?,
        None => orchestrator.generate(count, &mut rng)?,
    };

    display_candidates(&candidates);
    display_disclaimer();
    Ok(())
}

fn cmd_config(config_path: &Path, output: Option<&Path>) -> Result<()> {
    let config = EngineConfig::load_or_default(config_path)?;
    let target = output.unwrap_or(config_path);
    config
        .save(target)
        .with_context(|| format!("Cannot write configuration to {:?}", target))?;
    println!("Configuration written to {}", target.display());
    Ok(())
}

fn cmd_add(conn: &Connection) -> Result<()> {
    println!("Add a draw by hand\n");

    let date = loop {
        match parse_date(&prompt("Date (MM/DD/YYYY): ")?) {
            Ok(date) => break date,
            Err(e) => println!("{e}. Try again."),
        }
    };

    let (white_balls, powerball) = loop {
        let input = prompt("5 white balls then the powerball, space separated (1-69, 1-26): ")?;
        match parse_numbers(&input) {
            Ok(numbers) => break numbers,
            Err(e) => println!("{e}. Try again."),
        }
    };

    let multiplier = loop {
        match parse_multiplier(Some(&prompt("Multiplier (empty if none): ")?)) {
            Ok(m) => break m,
            Err(e) => println!("{e}. Try again."),
        }
    };

    let draw = Draw::new(date, &white_balls, powerball, multiplier)?;

    println!("\nDraw to insert:");
    display_draws(std::slice::from_ref(&draw));

    let confirm = prompt("\nConfirm insertion? (y/n): ")?;
    if confirm.trim().eq_ignore_ascii_case("y") {
        if insert_draw(conn, &draw)? {
            println!("Draw inserted.");
        } else {
            println!("A draw already exists on this date (ignored).");
        }
    } else {
        println!("Insertion cancelled.");
    }

    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input).context("Cannot read input")?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_seed_format() {
        let seed = date_seed();
        assert!(seed >= 20_000_000, "seed too small: {seed}");
        assert!(seed <= 99_991_231, "seed too large: {seed}");
        let s = seed.to_string();
        assert_eq!(s.len(), 8);
        let month = (seed / 100) % 100;
        let day = seed % 100;
        assert!((1..=12).contains(&month));
        assert!((1..=31).contains(&day));
    }

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from(["powerstat", "generate", "--strategy", "hot", "-n", "3", "--seed", "7"]).unwrap();
        match cli.command {
            Command::Generate { strategy, count, seed } => {
                assert_eq!(strategy, Some(StrategyKind::HotBiased));
                assert_eq!(count, 3);
                assert_eq!(seed, Some(7));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_strategy() {
        assert!(Cli::try_parse_from(["powerstat", "generate", "--strategy", "lucky"]).is_err());
    }

    #[test]
    fn test_cli_global_config() {
        let cli = Cli::try_parse_from(["powerstat", "cluster", "--config", "custom.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.json")));
        assert!(matches!(cli.command, Command::Cluster));
    }

    #[test]
    fn test_cli_heat_defaults() {
        let cli = Cli::try_parse_from(["powerstat", "heat"]).unwrap();
        match cli.command {
            Command::Heat { top, hot, cold } => {
                assert_eq!(top, 20);
                assert_eq!(hot, DEFAULT_HOT_THRESHOLD);
                assert_eq!(cold, DEFAULT_COLD_THRESHOLD);
            }
            _ => panic!("expected heat"),
        }
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("data/powerstat.json"));
    }
}
