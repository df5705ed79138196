use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use collection::{GameHeader, GameResult, GameStore, parser};
use filter::{ChainedSearch, FilterEngine, FilterOperator, Search, SearchEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

mod searches;

use searches::{EcoSearch, EloSearch, PlyCountSearch, ResultSearch};

/// GameFilter - filter a game collection with chained searches
#[derive(Parser)]
#[command(name = "gamefilter")]
#[command(about = "Filter a chess game collection with chained searches", long_about = None)]
struct Cli {
    /// Path to the game file (tab-separated headers)
    #[arg(short, long, default_value = "games.tsv")]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic game file for demos and benchmarks
    Generate {
        /// Number of games to generate
        #[arg(long, default_value = "100000")]
        count: usize,

        /// RNG seed, for reproducible files
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Show collection statistics
    Stats {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a search chain over the collection and list matching games
    Search(SearchArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Minimum rating: average of both players must reach this
    #[arg(long)]
    min_elo: Option<u16>,

    /// Result to match: 1-0, 1/2-1/2, 0-1, or *
    #[arg(long)]
    result: Option<String>,

    /// ECO opening code prefix, e.g. "B9"
    #[arg(long)]
    eco: Option<String>,

    /// Minimum game length in plies
    #[arg(long)]
    min_plies: Option<u16>,

    /// Join the criteria with OR instead of AND
    #[arg(long)]
    any: bool,

    /// Maximum number of matches to print
    #[arg(long, default_value = "20")]
    limit: usize,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { count, seed } => handle_generate(&cli.file, count, seed),
        Commands::Stats { json } => handle_stats(&cli.file, json),
        Commands::Search(args) => handle_search(&cli.file, args),
    }
}

/// Handle the 'generate' command
fn handle_generate(file: &Path, count: usize, seed: u64) -> Result<()> {
    let start = Instant::now();
    let games = generate_games(count, seed);
    parser::write_game_file(file, &games)
        .with_context(|| format!("Failed to write {}", file.display()))?;

    println!(
        "{} Wrote {} games to {} in {:?}",
        "✓".green(),
        count,
        file.display(),
        start.elapsed()
    );
    Ok(())
}

/// Handle the 'stats' command
fn handle_stats(file: &Path, json: bool) -> Result<()> {
    let store = load_store(file)?;
    let stats = store.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", format!("Statistics for {}", file.display()).bold().blue());
    println!("{}Games: {}", "• ".green(), stats.games);
    println!(
        "{}Results: {} white / {} drawn / {} black / {} unknown",
        "• ".green(),
        stats.white_wins,
        stats.draws,
        stats.black_wins,
        stats.unknown_results
    );
    println!(
        "{}Rated games: {} (average Elo {:.0})",
        "• ".cyan(),
        stats.rated_games,
        stats.avg_elo
    );
    println!("{}Average length: {:.1} plies", "• ".cyan(), stats.avg_ply_count);
    Ok(())
}

/// Handle the 'search' command
fn handle_search(file: &Path, args: SearchArgs) -> Result<()> {
    let store = load_store(file)?;

    // Collect one search stage per criterion, in a stable order.
    let mut stages: Vec<Box<dyn Search>> = Vec::new();
    if let Some(min_elo) = args.min_elo {
        stages.push(Box::new(EloSearch::new(store.clone(), min_elo)));
    }
    if let Some(result) = &args.result {
        stages.push(Box::new(ResultSearch::new(
            store.clone(),
            parse_result_arg(result)?,
        )));
    }
    if let Some(eco) = &args.eco {
        stages.push(Box::new(EcoSearch::new(store.clone(), eco.clone())));
    }
    if let Some(min_plies) = args.min_plies {
        stages.push(Box::new(PlyCountSearch::new(store.clone(), min_plies)));
    }
    if stages.is_empty() {
        bail!("give at least one of --min-elo, --result, --eco, --min-plies");
    }

    // Fold the stages into one chain, back to front. The first stage runs
    // under Replace; the rest join under AND (or OR with --any).
    let join = if args.any {
        FilterOperator::Or
    } else {
        FilterOperator::And
    };
    let mut chain: Option<Box<dyn Search>> = None;
    while let Some(stage) = stages.pop() {
        chain = Some(match chain {
            Some(rest) => Box::new(ChainedSearch::new(stage, join, rest)),
            None => stage,
        });
    }

    let engine = FilterEngine::new(store.clone());
    let events = engine.subscribe();
    let start = Instant::now();
    engine.execute_search(chain, FilterOperator::Replace);

    // Follow the run from the event channel until it completes.
    for event in events.iter() {
        match event {
            SearchEvent::Progress(percent) => {
                print!("\rScanning... {percent:>3}%");
                std::io::stdout().flush().ok();
            }
            SearchEvent::Finished => break,
        }
    }
    engine.wait();
    println!();

    tracing::info!(
        games_searched = engine.games_searched(),
        search_millis = engine.search_time().as_millis() as u64,
        "search complete"
    );

    let matched = engine.included_games();
    println!(
        "{} {} of {} games match in {:?}",
        "✓".green(),
        matched.len(),
        engine.size(),
        start.elapsed()
    );

    for &id in matched.iter().take(args.limit) {
        if let Some(game) = store.get(id) {
            println!("{:>7}  {}", id.to_string().green(), format_game(game));
        }
    }
    if matched.len() > args.limit {
        println!("  ... and {} more (raise --limit to see them)", matched.len() - args.limit);
    }
    Ok(())
}

fn load_store(file: &Path) -> Result<Arc<GameStore>> {
    let start = Instant::now();
    let store = GameStore::load_from_file(file)
        .with_context(|| format!("Failed to load game file {}", file.display()))?;
    println!(
        "{} Loaded {} games from {} in {:?}",
        "✓".green(),
        store.len(),
        file.display(),
        start.elapsed()
    );
    Ok(Arc::new(store))
}

fn parse_result_arg(s: &str) -> Result<GameResult> {
    Ok(match s {
        "1-0" | "white" => GameResult::WhiteWin,
        "1/2-1/2" | "draw" => GameResult::Draw,
        "0-1" | "black" => GameResult::BlackWin,
        "*" | "unknown" => GameResult::Unknown,
        _ => bail!("unrecognized result '{s}' (use 1-0, 1/2-1/2, 0-1, or *)"),
    })
}

fn format_game(game: &GameHeader) -> String {
    let elo = |value: Option<u16>| value.map_or_else(|| "----".to_string(), |e| e.to_string());
    format!(
        "{} ({}) - {} ({})  {}  {}  {}  {} plies",
        game.white,
        elo(game.white_elo),
        game.black,
        elo(game.black_elo),
        game.result.as_str().bold(),
        game.eco.as_deref().unwrap_or("?"),
        game.year.map_or_else(|| "????".to_string(), |y| y.to_string()),
        game.ply_count
    )
}

// =============================================================================
// Synthetic data
// =============================================================================

const PLAYERS: &[&str] = &[
    "Adams", "Petrov", "Larsen", "Gupta", "Svensson", "Moreau", "Tanaka", "Novak", "Silva",
    "Keller", "Ivanov", "Dubois", "Olsen", "Marin", "Weber", "Costa",
];

/// Deterministic synthetic game headers: plausible distributions, nothing
/// more. The same seed always yields the same file.
fn generate_games(count: usize, seed: u64) -> Vec<GameHeader> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..count)
        .map(|_| {
            let white = PLAYERS[rng.random_range(0..PLAYERS.len())];
            let black = PLAYERS[rng.random_range(0..PLAYERS.len())];
            let result = match rng.random_range(0..100) {
                0..=39 => GameResult::WhiteWin,
                40..=71 => GameResult::Draw,
                72..=94 => GameResult::BlackWin,
                _ => GameResult::Unknown,
            };
            // Roughly one game in ten arrives unrated.
            let rated = rng.random_range(0..10) != 0;
            let (white_elo, black_elo) = if rated {
                (
                    Some(rng.random_range(1800..2800u16)),
                    Some(rng.random_range(1800..2800u16)),
                )
            } else {
                (None, None)
            };
            let eco = if rng.random_range(0..20) == 0 {
                None
            } else {
                let volume = (b'A' + rng.random_range(0..5u8)) as char;
                Some(format!(
                    "{}{}{}",
                    volume,
                    rng.random_range(0..10u8),
                    rng.random_range(0..10u8)
                ))
            };

            GameHeader {
                white: white.to_string(),
                black: black.to_string(),
                white_elo,
                black_elo,
                result,
                year: Some(rng.random_range(1970..2026u16)),
                eco,
                ply_count: rng.random_range(8..240u16),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate_games(50, 7);
        let b = generate_games(50, 7);
        assert_eq!(a, b);
        assert_ne!(a, generate_games(50, 8));
    }

    #[test]
    fn test_parse_result_arg_accepts_aliases() {
        assert_eq!(parse_result_arg("1-0").unwrap(), GameResult::WhiteWin);
        assert_eq!(parse_result_arg("draw").unwrap(), GameResult::Draw);
        assert!(parse_result_arg("2-0").is_err());
    }
}
