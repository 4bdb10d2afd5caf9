//! Game annotator CLI
//!
//! Imports a PGN (or a JSON move-descriptor list), classifies every move with
//! the opening book and a local UCI engine, and prints a JSON report.

use std::path::PathBuf;

use anyhow::Context;
use chess_core::{pgn, GameHeaders, STANDARD_START_FEN};
use tracing::{info, warn};

use game_annotator::{
    AnnotatorConfig, ChessRules, ClassificationPipeline, EngineSession, GameReport, GameTimeline,
    OpeningBook, PipelineOptions, ReplayBuilder,
};

struct Args {
    input: PathBuf,
    output: Option<PathBuf>,
    start_fen: Option<String>,
    classify: bool,
}

/// Parse `<game.pgn|moves.json> [--output FILE] [--fen FEN] [--no-classify]`
fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut input = None;
    let mut output = None;
    let mut start_fen = None;
    let mut classify = true;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--output" | "-o" => {
                output = Some(PathBuf::from(args.get(i + 1).context("--output needs a path")?));
                i += 1;
            }
            "--fen" => {
                start_fen = Some(args.get(i + 1).context("--fen needs a FEN")?.clone());
                i += 1;
            }
            "--no-classify" => classify = false,
            other if input.is_none() => input = Some(PathBuf::from(other)),
            other => anyhow::bail!("unexpected argument: {other}"),
        }
        i += 1;
    }

    Ok(Args {
        input: input.context("usage: game-annotator <game.pgn|moves.json> [--output FILE] [--fen FEN] [--no-classify]")?,
        output,
        start_fen,
        classify,
    })
}

fn load_timeline(args: &Args) -> anyhow::Result<GameTimeline> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let builder = ReplayBuilder::new(&ChessRules);

    let is_json = args.input.extension().is_some_and(|ext| ext == "json");
    if is_json {
        let descriptors = pgn::parse_descriptors_json(&text)?;
        let fen = args.start_fen.as_deref().unwrap_or(STANDARD_START_FEN);
        return Ok(builder.build(GameHeaders::default(), fen, &descriptors)?);
    }

    let mut game = pgn::parse_pgn(&text)?;
    if let Some(fen) = &args.start_fen {
        game.headers.fen = Some(fen.clone());
    }
    Ok(builder.build_game(&game)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let args = parse_args()?;
    let config = AnnotatorConfig::load()?;

    let mut timeline = load_timeline(&args)?;
    info!(
        white = timeline.headers().white.as_str(),
        black = timeline.headers().black.as_str(),
        moves = timeline.len(),
        "Game imported"
    );

    if args.classify && !timeline.is_empty() {
        let session = EngineSession::start(&config)
            .await
            .context("starting engine")?;
        let book = OpeningBook::from_config(&config)?;
        if !book.is_configured() {
            warn!("No opening book configured, every move goes to the engine");
        }

        let pipeline =
            ClassificationPipeline::new(&session, &book, &ChessRules, PipelineOptions::from(&config));
        pipeline.run(&mut timeline).await;
        session.dispose();
    }

    let report = GameReport::from_timeline(&timeline);
    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
