//! solfa: parse a score sheet and render it to audio.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use solfa::audio::{self, RenderSettings, Renderer};
use solfa::notation::{KnownSymbols, Notation, ParsedScore, SymbolMatcher};
use solfa::recognition::ReferenceSet;
use solfa::{Config, Sheet};

macro_rules! fail {
    ($($arg:tt)*) => {{
        eprintln!($($arg)*);
        std::process::exit(1);
    }};
}

#[derive(Parser)]
#[command(author, version)]
#[command(about = "Spreadsheet music notation parser and renderer")]
#[command(arg_required_else_help = true)]
struct ArgParser {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a sheet and print the FA and SOL sequences
    Parse(ParseArgs),
    /// Parse a sheet and render output_fa.wav / output_sol.wav
    Render(RenderArgs),
}

#[derive(Args)]
struct ParseArgs {
    #[arg(value_name = "SHEET", help = "sheet YAML file")]
    sheet: PathBuf,

    #[arg(long, value_name = "DIR", help = "reference images directory")]
    references: Option<PathBuf>,
}

#[derive(Args)]
struct RenderArgs {
    #[command(flatten)]
    parse: ParseArgs,

    #[arg(long, value_name = "DIR", help = "directory of <entry>.wav clips")]
    music_dir: Option<PathBuf>,

    #[arg(short = 'o', long, value_name = "DIR", help = "output directory")]
    output_dir: Option<PathBuf>,

    #[arg(long, help = "play both staves once rendered")]
    play: bool,

    #[arg(long, value_name = "0..1", help = "playback volume")]
    volume: Option<f32>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "solfa=debug" } else { "solfa=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn matcher(references: Option<&Path>) -> Box<dyn SymbolMatcher> {
    match references {
        Some(dir) => match ReferenceSet::load(dir) {
            Ok(set) => Box::new(set),
            Err(e) => fail!("{e}"),
        },
        None => Box::new(KnownSymbols),
    }
}

fn parse_sheet(args: &ParseArgs, config: &Config) -> ParsedScore {
    let sheet = match Sheet::load(&args.sheet) {
        Ok(sheet) => sheet,
        Err(e) => fail!("{e}"),
    };
    let references = args.references.as_deref().or(config.references_dir.as_deref());

    match Notation::parse_sheet(sheet, matcher(references)) {
        Ok(score) => score,
        Err(e) => fail!("{e}"),
    }
}

fn print_score(score: &ParsedScore) {
    println!("FA: {}", score.fa_notes.join(" "));
    println!("SOL: {}", score.sol_notes.join(" "));
    for warning in &score.warnings {
        println!("warning: {warning}");
    }
}

fn parse(args: ParseArgs, config: &Config) {
    let score = parse_sheet(&args, config);
    print_score(&score);
}

fn render(args: RenderArgs, mut config: Config) {
    if let Some(dir) = args.music_dir {
        config.music_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(volume) = args.volume {
        config.volume = volume;
    }

    let score = parse_sheet(&args.parse, &config);
    print_score(&score);
    if score.is_empty() {
        fail!("no notes found in {}", args.parse.sheet.display());
    }

    let mut renderer = Renderer::new(RenderSettings::from_config(&config));
    let rendered = match renderer.render(&score) {
        Ok(rendered) => rendered,
        Err(e) => fail!("{e}"),
    };
    for path in rendered.fa_path.iter().chain(&rendered.sol_path) {
        println!("wrote {}", path.display());
    }

    if args.play {
        let stop = Arc::new(AtomicBool::new(false));
        let handler_stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed)) {
            fail!("cannot install Ctrl-C handler: {e}");
        }
        if let Err(e) = audio::play_mix(&rendered, config.volume, &stop) {
            fail!("playback failed: {e}");
        }
    }
    info!("done");
}

fn main() {
    let args = ArgParser::parse();
    init_logging(args.verbose);

    let config = Config::load();

    match args.command {
        Command::Parse(a) => parse(a, &config),
        Command::Render(a) => render(a, config),
    }
}
