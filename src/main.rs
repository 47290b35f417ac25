use anyhow::{bail, Context};
use b9_unwind::config::UnwinderConfig;
use b9_unwind::debugger::{self, DebugContext};
use b9_unwind::snapshot::SnapshotTarget;
use b9_unwind::unwinder::InterpUnwinder;
use std::fs;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use tracing::{info, Level};

const USAGE: &str =
    "usage: b9-unwind <snapshot.json> [--config <config.json>] [--batch <commands>] [-v]";

struct Options {
    snapshot: PathBuf,
    config: Option<PathBuf>,
    batch: Option<PathBuf>,
    verbose: bool,
}

fn parse_args(args: &[String]) -> anyhow::Result<Options> {
    let mut snapshot = None;
    let mut config = None;
    let mut batch = None;
    let mut verbose = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(PathBuf::from(iter.next().context("--config needs a path")?));
            }
            "--batch" | "-x" => {
                batch = Some(PathBuf::from(iter.next().context("--batch needs a path")?));
            }
            "-v" | "--verbose" => verbose = true,
            other if other.starts_with('-') => bail!("unknown option '{}'\n{}", other, USAGE),
            other => {
                if snapshot.replace(PathBuf::from(other)).is_some() {
                    bail!("only one snapshot may be given\n{}", USAGE);
                }
            }
        }
    }

    Ok(Options {
        snapshot: snapshot.context(USAGE)?,
        config,
        batch,
        verbose,
    })
}

fn init_logger(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_max_level(level)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_args(&args)?;
    init_logger(options.verbose);

    let config = match &options.config {
        Some(path) => UnwinderConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => UnwinderConfig::default(),
    };

    let text = fs::read_to_string(&options.snapshot)
        .with_context(|| format!("reading snapshot {}", options.snapshot.display()))?;
    let target = SnapshotTarget::from_json(&text)
        .with_context(|| format!("parsing snapshot {}", options.snapshot.display()))?;
    info!(stops = target.stop_count(), "snapshot loaded");

    let mut ctx = DebugContext::new(target, InterpUnwinder::new(config));
    let mut stdout = io::stdout().lock();

    match &options.batch {
        Some(path) => {
            let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
            debugger::run_shell(&mut ctx, BufReader::new(file), &mut stdout, false)?;
        }
        None => {
            let stdin = io::stdin();
            let prompt = stdin.is_terminal();
            debugger::run_shell(&mut ctx, stdin.lock(), &mut stdout, prompt)?;
        }
    }

    Ok(())
}
