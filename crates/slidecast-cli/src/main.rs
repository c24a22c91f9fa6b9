mod app;
mod layout;
mod prompt;

use anyhow::{Context, Result, bail};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyEventKind},
    execute, queue,
    style::Print,
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate,
        EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    },
};
use slidecast_config::Config;
use slidecast_engine::ansi::CLEAR_KITTY_IMAGES;
use std::{
    env,
    fs::OpenOptions,
    io::{Write, stdout},
    path::{Path, PathBuf},
    process,
};

use app::App;

#[derive(Debug, PartialEq)]
struct Args {
    deck: PathBuf,
    config: Option<PathBuf>,
    log: Option<PathBuf>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut deck = None;
    let mut config = None;
    let mut log = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(args.next().context("--config needs a path")?)),
            "--log" => log = Some(PathBuf::from(args.next().context("--log needs a path")?)),
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            _ if deck.is_none() => deck = Some(PathBuf::from(&arg)),
            _ => bail!("unexpected argument {arg}"),
        }
    }

    let deck: PathBuf = deck.context("no presentation file given")?;
    if deck.extension().and_then(|e| e.to_str()) != Some("md") {
        bail!("{} is not a markdown (.md) file", deck.display());
    }
    Ok(Args { deck, config, log })
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    // The terminal belongs to the presentation, so logs go to the file.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let argv: Vec<String> = env::args().collect();
    let program = argv.first().cloned().unwrap_or_else(|| "slidecast".to_string());

    let args = match parse_args(argv.into_iter().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Usage: {program} <file.md> [--config <path>] [--log <path>]");
            process::exit(1);
        }
    };

    let loaded = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    let config = match loaded {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let log_path = args.log.clone().unwrap_or_else(|| config.log_path());
    init_logging(&log_path)?;
    log::info!("slidecast starting up with {}", args.deck.display());

    let mut app = App::new(args.deck, config, terminal::size()?)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let res = run_app(&mut stdout, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout, Print(CLEAR_KITTY_IMAGES), Show, LeaveAlternateScreen)?;

    if let Err(err) = res {
        log::error!("{err:?}");
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<W: Write>(out: &mut W, app: &mut App) -> Result<()> {
    loop {
        draw(out, &app.view()?, app.animating())?;

        let input_ready = match app.tick() {
            Some(delay) => event::poll(delay)?,
            None => true,
        };
        if !input_ready {
            app.advance();
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if !app.key(key) {
                    return Ok(());
                }
            }
            Event::Resize(width, height) => app.resize(width, height),
            _ => {}
        }
    }
}

/// Writes a placed frame row by row. Animated frames cover every cell
/// already, so only still frames clear the screen first.
fn draw<W: Write>(out: &mut W, frame: &str, animating: bool) -> Result<()> {
    queue!(out, BeginSynchronizedUpdate)?;
    if !animating {
        queue!(out, Clear(ClearType::All))?;
    }
    for (row, line) in frame.split('\n').enumerate() {
        let Ok(row) = u16::try_from(row) else {
            break;
        };
        queue!(out, MoveTo(0, row), Print(line))?;
    }
    queue!(out, EndSynchronizedUpdate)?;
    out.flush()?;
    Ok(())
}
