mod display;

use std::io::{stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    terminal, ExecutableCommand,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use astro_beats::assets::AssetPack;
use astro_beats::compute::{init_state, step};
use astro_beats::config::{GameConfig, JudgeMode, MissPolicy, OverlapMode, PlacementMode};
use astro_beats::entities::{FrameOutcome, GameState};
use astro_beats::input::{drain_events, menu_action, KeyMap, MenuAction, PressTracker};

use display::{Backdrop, View};

#[derive(Parser)]
#[command(name = "astro_beats")]
#[command(about = "Four-lane falling-note rhythm game for the terminal", version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// How many notes a single press may credit
    #[arg(long, value_enum)]
    judge: Option<JudgeMode>,

    /// What a note falling through the bottom costs
    #[arg(long, value_enum)]
    miss: Option<MissPolicy>,

    /// Lane selection for the opening batch of notes
    #[arg(long, value_enum)]
    placement: Option<PlacementMode>,

    /// Overlap correction strategy
    #[arg(long, value_enum)]
    overlap: Option<OverlapMode>,

    /// Seed for note placement and respawn heights
    #[arg(long)]
    seed: Option<u64>,

    /// Directory holding lane and background art
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Log file; the terminal itself is taken by the game
    #[arg(long, value_name = "FILE", env = "ASTROBEATS_LOG", default_value = "astrobeats.log")]
    log_file: PathBuf,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create log file {:?}", path))?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("astro_beats=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn load_config(args: &Args) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => {
            info!("No config file given, using defaults");
            GameConfig::default()
        }
    };

    if let Some(judge) = args.judge {
        config.rules.judge_mode = judge;
    }
    if let Some(miss) = args.miss {
        config.rules.miss_policy = miss;
    }
    if let Some(placement) = args.placement {
        config.rules.placement = placement;
    }
    if let Some(overlap) = args.overlap {
        config.rules.overlap_mode = overlap;
    }
    if let Some(dir) = &args.assets {
        config.display.assets_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Everything loaded once per process and shared by both screens.
struct Session {
    config: GameConfig,
    keymap: KeyMap,
    assets: AssetPack,
    backdrop: Backdrop,
    frame_budget: Duration,
    started: Instant,
}

impl Session {
    fn view(&self, frame: u64) -> View<'_> {
        View {
            assets: &self.assets,
            backdrop: &self.backdrop,
            keys: &self.config.keys,
            frame,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    fn throttle(&self, frame_start: Instant) {
        let elapsed = frame_start.elapsed();
        if elapsed < self.frame_budget {
            thread::sleep(self.frame_budget - elapsed);
        }
    }
}

// ── Menu ──────────────────────────────────────────────────────────────────────

fn show_menu<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    session: &Session,
) -> Result<MenuAction> {
    let mut frame: u64 = 0;
    loop {
        let frame_start = Instant::now();
        frame += 1;

        for ev in rx.try_iter() {
            if let Some(action) = menu_action(&ev) {
                return Ok(action);
            }
        }

        display::render_menu(out, &session.config.rules, &session.view(frame))?;
        session.throttle(frame_start);
    }
}

// ── Game loop ─────────────────────────────────────────────────────────────────

/// Runs until the quit signal; returns the final state.
///
/// Per frame: drain input, judge, fall, resolve overlaps, respawn, draw,
/// sleep out the rest of the frame budget.
fn game_loop<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    session: &Session,
    rng: &mut StdRng,
) -> Result<GameState> {
    let sizes = session.assets.note_sizes();
    let mut state = init_state(session.config.rules, &sizes, rng);
    let mut tracker = PressTracker::default();
    info!(notes = state.notes.len(), "Game started");

    loop {
        let frame_start = Instant::now();

        let input = drain_events(rx.try_iter(), &session.keymap, &mut tracker, state.frame);
        if !input.presses.is_empty() {
            debug!(frame = state.frame, lanes = ?input.presses, "Key down");
        }

        state = match step(&state, &input, rng) {
            FrameOutcome::Continue(next) => next,
            FrameOutcome::Quit => return Ok(state),
        };

        display::render(out, &state, &session.view(state.frame))?;
        session.throttle(frame_start);
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let config = load_config(&args)?;
    let keymap = KeyMap::new(&config.keys, config.rules.lanes)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let assets = AssetPack::load(&config.display.assets_dir, config.rules.lanes, &mut rng);
    let backdrop = Backdrop::new(&assets, config.display.pulse_interval_ms);
    let session = Session {
        frame_budget: Duration::from_millis(1000 / u64::from(config.display.fps)),
        config,
        keymap,
        assets,
        backdrop,
        started: Instant::now(),
    };

    let raw_out = stdout();
    let mut out = BufWriter::new(raw_out);

    terminal::enable_raw_mode()?;
    out.execute(terminal::EnterAlternateScreen)?;
    out.execute(cursor::Hide)?;
    out.execute(EnableMouseCapture)?;

    // Request key-release (and key-repeat) events from the terminal.
    // Kitty-protocol terminals support this; others fall back gracefully.
    let keyboard_enhanced = out
        .execute(PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
        ))
        .is_ok();

    // Dedicate a thread exclusively to blocking event reads, sending them
    // through a channel so the frame loop never has to block on I/O.
    let (tx, rx) = mpsc::channel::<Event>();
    thread::spawn(move || {
        while let Ok(ev) = event::read() {
            if tx.send(ev).is_err() {
                break; // receiver dropped → program exiting
            }
        }
    });

    let result = run(&mut out, &rx, &session, &mut rng);

    // Always restore the terminal
    if keyboard_enhanced {
        let _ = out.execute(PopKeyboardEnhancementFlags);
    }
    let _ = out.execute(DisableMouseCapture);
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    result
}

fn run<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    session: &Session,
    rng: &mut StdRng,
) -> Result<()> {
    match show_menu(out, rx, session)? {
        MenuAction::Quit => info!("Quit from menu"),
        MenuAction::Start => {
            let state = game_loop(out, rx, session, rng)?;
            info!(
                score = state.score,
                misses = state.misses,
                frames = state.frame,
                "Session ended"
            );
        }
    }
    Ok(())
}
