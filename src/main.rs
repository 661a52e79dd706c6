/// Entry point and game loop.

mod ui;

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::info;

use blastgrid::config::{Difficulty, GameConfig, LEVELS_PER_DIFFICULTY};
use blastgrid::sim::event::GameEvent;
use blastgrid::sim::level::{embedded_levels, LevelDef};
use blastgrid::sim::progress::Progress;
use blastgrid::sim::round::{Effect, Outcome, Phase, Round};
use blastgrid::sim::step::step;
use ui::input::InputState;
use ui::renderer::{Overlay, Renderer};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// How long a status message stays on screen.
const MESSAGE_MS: u32 = 1500;

/// Totals printed after leaving the terminal UI.
#[derive(Default)]
struct Summary {
    cleared: u32,
    total_score: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = GameConfig::load();
    let levels = embedded_levels();
    let seed = config.seed.unwrap_or_else(clock_seed);
    info!("starting on {} with seed {seed}", config.difficulty);

    let mut renderer = Renderer::new();
    renderer.init().context("terminal init failed")?;

    let result = game_loop(&mut renderer, &config, &levels, seed);

    renderer.cleanup().context("terminal cleanup failed")?;
    let summary = result?;

    println!();
    println!("Thanks for playing Blast Grid!");
    println!("Levels cleared: {}  Total score: {}", summary.cleared, summary.total_score);
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// What Enter does once the current round has ended.
#[derive(Clone, Copy)]
enum Next {
    Play(Difficulty, usize),
    Quit,
}

struct Session<'a> {
    config: &'a GameConfig,
    levels: &'a [LevelDef],
    seed: u64,
    attempts: u64,
    progress: Progress,
    next: Next,
    summary: Summary,
}

impl<'a> Session<'a> {
    fn start(&mut self, difficulty: Difficulty, index: usize) -> Result<Round> {
        let def = self.levels
            .get(index)
            .with_context(|| format!("no level {}", index + 1))?;
        let seed = self.seed.wrapping_add(self.attempts);
        self.attempts += 1;
        Round::start(def, difficulty, self.config.difficulty_config(difficulty), index, seed)
            .with_context(|| format!("level {:?} is malformed", def.name))
    }

    /// Feed a finished round to progress and decide where Enter leads.
    fn finish(&mut self, round: &Round) {
        let Some(report) = round.report() else { return };
        self.next = match report.outcome {
            Outcome::Victory { score } => {
                self.summary.cleared += 1;
                self.summary.total_score += score as u64;
                match self.progress.record(&report) {
                    Some((d, i)) => Next::Play(d, i),
                    None => Next::Quit,
                }
            }
            Outcome::Defeat(_) => Next::Play(report.difficulty, report.level_index),
            Outcome::Retreated => Next::Quit,
        };
    }
}

fn game_loop(
    renderer: &mut Renderer,
    config: &GameConfig,
    levels: &[LevelDef],
    seed: u64,
) -> Result<Summary> {
    let mut session = Session {
        config,
        levels,
        seed,
        attempts: 0,
        progress: Progress::new(levels.len().min(LEVELS_PER_DIFFICULTY)),
        next: Next::Quit,
        summary: Summary::default(),
    };
    session.progress.select(config.difficulty, 0);
    let mut round = session.start(session.progress.selected_difficulty, session.progress.selected_level)?;

    let mut kb = InputState::new();
    let tick_rate = Duration::from_millis(config.tick_rate_ms.max(1));
    let dt = u32::try_from(config.tick_rate_ms.max(1)).unwrap_or(u32::MAX);
    let mut last_tick = Instant::now();

    let mut message = String::new();
    let mut message_timer: u32 = 0;

    loop {
        kb.drain_events();
        if kb.ctrl_c_pressed() {
            break;
        }

        if round.is_over() {
            if kb.retreat_pressed() {
                break;
            }
            if kb.confirm_pressed() {
                match session.next {
                    Next::Play(d, i) => {
                        round = session.start(d, i)?;
                        kb.reset_directions();
                        message.clear();
                        renderer.invalidate();
                    }
                    Next::Quit => break,
                }
            }
        } else {
            for ev in kb.round_events() {
                round.handle_input(ev);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            let was_over = round.is_over();
            let events = step(&mut round, dt);
            for event in &events {
                if let Some(text) = describe(event) {
                    message = text;
                    message_timer = MESSAGE_MS;
                }
            }
            if !was_over && round.is_over() {
                session.finish(&round);
                if round.phase() == Phase::Ended(Outcome::Retreated) {
                    break;
                }
            }

            if message_timer > 0 {
                message_timer = message_timer.saturating_sub(dt);
                if message_timer == 0 { message.clear(); }
            }
            last_tick = Instant::now();
        }

        let overlay = Overlay { message: &message, level_count: levels.len() };
        renderer.render(&round, &overlay)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(session.summary)
}

/// Status-bar text for the events worth announcing.
fn describe(event: &GameEvent) -> Option<String> {
    let text = match event {
        GameEvent::ChainTriggered { .. } => "Chain reaction!".to_string(),
        GameEvent::ItemRevealed { kind, .. } => format!("{} revealed", kind.name()),
        GameEvent::ItemDestroyed { kind, .. } => format!("{} burned up", kind.name()),
        GameEvent::ItemPicked { kind } => format!("Got {}", kind.name()),
        GameEvent::EnemyKilled { .. } => "Enemy down".to_string(),
        GameEvent::PlayerHit { lives } => format!("Hit! {lives} lives left"),
        GameEvent::ShieldAbsorbed => "Shield broke".to_string(),
        GameEvent::EffectExpired(Effect::WallPass) => "Wall pass wore off".to_string(),
        GameEvent::EffectExpired(Effect::BombPass) => "Bomb pass wore off".to_string(),
        GameEvent::PlayerEjected { .. } => "Pushed out of the wall".to_string(),
        GameEvent::PortalOpened => "Portal open!".to_string(),
        GameEvent::BombPlaced { .. }
        | GameEvent::BombDetonated { .. }
        | GameEvent::BlockDestroyed { .. }
        | GameEvent::Victory { .. }
        | GameEvent::Defeat(_)
        | GameEvent::Retreated => return None,
    };
    Some(text)
}
