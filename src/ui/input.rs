/// Keyboard tracker: turns raw crossterm key events into round inputs.
///
/// Movement keys are level-triggered: the round only sees `Press` when a
/// direction becomes held and `Release` when it stops being held. Bomb,
/// retreat and confirm are edge-triggered.
///
/// Terminals that never report key releases fall back to a hold timeout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use blastgrid::domain::entity::MoveDir;
use blastgrid::sim::round::InputEvent;

/// After this long without a Press/Repeat, a key counts as released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_BOMB: &[KeyCode] = &[KeyCode::Char(' ')];
const KEYS_RETREAT: &[KeyCode] = &[KeyCode::Esc];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];

pub struct InputState {
    /// Timestamp of the last Press/Repeat per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    raw_events: Vec<KeyEvent>,
    /// Directions the round was last told are held.
    reported: [bool; 4],
    /// Only true when the terminal is known to send Release events.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            reported: [false; 4],
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else { continue };
            self.raw_events.push(key);
            match key.kind {
                KeyEventKind::Release if self.honor_release => {
                    self.last_active.remove(&key.code);
                }
                KeyEventKind::Release => {}
                _ => {
                    let was_held = self.is_held(key.code);
                    self.last_active.insert(key.code, Instant::now());
                    if !was_held {
                        self.fresh_presses.push(key.code);
                    }
                }
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Round inputs for this frame: direction transitions first, then
    /// bomb and retreat requests.
    pub fn round_events(&mut self) -> Vec<InputEvent> {
        let mut out = Vec::new();
        for (i, dir) in MoveDir::ALL.into_iter().enumerate() {
            let held = self.any_held(keys_for(dir));
            if held == self.reported[i] { continue; }
            self.reported[i] = held;
            out.push(if held { InputEvent::Press(dir) } else { InputEvent::Release(dir) });
        }
        if self.any_pressed(KEYS_BOMB) {
            out.push(InputEvent::PlaceBomb);
        }
        if self.any_pressed(KEYS_RETREAT) {
            out.push(InputEvent::Retreat);
        }
        out
    }

    /// Forget reported directions, e.g. when a fresh round starts.
    pub fn reset_directions(&mut self) {
        self.reported = [false; 4];
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_pressed(KEYS_CONFIRM)
    }

    pub fn retreat_pressed(&self) -> bool {
        self.any_pressed(KEYS_RETREAT)
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    // ── Internal ──

    fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }
}

fn keys_for(dir: MoveDir) -> &'static [KeyCode] {
    match dir {
        MoveDir::Up => KEYS_UP,
        MoveDir::Down => KEYS_DOWN,
        MoveDir::Left => KEYS_LEFT,
        MoveDir::Right => KEYS_RIGHT,
    }
}
