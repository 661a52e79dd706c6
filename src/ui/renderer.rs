/// Presentation layer: double-buffered, diff-based terminal renderer.
///
///   1. Compose the next frame into `front`
///   2. Compare each cell with `back` (previous frame)
///   3. Emit terminal commands only for changed cells, batched with `queue!`
///   4. Swap front/back
///
/// Each grid tile takes two terminal columns.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use blastgrid::domain::entity::{ItemKind, MoveDir, Positioned};
use blastgrid::domain::tile::Tile;
use blastgrid::sim::round::{DefeatCause, Outcome, Phase, Round};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from every real cell, so the next flush repaints everything.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Renderer ──

const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

/// Everything the driver wants drawn around the grid.
pub struct Overlay<'a> {
    pub message: &'a str,
    pub level_count: usize,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        self.fit_terminal();
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// Force a full repaint on the next frame.
    pub fn invalidate(&mut self) {
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, round: &Round, overlay: &Overlay) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.fit_terminal();
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.front.clear();
        self.compose_hud(round, overlay);
        self.compose_map(round);

        let below = MAP_ROW + round.grid().height() + 1;
        self.compose_message(round, overlay, below);
        self.compose_help(round, below + 2);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn fit_terminal(&mut self) {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.invalidate();
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose ──

    fn compose_hud(&mut self, r: &Round, overlay: &Overlay) {
        let p = r.player();
        let time = match r.time_remaining_ms() {
            Some(ms) => format!("{:>3}s", ms.div_ceil(1000)),
            None => " --".to_string(),
        };
        let mut effects = String::new();
        if p.wall_pass.is_active() { effects.push_str(" WALL"); }
        if p.bomb_pass.is_active() { effects.push_str(" BOMB"); }
        if p.shield { effects.push_str(" SHIELD"); }
        if p.has_key { effects.push_str(" KEY"); }

        let hud = format!(
            " {} {}/{} {}  T:{}  Score:{:<5}  Lives:{}  Bombs:{}/{}  Fire:{} {}",
            r.difficulty(),
            r.level_index() + 1,
            overlay.level_count,
            r.level_name(),
            time,
            r.score(),
            r.lives(),
            p.bomb_capacity - p.bombs_active.min(p.bomb_capacity),
            p.bomb_capacity,
            p.bomb_range,
            effects,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_map(&mut self, r: &Round) {
        let grid = r.grid();
        for gy in 0..grid.height() {
            let row = MAP_ROW + gy;
            if row >= self.front.height { break; }
            for gx in 0..grid.width() {
                let col = gx * CELL_W;
                if col + 1 >= self.front.width { break; }
                let (c0, c1, fg, bg) = cell_glyph(r, gx, gy);
                self.front.set(col, row, Cell::new(c0, fg, bg));
                self.front.set(col + 1, row, Cell::new(c1, fg, bg));
            }
        }
    }

    fn compose_message(&mut self, r: &Round, overlay: &Overlay, row: usize) {
        if row >= self.front.height { return; }
        let ended = match r.phase() {
            Phase::Playing => None,
            Phase::Ended(Outcome::Victory { score }) => Some(format!("CLEARED! score {score}")),
            Phase::Ended(Outcome::Defeat(DefeatCause::LivesExhausted)) => Some("DEFEATED".to_string()),
            Phase::Ended(Outcome::Defeat(DefeatCause::TimeExpired)) => Some("TIME UP".to_string()),
            Phase::Ended(Outcome::Retreated) => Some("RETREATED".to_string()),
        };
        let text = match (ended, overlay.message.is_empty()) {
            (Some(e), true) => e,
            (Some(e), false) => format!("{e}  {}", overlay.message),
            (None, false) => overlay.message.to_string(),
            (None, true) => return,
        };
        self.front.fill_row(row, MSG_BG);
        self.front.put_str(0, row, &format!(" * {text} "), Color::Black, MSG_BG);
    }

    fn compose_help(&mut self, r: &Round, row: usize) {
        if row >= self.front.height { return; }
        let help = if r.is_over() {
            " Enter:Continue  Esc:Quit  Ctrl+C:Quit"
        } else {
            " Arrows/WASD:Move  Space:Bomb  Esc:Retreat  Ctrl+C:Quit"
        };
        self.front.put_str(0, row, help, Color::DarkGrey, Color::Reset);
    }
}

/// Topmost thing on a cell: player, enemy, explosion, bomb, item, portal, tile.
fn cell_glyph(r: &Round, gx: usize, gy: usize) -> (char, char, Color, Color) {
    let p = r.player();
    if p.body.cell() == (gx, gy) {
        // Blink while invincible.
        let blink = p.invincible.is_active() && (p.invincible.remaining_ms / 100) % 2 == 1;
        let fg = if blink { Color::DarkGrey } else { Color::White };
        let ch = match p.motion.facing {
            MoveDir::Up => '^',
            MoveDir::Down => 'v',
            MoveDir::Left => '<',
            MoveDir::Right => '>',
        };
        return ('@', ch, fg, Color::Reset);
    }
    if r.enemies().iter().any(|e| e.is_at(gx, gy)) {
        return ('&', '&', Color::Rgb { r: 255, g: 80, b: 80 }, Color::Reset);
    }
    if let Some(ex) = r.explosions().iter().find(|e| e.is_at(gx, gy)) {
        let heat = (ex.intensity() * 200.0) as u8;
        return ('*', '*', Color::Yellow, Color::Rgb { r: 55 + heat, g: heat / 3, b: 0 });
    }
    if let Some(b) = r.bombs().iter().find(|b| b.is_at(gx, gy)) {
        let fg = if b.timer_ms < 500 { Color::Red } else { Color::White };
        return ('(', ')', fg, Color::Reset);
    }
    if let Some(it) = r.items().iter().find(|i| i.is_at(gx, gy)) {
        return item_glyph(it.kind);
    }
    let portal = r.portal();
    if portal.body.cell() == (gx, gy) {
        return if portal.open {
            ('[', ']', Color::Rgb { r: 80, g: 255, b: 80 }, Color::Rgb { r: 0, g: 60, b: 0 })
        } else {
            ('[', ']', Color::DarkGrey, Color::Reset)
        };
    }
    match r.grid().tile_at(gx, gy) {
        Tile::Solid => ('█', '█', Color::Rgb { r: 120, g: 120, b: 120 }, Color::Rgb { r: 70, g: 70, b: 70 }),
        Tile::Breakable => ('▒', '▒', Color::Rgb { r: 180, g: 120, b: 60 }, Color::Rgb { r: 100, g: 65, b: 30 }),
        Tile::Empty | Tile::Item | Tile::Portal => (' ', ' ', Color::Reset, Color::Reset),
    }
}

fn item_glyph(kind: ItemKind) -> (char, char, Color, Color) {
    let (a, b) = match kind {
        ItemKind::Fire => ('F', '+'),
        ItemKind::Bomb => ('B', '+'),
        ItemKind::Speed => ('S', '+'),
        ItemKind::Slow => ('S', '-'),
        ItemKind::PassWall => ('W', 'p'),
        ItemKind::PassBomb => ('B', 'p'),
        ItemKind::Shield => ('S', 'h'),
        ItemKind::Key => ('K', 'y'),
    };
    let fg = if kind == ItemKind::Key { Color::Rgb { r: 255, g: 220, b: 50 } } else { Color::Cyan };
    (a, b, fg, Color::Reset)
}
