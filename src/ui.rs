//! Layout and drawing: menu, board with spawn strip, side panel, pause and game over overlays.

use crate::app::{MenuOption, PauseOption, Screen};
use crate::game::GameState;
use crate::grid::GridPos;
use crate::shapes::Shape;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns per grid cell.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;
/// Spawn-buffer rows drawn above row 0.
const DANGER_ROWS: u16 = 2;
const SIDEBAR_WIDTH: u16 = 24;
/// Duration of the cleared-row flash in ms.
const LINE_CLEAR_FADE_MS: u32 = 350;
const MINI_CELL_W: u16 = 2;

/// Everything `draw` needs besides the game itself.
pub struct View<'a> {
    pub screen: Screen,
    pub theme: &'a Theme,
    pub menu_selected: MenuOption,
    pub pause_selected: PauseOption,
    /// Stored best, shown on the menu.
    pub best: u32,
}

/// Cleared-row flash: created when rows clear, rendered until done.
#[derive(Default)]
pub struct LineFlash {
    rows: Vec<usize>,
    effect: Option<Effect>,
    last_frame: Option<Instant>,
}

impl LineFlash {
    pub fn start(&mut self, rows: Vec<usize>) {
        self.rows = rows;
        self.effect = None;
        self.last_frame = None;
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.effect = None;
        self.last_frame = None;
    }

    fn render(&mut self, frame: &mut Frame, board: Rect, now: Instant) {
        if self.rows.is_empty() {
            return;
        }
        let delta = self
            .last_frame
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default();
        let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
        self.last_frame = Some(now);

        if self.effect.is_none() {
            let flashing: HashSet<u16> = self
                .rows
                .iter()
                .map(|&r| board.y + (r as u16 + DANGER_ROWS) * CELL_HEIGHT)
                .collect();
            let filter = CellFilter::PositionFn(ref_count(move |pos: Position| flashing.contains(&pos.y)));
            let effect = fx::fade_from(Color::White, Color::White, (LINE_CLEAR_FADE_MS, Interpolation::QuadOut))
                .with_filter(filter)
                .with_area(board);
            self.effect = Some(effect);
        }

        if let Some(effect) = self.effect.as_mut() {
            frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
            if effect.done() {
                self.clear();
            }
        }
    }
}

/// Board size in terminal cells including border and spawn strip.
fn board_outer_size(state: &GameState) -> (u16, u16) {
    let grid = state.grid();
    (
        grid.width as u16 * CELL_WIDTH + 2,
        (grid.height as u16 + DANGER_ROWS) * CELL_HEIGHT + 2,
    )
}

/// Draw the current screen.
pub fn draw(frame: &mut Frame, view: &View, state: &GameState, flash: &mut LineFlash, no_animation: bool) {
    let area = frame.area();
    let theme = view.theme;
    Block::default()
        .style(Style::default().bg(theme.board))
        .render(area, frame.buffer_mut());

    match view.screen {
        Screen::Menu => draw_menu(frame, theme, view.menu_selected, view.best, area),
        Screen::Playing => {
            let board = draw_game(frame, state, theme, area);
            if !no_animation {
                flash.render(frame, board, Instant::now());
            }
        }
        Screen::Paused => {
            draw_game(frame, state, theme, area);
            draw_pause_menu(frame, theme, view.pause_selected, area);
        }
        Screen::GameOver { new_high_score } => {
            draw_game(frame, state, theme, area);
            draw_game_over(frame, state, theme, new_high_score, area);
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, selected: MenuOption, best: u32, area: Rect) {
    let popup = centered(area, 36, 14);
    let title_style = Style::default().fg(theme.accent).bold();
    let options = [(MenuOption::Start, " Start "), (MenuOption::Quit, " Quit ")];

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("W A R P T R I S", title_style)),
        Line::from(Span::styled(
            "the grid will not sit still",
            Style::default().fg(theme.dim).italic(),
        )),
        Line::from(""),
    ];
    for (opt, label) in options {
        let style = if opt == selected {
            Style::default().fg(theme.board).bg(theme.accent).bold()
        } else {
            Style::default().fg(theme.text)
        };
        lines.push(Line::from(Span::styled(label, style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Best: {}", best),
        Style::default().fg(theme.text),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "↑↓ choose   Enter select",
        Style::default().fg(theme.dim),
    )));

    Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border).bg(theme.board)),
    )
    .render(popup, frame.buffer_mut());
}

/// Draws board and side panel centred in `area`. Returns the board's inner rect.
fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) -> Rect {
    let (bw, bh) = board_outer_size(state);
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Fill(1), Constraint::Length(total_w), Constraint::Fill(1)])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(bh), Constraint::Fill(1)])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);

    let board = draw_board(frame, state, theme, inner[0]);
    draw_sidebar(frame, state, theme, inner[1]);
    board
}

fn draw_board(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border).bg(theme.board))
        .title(Span::styled(" Warptris ", Style::default().fg(theme.accent)));
    let board = block.inner(area);
    block.render(area, frame.buffer_mut());

    let grid = state.grid();
    let mut colours: HashMap<GridPos, Color> = state
        .settled()
        .iter()
        .map(|t| (t.position, theme.block_color(t.colour)))
        .collect();
    let mut active = HashSet::new();
    if let Some(current) = state.current() {
        for tile in current.tiles() {
            colours.insert(tile.position, theme.block_color(tile.colour));
            active.insert(tile.position);
        }
    }
    // Landed blocks waiting on the lock delay are drawn shaded.
    let landed = state.lock_remaining().is_some();

    let buf = frame.buffer_mut();
    for row in -(DANGER_ROWS as i32)..grid.height as i32 {
        for col in 0..grid.width as i32 {
            let pos = GridPos::new(col, row);
            let Some((ox, oy)) = grid.to_screen(pos, CELL_WIDTH, CELL_HEIGHT, DANGER_ROWS) else {
                continue;
            };
            let (x, y) = (board.x + ox, board.y + oy);
            let bg = if row < 0 { theme.danger } else { theme.board };
            let (symbol, style) = match colours.get(&pos) {
                Some(&c) if landed && active.contains(&pos) => ("▓▓", Style::default().fg(c).bg(bg)),
                Some(&c) => ("██", Style::default().fg(c).bg(bg)),
                None => (" ·", Style::default().fg(theme.border).bg(bg)),
            };
            set_cell_str(buf, board, x, y, symbol, style);
        }
    }
    board
}

/// Writes `symbol` at (x, y) if it fits inside `clip`.
fn set_cell_str(buf: &mut Buffer, clip: Rect, x: u16, y: u16, symbol: &str, style: Style) {
    if x + CELL_WIDTH <= clip.x + clip.width && y < clip.y + clip.height {
        buf.set_string(x, y, symbol, style);
    }
}

fn panel(theme: &Theme, title: impl Into<String>) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border).bg(theme.board))
        .title(Span::styled(title.into(), Style::default().fg(theme.accent)))
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let label = Style::default().fg(theme.accent);
    let value = Style::default().fg(theme.text);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // score, best
            Constraint::Length(6), // event
            Constraint::Min(4),    // queue
        ])
        .split(area);

    let score_lines = vec![
        Line::from(vec![Span::styled("Cleared: ", label), Span::styled(state.score().to_string(), value)]),
        Line::from(vec![Span::styled("Best:    ", label), Span::styled(state.high_score().to_string(), value)]),
    ];
    Paragraph::new(score_lines)
        .block(panel(theme, " Score "))
        .render(chunks[0], frame.buffer_mut());

    let countdown = state.event_countdown();
    let event_lines = vec![
        Line::from(Span::styled(state.pending_event().label(), value.bold())),
        Line::from(vec![
            Span::styled("in ", label),
            Span::styled(countdown.to_string(), value),
            Span::styled(if countdown == 1 { " lock" } else { " locks" }, label),
        ]),
        Line::from(vec![
            Span::styled("Gravity: ", label),
            Span::styled(format!("{:.1}", state.gravity()), value),
        ]),
        Line::from(match state.last_event() {
            Some(e) => Span::styled(format!("Last: {}", e), Style::default().fg(theme.dim)),
            None => Span::raw(""),
        }),
    ];
    Paragraph::new(event_lines)
        .block(panel(theme, " Next event "))
        .render(chunks[1], frame.buffer_mut());

    let queue_block = panel(theme, format!(" Queue ({}) ", state.queue_len()));
    let queue_area = queue_block.inner(chunks[2]);
    queue_block.render(chunks[2], frame.buffer_mut());
    let mut y = queue_area.y;
    for block in state.queue() {
        let shape = block.shape();
        let h = shape.height() as u16;
        if y + h > queue_area.y + queue_area.height {
            break;
        }
        let preview = Rect {
            x: queue_area.x,
            y,
            width: queue_area.width,
            height: h,
        };
        draw_shape_preview(frame.buffer_mut(), shape, theme.block_color(block.colour()), preview);
        y += h + 1;
    }
}

/// Draws a shape centred horizontally in `area`.
fn draw_shape_preview(buf: &mut Buffer, shape: &Shape, colour: Color, area: Rect) {
    let w = shape.width() as u16 * MINI_CELL_W;
    let off_x = area.width.saturating_sub(w) / 2;
    for (r, c) in shape.offsets() {
        let x = area.x + off_x + c as u16 * MINI_CELL_W;
        let y = area.y + r as u16;
        if x + MINI_CELL_W <= area.x + area.width && y < area.y + area.height {
            buf.set_string(x, y, "██", Style::default().fg(colour));
        }
    }
}

fn draw_pause_menu(frame: &mut Frame, theme: &Theme, selected: PauseOption, area: Rect) {
    let popup = centered(area, 24, 8);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent).bg(theme.board))
        .title(" Paused ");
    Clear.render(popup, frame.buffer_mut());
    let inner = block.inner(popup);
    block.render(popup, frame.buffer_mut());

    let options = [
        (PauseOption::Resume, " Resume "),
        (PauseOption::MainMenu, " Main Menu "),
        (PauseOption::Quit, " Quit "),
    ];
    let buf = frame.buffer_mut();
    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.board).bg(theme.accent).bold()
        } else {
            Style::default().fg(theme.accent).bg(theme.board)
        };
        let rx = inner.x + inner.width.saturating_sub(label.len() as u16) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.y + inner.height {
            buf.set_string(rx, ry, label, style);
        }
    }
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, new_high_score: bool, area: Rect) {
    let popup = centered(area, 34, 10);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Game Over ", Style::default().fg(Color::White).bg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(format!(" Cleared: {} ", state.score()), Style::default().fg(theme.text))),
        Line::from(Span::styled(format!(" Best: {} ", state.high_score()), Style::default().fg(theme.text))),
    ];
    if new_high_score {
        lines.push(Line::from(Span::styled(" New record! ", Style::default().fg(Color::Yellow).bold())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R Restart  Esc Menu  Q Quit ",
        Style::default().fg(theme.dim),
    )));
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.board))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border).bg(theme.board)),
        )
        .render(popup, frame.buffer_mut());
}
