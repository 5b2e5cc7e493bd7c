//! GameView: maps a `GameSnapshot` into a terminal framebuffer.
//!
//! This module is pure (no I/O). It can be unit-tested.

use crate::core::GameSnapshot;
use crate::fb::{Cell, CellStyle, FrameBuffer, Rgb};
use crate::types::{GamePhase, Palette};

const PLAYFIELD_BG: Rgb = Rgb::new(0, 0, 0);
const BORDER_FG: Rgb = Rgb::new(200, 200, 200);
const GRID_FG: Rgb = Rgb::new(60, 60, 70);
const TEXT_FG: Rgb = Rgb::new(220, 220, 220);

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorY {
    Center,
    Top,
}

/// Screen rectangle of the bordered playfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    x: u16,
    y: u16,
    w: u16,
    h: u16,
}

/// Draws the playfield, the falling piece, the score panel and overlays.
#[derive(Debug, Clone)]
pub struct GameView {
    /// Board cell width in terminal columns.
    cell_w: u16,
    anchor_y: AnchorY,
    show_help: bool,
}

impl Default for GameView {
    fn default() -> Self {
        // Two columns per cell keeps cells roughly square in most fonts.
        Self {
            cell_w: 2,
            anchor_y: AnchorY::Center,
            show_help: true,
        }
    }
}

impl GameView {
    pub fn new(cell_w: u16) -> Self {
        Self {
            cell_w: cell_w.max(1),
            ..Self::default()
        }
    }

    pub fn with_anchor_y(mut self, anchor_y: AnchorY) -> Self {
        self.anchor_y = anchor_y;
        self
    }

    pub fn with_help(mut self, show_help: bool) -> Self {
        self.show_help = show_help;
        self
    }

    /// Render into an existing framebuffer, resizing it to the viewport.
    pub fn render_into(
        &self,
        snap: &GameSnapshot,
        palette: &Palette,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(Cell::default());

        let w = snap.width as u16 * self.cell_w + 2;
        let h = snap.height as u16 + 2;
        let frame = Frame {
            x: viewport.width.saturating_sub(w) / 2,
            y: match self.anchor_y {
                AnchorY::Center => viewport.height.saturating_sub(h) / 2,
                AnchorY::Top => 0,
            },
            w,
            h,
        };

        draw_border(fb, frame, CellStyle::new(BORDER_FG, PLAYFIELD_BG));

        for y in 0..snap.height as usize {
            for x in 0..snap.width as usize {
                let value = snap.composed_cell(x, y);
                let cell = match palette.color(value) {
                    Some(color) => Cell::new('█', CellStyle::new(color, PLAYFIELD_BG)),
                    None => Cell::new('·', CellStyle::new(GRID_FG, PLAYFIELD_BG).dim()),
                };
                let px = frame.x + 1 + x as u16 * self.cell_w;
                let py = frame.y + 1 + y as u16;
                fb.fill_rect(px, py, self.cell_w, 1, cell.ch, cell.style);
            }
        }

        self.draw_side_panel(fb, snap, viewport, frame);

        let overlay = match snap.phase {
            GamePhase::NotStarted => Some("PRESS ENTER"),
            GamePhase::Paused => Some("PAUSED"),
            GamePhase::GameOver => Some("GAME OVER"),
            GamePhase::Running => None,
        };
        if let Some(text) = overlay {
            draw_overlay_text(fb, frame, text);
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, snap: &GameSnapshot, palette: &Palette, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(snap, palette, viewport, &mut fb);
        fb
    }

    fn draw_side_panel(&self, fb: &mut FrameBuffer, snap: &GameSnapshot, viewport: Viewport, frame: Frame) {
        let panel_x = frame.x.saturating_add(frame.w).saturating_add(2);
        if panel_x.saturating_add(8) > viewport.width {
            return;
        }

        let label = CellStyle::new(TEXT_FG, PLAYFIELD_BG).bold();
        let value = CellStyle::new(TEXT_FG, PLAYFIELD_BG);
        let hint = value.dim();

        let mut y = frame.y;
        fb.put_str(panel_x, y, "SCORE", label);
        y += 1;
        fb.put_u32(panel_x, y, snap.score, value);

        if !self.show_help {
            return;
        }
        y += 2;
        for line in [
            "←/→  move",
            "↓    drop",
            "↑ z  rotate",
            "p    pause",
            "r    restart",
            "q    quit",
        ] {
            fb.put_str(panel_x, y, line, hint);
            y += 1;
        }
    }
}

fn draw_border(fb: &mut FrameBuffer, f: Frame, style: CellStyle) {
    if f.w < 2 || f.h < 2 {
        return;
    }
    let right = f.x + f.w - 1;
    let bottom = f.y + f.h - 1;

    fb.put_char(f.x, f.y, '┌', style);
    fb.put_char(right, f.y, '┐', style);
    fb.put_char(f.x, bottom, '└', style);
    fb.put_char(right, bottom, '┘', style);
    for x in f.x + 1..right {
        fb.put_char(x, f.y, '─', style);
        fb.put_char(x, bottom, '─', style);
    }
    for y in f.y + 1..bottom {
        fb.put_char(f.x, y, '│', style);
        fb.put_char(right, y, '│', style);
    }
}

fn draw_overlay_text(fb: &mut FrameBuffer, f: Frame, text: &str) {
    let text_w = text.chars().count() as u16;
    let x = f.x.saturating_add(f.w.saturating_sub(text_w) / 2);
    let y = f.y.saturating_add(f.h / 2);
    let style = CellStyle::new(Rgb::new(255, 255, 255), PLAYFIELD_BG).bold();
    fb.put_str(x, y, text, style);
}
