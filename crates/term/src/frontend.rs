//! Terminal observer: renders every frame the driver publishes.

use std::io::{self, Write};

use crate::core::{GameObserver, GameSnapshot};
use crate::fb::FrameBuffer;
use crate::game_view::{GameView, Viewport};
use crate::renderer::TerminalRenderer;
use crate::types::Palette;

pub struct TerminalFrontend<W: Write = io::Stdout> {
    renderer: TerminalRenderer<W>,
    view: GameView,
    fb: FrameBuffer,
    /// Fixed viewport; `None` queries the terminal size every frame.
    viewport: Option<Viewport>,
    last_score: u32,
    /// First I/O error hit while rendering. The observer contract has no
    /// return value, so the loop collects it with [`TerminalFrontend::take_error`].
    error: Option<anyhow::Error>,
}

impl TerminalFrontend<io::Stdout> {
    pub fn new() -> Self {
        Self::with_renderer(TerminalRenderer::new())
    }
}

impl Default for TerminalFrontend<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> TerminalFrontend<W> {
    pub fn with_renderer(renderer: TerminalRenderer<W>) -> Self {
        Self {
            renderer,
            view: GameView::default(),
            fb: FrameBuffer::new(0, 0),
            viewport: None,
            last_score: 0,
            error: None,
        }
    }

    pub fn with_view(mut self, view: GameView) -> Self {
        self.view = view;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn renderer_mut(&mut self) -> &mut TerminalRenderer<W> {
        &mut self.renderer
    }

    pub fn last_score(&self) -> u32 {
        self.last_score
    }

    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    fn current_viewport(&self) -> Viewport {
        self.viewport.unwrap_or_else(|| {
            let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
            Viewport::new(w, h)
        })
    }
}

impl<W: Write> GameObserver for TerminalFrontend<W> {
    fn render(&mut self, snapshot: &GameSnapshot, palette: &Palette) {
        let viewport = self.current_viewport();
        self.view.render_into(snapshot, palette, viewport, &mut self.fb);
        if let Err(err) = self.renderer.present(&mut self.fb) {
            self.error.get_or_insert(err);
        }
    }

    fn score_changed(&mut self, score: u32) {
        self.last_score = score;
    }
}
