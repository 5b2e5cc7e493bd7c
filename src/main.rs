//! Terminal Blockfall runner (default binary).
//!
//! This is the primary gameplay entrypoint.
//! It uses crossterm for input and a custom framebuffer-based renderer.
//! When the remote adapter is enabled, commands from the controlling client
//! are applied on this same loop.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event};

use blockfall::adapter::{Adapter, BoardSize};
use blockfall::core::{FrameScheduler, GameConfig, GameDriver, GameState};
use blockfall::input::{handle_key_event, should_quit};
use blockfall::term::TerminalFrontend;
use blockfall::types::FRAME_MS;

fn main() -> Result<()> {
    let config = GameConfig::from_env().context("invalid BLOCKFALL_* configuration")?;
    let board = BoardSize {
        width: config.width,
        height: config.height,
    };
    let state = GameState::new(config)?;
    let adapter = Adapter::start_from_env(board)?;

    let mut frontend = TerminalFrontend::new();
    frontend.renderer_mut().enter()?;

    let result = run(state, &mut frontend, adapter);

    // Always try to restore terminal state.
    let _ = frontend.renderer_mut().exit();
    result
}

fn run(state: GameState, frontend: &mut TerminalFrontend, mut adapter: Option<Adapter>) -> Result<()> {
    let mut driver = GameDriver::new(state, FrameScheduler::new());
    let epoch = Instant::now();
    let now_ms = || epoch.elapsed().as_millis() as u64;

    driver.redraw(frontend);
    if let Some(adapter) = adapter.as_mut() {
        adapter.broadcast_if_changed(driver.state_mut());
    }

    loop {
        // Wake for the next tick, but never sleep past one frame so remote
        // commands are picked up promptly.
        let wait = driver
            .due_in(now_ms())
            .map_or(FRAME_MS as u64, |ms| ms.min(FRAME_MS as u64));

        if event::poll(Duration::from_millis(wait))? {
            match event::read()? {
                Event::Key(key) => {
                    if should_quit(key) {
                        return Ok(());
                    }
                    if let Some(action) = handle_key_event(key) {
                        driver.handle_action(action, now_ms(), frontend);
                    }
                }
                Event::Resize(_, _) => {
                    frontend.renderer_mut().invalidate();
                    driver.redraw(frontend);
                }
                _ => {}
            }
        }

        driver.pump(now_ms(), frontend);

        if let Some(adapter) = adapter.as_mut() {
            adapter.apply_pending(&mut driver, now_ms(), frontend);
            adapter.broadcast_if_changed(driver.state_mut());
        }

        if let Some(err) = frontend.take_error() {
            return Err(err);
        }
    }
}
