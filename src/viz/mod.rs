//! Terminal keyboard for keysynth
//!
//! Provides a TUI showing:
//! - The keyboard, with sounding keys lit
//! - Current synthesis parameters and voice count
//! - Key help
//!
//! Key presses drive the engine directly. Terminals that support the
//! keyboard enhancement protocol report real key releases; elsewhere a key
//! is released once its auto-repeat stops (see [`HeldKeys`]).

mod held;
mod keyboard;

pub use held::{HeldKeys, RELEASE_TIMEOUT};
pub use keyboard::Keyboard;

use std::collections::BTreeSet;
use std::io::Stdout;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::info;

use crate::engine::{Engine, Nudge, VoiceEvent};
use crate::keymap::NoteIdentity;
use crate::synth::{SynthesisMode, SynthesisParameters};

/// UI refresh and teardown polling interval
pub const TICK: Duration = Duration::from_millis(50);

/// What a terminal key event asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    ReleaseAll,
    Press(char),
    Release(char),
    Nudge(Nudge),
    Ignore,
}

/// Translate a terminal key event
pub fn map_key(key: KeyEvent) -> Action {
    if key.kind == KeyEventKind::Release {
        return match key.code {
            KeyCode::Char(c) => Action::Release(c),
            _ => Action::Ignore,
        };
    }

    match key.code {
        KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char(' ') => Action::ReleaseAll,
        KeyCode::Tab => Action::Nudge(Nudge::LfoTargetToggle),
        KeyCode::Up => Action::Nudge(Nudge::AmountUp),
        KeyCode::Down => Action::Nudge(Nudge::AmountDown),
        KeyCode::Right => Action::Nudge(Nudge::RateUp),
        KeyCode::Left => Action::Nudge(Nudge::RateDown),
        KeyCode::Char(']') => Action::Nudge(Nudge::PartialsUp),
        KeyCode::Char('[') => Action::Nudge(Nudge::PartialsDown),
        KeyCode::Char('=') => Action::Nudge(Nudge::LfoDepthUp),
        KeyCode::Char('-') => Action::Nudge(Nudge::LfoDepthDown),
        KeyCode::Char(c) => Action::Press(c),
        _ => Action::Ignore,
    }
}

/// Keys currently lit, following voice events
#[derive(Debug, Default)]
pub struct KeyboardState {
    lit: BTreeSet<NoteIdentity>,
}

impl KeyboardState {
    pub fn apply(&mut self, event: VoiceEvent) {
        match event {
            VoiceEvent::Started(note) => {
                self.lit.insert(note);
            }
            VoiceEvent::Stopped(note) => {
                self.lit.remove(&note);
            }
            VoiceEvent::Disposed(_) => {}
        }
    }

    pub fn lit(&self) -> &BTreeSet<NoteIdentity> {
        &self.lit
    }

    pub fn is_lit(&self, note: NoteIdentity) -> bool {
        self.lit.contains(&note)
    }
}

/// One-line summary of the parameters new voices will use
pub fn status_line(params: &SynthesisParameters) -> String {
    let voice = match params.mode {
        SynthesisMode::Simple => format!("simple {}", params.waveform),
        SynthesisMode::Additive => format!(
            "additive {} partials, spread {:.2}",
            params.additive.partial_count, params.additive.spread
        ),
        SynthesisMode::Am => format!(
            "am {} by {} at {:.1} Hz, depth {:.2}",
            params.am.carrier, params.am.modulator, params.am.modulator_frequency, params.am.depth
        ),
        SynthesisMode::Fm => format!(
            "fm {} by {} at {:.1} Hz, index {:.2}",
            params.fm.carrier, params.fm.modulator, params.fm.modulator_frequency, params.fm.index
        ),
    };

    let lfo = if params.lfo.is_enabled() {
        format!(
            "lfo {} {:.1} Hz, depth {:.2}",
            params.lfo.target, params.lfo.rate, params.lfo.depth
        )
    } else {
        format!("lfo off ({})", params.lfo.target)
    };

    format!("{voice}  |  {lfo}")
}

/// Run the interactive keyboard until the user quits.
///
/// Every voice is released and torn down before returning.
pub fn run(engine: &mut Engine) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    info!(enhanced, "keyboard session started");

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, engine, enhanced);
    engine.shutdown();

    // Cleanup
    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    info!("keyboard session ended");
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    engine: &mut Engine,
    enhanced: bool,
) -> Result<()> {
    let mut events = engine.subscribe();
    let mut keys = KeyboardState::default();
    let mut held = HeldKeys::default();

    loop {
        terminal.draw(|f| draw_ui(f, engine, &keys, enhanced))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                match map_key(key) {
                    Action::Quit => break,
                    Action::ReleaseAll => {
                        engine.release_all();
                        held.clear();
                    }
                    Action::Press(c) => {
                        if !enhanced {
                            if let Some(note) = NoteIdentity::from_char(c) {
                                held.press(note, Instant::now());
                            }
                        }
                        engine.press(c);
                    }
                    Action::Release(c) => {
                        engine.release(c);
                    }
                    Action::Nudge(nudge) => engine.nudge(nudge),
                    Action::Ignore => {}
                }
            }
        }

        if !enhanced {
            for note in held.expired(Instant::now()) {
                engine.key_up(note);
            }
        }
        engine.poll();

        loop {
            match events.try_recv() {
                Ok(event) => keys.apply(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    Ok(())
}

fn draw_ui(f: &mut Frame, engine: &Engine, keys: &KeyboardState, enhanced: bool) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Keyboard
            Constraint::Length(3), // Status
            Constraint::Min(4),    // Help
        ])
        .split(area);

    let keyboard = Keyboard::new(keys.lit())
        .block(Block::default().borders(Borders::ALL).title(" keysynth "));
    f.render_widget(keyboard, chunks[0]);

    draw_status(f, chunks[1], engine);
    draw_help(f, chunks[2], enhanced);
}

fn draw_status(f: &mut Frame, area: Rect, engine: &Engine) {
    let pool = engine.pool();
    let voices = format!("{}/{}", pool.active_count(), pool.settings().budget);
    let voice_color = if pool.active_count() >= pool.settings().budget {
        Color::Red
    } else {
        Color::Green
    };

    let text = Line::from(vec![
        Span::raw("  "),
        Span::styled(status_line(engine.params()), Style::default().fg(Color::Cyan)),
        Span::raw("  |  voices "),
        Span::styled(voices, Style::default().fg(voice_color)),
    ]);

    let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn draw_help(f: &mut Frame, area: Rect, enhanced: bool) {
    let release = if enhanced {
        "keys release when let go"
    } else {
        "keys release 0.7 s after auto-repeat stops"
    };

    let lines = vec![
        Line::from("  1-4: sine square saw triangle  |  5-8: simple additive am fm"),
        Line::from("  Up/Down: depth  |  Left/Right: rate  |  [ ]: partials  |  - =: lfo depth  |  Tab: lfo target"),
        Line::from(format!("  Space: release all  |  Esc: quit  |  {release}")),
    ];

    let paragraph = Paragraph::new(lines).style(Style::default().fg(Color::DarkGray));
    f.render_widget(paragraph, area);
}
