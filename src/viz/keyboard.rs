//! Keyboard widget for ratatui

use std::collections::BTreeSet;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Widget},
};

use crate::keymap::{NoteIdentity, KEYBOARD};

/// Columns per white key
pub const WHITE_WIDTH: u16 = 5;
/// Columns per black key
pub const BLACK_WIDTH: u16 = 3;

/// Two-row piano keyboard with the sounding keys lit
pub struct Keyboard<'a> {
    lit: &'a BTreeSet<NoteIdentity>,
    block: Option<Block<'a>>,
}

impl<'a> Keyboard<'a> {
    pub fn new(lit: &'a BTreeSet<NoteIdentity>) -> Self {
        Self { lit, block: None }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn key_style(&self, key: char, black: bool) -> Style {
        let lit = NoteIdentity::from_char(key).is_some_and(|note| self.lit.contains(&note));
        match (black, lit) {
            (false, false) => Style::default().fg(Color::Black).bg(Color::White),
            (false, true) => Style::default().fg(Color::Black).bg(Color::Cyan),
            (true, false) => Style::default().fg(Color::White).bg(Color::DarkGray),
            (true, true) => Style::default().fg(Color::Black).bg(Color::Magenta),
        }
    }

    /// Black keys on the first row, white keys and note names below
    fn render_keys(&self, area: Rect, buf: &mut Buffer) {
        if area.height < 2 {
            return;
        }
        let right = area.x + area.width;
        let mut whites: u16 = 0;

        for entry in KEYBOARD.iter() {
            if entry.black {
                // Straddles the boundary with the previous white key
                let x = area.x + (whites * WHITE_WIDTH).saturating_sub(2);
                if x + BLACK_WIDTH <= right {
                    let label = format!("{:^width$}", entry.key, width = BLACK_WIDTH as usize);
                    buf.set_string(x, area.y, label, self.key_style(entry.key, true));
                }
            } else {
                let x = area.x + whites * WHITE_WIDTH;
                if x + WHITE_WIDTH <= right {
                    let label = format!("{:^width$}", entry.key, width = WHITE_WIDTH as usize);
                    buf.set_string(x, area.y + 1, label, self.key_style(entry.key, false));
                    if area.height > 2 {
                        let name = format!("{:^width$}", entry.name, width = WHITE_WIDTH as usize);
                        buf.set_string(x, area.y + 2, name, Style::default().fg(Color::Gray));
                    }
                }
                whites += 1;
            }
        }
    }
}

impl Widget for Keyboard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        self.render_keys(inner_area, buf);
    }
}
