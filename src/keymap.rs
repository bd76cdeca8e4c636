//! Computer-keyboard layout: note identities, pitches and shortcuts

use std::fmt;

use crate::synth::{SynthesisMode, Waveform};

/// A physical key that plays a note.
///
/// Holds a row of [`KEYBOARD`], so every identity has a pitch and identities
/// order by pitch. The key character doubles as the legacy browser key code
/// for letters (`'S'` is 83).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteIdentity(usize);

impl NoteIdentity {
    /// Identity for a typed character, if it is on the keyboard
    pub fn from_char(c: char) -> Option<Self> {
        let c = c.to_ascii_uppercase();
        KEYBOARD.iter().position(|entry| entry.key == c).map(NoteIdentity)
    }

    /// Identity for a browser key code (83 = S, 186 = ;, 222 = ')
    pub fn from_key_code(code: u32) -> Option<Self> {
        let c = match code {
            186 => ';',
            222 => '\'',
            _ => char::from_u32(code)?,
        };
        Self::from_char(c)
    }

    pub fn as_char(&self) -> char {
        self.entry().key
    }

    /// Frequency in Hz
    pub fn pitch(&self) -> f64 {
        self.entry().pitch
    }

    pub fn is_black(&self) -> bool {
        self.entry().black
    }

    pub fn entry(&self) -> &'static KeyEntry {
        &KEYBOARD[self.0]
    }
}

impl fmt::Display for NoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One row of the pitch table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEntry {
    pub key: char,
    pub pitch: f64,
    pub black: bool,
    pub name: &'static str,
}

const fn white(key: char, pitch: f64, name: &'static str) -> KeyEntry {
    KeyEntry {
        key,
        pitch,
        black: false,
        name,
    }
}

const fn black(key: char, pitch: f64, name: &'static str) -> KeyEntry {
    KeyEntry {
        key,
        pitch,
        black: true,
        name,
    }
}

/// C4 to E5, chromatic, ordered by pitch
pub static KEYBOARD: [KeyEntry; 17] = [
    white('S', 261.63, "C4"),
    black('E', 277.18, "C#4"),
    white('D', 293.66, "D4"),
    black('R', 311.13, "D#4"),
    white('F', 329.63, "E4"),
    white('G', 349.23, "F4"),
    black('Y', 369.99, "F#4"),
    white('H', 391.99, "G4"),
    black('U', 415.30, "G#4"),
    white('J', 440.00, "A4"),
    black('I', 466.16, "A#4"),
    white('K', 493.88, "B4"),
    white('L', 523.26, "C5"),
    black('O', 554.37, "C#5"),
    white(';', 587.33, "D5"),
    black('P', 622.25, "D#5"),
    white('\'', 659.26, "E5"),
];

/// Every playable identity, lowest first
pub fn identities() -> impl Iterator<Item = NoteIdentity> {
    (0..KEYBOARD.len()).map(NoteIdentity)
}

/// What a digit key does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Waveform(Waveform),
    Mode(SynthesisMode),
}

/// '1'-'4' pick a waveform, '5'-'8' pick a synthesis mode
pub fn shortcut(c: char) -> Option<Shortcut> {
    match c {
        '1' => Some(Shortcut::Waveform(Waveform::Sine)),
        '2' => Some(Shortcut::Waveform(Waveform::Square)),
        '3' => Some(Shortcut::Waveform(Waveform::Sawtooth)),
        '4' => Some(Shortcut::Waveform(Waveform::Triangle)),
        '5' => Some(Shortcut::Mode(SynthesisMode::Simple)),
        '6' => Some(Shortcut::Mode(SynthesisMode::Additive)),
        '7' => Some(Shortcut::Mode(SynthesisMode::Am)),
        '8' => Some(Shortcut::Mode(SynthesisMode::Fm)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(NoteIdentity::from_char('s'), NoteIdentity::from_char('S'));
        assert_eq!(NoteIdentity::from_char('s').map(|n| n.pitch()), Some(261.63));
    }

    #[test]
    fn test_unmapped_keys() {
        assert_eq!(NoteIdentity::from_char('Q'), None);
        assert_eq!(NoteIdentity::from_char('1'), None);
        assert_eq!(NoteIdentity::from_key_code(0x110000), None);
    }

    #[test]
    fn test_browser_key_codes() {
        assert_eq!(NoteIdentity::from_key_code(83).map(|n| n.as_char()), Some('S'));
        assert_eq!(NoteIdentity::from_key_code(74).map(|n| n.pitch()), Some(440.0));
        assert_eq!(NoteIdentity::from_key_code(186).map(|n| n.as_char()), Some(';'));
    }

    #[test]
    fn test_black_keys() {
        let blacks: String = identities()
            .filter(|n| n.is_black())
            .map(|n| n.as_char())
            .collect();
        assert_eq!(blacks, "ERYUIOP");
    }

    #[test]
    fn test_table_is_ascending_semitones() {
        for pair in KEYBOARD.windows(2) {
            let ratio = pair[1].pitch / pair[0].pitch;
            assert!((ratio - 2f64.powf(1.0 / 12.0)).abs() < 0.001, "{} -> {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_every_identity_has_a_pitch() {
        let pitches: Vec<f64> = identities().map(|n| n.pitch()).collect();
        let table: Vec<f64> = KEYBOARD.iter().map(|entry| entry.pitch).collect();
        assert_eq!(pitches, table);

        let mut sorted: Vec<NoteIdentity> = "'LSJ".chars().filter_map(NoteIdentity::from_char).collect();
        sorted.sort();
        assert_eq!(sorted.iter().map(|n| n.as_char()).collect::<String>(), "SJL'");
    }

    #[test]
    fn test_digit_shortcuts() {
        assert_eq!(shortcut('3'), Some(Shortcut::Waveform(Waveform::Sawtooth)));
        assert_eq!(shortcut('8'), Some(Shortcut::Mode(SynthesisMode::Fm)));
        assert_eq!(shortcut('9'), None);
    }
}
