//! Glyph metrics for the built-in Helvetica faces.
//!
//! Advance widths are in thousandths of an em, taken from the Adobe Core 14 AFM files for the
//! printable WinAnsi range. Helvetica-Oblique shares the regular advances.

use super::layout::{FontFace, PT_TO_MM};

/// Advances for U+0020..=U+007E.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0'..'?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P'..'_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`'..'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p'..'~'
];

/// Advances for U+00A0..=U+00FF.
const HELVETICA_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // nbsp..macron
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // degree..questiondown
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // Agrave..Idieresis
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // Eth..germandbls
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // agrave..idieresis
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // eth..ydieresis
];

const HELVETICA_BOLD_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333, // nbsp..macron
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611, // degree..questiondown
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // Agrave..Idieresis
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // Eth..germandbls
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278, // agrave..idieresis
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556, // eth..ydieresis
];

/// Advance of `c` in thousandths of an em. Characters outside WinAnsi are measured as the
/// `?` they are drawn as.
pub(crate) fn advance(c: char, face: FontFace) -> u16 {
    let (ascii, latin1) = match face {
        FontFace::Bold => (&HELVETICA_BOLD_ASCII, &HELVETICA_BOLD_LATIN1),
        FontFace::Regular | FontFace::Oblique => (&HELVETICA_ASCII, &HELVETICA_LATIN1),
    };
    match c {
        ' '..='~' => ascii[c as usize - 0x20],
        '\u{A0}'..='\u{FF}' => latin1[c as usize - 0xA0],
        _ => ascii[usize::from(b'?') - 0x20],
    }
}

/// Rendered width of `text` in millimetres.
pub(crate) fn text_width_mm(text: &str, size_pt: f32, face: FontFace) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(advance(c, face))).sum();
    units as f32 / 1000.0 * size_pt * PT_TO_MM
}

/// Replaces characters the built-in fonts cannot show.
pub(crate) fn winansi_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2022}' => out.push('-'),
            '\u{2265}' => out.push_str(">="),
            '\u{2264}' => out.push_str("<="),
            ' '..='~' | '\u{A0}'..='\u{FF}' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
