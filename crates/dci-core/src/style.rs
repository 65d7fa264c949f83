//! SGR (Select Graphic Rendition) helpers.
//!
//! Every helper wraps text in a begin sequence and the matching end sequence,
//! so styles nest without resetting unrelated attributes.

const CSI: &str = "\x1b[";

/// Bold.
pub const BOLD: u8 = 1;
/// Italic.
pub const ITALIC: u8 = 3;
/// Red foreground.
pub const RED: u8 = 31;
/// Green foreground.
pub const GREEN: u8 = 32;
/// Yellow foreground.
pub const YELLOW: u8 = 33;
/// Blue foreground.
pub const BLUE: u8 = 34;

/// Returns the SGR code that cancels `code`.
///
/// Codes outside the attribute and color ranges fall back to a full reset (`0`);
/// passing one is a caller bug.
pub fn end_code(code: u8) -> u8 {
    match code {
        1..=2 => 22,
        5..=6 => 25,
        3..=4 | 7..=9 => code + 20,
        30..=37 | 90..=97 => 39,
        40..=47 | 100..=107 => 49,
        _ => {
            debug_assert!(false, "SGR code {code} has no matching end code");
            0
        }
    }
}

/// Wraps `text` in the begin/end sequences for `code`.
pub fn paint(text: impl AsRef<str>, code: u8) -> String {
    format!("{CSI}{code}m{}{CSI}{}m", text.as_ref(), end_code(code))
}

/// Bold `text`, closed with `22` so an enclosing color is kept.
pub fn bold(text: impl AsRef<str>) -> String {
    paint(text, BOLD)
}

/// Italic `text`.
pub fn italic(text: impl AsRef<str>) -> String {
    paint(text, ITALIC)
}

/// Red `text`, used for failures and missing tools.
pub fn red(text: impl AsRef<str>) -> String {
    paint(text, RED)
}

/// Green `text`, used for success lines.
pub fn green(text: impl AsRef<str>) -> String {
    paint(text, GREEN)
}

/// Yellow `text`, used for target names.
pub fn yellow(text: impl AsRef<str>) -> String {
    paint(text, YELLOW)
}

/// Blue `text`, used for feature names.
pub fn blue(text: impl AsRef<str>) -> String {
    paint(text, BLUE)
}

/// The `error:` prefix used for fatal diagnostics.
pub fn error_prefix() -> String {
    bold(red("error") + ":")
}
