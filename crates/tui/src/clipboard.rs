use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// OSC 52 "set clipboard" sequence understood by most terminal emulators.
pub(crate) fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

pub(crate) fn write_clipboard(writer: &mut impl Write, text: &str) -> io::Result<()> {
    writer.write_all(osc52_sequence(text).as_bytes())?;
    writer.flush()
}
