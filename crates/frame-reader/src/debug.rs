//! Debug formatters for byte heavy values

use std::fmt;

const FIRST_N_BYTES: usize = 16;

/// Print the first bytes of a slice and how many were left out
pub fn trimmed_bytes_fmt<T: AsRef<[u8]>>(bytes: &T, f: &mut fmt::Formatter) -> fmt::Result {
    let bytes = bytes.as_ref();
    let shown = &bytes[..bytes.len().min(FIRST_N_BYTES)];
    let hidden = bytes.len() - shown.len();

    if hidden == 0 {
        write!(f, "{:02x?}", shown)
    } else {
        write!(f, "{:02x?} + {} bytes", shown, hidden)
    }
}

/// Print bytes as text, replacing invalid UTF-8
pub fn lossy_text_fmt<T: AsRef<[u8]>>(bytes: &T, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", String::from_utf8_lossy(bytes.as_ref()))
}
