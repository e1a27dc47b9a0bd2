//! Hexdump formatting for packet tracing.
//!
//! Sixteen bytes per row: offset, hex bytes, printable ASCII gutter. Used by
//! the terminal at debug level to trace outgoing packets.

use std::fmt::Write;

/// Render a byte slice as a classic hexdump.
pub fn format(data: &[u8]) -> String {
    let mut out = String::new();
    let mut ascii = String::new();

    for (i, byte) in data.iter().enumerate() {
        if i % 16 == 0 {
            if i != 0 {
                let _ = writeln!(out, "  {ascii}");
                ascii.clear();
            }
            let _ = write!(out, "{i:04X}: ");
        }

        let _ = write!(out, "{byte:02X} ");
        if (0x20..0x7F).contains(byte) {
            ascii.push(*byte as char);
        } else {
            ascii.push('.');
        }
    }

    if !ascii.is_empty() {
        let pad = (16 - data.len() % 16) % 16;
        for _ in 0..pad {
            out.push_str("   ");
        }
        let _ = write!(out, "  {ascii}");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_slice_single_row() {
        let dump = format(b"AB\x00");
        assert!(dump.starts_with("0000: 41 42 00 "));
        assert!(dump.ends_with("AB."));
    }

    #[test]
    fn wraps_every_sixteen_bytes() {
        let data: Vec<u8> = (0u8..32).collect();
        let dump = format(&data);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("0010: "));
    }

    #[test]
    fn empty_input_empty_output() {
        assert!(format(&[]).is_empty());
    }
}
