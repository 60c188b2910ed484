//! Human-readable rendering of results, kept apart from the typed accessors.

use std::fmt::{self, Write};

use crate::result::RowResult;

/// Render bytes with printable ASCII passed through and everything else as
/// `\xNN`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (b' '..=b'~').contains(&b) && b != b'\\' {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\x{b:02X}");
        }
    }
    out
}

/// `Display` adapter for a [`RowResult`].
///
/// ```text
/// row_1 {
///   f:q @ 1700000000000 = row_1
/// }
/// ```
pub struct ResultDisplay<'a>(pub &'a RowResult);

impl fmt::Display for ResultDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.0.row())?;
        for cell in self.0.cells() {
            writeln!(
                f,
                "  {}:{} @ {} = {}",
                escape_bytes(&cell.family),
                escape_bytes(&cell.qualifier),
                cell.timestamp,
                escape_bytes(&cell.value)
            )?;
        }
        write!(f, "}}")
    }
}

/// Multi-line dump of a result, for logs and demos.
pub fn debug_string(result: &RowResult) -> String {
    ResultDisplay(result).to_string()
}

#[cfg(test)]
mod tests {
    use super::{debug_string, escape_bytes};
    use crate::{
        result::RowResult,
        row::{Cell, RowKey},
    };

    #[test]
    fn escapes_non_printable() {
        assert_eq!(escape_bytes(b"abc"), "abc");
        assert_eq!(escape_bytes(b"a\\b"), "a\\x5Cb");
        assert_eq!(escape_bytes(&[0x01, b'z', 0x80]), "\\x01z\\x80");
    }

    #[test]
    fn renders_cells() {
        let result = RowResult::new(
            RowKey::from("row_1"),
            vec![Cell::new("row_1", "f", "q", 42, "row_1")],
        );
        assert_eq!(debug_string(&result), "row_1 {\n  f:q @ 42 = row_1\n}");
    }
}
