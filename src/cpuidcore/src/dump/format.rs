//! Fixed-width rendering of dump rows.
//!
//! The header line is a compatibility contract: callers diff dumps across
//! machines and microcode revisions, so its bytes and the column alignment
//! of every data row underneath it must never change.

use core::fmt::Write;

use super::registers::DumpRow;

pub(crate) const HEADER: &str =
    "Leaf           Subleaf         EAX         EBX        ECX          EDX";

/// Offset of each field in a data row, matching where the corresponding
/// header word starts.
const FIELD_COLUMNS: [usize; 6] = [0, 15, 31, 43, 54, 67];

/// Renders the header, the separator and one line per row, in row order.
///
/// Every field is exactly eight zero-padded lower-case hex digits, so column
/// positions never vary with value magnitude.
pub fn format_rows(rows: &[DumpRow]) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "{HEADER}");
    let _ = writeln!(text, "{}", "-".repeat(HEADER.len()));
    for row in rows {
        let fields = [
            row.query.leaf,
            row.query.subleaf,
            row.result.eax,
            row.result.ebx,
            row.result.ecx,
            row.result.edx,
        ];
        let line_start = text.len();
        for (column, value) in FIELD_COLUMNS.iter().zip(fields) {
            while text.len() - line_start < *column {
                text.push(' ');
            }
            let _ = write!(text, "{value:08x}");
        }
        text.push('\n');
    }
    text
}
