//! The dump engine: enumerates every identification leaf the processor
//! implements and renders the rows as fixed-width text.

mod decode;
mod enumerate;
mod format;
mod ops;
mod registers;
mod vendor;

pub use decode::{DecodedField, decode_row};
pub use enumerate::enumerate;
pub use format::format_rows;
pub use ops::{CpuidOps, HardwareCpuid};
pub use registers::{DumpRow, LeafQuery, LeafResult};
pub use vendor::{Vendor, VendorInfo};

/// The one fatal condition of a dump.
#[derive(thiserror::Error, Clone, Copy, Debug)]
pub enum DumpError {
    /// The identification instruction cannot be issued on this architecture
    /// at all. No dump is possible; nothing degrades gracefully past this.
    #[error("the CPUID instruction is not available on this architecture")]
    UnsupportedPlatform,
}

/// Dumps the identification space of the calling thread's current core and
/// returns the composed text: header, separator and one line per leaf.
///
/// Fails only with [`DumpError::UnsupportedPlatform`]; an unimplemented leaf
/// or an unknown vendor shows up as zeroed rows, never as an error.
///
/// Per-core identification state can differ on multi-core systems. A caller
/// that needs a single-core-consistent dump must pin the executing thread to
/// one logical core for the duration of the call; this function does not pin
/// by itself.
pub fn dump() -> Result<String, DumpError> {
    let ops = HardwareCpuid::new()?;
    Ok(dump_on(&ops))
}

/// Like [`dump`], against a caller-supplied executor. Given an executor, a
/// dump cannot fail.
pub fn dump_on(ops: &dyn CpuidOps) -> String {
    let (info, rows) = enumerate(ops);
    log::debug!(
        "dumped {} rows: {} processor, max basic leaf {:#x}, max extended leaf {:#x}",
        rows.len(),
        info.vendor,
        info.max_basic_leaf,
        info.max_extended_leaf
    );
    format_rows(&rows)
}

#[cfg(test)]
mod tests {
    use super::ops::fake::FakeCpuid;
    use super::*;

    #[ctor::ctor]
    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// The minimal processor: one basic leaf past leaf 0, no extended range.
    fn minimal_model() -> FakeCpuid {
        FakeCpuid::default()
            .set(
                0x0,
                0,
                [
                    0x1,
                    u32::from_ne_bytes(*b"Genu"),
                    u32::from_ne_bytes(*b"ntel"),
                    u32::from_ne_bytes(*b"ineI"),
                ],
            )
            .set(0x1, 0, [0x0003_06c3, 0, 0, 0])
            .set(0x8000_0000, 0, [0, 0, 0, 0])
    }

    #[test]
    fn minimal_processor_dumps_header_and_two_rows() {
        let text = dump_on(&minimal_model());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "Leaf           Subleaf         EAX         EBX        ECX          EDX"
        );
        assert_eq!(lines[1], "-".repeat(70));
        assert!(lines[2].starts_with("00000000       00000000        00000001"));
        assert!(lines[3].starts_with("00000001       00000000        000306c3"));
    }

    #[test]
    fn consecutive_dumps_are_identical() {
        let ops = minimal_model();
        assert_eq!(dump_on(&ops), dump_on(&ops));

        let (first, _) = enumerate(&ops);
        let (second, _) = enumerate(&ops);
        assert_eq!(first, second);
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[test]
    fn hardware_dump_produces_parseable_rows() {
        let text = dump().unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert!(lines.len() > 2, "{text}");
        // Leaf 0 always reports a nonzero maximum, and every row carries the
        // header's six columns.
        assert!(lines[2].starts_with("00000000       00000000"));
        for line in &lines[2..] {
            assert_eq!(line.split_whitespace().count(), 6, "{line}");
        }
    }
}
