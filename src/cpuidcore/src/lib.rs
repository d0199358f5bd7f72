//! CPUID leaf enumeration and dump engine.
//!
//! Walks every identification leaf and subleaf the processor implements,
//! following the vendor-specific iteration rules, and renders the raw
//! register values as fixed-width text suitable for diffing across
//! machines. The executor behind the walk is a trait, so tests (and other
//! embedders) can substitute canned register values for real hardware.

pub mod dump;

pub use dump::DecodedField;
pub use dump::DumpError;
pub use dump::decode_row;
pub use dump::dump;
pub use dump::dump_on;
pub use dump::enumerate;
pub use dump::format_rows;
pub use dump::{CpuidOps, HardwareCpuid};
pub use dump::{DumpRow, LeafQuery, LeafResult};
pub use dump::{Vendor, VendorInfo};
