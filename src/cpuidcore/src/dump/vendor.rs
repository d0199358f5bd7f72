//! Vendor identification and the enumeration bounds derived from it.

use derive_more::Display;

use super::registers::LeafResult;

// The 12-byte vendor string is reported in EBX, EDX, ECX order by leaf 0.
const INTEL_VENDOR_EBX: u32 = u32::from_ne_bytes(*b"Genu");
const INTEL_VENDOR_EDX: u32 = u32::from_ne_bytes(*b"ineI");
const INTEL_VENDOR_ECX: u32 = u32::from_ne_bytes(*b"ntel");
const AMD_VENDOR_EBX: u32 = u32::from_ne_bytes(*b"Auth");
const AMD_VENDOR_EDX: u32 = u32::from_ne_bytes(*b"enti");
const AMD_VENDOR_ECX: u32 = u32::from_ne_bytes(*b"cAMD");

/// How far past the boundary leaf (0 or 0x8000_0000) a reported maximum may
/// plausibly lie. No shipped part comes anywhere near this; values beyond it
/// are sentinel garbage and must not drive enumeration.
const PLAUSIBLE_LEAF_RANGE: u32 = 0x100;

/// The first leaf of the extended function range.
pub(crate) const EXTENDED_FUNCTION_BASE: u32 = 0x8000_0000;

/// The processor vendor, as far as enumeration and decoding care about it.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Vendor {
    /// Leaf 0 reported "GenuineIntel".
    #[display("Intel")]
    Intel,
    /// Leaf 0 reported "AuthenticAMD".
    #[display("AMD")]
    Amd,
    /// Any other vendor string. Enumeration still works; only the
    /// vendor-specific branches are skipped.
    #[display("other")]
    Other,
}

impl Vendor {
    pub(crate) fn from_leaf0(leaf0: &LeafResult) -> Self {
        if (leaf0.ebx, leaf0.edx, leaf0.ecx) == (INTEL_VENDOR_EBX, INTEL_VENDOR_EDX, INTEL_VENDOR_ECX) {
            Self::Intel
        } else if (leaf0.ebx, leaf0.edx, leaf0.ecx) == (AMD_VENDOR_EBX, AMD_VENDOR_EDX, AMD_VENDOR_ECX) {
            Self::Amd
        } else {
            Self::Other
        }
    }
}

/// Enumeration bounds and vendor, computed once from the leaf 0 and leaf
/// 0x8000_0000 results before any subleaf-dependent leaf is queried, and
/// read-only thereafter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VendorInfo {
    /// The detected vendor.
    pub vendor: Vendor,
    /// The highest implemented basic leaf, clamped to a plausible range.
    pub max_basic_leaf: u32,
    /// EAX of leaf 0x8000_0000, clamped. A value below 0x8000_0000 means the
    /// processor implements no extended function range at all.
    pub max_extended_leaf: u32,
}

impl VendorInfo {
    pub(crate) fn from_roots(leaf0: &LeafResult, extended0: &LeafResult) -> Self {
        let max_basic_leaf = if leaf0.eax <= PLAUSIBLE_LEAF_RANGE {
            leaf0.eax
        } else {
            // A corrupted maximum stops enumeration at the boundary leaf.
            0
        };

        let max_extended_leaf = if extended0.eax <= EXTENDED_FUNCTION_BASE + PLAUSIBLE_LEAF_RANGE {
            extended0.eax
        } else {
            EXTENDED_FUNCTION_BASE
        };

        Self {
            vendor: Vendor::from_leaf0(leaf0),
            max_basic_leaf,
            max_extended_leaf,
        }
    }
}
