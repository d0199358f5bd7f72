//! Optional semantic decoding of leaves with known meaning.
//!
//! Decoding never fails: a leaf nobody taught this module about simply
//! yields no fields, and the raw row stands on its own.

use bit_field::BitField;

use super::registers::{DumpRow, LeafResult};
use super::vendor::{EXTENDED_FUNCTION_BASE, Vendor, VendorInfo};

/// One decoded field of a row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedField {
    /// What the field is.
    pub name: &'static str,
    /// The rendered value.
    pub value: String,
}

impl DecodedField {
    fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

// Abridged flag tables; a flag absent here still shows up in the raw row.
// See: (Intel) Table 3-10/3-11, Feature Information
// See: (AMD) CPUID Fn8000_0001_ECX/EDX Feature Identifiers
const LEAF1_ECX_FLAGS: &[(usize, &str)] = &[
    (0, "sse3"),
    (1, "pclmulqdq"),
    (9, "ssse3"),
    (12, "fma"),
    (19, "sse4.1"),
    (20, "sse4.2"),
    (22, "movbe"),
    (23, "popcnt"),
    (25, "aes"),
    (26, "xsave"),
    (28, "avx"),
    (29, "f16c"),
    (30, "rdrand"),
    (31, "hypervisor"),
];
const LEAF1_EDX_FLAGS: &[(usize, &str)] = &[
    (0, "fpu"),
    (4, "tsc"),
    (5, "msr"),
    (6, "pae"),
    (8, "cx8"),
    (15, "cmov"),
    (19, "clfsh"),
    (23, "mmx"),
    (25, "sse"),
    (26, "sse2"),
    (28, "htt"),
];
const LEAF7_EBX_FLAGS: &[(usize, &str)] = &[
    (0, "fsgsbase"),
    (3, "bmi1"),
    (5, "avx2"),
    (8, "bmi2"),
    (16, "avx512f"),
    (18, "rdseed"),
    (19, "adx"),
    (29, "sha"),
];
const LEAF7_ECX_FLAGS: &[(usize, &str)] = &[(1, "avx512vbmi"), (8, "gfni"), (9, "vaes")];
const EXTENDED1_ECX_FLAGS: &[(usize, &str)] =
    &[(0, "lahf_lm"), (5, "abm"), (6, "sse4a"), (8, "3dnowprefetch")];
const EXTENDED1_EDX_FLAGS: &[(usize, &str)] = &[
    (11, "syscall"),
    (20, "nx"),
    (26, "pdpe1gb"),
    (27, "rdtscp"),
    (29, "lm"),
];

/// Decodes the fields of one row, as far as this module knows the leaf.
///
/// `info` resolves the vendor-dependent leaves: cache parameters live in
/// leaf 4 on Intel and in leaf 0x8000_001D on AMD. An unrecognized leaf
/// decodes to an empty list; that is expected, not an error.
pub fn decode_row(row: &DumpRow, info: &VendorInfo) -> Vec<DecodedField> {
    let result = &row.result;
    match (row.query.leaf, row.query.subleaf) {
        (0x0, 0) => decode_leaf0(result),
        (0x1, 0) => decode_leaf1(result),
        (0x4, _) if info.vendor == Vendor::Intel => decode_cache(result),
        (0x7, 0) => decode_leaf7(result),
        (0xb | 0x1f, _) => decode_topology(result),
        (0x8000_0000, 0) if result.eax >= EXTENDED_FUNCTION_BASE => {
            vec![DecodedField::new(
                "max extended leaf",
                format!("{:#x}", result.eax),
            )]
        }
        (0x8000_0001, 0) => decode_extended1(result),
        (0x8000_0002..=0x8000_0004, 0) => decode_brand_fragment(result),
        (0x8000_0008, 0) if result.eax.get_bits(0..8) != 0 => vec![
            DecodedField::new(
                "physical address bits",
                result.eax.get_bits(0..8).to_string(),
            ),
            DecodedField::new("linear address bits", result.eax.get_bits(8..16).to_string()),
        ],
        (0x8000_001d, _) if info.vendor == Vendor::Amd => decode_cache(result),
        _ => Vec::new(),
    }
}

fn decode_leaf0(result: &LeafResult) -> Vec<DecodedField> {
    // The vendor string is reported in EBX, EDX, ECX order.
    let mut bytes = result.ebx.to_le_bytes().to_vec();
    bytes.extend(result.edx.to_le_bytes());
    bytes.extend(result.ecx.to_le_bytes());
    vec![
        DecodedField::new("vendor", String::from_utf8_lossy(&bytes).into_owned()),
        DecodedField::new("max basic leaf", format!("{:#x}", result.eax)),
    ]
}

fn decode_leaf1(result: &LeafResult) -> Vec<DecodedField> {
    let stepping = result.eax.get_bits(0..4);
    let mut model = result.eax.get_bits(4..8);
    let mut family = result.eax.get_bits(8..12);

    // The extended fields fold in only for the families that overflow the
    // base ones.
    if family == 0xf {
        family += result.eax.get_bits(20..28);
    }
    if family >= 0x6 {
        model += result.eax.get_bits(16..20) << 4;
    }

    let mut fields = vec![
        DecodedField::new("family", format!("{family:#x}")),
        DecodedField::new("model", format!("{model:#x}")),
        DecodedField::new("stepping", format!("{stepping:#x}")),
        DecodedField::new(
            "initial apic id",
            result.ebx.get_bits(24..32).to_string(),
        ),
    ];
    fields.extend(flag_names("features (ecx)", result.ecx, LEAF1_ECX_FLAGS));
    fields.extend(flag_names("features (edx)", result.edx, LEAF1_EDX_FLAGS));
    fields
}

fn decode_leaf7(result: &LeafResult) -> Vec<DecodedField> {
    let mut fields = Vec::new();
    fields.extend(flag_names("features (ebx)", result.ebx, LEAF7_EBX_FLAGS));
    fields.extend(flag_names("features (ecx)", result.ecx, LEAF7_ECX_FLAGS));
    fields
}

fn decode_extended1(result: &LeafResult) -> Vec<DecodedField> {
    let mut fields = Vec::new();
    fields.extend(flag_names("features (ecx)", result.ecx, EXTENDED1_ECX_FLAGS));
    fields.extend(flag_names("features (edx)", result.edx, EXTENDED1_EDX_FLAGS));
    fields
}

fn decode_cache(result: &LeafResult) -> Vec<DecodedField> {
    let kind = match result.eax.get_bits(0..5) {
        1 => "data",
        2 => "instruction",
        3 => "unified",
        _ => return Vec::new(),
    };
    let level = result.eax.get_bits(5..8);
    let ways = u64::from(result.ebx.get_bits(22..32)) + 1;
    let partitions = u64::from(result.ebx.get_bits(12..22)) + 1;
    let line_size = u64::from(result.ebx.get_bits(0..12)) + 1;
    let sets = u64::from(result.ecx) + 1;
    let size_kib = ways * partitions * line_size * sets / 1024;
    vec![DecodedField::new(
        "cache",
        format!("L{level} {kind}, {size_kib} KiB, {ways}-way, {line_size}-byte lines"),
    )]
}

fn decode_topology(result: &LeafResult) -> Vec<DecodedField> {
    let level_type = match result.ecx.get_bits(8..16) {
        1 => "thread",
        2 => "core",
        3 => "module",
        4 => "tile",
        5 => "die",
        6 => "die group",
        _ => return Vec::new(),
    };
    let level = result.ecx.get_bits(0..8);
    let count = result.ebx.get_bits(0..16);
    let shift = result.eax.get_bits(0..5);
    vec![DecodedField::new(
        "topology level",
        format!("level {level} {level_type}: {count} logical processors, apic shift {shift}"),
    )]
}

fn decode_brand_fragment(result: &LeafResult) -> Vec<DecodedField> {
    let mut bytes = result.eax.to_le_bytes().to_vec();
    bytes.extend(result.ebx.to_le_bytes());
    bytes.extend(result.ecx.to_le_bytes());
    bytes.extend(result.edx.to_le_bytes());
    let fragment = String::from_utf8_lossy(&bytes)
        .trim_end_matches('\0')
        .to_string();
    if fragment.is_empty() {
        return Vec::new();
    }
    vec![DecodedField::new("brand string fragment", fragment)]
}

fn flag_names(name: &'static str, register: u32, table: &[(usize, &'static str)]) -> Option<DecodedField> {
    let set: Vec<_> = table
        .iter()
        .filter(|(bit, _)| register.get_bit(*bit))
        .map(|(_, flag)| *flag)
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(DecodedField::new(name, set.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intel_info() -> VendorInfo {
        VendorInfo {
            vendor: Vendor::Intel,
            max_basic_leaf: 0x1f,
            max_extended_leaf: 0x8000_0008,
        }
    }

    fn amd_info() -> VendorInfo {
        VendorInfo {
            vendor: Vendor::Amd,
            max_basic_leaf: 0x10,
            max_extended_leaf: 0x8000_001d,
        }
    }

    fn field<'a>(fields: &'a [DecodedField], name: &str) -> &'a str {
        &fields
            .iter()
            .find(|field| field.name == name)
            .unwrap_or_else(|| panic!("no field {name}"))
            .value
    }

    #[test]
    fn vendor_string_is_reassembled_in_register_order() {
        let row = DumpRow::new(
            0,
            0,
            LeafResult::new(
                0xd,
                u32::from_ne_bytes(*b"Genu"),
                u32::from_ne_bytes(*b"ntel"),
                u32::from_ne_bytes(*b"ineI"),
            ),
        );
        let fields = decode_row(&row, &intel_info());
        assert_eq!(field(&fields, "vendor"), "GenuineIntel");
        assert_eq!(field(&fields, "max basic leaf"), "0xd");
    }

    #[test]
    fn family_model_stepping_fold_for_intel() {
        // A Haswell signature.
        let row = DumpRow::new(1, 0, LeafResult::new(0x0003_06c3, 0x0200_0800, 0, 0));
        let fields = decode_row(&row, &intel_info());
        assert_eq!(field(&fields, "family"), "0x6");
        assert_eq!(field(&fields, "model"), "0x3c");
        assert_eq!(field(&fields, "stepping"), "0x3");
        assert_eq!(field(&fields, "initial apic id"), "2");
    }

    #[test]
    fn family_model_stepping_fold_for_amd() {
        // A Zen 3 signature: both extended fields participate.
        let row = DumpRow::new(1, 0, LeafResult::new(0x00a2_0f10, 0, 0, 0));
        let fields = decode_row(&row, &amd_info());
        assert_eq!(field(&fields, "family"), "0x19");
        assert_eq!(field(&fields, "model"), "0x21");
        assert_eq!(field(&fields, "stepping"), "0x0");
    }

    #[test]
    fn feature_flags_are_listed_by_name() {
        let row = DumpRow::new(1, 0, LeafResult::new(0, 0, 0x7ffa_fbff, 0xbfeb_fbff));
        let fields = decode_row(&row, &intel_info());
        let ecx = field(&fields, "features (ecx)");
        assert!(ecx.contains("sse4.2"));
        assert!(ecx.contains("avx"));
        let edx = field(&fields, "features (edx)");
        assert!(edx.contains("sse2"));
        assert!(edx.contains("tsc"));
    }

    #[test]
    fn cache_parameters_decode_size_and_shape() {
        // 8-way, 64 sets, 64-byte lines: a 32 KiB L1 data cache.
        let row = DumpRow::new(4, 0, LeafResult::new(0x1c00_4121, 0x01c0_003f, 0x3f, 0));
        let fields = decode_row(&row, &intel_info());
        assert_eq!(
            field(&fields, "cache"),
            "L1 data, 32 KiB, 8-way, 64-byte lines"
        );
    }

    #[test]
    fn cache_leaves_are_vendor_specific() {
        let intel_style = DumpRow::new(4, 0, LeafResult::new(0x1c00_4121, 0x01c0_003f, 0x3f, 0));
        let amd_style =
            DumpRow::new(0x8000_001d, 0, LeafResult::new(0x121, 0x01c0_003f, 0x3f, 0));

        assert!(decode_row(&intel_style, &amd_info()).is_empty());
        assert!(decode_row(&amd_style, &intel_info()).is_empty());
        assert!(!decode_row(&amd_style, &amd_info()).is_empty());
    }

    #[test]
    fn topology_levels_are_named() {
        let row = DumpRow::new(0xb, 1, LeafResult::new(0x4, 0x8, 0x201, 0));
        let fields = decode_row(&row, &intel_info());
        assert_eq!(
            field(&fields, "topology level"),
            "level 1 core: 8 logical processors, apic shift 4"
        );
    }

    #[test]
    fn brand_fragments_are_plain_text() {
        let row = DumpRow::new(
            0x8000_0002,
            0,
            LeafResult::new(0x6574_6e49, 0x2952_286c, 0x726f_4320, 0x4d54_2865),
        );
        let fields = decode_row(&row, &intel_info());
        assert_eq!(field(&fields, "brand string fragment"), "Intel(R) Core(TM");
    }

    #[test]
    fn address_widths_decode_from_the_extended_leaf() {
        let row = DumpRow::new(0x8000_0008, 0, LeafResult::new(0x3027, 0, 0, 0));
        let fields = decode_row(&row, &intel_info());
        assert_eq!(field(&fields, "physical address bits"), "39");
        assert_eq!(field(&fields, "linear address bits"), "48");
    }

    #[test]
    fn unknown_leaves_decode_to_nothing() {
        let zeroed = VendorInfo {
            vendor: Vendor::Other,
            max_basic_leaf: 5,
            max_extended_leaf: 0,
        };
        for leaf in [0x2, 0x3, 0x5, 0x6, 0x40000000, 0x8000_0007] {
            let row = DumpRow::new(leaf, 0, LeafResult::new(1, 2, 3, 4));
            assert!(decode_row(&row, &zeroed).is_empty(), "leaf {leaf:#x}");
        }
    }

    #[test]
    fn sentinel_records_decode_to_nothing() {
        let cache = DumpRow::new(4, 0, LeafResult::default());
        let topology = DumpRow::new(0xb, 0, LeafResult::default());
        assert!(decode_row(&cache, &intel_info()).is_empty());
        assert!(decode_row(&topology, &intel_info()).is_empty());
    }
}
