//! The Leaf Enumerator: decides which leaves and subleaves exist on the
//! target processor and executes them, in order, exactly once each.

use bit_field::BitField;

use super::ops::CpuidOps;
use super::registers::{DumpRow, LeafResult};
use super::vendor::{EXTENDED_FUNCTION_BASE, Vendor, VendorInfo};

// Basic leaves whose subleaf count is not fixed.
// See: (Intel) Table 3-8. Information Returned by CPUID Instruction
// See: (AMD) Appendix E, Obtaining Processor Information Via the CPUID Instruction
const CACHE_PARAMETERS_LEAF: u32 = 0x4;
const EXTENDED_FEATURES_LEAF: u32 = 0x7;
const TOPOLOGY_LEAF: u32 = 0xb;
const TOPOLOGY_V2_LEAF: u32 = 0x1f;

/// CPUID Fn8000_001D, cache properties. The one extended leaf with subleaf
/// iteration, and only meaningful on AMD parts.
const AMD_CACHE_PROPERTIES_LEAF: u32 = 0x8000_001d;

/// Upper bound on any subleaf walk. Real parts report single-digit subleaf
/// counts; a walk that has not hit its terminator by this point is reading a
/// processor that never reports one.
const MAX_SUBLEAF_WALK: u32 = 0xff;

/// Executes every leaf and subleaf the processor behind `ops` implements and
/// returns the rows in enumeration order: basic leaves ascending, then the
/// extended range, subleaves ascending within each leaf.
///
/// Each query is executed once, and only after the queries it depends on
/// (the enumeration of leaf 5 cannot start before leaf 0 has answered how
/// far the basic range goes).
pub fn enumerate(ops: &dyn CpuidOps) -> (VendorInfo, Vec<DumpRow>) {
    // Both boundary leaves are read up front: every later enumeration
    // decision depends on them. Their results double as their rows.
    let leaf0 = execute(ops, 0, 0);
    let extended0 = execute(ops, EXTENDED_FUNCTION_BASE, 0);
    let info = VendorInfo::from_roots(&leaf0, &extended0);

    let mut rows = vec![DumpRow::new(0, 0, leaf0)];
    for leaf in 1..=info.max_basic_leaf {
        match leaf {
            CACHE_PARAMETERS_LEAF | TOPOLOGY_LEAF | TOPOLOGY_V2_LEAF => {
                walk_sentinel_subleaves(ops, leaf, &mut rows);
            }
            EXTENDED_FEATURES_LEAF => walk_declared_subleaves(ops, leaf, &mut rows),
            _ => rows.push(DumpRow::new(leaf, 0, execute(ops, leaf, 0))),
        }
    }

    // A processor without the extended range echoes basic-leaf data (or
    // zeros) for leaf 0x8000_0000; only a maximum inside the range means the
    // range exists.
    if info.max_extended_leaf >= EXTENDED_FUNCTION_BASE {
        rows.push(DumpRow::new(EXTENDED_FUNCTION_BASE, 0, extended0));
        for leaf in EXTENDED_FUNCTION_BASE + 1..=info.max_extended_leaf {
            if leaf == AMD_CACHE_PROPERTIES_LEAF && info.vendor == Vendor::Amd {
                walk_sentinel_subleaves(ops, leaf, &mut rows);
            } else {
                rows.push(DumpRow::new(leaf, 0, execute(ops, leaf, 0)));
            }
        }
    }

    (info, rows)
}

fn execute(ops: &dyn CpuidOps, leaf: u32, subleaf: u32) -> LeafResult {
    log::trace!("CPUID {leaf:#x?} {subleaf:#x?}");
    ops.cpuid(leaf, subleaf)
}

/// Walks a sentinel-terminated leaf: subleaf 0, 1, 2, ... until the first
/// record whose termination field reads invalid. The sentinel record is not
/// emitted, except at subleaf 0 so that an in-range leaf never disappears
/// from the dump entirely.
fn walk_sentinel_subleaves(ops: &dyn CpuidOps, leaf: u32, rows: &mut Vec<DumpRow>) {
    for subleaf in 0..=MAX_SUBLEAF_WALK {
        let result = execute(ops, leaf, subleaf);
        let sentinel = is_sentinel(leaf, &result);
        if subleaf == 0 || !sentinel {
            rows.push(DumpRow::new(leaf, subleaf, result));
        }
        if sentinel {
            break;
        }
    }
}

fn is_sentinel(leaf: u32, result: &LeafResult) -> bool {
    match leaf {
        // Cache type field: 0 = no more caches.
        CACHE_PARAMETERS_LEAF | AMD_CACHE_PROPERTIES_LEAF => result.eax.get_bits(0..5) == 0,
        // Topology level type: 0 = invalid level.
        TOPOLOGY_LEAF | TOPOLOGY_V2_LEAF => result.ecx.get_bits(8..16) == 0,
        _ => unreachable!("leaf {leaf:#x} has no sentinel subleaf"),
    }
}

/// Walks a leaf whose subleaf 0 declares, in EAX, the index of its last
/// valid subleaf.
fn walk_declared_subleaves(ops: &dyn CpuidOps, leaf: u32, rows: &mut Vec<DumpRow>) {
    let first = execute(ops, leaf, 0);
    let last = first.eax.min(MAX_SUBLEAF_WALK);
    rows.push(DumpRow::new(leaf, 0, first));
    for subleaf in 1..=last {
        rows.push(DumpRow::new(leaf, subleaf, execute(ops, leaf, subleaf)));
    }
}
