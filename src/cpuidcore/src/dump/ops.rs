//! The Leaf Executor seam: a trait for issuing one identification query, and
//! the hardware-backed implementation of it.

use super::DumpError;
use super::registers::LeafResult;

/// Executes a single identification query.
///
/// An implementation must report whatever registers the target answers with,
/// including all-zero for unimplemented leaves. It performs no validation,
/// no caching and has no observable effect on program state; deciding
/// whether a leaf is meaningful is the enumerator's job.
pub trait CpuidOps {
    /// Executes the query for `(leaf, subleaf)` exactly as requested.
    fn cpuid(&self, leaf: u32, subleaf: u32) -> LeafResult;
}

/// The production executor, backed by the CPUID instruction of the calling
/// thread's current core.
///
/// Constructing one is the architecture gate: on targets without the
/// instruction, [`HardwareCpuid::new`] reports
/// [`DumpError::UnsupportedPlatform`] and no executor ever exists.
#[derive(Clone, Copy, Debug)]
pub struct HardwareCpuid {
    _no_external_construction: (),
}

impl HardwareCpuid {
    /// Returns an executor for the current processor, or
    /// [`DumpError::UnsupportedPlatform`] if this architecture cannot issue
    /// the identification instruction.
    pub fn new() -> Result<Self, DumpError> {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            Ok(Self {
                _no_external_construction: (),
            })
        }
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        {
            Err(DumpError::UnsupportedPlatform)
        }
    }
}

impl CpuidOps for HardwareCpuid {
    fn cpuid(&self, leaf: u32, subleaf: u32) -> LeafResult {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            let regs = raw_cpuid::cpuid!(leaf, subleaf);
            LeafResult::new(regs.eax, regs.ebx, regs.ecx, regs.edx)
        }
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        {
            let _ = (leaf, subleaf);
            // `new` never hands out an instance on these targets.
            unreachable!()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[test]
    fn hardware_executor_reports_a_nonzero_leaf0() {
        let ops = HardwareCpuid::new().unwrap();
        let leaf0 = ops.cpuid(0, 0);
        // Every x86 part implements at least leaf 1 and a vendor string.
        assert!(leaf0.eax >= 1);
        assert_ne!(leaf0.ebx, 0);
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    #[test]
    fn hardware_executor_is_refused() {
        assert!(HardwareCpuid::new().is_err());
    }
}
