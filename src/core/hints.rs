/*!
 * Compiler and CPU Hints
 * Branch prediction hints and the spin-loop relax used by busy-wait paths
 */

#![allow(unused)]

/// Hint to the compiler that this branch is likely to be taken
///
/// # Implementation
/// On nightly with core_intrinsics, uses LLVM's `llvm.expect` intrinsic.
/// On stable, returns the value unchanged.
#[inline(always)]
#[must_use]
pub fn likely(b: bool) -> bool {
    #[cfg(feature = "nightly")]
    {
        unsafe { core::intrinsics::likely(b) }
    }
    #[cfg(not(feature = "nightly"))]
    {
        b
    }
}

/// Hint to the compiler that this branch is unlikely to be taken
///
/// Use for contract-violation and contention paths.
#[inline(always)]
#[must_use]
pub fn unlikely(b: bool) -> bool {
    #[cfg(feature = "nightly")]
    {
        unsafe { core::intrinsics::unlikely(b) }
    }
    #[cfg(not(feature = "nightly"))]
    {
        b
    }
}

/// Tell the CPU we are in a spin-wait loop (`pause` on x86, `yield` on ARM)
#[inline(always)]
pub fn cpu_relax() {
    std::hint::spin_loop();
}
