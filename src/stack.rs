//! Keeps deeply nested parsing and evaluation off the edge of the host stack.
//!
//! Recursive steps run through [`ensure_sufficient_stack`], which switches to
//! a freshly allocated segment when the current one is nearly used up.

/// Remaining stack below which a new segment is allocated
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated segment
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
