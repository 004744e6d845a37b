//! Process-wide context identifiers

use std::sync::atomic::{AtomicU32, Ordering};

/// Identifier of a shared context, never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u32);

/// Reserved value meaning "no context"
pub const INVALID_CONTEXT_ID: u32 = 0;

static NEXT_CONTEXT_ID: AtomicU32 = AtomicU32::new(1);

impl ContextId {
    /// Allocate the next identifier
    ///
    /// Lock-free; concurrent callers never observe the same value. After
    /// `u32::MAX` the counter wraps to 1, skipping the reserved 0.
    pub fn next() -> Self {
        Self(allocate(&NEXT_CONTEXT_ID))
    }

    /// Raw value
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Claim the current value of `counter` and advance it, wrapping past zero
fn allocate(counter: &AtomicU32) -> u32 {
    let mut current = counter.load(Ordering::Relaxed);
    loop {
        let next = if current == u32::MAX { 1 } else { current + 1 };
        match counter.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return current,
            Err(actual) => current = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_nonzero_and_increasing() {
        let a = ContextId::next();
        let b = ContextId::next();
        assert_ne!(a.get(), INVALID_CONTEXT_ID);
        assert_ne!(a, b);
    }

    #[test]
    fn test_counter_wraps_past_zero() {
        let counter = AtomicU32::new(u32::MAX - 1);
        assert_eq!(allocate(&counter), u32::MAX - 1);
        assert_eq!(allocate(&counter), u32::MAX);
        assert_eq!(allocate(&counter), 1);
        assert_eq!(allocate(&counter), 2);
    }
}
