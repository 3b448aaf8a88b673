//! Cross-Runtime Ownership Handoff
//!
//! Neither runtime shares an allocator with the other, so an aliased buffer
//! cannot be freed by whichever side happens to drop it last. Instead, the
//! side that hands its buffer over installs a release callback at the
//! consuming side's deallocation point. `OwnershipToken` is that callback,
//! boxed up so Rust's drop glue fires it exactly once.
//!
//! ## Lifecycle
//!
//! - Created once per successful aliasing transfer (or embedded in an
//!   engine allocation at construction time).
//! - Fired exactly once, when the owning value is dropped.
//! - Never fired if the transfer fails before completion: `disarm` (or
//!   `take`, which re-homes the callback into a new token) leaves the
//!   original token inert.

use std::fmt;

type ReleaseFn = Box<dyn FnOnce() + Send + Sync>;

/// A no-argument release callback fired exactly once on drop.
///
/// Ownership is always singular: whichever value holds the armed token is
/// the one responsible for notifying the source runtime.
pub struct OwnershipToken {
    release: Option<ReleaseFn>,
}

impl OwnershipToken {
    /// Create a token that fires `release` when dropped.
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Create a token with no callback.
    pub fn inert() -> Self {
        Self { release: None }
    }

    /// Check whether the token still holds its callback.
    pub fn is_armed(&self) -> bool {
        self.release.is_some()
    }

    /// Drop the callback without firing it.
    ///
    /// Used when a transfer fails before completion: the original owner
    /// still owns the buffer and must free it through its own path.
    pub fn disarm(&mut self) {
        self.release = None;
    }

    /// Move the callback into a fresh token, leaving this one inert.
    ///
    /// This is the handoff primitive: the source's release obligation is
    /// relinquished at the exact point the destination assumes it.
    pub fn take(&mut self) -> OwnershipToken {
        Self {
            release: self.release.take(),
        }
    }
}

impl Drop for OwnershipToken {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for OwnershipToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnershipToken")
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_token(count: &Arc<AtomicUsize>) -> OwnershipToken {
        let count = Arc::clone(count);
        OwnershipToken::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_fires_exactly_once_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = counter_token(&count);
        assert!(token.is_armed());
        drop(token);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disarmed_token_never_fires() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut token = counter_token(&count);
        token.disarm();
        assert!(!token.is_armed());
        drop(token);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_take_rehomes_the_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut token = counter_token(&count);
        let moved = token.take();
        assert!(!token.is_armed());
        assert!(moved.is_armed());

        drop(token);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        drop(moved);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inert_token() {
        let token = OwnershipToken::inert();
        assert!(!token.is_armed());
    }
}
