//! Debug-only guard against nested entry into a `CarDb`.
//!
//! Every table operation runs to completion, drain step included, before it
//! returns. The only foreign code called while slots are being rewritten is
//! the user's `BuildHasher`. If that code ever reaches back into the same
//! table, debug builds panic rather than observe a half-drained generation.
//! Release builds compile the check away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table busy flag. Public entry points open a section with
/// `let _g = self.reentrancy.enter();`.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // !Sync in every build profile, not only when `busy` exists.
    _unsync: PhantomData<Cell<()>>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _unsync: PhantomData,
        }
    }

    /// Opens an exclusive section. Panics in debug builds if one is already
    /// open on this table.
    #[inline]
    pub(crate) fn enter(&self) -> Section<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "reentrancy detected: CarDb entered while an operation was in progress"
            );
        }
        Section { owner: self }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes the section on drop.
pub(crate) struct Section<'a> {
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    owner: &'a DebugReentrancy,
}

impl Drop for Section<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let was_busy = self.owner.busy.replace(false);
            debug_assert!(was_busy);
        }
    }
}
