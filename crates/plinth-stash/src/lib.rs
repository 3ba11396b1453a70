//! Replica message stashing for the Plinth validator core.
//!
//! A replica that is catching up, mid view-change, or outside its
//! checkpoint watermarks cannot process every protocol message the
//! moment it arrives. The [`Stasher`] buffers such messages in one FIFO
//! bucket per [`StashReason`] and replays them deterministically once
//! the blocking condition clears, re-entering the ordinary inbound
//! path rather than any shortcut.

pub mod stasher;

pub use stasher::{Disposition, DrainSummary, StashReason, Stasher};
