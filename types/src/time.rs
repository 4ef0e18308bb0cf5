//! Network time and close-time rounding.
//!
//! CREST close times are expressed in whole seconds since the network epoch
//! (2000-01-01 00:00:00 UTC). Validators deliberately report close times at a
//! coarse resolution so that honest nodes with slightly different clocks can
//! still agree on the close-time field.

use crate::LedgerIndex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Seconds between the Unix epoch and the network epoch (2000-01-01 UTC).
pub const NETWORK_EPOCH_OFFSET: u64 = 946_684_800;

/// A point in network time: whole seconds since the network epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NetTime(u64);

impl NetTime {
    /// The null time point. Used as the "no agreed close time" sentinel.
    pub const NULL: Self = Self(0);

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Convert from a Unix timestamp (seconds since 1970).
    pub fn from_unix(unix_secs: u64) -> Self {
        Self(unix_secs.saturating_sub(NETWORK_EPOCH_OFFSET))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn saturating_sub(&self, other: NetTime) -> u64 {
        self.0.saturating_sub(other.0)
    }
}

impl Add<u64> for NetTime {
    type Output = NetTime;

    fn add(self, secs: u64) -> NetTime {
        NetTime(self.0.saturating_add(secs))
    }
}

impl Sub<u64> for NetTime {
    type Output = NetTime;

    fn sub(self, secs: u64) -> NetTime {
        NetTime(self.0.saturating_sub(secs))
    }
}

impl fmt::Display for NetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// The close-time resolution grid, in seconds.
///
/// Possible resolutions, coarsest last. A round's resolution moves one step
/// finer when the network has been agreeing on close times, one step coarser
/// when it has not.
pub const POSSIBLE_RESOLUTIONS: [u32; 6] = [10, 20, 30, 60, 90, 120];

/// How often (in ledgers) the resolution may decrease (become finer).
const DECREASE_INTERVAL: LedgerIndex = 8;
/// How often (in ledgers) the resolution may increase (become coarser).
const INCREASE_INTERVAL: LedgerIndex = 2;

/// A close-time resolution: the grid spacing close times are snapped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseResolution(u32);

impl CloseResolution {
    /// The resolution used for the ledger right after genesis.
    pub const INITIAL: Self = Self(POSSIBLE_RESOLUTIONS[2]);

    pub fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u32 {
        self.0
    }

    /// Resolution for the ledger at `seq`, given the previous ledger's
    /// resolution and whether the previous round agreed on a close time.
    ///
    /// Agreement lets the grid tighten every [`DECREASE_INTERVAL`] ledgers;
    /// disagreement widens it every [`INCREASE_INTERVAL`] ledgers.
    pub fn next(&self, previous_agree: bool, seq: LedgerIndex) -> Self {
        let idx = POSSIBLE_RESOLUTIONS
            .iter()
            .position(|&r| r == self.0)
            .unwrap_or(2);

        if previous_agree && seq % DECREASE_INTERVAL == 0 && idx > 0 {
            Self(POSSIBLE_RESOLUTIONS[idx - 1])
        } else if !previous_agree && seq % INCREASE_INTERVAL == 0 && idx + 1 < POSSIBLE_RESOLUTIONS.len()
        {
            Self(POSSIBLE_RESOLUTIONS[idx + 1])
        } else {
            *self
        }
    }
}

/// Round `time` to the nearest multiple of `resolution` (round-half-up).
pub fn round_close_time(time: NetTime, resolution: CloseResolution) -> NetTime {
    let res = u64::from(resolution.as_secs());
    if res <= 1 {
        return time;
    }
    let t = time.as_secs() + res / 2;
    NetTime::from_secs(t - t % res)
}

/// The effective close time for a building ledger.
///
/// The agreed close time is snapped to the resolution grid, then clamped to be
/// strictly after the parent's close time so that ledger close times are
/// always strictly increasing.
pub fn effective_close_time(
    agreed: NetTime,
    resolution: CloseResolution,
    prev_close: NetTime,
) -> NetTime {
    let rounded = round_close_time(agreed, resolution);
    NetTime::from_secs(rounded.as_secs().max(prev_close.as_secs() + 1))
}
