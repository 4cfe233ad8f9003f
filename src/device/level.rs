/*!
Organization levels and address vectors.

`Level` mirrors the fixed ordering the rest of the device model assumes:
channel, rank, bankgroup, bank, row, column. Grounded on
`examples/original_source/src/dram/impl/DDR4.cpp`'s `m_levels` table --
the same six names, in the same order, everywhere a level index is used
(command scopes, organization counts, address vectors).

Only `Channel`..`Bank` have `Node`s in the device tree (see
`device::node`); `Row` and `Column` exist here purely so `AddrVec` and
command scopes can refer to them.
*/

use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Channel = 0,
    Rank = 1,
    BankGroup = 2,
    Bank = 3,
    Row = 4,
    Column = 5,
}

pub const LEVEL_COUNT: usize = 6;

pub const ALL_LEVELS: [Level; LEVEL_COUNT] = [
    Level::Channel,
    Level::Rank,
    Level::BankGroup,
    Level::Bank,
    Level::Row,
    Level::Column,
];

impl Level {
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The next level down the hierarchy, or `None` past `Column`.
    pub const fn child(self) -> Option<Level> {
        match self {
            Level::Channel => Some(Level::Rank),
            Level::Rank => Some(Level::BankGroup),
            Level::BankGroup => Some(Level::Bank),
            Level::Bank => Some(Level::Row),
            Level::Row => Some(Level::Column),
            Level::Column => None,
        }
    }

    /// The deepest level that actually owns a `Node` in the device tree.
    pub const fn is_node_level(self) -> bool {
        matches!(self, Level::Channel | Level::Rank | Level::BankGroup | Level::Bank)
    }
}

/// A wildcard-capable address: one index per `Level`, `-1` meaning "any".
///
/// Represented as a fixed `[i32; LEVEL_COUNT]` rather than a `Vec` since
/// the number of levels is fixed at compile time; this is the idiomatic
/// replacement for the original's `std::vector<int> AddrVec_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct AddrVec(pub [i32; LEVEL_COUNT]);

pub const WILDCARD: i32 = -1;

impl AddrVec {
    pub const fn wildcard() -> Self {
        AddrVec([WILDCARD; LEVEL_COUNT])
    }

    pub fn get(&self, level: Level) -> i32 {
        self.0[level.index()]
    }

    pub fn set(&mut self, level: Level, value: i32) {
        self.0[level.index()] = value;
    }

    pub fn with(mut self, level: Level, value: i32) -> Self {
        self.set(level, value);
        self
    }

    pub fn is_wildcard(&self, level: Level) -> bool {
        self.get(level) == WILDCARD
    }

    /// True iff every non-wildcard slot in `self` and `other` agree, up to
    /// and including `through`. Used by the row-close veto (spec §4.2
    /// step 7) and the APA interruption veto (spec §4.3) which both
    /// compare address vectors "at bank granularity".
    pub fn overlaps_through(&self, other: &AddrVec, through: Level) -> bool {
        for level in ALL_LEVELS.iter().copied() {
            let a = self.get(level);
            let b = other.get(level);
            if a != WILDCARD && b != WILDCARD && a != b {
                return false;
            }
            if level == through {
                break;
            }
        }
        true
    }
}

impl Index<Level> for AddrVec {
    type Output = i32;
    fn index(&self, level: Level) -> &i32 {
        &self.0[level.index()]
    }
}

impl IndexMut<Level> for AddrVec {
    fn index_mut(&mut self, level: Level) -> &mut i32 {
        &mut self.0[level.index()]
    }
}

/// Per-level fan-out plus the chip parameters needed for the density
/// sanity check (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Organization {
    pub count: [u64; LEVEL_COUNT],
    pub density_mb: u64,
    pub dq: u32,
    pub channel_width: u32,
}

impl Organization {
    /// `bg * ba * rows * cols * dq` (bits), shifted right by 20, must equal
    /// the declared density. Mirrors `DDR4::set_organization`'s sanity
    /// check verbatim.
    pub fn validate_density(&self) -> Result<(), crate::error::ConfigError> {
        let calculated = (self.count[Level::BankGroup.index()]
            * self.count[Level::Bank.index()]
            * self.count[Level::Row.index()]
            * self.count[Level::Column.index()]
            * self.dq as u64)
            >> 20;
        if calculated != self.density_mb {
            return Err(crate::error::ConfigError::DensityMismatch {
                calculated,
                declared: self.density_mb,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_ignores_wildcards() {
        let a = AddrVec([0, 0, 1, 2, -1, -1]);
        let b = AddrVec([0, 0, 1, 2, 5, -1]);
        assert!(a.overlaps_through(&b, Level::Bank));
    }

    #[test]
    fn overlap_detects_mismatch() {
        let a = AddrVec([0, 0, 1, 2, -1, -1]);
        let b = AddrVec([0, 0, 1, 3, -1, -1]);
        assert!(!a.overlaps_through(&b, Level::Bank));
    }

    #[test]
    fn density_matches_ddr4_2gb_x8() {
        let org = Organization {
            count: [1, 1, 4, 4, 1 << 14, 1 << 10],
            density_mb: 2 << 10,
            dq: 8,
            channel_width: 64,
        };
        org.validate_density().unwrap();
    }
}
