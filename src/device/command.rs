/*!
The DDR4 + PuM command enumeration and its static metadata.

Grounded on `DDR4::m_commands`/`m_command_scopes`/`m_command_meta` in
`examples/original_source/src/dram/impl/DDR4.cpp`. `RDA`/`WRA`
(auto-precharge variants) are dropped: spec.md's Read/Write never mention
auto-precharge, and the rest of the original's command set is preserved.
`REFsb`/`REFsb_end`/`VRR`/`VRR_end`/`PREsb` are kept even though spec.md's
FSM diagram only names `REFab` -- `action.h` defines them alongside REFab
and spec §4.1 calls the device's command set "the set is extensible",
so per-bankgroup refresh and rank-level VRR stay in as a supplemental,
not-excluded feature (see SPEC_FULL.md §3).
*/

use crate::device::level::Level;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Act,
    Pre,
    Prea,
    Presb,
    Rd,
    Wr,
    Refab,
    RefabEnd,
    Refsb,
    RefsbEnd,
    Vrr,
    VrrEnd,
    Actp,
    Actv,
    Prev,
    Prej,
    Pref,
    Rc,
    Maj,
    Frac,
}

pub const ALL_COMMANDS: [Command; 20] = [
    Command::Act,
    Command::Pre,
    Command::Prea,
    Command::Presb,
    Command::Rd,
    Command::Wr,
    Command::Refab,
    Command::RefabEnd,
    Command::Refsb,
    Command::RefsbEnd,
    Command::Vrr,
    Command::VrrEnd,
    Command::Actp,
    Command::Actv,
    Command::Prev,
    Command::Prej,
    Command::Pref,
    Command::Rc,
    Command::Maj,
    Command::Frac,
];

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const COMMAND_COUNT: usize = ALL_COMMANDS.len();

impl Command {
    /// Dense index into per-command arrays (`Node::cmd_ready_clk` etc.),
    /// matching `ALL_COMMANDS`'s order.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Command::Act => "ACT",
            Command::Pre => "PRE",
            Command::Prea => "PREA",
            Command::Presb => "PREsb",
            Command::Rd => "RD",
            Command::Wr => "WR",
            Command::Refab => "REFab",
            Command::RefabEnd => "REFab_end",
            Command::Refsb => "REFsb",
            Command::RefsbEnd => "REFsb_end",
            Command::Vrr => "VRR",
            Command::VrrEnd => "VRR_end",
            Command::Actp => "ACTp",
            Command::Actv => "ACTv",
            Command::Prev => "PREv",
            Command::Prej => "PREj",
            Command::Pref => "PREf",
            Command::Rc => "RC",
            Command::Maj => "MAJ",
            Command::Frac => "FRAC",
        }
    }

    /// The level at which this command's side effects (state/action
    /// updates) stop recursing. Grounded on `DDR4::m_command_scopes`.
    pub const fn scope(self) -> Level {
        match self {
            Command::Act | Command::Actp | Command::Actv => Level::Row,
            Command::Rd | Command::Wr => Level::Column,
            Command::Pre
            | Command::Rc
            | Command::Maj
            | Command::Frac
            | Command::Prev
            | Command::Prej
            | Command::Pref => Level::Bank,
            Command::Presb | Command::Refsb | Command::RefsbEnd => Level::BankGroup,
            Command::Prea | Command::Refab | Command::RefabEnd | Command::Vrr | Command::VrrEnd => {
                Level::Rank
            }
        }
    }
}

/// Per-command scheduler-relevant flags. Grounded on `DDR4::m_command_meta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMeta {
    /// Once issued, the owning request is copied into the active buffer
    /// and kept there until its `final_command` fires (spec §4.2 step 9).
    pub is_opening: bool,
    /// Vetoes scheduling anything that would close a bank the active
    /// buffer still needs open (spec §4.2 step 7).
    pub is_closing: bool,
    pub is_access: bool,
    pub is_refresh: bool,
}

impl Command {
    pub const fn meta(self) -> CommandMeta {
        const fn m(is_opening: bool, is_closing: bool, is_access: bool, is_refresh: bool) -> CommandMeta {
            CommandMeta { is_opening, is_closing, is_access, is_refresh }
        }
        match self {
            Command::Act => m(true, false, false, false),
            Command::Pre => m(false, true, false, false),
            Command::Prea => m(false, true, false, false),
            Command::Presb => m(false, true, false, false),
            Command::Rd => m(false, false, true, false),
            Command::Wr => m(false, false, true, false),
            Command::Refab => m(false, false, false, true),
            Command::RefabEnd => m(false, true, false, false),
            Command::Refsb => m(false, false, false, true),
            Command::RefsbEnd => m(false, true, false, false),
            Command::Vrr => m(false, false, false, true),
            Command::VrrEnd => m(false, true, false, false),
            // ACTp opens the PuM sequence so the request stays pinned in
            // the active buffer; every other PuM command is marked
            // closing purely for the scheduler's row-close veto -- they
            // must not be interrupted once started, not because they
            // literally close a row early.
            Command::Actp => m(true, false, false, false),
            Command::Actv => m(false, true, false, false),
            Command::Prev => m(false, true, false, false),
            Command::Prej => m(false, true, false, false),
            Command::Pref => m(false, true, false, false),
            Command::Rc => m(false, true, false, false),
            Command::Maj => m(false, true, false, false),
            Command::Frac => m(false, true, false, false),
        }
    }
}
