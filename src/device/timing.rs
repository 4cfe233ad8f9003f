/*!
Timing constraint records and the compiled per-(level, command) table.

Grounded on `populate_timingcons(...)` in `DDR4::set_timing_vals`
(`examples/original_source/src/dram/impl/DDR4.cpp`). Each source record
names a *set* of preceding commands and a *set* of following commands;
`TimingTable::compile` expands that cross-product into the
`(level, preceding) -> Vec<CompiledConstraint>` lookup the node tree walks
on every `issue_command`.
*/

use crate::device::command::Command;
use crate::device::level::{Level, LEVEL_COUNT};
use std::collections::HashMap;

pub type Clk = i64;

/// A timing value table (nCL, nRCD, ...). Grounded on `DDR4::m_timings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingValues {
    pub rate: i64,
    pub n_bl: i64,
    pub n_cl: i64,
    pub n_rcd: i64,
    pub n_rp: i64,
    pub n_ras: i64,
    pub n_rc: i64,
    pub n_wr: i64,
    pub n_rtp: i64,
    pub n_cwl: i64,
    pub n_ccds: i64,
    pub n_ccdl: i64,
    pub n_rrds: i64,
    pub n_rrdl: i64,
    pub n_wtrs: i64,
    pub n_wtrl: i64,
    pub n_faw: i64,
    pub n_rfc: i64,
    pub n_refi: i64,
    pub n_cs: i64,
    pub tck_ps: i64,
}

/// One source-level timing record, before expansion across its command
/// sets. `window = 1` unless overridden (e.g. `nFAW` uses `window = 4`).
pub struct TimingRecord {
    pub level: Level,
    pub preceding: &'static [Command],
    pub following: &'static [Command],
    pub latency: Clk,
    pub window: usize,
    pub sibling: bool,
}

impl TimingRecord {
    const fn new(level: Level, preceding: &'static [Command], following: &'static [Command], latency: Clk) -> Self {
        TimingRecord { level, preceding, following, latency, window: 1, sibling: false }
    }

    const fn windowed(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    const fn as_sibling(mut self) -> Self {
        self.sibling = true;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompiledConstraint {
    pub following: Command,
    pub latency: Clk,
    pub window: usize,
    pub sibling: bool,
}

/// `(level, preceding command) -> constraints`, the structure
/// `Node::update_timing` consults every time a command is issued.
#[derive(Debug, Default)]
pub struct TimingTable {
    entries: HashMap<(Level, Command), Vec<CompiledConstraint>>,
}

impl TimingTable {
    pub fn lookup(&self, level: Level, command: Command) -> &[CompiledConstraint] {
        self.entries.get(&(level, command)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The largest window any constraint needs for `(level, command)`, or 0
    /// if `command` carries no history at `level` -- sets the fixed size
    /// of that node's history deque (spec §3, Node invariants).
    pub fn max_window(&self, level: Level, command: Command) -> usize {
        self.entries
            .get(&(level, command))
            .map(|cs| cs.iter().map(|c| c.window).max().unwrap_or(0))
            .unwrap_or(0)
    }

    fn push(&mut self, level: Level, preceding: Command, compiled: CompiledConstraint) {
        self.entries.entry((level, preceding)).or_default().push(compiled);
    }

    fn compile(records: &[TimingRecord]) -> TimingTable {
        let mut table = TimingTable::default();
        for record in records {
            for &preceding in record.preceding {
                for &following in record.following {
                    table.push(
                        record.level,
                        preceding,
                        CompiledConstraint {
                            following,
                            latency: record.latency,
                            window: record.window,
                            sibling: record.sibling,
                        },
                    );
                }
            }
        }
        table
    }

    /// Build the full DDR4+PuM timing table from resolved timing values.
    /// Every record here is transcribed from `populate_timingcons` in
    /// `DDR4::set_timing_vals`; `RDA`/`WRA` entries are dropped along with
    /// the command variants themselves (see `device::command`).
    pub fn ddr4(v: &TimingValues) -> TimingTable {
        use Command::*;
        use Level::*;

        let records: Vec<TimingRecord> = vec![
            // Channel: data bus occupancy.
            TimingRecord::new(Channel, &[Rd], &[Rd], v.n_bl),
            TimingRecord::new(Channel, &[Wr], &[Wr], v.n_bl),
            // Rank: CAS <-> CAS.
            TimingRecord::new(Rank, &[Rd], &[Rd], v.n_ccds),
            TimingRecord::new(Rank, &[Wr], &[Wr], v.n_ccds),
            TimingRecord::new(Rank, &[Rd], &[Wr], v.n_cl + v.n_bl + 2 - v.n_cwl),
            TimingRecord::new(Rank, &[Wr], &[Rd], v.n_cwl + v.n_bl + v.n_wtrs),
            TimingRecord::new(Rank, &[Rd], &[Rd, Wr], v.n_bl + v.n_cs).as_sibling(),
            TimingRecord::new(Rank, &[Wr], &[Rd], v.n_cl + v.n_bl + v.n_cs - v.n_cwl).as_sibling(),
            TimingRecord::new(Rank, &[Frac, Maj, Rc], &[Rd, Wr, Frac, Maj, Rc], v.n_cs).as_sibling(),
            TimingRecord::new(Rank, &[Rd, Wr], &[Frac, Maj, Rc], v.n_cs).as_sibling(),
            // Rank: CAS <-> PREA.
            TimingRecord::new(Rank, &[Rd], &[Prea], v.n_rtp),
            TimingRecord::new(Rank, &[Wr], &[Prea], v.n_cwl + v.n_bl + v.n_wr),
            TimingRecord::new(Rank, &[Frac, Rc, Maj], &[Prea], 1),
            // Rank: RAS <-> RAS.
            TimingRecord::new(Rank, &[Act], &[Act, Actp, Actv], v.n_rrds),
            TimingRecord::new(Rank, &[Act], &[Act], v.n_faw).windowed(4),
            TimingRecord::new(Rank, &[Act], &[Prea], v.n_ras),
            TimingRecord::new(Rank, &[Prea], &[Act, Actp], v.n_rp),
            TimingRecord::new(Rank, &[Actp], &[Act, Actp, Actv], v.n_rrds),
            TimingRecord::new(Rank, &[Actv], &[Act, Actp, Actv], v.n_rrds),
            // Rank: RAS <-> REF.
            TimingRecord::new(Rank, &[Act], &[Refab], v.n_rc),
            TimingRecord::new(Rank, &[Pre, Prea], &[Refab], v.n_rp),
            TimingRecord::new(Rank, &[Refab], &[Act, Prea], v.n_rfc),
            TimingRecord::new(Rank, &[Actp], &[Refab], v.n_rc),
            // BankGroup: CAS <-> CAS.
            TimingRecord::new(BankGroup, &[Rd], &[Rd], v.n_ccdl),
            TimingRecord::new(BankGroup, &[Wr], &[Wr], v.n_ccdl),
            TimingRecord::new(BankGroup, &[Wr], &[Rd], v.n_cwl + v.n_bl + v.n_wtrl),
            TimingRecord::new(BankGroup, &[Maj, Frac, Rc], &[Rd, Wr], v.n_ccdl),
            // BankGroup: RAS <-> RAS.
            TimingRecord::new(BankGroup, &[Act], &[Act, Actp, Actv], v.n_rrdl),
            TimingRecord::new(BankGroup, &[Actp], &[Act, Actp, Actv], v.n_rrdl),
            TimingRecord::new(BankGroup, &[Actv], &[Act, Actp, Actv], v.n_rrdl),
            // Bank: baseline RD/WR/ACT/PRE.
            TimingRecord::new(Bank, &[Act], &[Act], v.n_rc),
            TimingRecord::new(Bank, &[Act], &[Rd, Wr], v.n_rcd),
            TimingRecord::new(Bank, &[Act], &[Pre], v.n_ras),
            TimingRecord::new(Bank, &[Pre], &[Act], v.n_rp),
            TimingRecord::new(Bank, &[Rd], &[Pre], v.n_rtp),
            TimingRecord::new(Bank, &[Wr], &[Pre], v.n_cwl + v.n_bl + v.n_wr),
            // Bank: PuM terminal commands block everything until their
            // full sequence (including the implicit trailing PRE) elapses.
            TimingRecord::new(Bank, &[Rc], &[Rd, Wr, Act, Pre, Frac, Maj, Rc], v.n_ras + 6 + v.n_rp),
            TimingRecord::new(Bank, &[Maj], &[Rd, Wr, Act, Pre, Frac, Rc, Maj], 3 + 6 + v.n_rp),
            TimingRecord::new(Bank, &[Frac], &[Rd, Wr, Act, Pre, Rc, Maj, Frac], 1 + v.n_rp),
            // Bank: PuM main timings (RowClone / Majority / Fractional APA).
            TimingRecord::new(Bank, &[Actp], &[Prev], v.n_ras),
            TimingRecord::new(Bank, &[Prev], &[Actv], 6),
            TimingRecord::new(Bank, &[Actv], &[Rc], v.n_rp),
            TimingRecord::new(Bank, &[Actp], &[Prej], 3),
            TimingRecord::new(Bank, &[Prej], &[Actv], 6),
            TimingRecord::new(Bank, &[Actv], &[Maj], v.n_rp),
            TimingRecord::new(Bank, &[Actp], &[Pref], 1),
            TimingRecord::new(Bank, &[Pref], &[Frac], v.n_rp),
        ];
        TimingTable::compile(&records)
    }
}

/// Sanity: every level index fits in the fixed-size arrays elsewhere.
#[cfg(test)]
const _: () = assert!(LEVEL_COUNT == 6);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ddr4_3200w() -> TimingValues {
        TimingValues {
            rate: 3200,
            n_bl: 4,
            n_cl: 20,
            n_rcd: 20,
            n_rp: 20,
            n_ras: 52,
            n_rc: 72,
            n_wr: 24,
            n_rtp: 12,
            n_cwl: 16,
            n_ccds: 4,
            n_ccdl: 8,
            n_rrds: 4,
            n_rrdl: 8,
            n_wtrs: 4,
            n_wtrl: 12,
            n_faw: 28,
            n_rfc: 313,
            n_refi: 9360,
            n_cs: 2,
            tck_ps: 625,
        }
    }

    #[test]
    fn act_to_act_uses_nrc() {
        let table = TimingTable::ddr4(&sample_ddr4_3200w());
        let constraints = table.lookup(Level::Bank, Command::Act);
        let to_act = constraints.iter().find(|c| c.following == Command::Act).unwrap();
        assert_eq!(to_act.latency, 72);
    }

    #[test]
    fn faw_uses_window_four() {
        let table = TimingTable::ddr4(&sample_ddr4_3200w());
        let constraints = table.lookup(Level::Rank, Command::Act);
        let faw = constraints.iter().filter(|c| c.following == Command::Act).find(|c| c.window == 4).unwrap();
        assert_eq!(faw.latency, 28);
    }

    #[test]
    fn rowclone_apa_chain_is_present() {
        let table = TimingTable::ddr4(&sample_ddr4_3200w());
        assert!(table.lookup(Level::Bank, Command::Actp).iter().any(|c| c.following == Command::Prev));
        assert!(table.lookup(Level::Bank, Command::Prev).iter().any(|c| c.following == Command::Actv));
        assert!(table.lookup(Level::Bank, Command::Actv).iter().any(|c| c.following == Command::Rc));
    }
}
