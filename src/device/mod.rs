/*!
The `Device` facade: the arena tree, the compiled timing table, the hook
tables, and the deferred-event queue wired together into the handful of
recursive tree-walk operations the original exposes per-node on
`DRAMNodeBase<T>` (`examples/original_source/src/dram/node.h`):
`update_states`/`issue_command`, `get_preq_command`, `check_ready`,
`check_rowbuffer_hit`, `check_node_open`.

The CRTP original dispatches these through virtual-ish template methods
reachable from any node; here they live on `Device` because the hook
tables and the compiled `TimingTable` are device-wide, not per-node.
*/

pub mod command;
pub mod events;
pub mod hooks;
pub mod level;
pub mod node;
pub mod preset;
pub mod state;
pub mod timing;

use command::Command;
use events::{deferred_for, EventQueue};
use hooks::HookTables;
use level::{AddrVec, Level, Organization};
use node::{NodeArena, NodeId};
use timing::{Clk, TimingTable, TimingValues};

pub struct Device {
    pub organization: Organization,
    pub timing_values: TimingValues,
    pub timing: TimingTable,
    pub hooks: HookTables,
    pub arena: NodeArena,
    pub roots: Vec<NodeId>,
    pub events: EventQueue,
    pub clk: Clk,
}

/// The deepest node level that actually owns a ready-clock/state slot for
/// a command with the given scope. Commands scoped to `Row`/`Column`
/// still only ever act through their owning `Bank` node (see
/// `device::node`'s doc comment on why the tree stops at `Bank`).
fn node_stop_level(scope: Level) -> Level {
    match scope {
        Level::Channel => Level::Channel,
        Level::Rank => Level::Rank,
        Level::BankGroup => Level::BankGroup,
        Level::Bank | Level::Row | Level::Column => Level::Bank,
    }
}

impl Device {
    pub fn new(organization: Organization, timing_values: TimingValues) -> Device {
        let timing = TimingTable::ddr4(&timing_values);
        let (arena, roots) = NodeArena::build(&organization, &timing);
        Device {
            organization,
            timing_values,
            timing,
            hooks: HookTables::ddr4(),
            arena,
            roots,
            events: EventQueue::default(),
            clk: 0,
        }
    }

    pub fn from_presets(org_preset: &str, timing_preset: &str) -> Result<Device, crate::error::ConfigError> {
        let organization = preset::organization_preset(org_preset)?;
        organization.validate_density()?;
        let timing_values = preset::resolve_timing(timing_preset, &organization, None)?;
        Ok(Device::new(organization, timing_values))
    }

    pub(crate) fn node_at(&self, addr_vec: &AddrVec, level: Level) -> NodeId {
        let mut current = self.roots[addr_vec[Level::Channel] as usize];
        if level == Level::Channel {
            return current;
        }
        current = self.arena.child_at(current, addr_vec[Level::Rank] as usize).expect("rank index out of range");
        if level == Level::Rank {
            return current;
        }
        current = self
            .arena
            .child_at(current, addr_vec[Level::BankGroup] as usize)
            .expect("bankgroup index out of range");
        if level == Level::BankGroup {
            return current;
        }
        self.arena.child_at(current, addr_vec[Level::Bank] as usize).expect("bank index out of range")
    }

    /// The Channel -> ... -> `stop` ancestor chain for an address, one
    /// `Node` per level, used by `issue_command`/`check_ready` to touch
    /// only the levels a command's scope actually reaches -- a
    /// Rank-scoped command like `Refab` must not force the caller to
    /// resolve a bankgroup/bank index that was never supplied.
    fn node_chain(&self, addr_vec: &AddrVec, stop: Level) -> Vec<NodeId> {
        let mut chain = vec![self.roots[addr_vec[Level::Channel] as usize]];
        if stop == Level::Channel {
            return chain;
        }
        for level in [Level::Rank, Level::BankGroup, Level::Bank] {
            let parent = *chain.last().unwrap();
            let node = self.arena.child_at(parent, addr_vec[level] as usize).unwrap_or_else(|| {
                panic!("{level:?} index {} out of range", addr_vec[level])
            });
            chain.push(node);
            if level == stop {
                break;
            }
        }
        chain
    }

    /// `DRAMNodeBase::check_ready`: every node along the chain down to
    /// `command`'s owning level must already be past its `ready_clk` for
    /// `command`.
    pub fn check_ready(&self, command: Command, addr_vec: &AddrVec, clk: Clk) -> bool {
        let stop = node_stop_level(command.scope());
        self.node_chain(addr_vec, stop).iter().all(|&node| self.arena.get(node).ready_clk(command) <= clk)
    }

    /// `DRAMNodeBase::get_preq_command`: resolve the next command the
    /// controller must actually issue before `command` can proceed (e.g. a
    /// `Closed` bank must see `Act` before `Rd`). Returns `None` when no
    /// prerequisite rule is registered for `command` at any level, which
    /// the original treats as "command is a no-op from here" (PuM states
    /// mid-sequence reject foreign commands outright).
    pub fn get_prereq(&self, command: Command, addr_vec: &AddrVec, clk: Clk) -> Option<Command> {
        for level in [Level::Bank, Level::BankGroup, Level::Rank, Level::Channel] {
            if let Some(f) = self.hooks.preqs.get(&(level, command)) {
                let node = self.node_at(addr_vec, level);
                return f(&self.arena, node, command, addr_vec, clk);
            }
        }
        None
    }

    /// `DRAMNodeBase::check_rowbuffer_hit`.
    pub fn check_rowbuffer_hit(&self, command: Command, addr_vec: &AddrVec, clk: Clk) -> bool {
        for level in [Level::Bank, Level::BankGroup, Level::Rank] {
            if let Some(f) = self.hooks.rowhits.get(&(level, command)) {
                let node = self.node_at(addr_vec, level);
                return f(&self.arena, node, addr_vec[Level::Row], clk);
            }
        }
        false
    }

    /// `DRAMNodeBase::check_node_open`.
    pub fn check_node_open(&self, command: Command, addr_vec: &AddrVec, clk: Clk) -> bool {
        for level in [Level::Bank, Level::BankGroup, Level::Rank] {
            if let Some(f) = self.hooks.rowopens.get(&(level, command)) {
                let node = self.node_at(addr_vec, level);
                return f(&self.arena, node, addr_vec[Level::Row], clk);
            }
        }
        false
    }

    fn find_action(&self, command: Command) -> Option<(Level, hooks::ActionFn)> {
        for level in [Level::Bank, Level::BankGroup, Level::Rank, Level::Channel] {
            if let Some(&f) = self.hooks.actions.get(&(level, command)) {
                return Some((level, f));
            }
        }
        None
    }

    /// `DRAMNodeBase::update_states` + `update_timing`, folded into one
    /// call since both always run together when a command is issued.
    pub fn issue_command(&mut self, command: Command, addr_vec: AddrVec, clk: Clk) {
        tracing::debug!(?command, bank = addr_vec[Level::Bank], row = addr_vec[Level::Row], clk, "issue_command");
        self.clk = self.clk.max(clk);

        if let Some((owner_level, action)) = self.find_action(command) {
            let node = self.node_at(&addr_vec, owner_level);
            let target_id = match owner_level {
                Level::Bank => addr_vec[Level::Row],
                Level::BankGroup => addr_vec[Level::Bank],
                _ => 0,
            };
            action(&mut self.arena, node, target_id, clk);
        }

        let stop = node_stop_level(command.scope());
        let chain = self.node_chain(&addr_vec, stop);
        for &node in chain.iter() {
            self.arena.record_issue_and_propagate(node, command, clk, &self.timing);
            if let Some(parent) = self.arena.get(node).parent {
                let siblings = self.arena.get(parent).children.clone();
                for sibling in siblings {
                    if sibling != node {
                        self.arena.propagate_sibling(sibling, command, clk, &self.timing);
                    }
                }
            }
        }

        if let Some((end_command, delay)) = deferred_for(command, self.timing_values.n_rfc) {
            self.events.schedule(end_command, addr_vec, clk + delay);
        }
    }

    /// Fire every deferred event due at `clk` (REFab_end/REFsb_end/VRR_end)
    /// before the controller schedules any new command this cycle (spec
    /// §5).
    pub fn tick(&mut self, clk: Clk) {
        for event in self.events.drain_due(clk) {
            self.issue_command(event.command, event.addr_vec, clk);
        }
    }

    /// The current state of the node owning `level` for this address --
    /// mainly useful for tests and diagnostics inspecting bank/rank state
    /// without reaching into `arena` directly.
    pub fn node_state(&self, addr_vec: &AddrVec, level: Level) -> crate::device::state::NodeState {
        self.arena.get(self.node_at(addr_vec, level)).state
    }

    /// The earliest cycle `command` could issue at `addr_vec`, i.e. the
    /// max `ready_clk` across the chain down to its owning level. Used by
    /// the controller to rank otherwise-tied requests (spec §4.2).
    pub fn ready_cycle(&self, command: Command, addr_vec: &AddrVec) -> Clk {
        let stop = node_stop_level(command.scope());
        self.node_chain(addr_vec, stop).iter().map(|&node| self.arena.get(node).ready_clk(command)).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_device() -> Device {
        let organization = Organization {
            count: [1, 1, 1, 2, 1 << 10, 1 << 8],
            density_mb: (1 * 2 * (1 << 10) * (1 << 8) * 8) >> 20,
            dq: 8,
            channel_width: 64,
        };
        let timing_values = TimingValues {
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
        };
        Device::new(organization, timing_values)
    }

    #[test]
    fn closed_bank_requires_activate() {
        let dev = tiny_device();
        let addr = AddrVec::wildcard().with(Level::Channel, 0).with(Level::Rank, 0).with(Level::BankGroup, 0).with(Level::Bank, 0).with(Level::Row, 3);
        assert_eq!(dev.get_prereq(Command::Rd, &addr, 0), Some(Command::Act));
    }

    #[test]
    fn activate_then_read_same_row_is_a_hit() {
        let mut dev = tiny_device();
        let addr = AddrVec::wildcard().with(Level::Channel, 0).with(Level::Rank, 0).with(Level::BankGroup, 0).with(Level::Bank, 0).with(Level::Row, 3);
        dev.issue_command(Command::Act, addr, 0);
        assert!(dev.check_rowbuffer_hit(Command::Rd, &addr, 0));
        assert_eq!(dev.get_prereq(Command::Rd, &addr, 0), Some(Command::Rd));
    }

    #[test]
    fn activate_then_read_other_row_requires_precharge() {
        let mut dev = tiny_device();
        let row3 = AddrVec::wildcard().with(Level::Channel, 0).with(Level::Rank, 0).with(Level::BankGroup, 0).with(Level::Bank, 0).with(Level::Row, 3);
        let row9 = row3.with(Level::Row, 9);
        dev.issue_command(Command::Act, row3, 0);
        assert_eq!(dev.get_prereq(Command::Rd, &row9, 0), Some(Command::Pre));
    }

    #[test]
    fn activate_ready_clock_gates_read() {
        let mut dev = tiny_device();
        let addr = AddrVec::wildcard().with(Level::Channel, 0).with(Level::Rank, 0).with(Level::BankGroup, 0).with(Level::Bank, 0).with(Level::Row, 3);
        dev.issue_command(Command::Act, addr, 0);
        assert!(!dev.check_ready(Command::Rd, &addr, 10));
        assert!(dev.check_ready(Command::Rd, &addr, 20));
    }

    #[test]
    fn rowclone_apa_chain_issues_in_sequence() {
        let mut dev = tiny_device();
        let addr = AddrVec::wildcard().with(Level::Channel, 0).with(Level::Rank, 0).with(Level::BankGroup, 0).with(Level::Bank, 0).with(Level::Row, 3);
        dev.issue_command(Command::Actp, addr, 0);
        assert!(dev.check_ready(Command::Prev, &addr, 52));
        dev.issue_command(Command::Prev, addr, 52);
        assert!(dev.check_ready(Command::Actv, &addr, 58));
        dev.issue_command(Command::Actv, addr, 58);
        assert!(dev.check_ready(Command::Rc, &addr, 78));
        dev.issue_command(Command::Rc, addr, 78);
        assert_eq!(dev.arena.get(dev.node_at(&addr, Level::Bank)).state, state::NodeState::Closed);
    }

    #[test]
    fn refresh_schedules_deferred_end_event() {
        let mut dev = tiny_device();
        let rank_addr = AddrVec::wildcard().with(Level::Channel, 0).with(Level::Rank, 0);
        let bank_addr = rank_addr.with(Level::BankGroup, 0).with(Level::Bank, 0);
        dev.issue_command(Command::Refab, rank_addr, 100);
        dev.tick(100 + dev.timing_values.n_rfc - 2);
        assert_eq!(dev.arena.get(dev.node_at(&bank_addr, Level::Bank)).state, state::NodeState::Refreshing);
        dev.tick(100 + dev.timing_values.n_rfc - 1);
        assert_eq!(dev.arena.get(dev.node_at(&bank_addr, Level::Bank)).state, state::NodeState::Closed);
    }
}
