/*!
Per-`(level, command)` function tables: action (state transitions),
prerequisite resolution, row-hit/row-open predicates.

Grounded on `examples/original_source/src/dram/lambdas/{action,preq,rowopen}.h`
and design note §9.1 ("Hierarchical dispatch without inheritance ... an
explicit `(level, command) -> function table`"). The original dispatches
through `std::function` members set up per-device-type; here each table is
a plain `HashMap<(Level, Command), fn(...)>` built once when the device is
constructed, since none of the hooks need to capture device-specific state
beyond what's already reachable through `NodeArena`.
*/

use crate::device::command::Command;
use crate::device::level::{AddrVec, Level};
use crate::device::node::{NodeArena, NodeId};
use crate::device::state::NodeState;
use crate::device::timing::Clk;
use std::collections::HashMap;

pub type ActionFn = fn(&mut NodeArena, NodeId, i32, Clk);
pub type PreqFn = fn(&NodeArena, NodeId, Command, &AddrVec, Clk) -> Option<Command>;
pub type RowPredFn = fn(&NodeArena, NodeId, i32, Clk) -> bool;

#[derive(Default)]
pub struct HookTables {
    pub actions: HashMap<(Level, Command), ActionFn>,
    pub preqs: HashMap<(Level, Command), PreqFn>,
    pub rowhits: HashMap<(Level, Command), RowPredFn>,
    pub rowopens: HashMap<(Level, Command), RowPredFn>,
}

impl HookTables {
    pub fn ddr4() -> HookTables {
        let mut t = HookTables::default();

        // --- actions -------------------------------------------------
        t.actions.insert((Level::Bank, Command::Act), action::bank::act);
        t.actions.insert((Level::Bank, Command::Pre), action::bank::pre);
        t.actions.insert((Level::Bank, Command::Actp), action::bank::actp);
        t.actions.insert((Level::Bank, Command::Prev), action::bank::prev);
        t.actions.insert((Level::Bank, Command::Actv), action::bank::actv);
        t.actions.insert((Level::Bank, Command::Rc), action::bank::rc);
        t.actions.insert((Level::Bank, Command::Prej), action::bank::prej);
        t.actions.insert((Level::Bank, Command::Maj), action::bank::maj);
        t.actions.insert((Level::Bank, Command::Pref), action::bank::pref);
        t.actions.insert((Level::Bank, Command::Frac), action::bank::frac);
        t.actions.insert((Level::Bank, Command::Vrr), action::bank::vrr);
        t.actions.insert((Level::Bank, Command::VrrEnd), action::bank::vrr_end);

        t.actions.insert((Level::BankGroup, Command::Presb), action::bankgroup::presb);
        t.actions.insert((Level::BankGroup, Command::Refsb), action::bankgroup::refsb);
        t.actions.insert((Level::BankGroup, Command::RefsbEnd), action::bankgroup::refsb_end);

        t.actions.insert((Level::Rank, Command::Prea), action::rank::prea);
        t.actions.insert((Level::Rank, Command::Refab), action::rank::refab);
        t.actions.insert((Level::Rank, Command::RefabEnd), action::rank::refab_end);

        // --- prerequisites --------------------------------------------
        t.preqs.insert((Level::Bank, Command::Rd), preq::bank::require_row_open);
        t.preqs.insert((Level::Bank, Command::Wr), preq::bank::require_row_open);
        t.preqs.insert((Level::Bank, Command::Act), preq::bank::require_row_open);
        t.preqs.insert((Level::Bank, Command::Pre), preq::bank::require_bank_closed);
        t.preqs.insert((Level::Bank, Command::Rc), preq::bank::require_rc);
        t.preqs.insert((Level::Bank, Command::Maj), preq::bank::require_maj);
        t.preqs.insert((Level::Bank, Command::Frac), preq::bank::require_frac);
        t.preqs.insert((Level::Rank, Command::Refab), preq::rank::require_all_banks_closed);

        // --- row hit / row open -----------------------------------------
        t.rowhits.insert((Level::Bank, Command::Rd), rowpred::bank::row_hit);
        t.rowhits.insert((Level::Bank, Command::Wr), rowpred::bank::row_hit);
        t.rowopens.insert((Level::Bank, Command::Rd), rowpred::bank::row_open);
        t.rowopens.insert((Level::Bank, Command::Wr), rowpred::bank::row_open);

        t
    }
}

mod action {
    use super::*;

    pub mod bank {
        use super::*;

        pub fn act(arena: &mut NodeArena, node: NodeId, target_row: i32, _clk: Clk) {
            let n = arena.get_mut(node);
            n.state = NodeState::Opened;
            n.row_state.insert(target_row, NodeState::Opened);
        }

        pub fn pre(arena: &mut NodeArena, node: NodeId, _target_row: i32, _clk: Clk) {
            let n = arena.get_mut(node);
            n.state = NodeState::Closed;
            n.row_state.clear();
        }

        pub fn actp(arena: &mut NodeArena, node: NodeId, target_row: i32, _clk: Clk) {
            let n = arena.get_mut(node);
            n.state = NodeState::OpenedPum;
            n.row_state.insert(target_row, NodeState::OpenedPum);
        }

        pub fn prev(arena: &mut NodeArena, node: NodeId, target_row: i32, _clk: Clk) {
            let n = arena.get_mut(node);
            n.state = NodeState::RcState;
            n.row_state.insert(target_row, NodeState::RcState);
        }

        pub fn actv(arena: &mut NodeArena, node: NodeId, target_row: i32, _clk: Clk) {
            let n = arena.get_mut(node);
            n.state = NodeState::Processed;
            n.row_state.insert(target_row, NodeState::Processed);
        }

        pub fn rc(arena: &mut NodeArena, node: NodeId, _target_row: i32, _clk: Clk) {
            let n = arena.get_mut(node);
            n.state = NodeState::Closed;
            n.row_state.clear();
        }

        pub fn prej(arena: &mut NodeArena, node: NodeId, target_row: i32, _clk: Clk) {
            let n = arena.get_mut(node);
            n.state = NodeState::MajState;
            n.row_state.insert(target_row, NodeState::MajState);
        }

        pub fn maj(arena: &mut NodeArena, node: NodeId, _target_row: i32, _clk: Clk) {
            let n = arena.get_mut(node);
            n.state = NodeState::Closed;
            n.row_state.clear();
        }

        pub fn pref(arena: &mut NodeArena, node: NodeId, target_row: i32, _clk: Clk) {
            let n = arena.get_mut(node);
            n.state = NodeState::Processed;
            n.row_state.insert(target_row, NodeState::Processed);
        }

        pub fn frac(arena: &mut NodeArena, node: NodeId, _target_row: i32, _clk: Clk) {
            let n = arena.get_mut(node);
            n.state = NodeState::Closed;
            n.row_state.clear();
        }

        pub fn vrr(arena: &mut NodeArena, node: NodeId, _target_row: i32, _clk: Clk) {
            arena.get_mut(node).state = NodeState::Refreshing;
        }

        pub fn vrr_end(arena: &mut NodeArena, node: NodeId, _target_row: i32, _clk: Clk) {
            arena.get_mut(node).state = NodeState::Closed;
        }
    }

    pub mod bankgroup {
        use super::*;

        fn bank_child(arena: &NodeArena, bankgroup: NodeId, target_bank: i32) -> Option<NodeId> {
            (0..).map(|i| arena.child_at(bankgroup, i)).take_while(Option::is_some).flatten().find(|&c| arena.get(c).node_id == target_bank)
        }

        pub fn presb(arena: &mut NodeArena, node: NodeId, target_bank: i32, _clk: Clk) {
            if let Some(bank) = bank_child(arena, node, target_bank) {
                let n = arena.get_mut(bank);
                n.state = NodeState::Closed;
                n.row_state.clear();
            }
        }

        pub fn refsb(arena: &mut NodeArena, node: NodeId, target_bank: i32, _clk: Clk) {
            if let Some(bank) = bank_child(arena, node, target_bank) {
                arena.get_mut(bank).state = NodeState::Refreshing;
            }
        }

        pub fn refsb_end(arena: &mut NodeArena, node: NodeId, target_bank: i32, _clk: Clk) {
            if let Some(bank) = bank_child(arena, node, target_bank) {
                let n = arena.get_mut(bank);
                n.state = NodeState::Closed;
                n.row_state.clear();
            }
        }
    }

    pub mod rank {
        use super::*;

        fn for_each_bank(arena: &mut NodeArena, rank: NodeId, mut f: impl FnMut(&mut NodeArena, NodeId)) {
            let bankgroups: Vec<NodeId> = (0..).map(|i| arena.child_at(rank, i)).take_while(Option::is_some).flatten().collect();
            for bg in bankgroups {
                let banks: Vec<NodeId> = (0..).map(|i| arena.child_at(bg, i)).take_while(Option::is_some).flatten().collect();
                for bank in banks {
                    f(arena, bank);
                }
            }
        }

        pub fn prea(arena: &mut NodeArena, node: NodeId, _target_id: i32, _clk: Clk) {
            for_each_bank(arena, node, |arena, bank| {
                let n = arena.get_mut(bank);
                n.state = NodeState::Closed;
                n.row_state.clear();
            });
        }

        pub fn refab(arena: &mut NodeArena, node: NodeId, _target_id: i32, _clk: Clk) {
            for_each_bank(arena, node, |arena, bank| {
                arena.get_mut(bank).state = NodeState::Refreshing;
            });
        }

        pub fn refab_end(arena: &mut NodeArena, node: NodeId, _target_id: i32, _clk: Clk) {
            for_each_bank(arena, node, |arena, bank| {
                let n = arena.get_mut(bank);
                n.state = NodeState::Closed;
                n.row_state.clear();
            });
        }
    }
}

mod preq {
    use super::*;

    pub mod bank {
        use super::*;

        /// `Read`/`Write`/`Open` (spec §4.1's `RequireRowOpen` rule).
        pub fn require_row_open(arena: &NodeArena, node: NodeId, command: Command, addr_vec: &AddrVec, _clk: Clk) -> Option<Command> {
            let n = arena.get(node);
            match n.state {
                NodeState::Closed => Some(Command::Act),
                NodeState::Opened => {
                    if n.row_state.contains_key(&addr_vec[Level::Row]) {
                        Some(command)
                    } else {
                        Some(Command::Pre)
                    }
                }
                NodeState::Refreshing => Some(Command::Act),
                _ => None,
            }
        }

        /// `Close` (spec §4.1's `RequireBankClosed` rule).
        pub fn require_bank_closed(arena: &NodeArena, node: NodeId, command: Command, _addr_vec: &AddrVec, _clk: Clk) -> Option<Command> {
            match arena.get(node).state {
                NodeState::Closed => Some(command),
                NodeState::Opened => Some(Command::Pre),
                NodeState::Refreshing => Some(command),
                _ => None,
            }
        }

        /// Shared "enter PuM" prerequisite used by `RC`/`MAJ`/`FRAC` once
        /// they fall through their own state.
        fn require_row_open_pum(arena: &NodeArena, node: NodeId, command: Command, addr_vec: &AddrVec, clk: Clk) -> Option<Command> {
            match arena.get(node).state {
                NodeState::Closed => Some(Command::Actp),
                NodeState::Opened => Some(Command::Pre),
                NodeState::Refreshing => Some(Command::Actp),
                _ => require_bank_closed(arena, node, command, addr_vec, clk),
            }
        }

        pub fn require_rc(arena: &NodeArena, node: NodeId, command: Command, addr_vec: &AddrVec, clk: Clk) -> Option<Command> {
            match arena.get(node).state {
                NodeState::OpenedPum => Some(Command::Prev),
                NodeState::RcState => Some(command),
                _ => require_row_open_pum(arena, node, command, addr_vec, clk),
            }
        }

        pub fn require_maj(arena: &NodeArena, node: NodeId, command: Command, addr_vec: &AddrVec, clk: Clk) -> Option<Command> {
            match arena.get(node).state {
                NodeState::OpenedPum => Some(Command::Prej),
                NodeState::MajState => Some(command),
                _ => require_row_open_pum(arena, node, command, addr_vec, clk),
            }
        }

        pub fn require_frac(arena: &NodeArena, node: NodeId, command: Command, addr_vec: &AddrVec, clk: Clk) -> Option<Command> {
            match arena.get(node).state {
                NodeState::OpenedPum => Some(command),
                _ => require_row_open_pum(arena, node, command, addr_vec, clk),
            }
        }
    }

    pub mod rank {
        use super::*;

        pub fn require_all_banks_closed(arena: &NodeArena, node: NodeId, command: Command, _addr_vec: &AddrVec, _clk: Clk) -> Option<Command> {
            let bankgroups: Vec<NodeId> = (0..).map(|i| arena.child_at(node, i)).take_while(Option::is_some).flatten().collect();
            for bg in bankgroups {
                let banks: Vec<NodeId> = (0..).map(|i| arena.child_at(bg, i)).take_while(Option::is_some).flatten().collect();
                for bank in banks {
                    match arena.get(bank).state {
                        NodeState::Closed => continue,
                        NodeState::Refreshing => return Some(command),
                        _ => return Some(Command::Prea),
                    }
                }
            }
            Some(command)
        }
    }
}

mod rowpred {
    use super::*;

    pub mod bank {
        use super::*;

        /// True iff the bank is `Opened` at all (spec §4.1 `check_node_open`).
        pub fn row_open(arena: &NodeArena, node: NodeId, _target_row: i32, _clk: Clk) -> bool {
            arena.get(node).state == NodeState::Opened
        }

        /// True iff the bank is `Opened` on the exact target row (spec
        /// §4.1 `check_rowbuffer_hit`).
        pub fn row_hit(arena: &NodeArena, node: NodeId, target_row: i32, _clk: Clk) -> bool {
            let n = arena.get(node);
            n.state == NodeState::Opened && n.row_state.contains_key(&target_row)
        }
    }
}
