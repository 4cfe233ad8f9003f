/*!
Device tree nodes.

Grounded on `DRAMNodeBase<T>` in `examples/original_source/src/dram/node.h`.
The original builds a CRTP-templated graph of raw `NodeType*` pointers; the
idiomatic Rust replacement is an arena (`Vec<Node>` owned by `Device`,
indexed by `NodeId`) instead of owned/raw pointers, per design note §9.2
("do not encode device identity in the type system").

Per `DRAMNodeBase`'s constructor, the tree only actually instantiates nodes
down to `Bank` -- `Row` state lives in `Node::row_state`, keyed by row id,
not as child nodes. `Level::Row`/`Level::Column` exist solely so
`AddrVec`/`Command::scope` can refer to them.
*/

use crate::device::command::{Command, COMMAND_COUNT};
use crate::device::level::{AddrVec, Level};
use crate::device::state::NodeState;
use crate::device::timing::{Clk, TimingTable};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

pub struct Node {
    pub level: Level,
    pub node_id: i32,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,

    pub state: NodeState,
    pub row_state: HashMap<i32, NodeState>,

    /// Earliest cycle each command may issue at this node; `-1` means
    /// "not yet constrained" (spec §3, Node invariants).
    pub cmd_ready_clk: Vec<Clk>,
    /// Bounded issue history per command; length fixed at construction to
    /// the widest `window` any constraint on that command needs.
    pub cmd_history: Vec<VecDeque<Clk>>,
}

impl Node {
    fn new(level: Level, node_id: i32, parent: Option<NodeId>, timing: &TimingTable) -> Node {
        let mut cmd_ready_clk = vec![-1; COMMAND_COUNT];
        cmd_ready_clk.fill(-1);
        let mut cmd_history = Vec::with_capacity(COMMAND_COUNT);
        for &command in crate::device::command::ALL_COMMANDS.iter() {
            let window = timing.max_window(level, command);
            cmd_history.push(VecDeque::with_capacity(window));
        }
        Node {
            level,
            node_id,
            parent,
            children: Vec::new(),
            state: NodeState::initial(level),
            row_state: HashMap::new(),
            cmd_ready_clk,
            cmd_history,
        }
    }

    pub fn ready_clk(&self, command: Command) -> Clk {
        self.cmd_ready_clk[command.index()]
    }

    fn set_ready_clk(&mut self, command: Command, clk: Clk) {
        let slot = &mut self.cmd_ready_clk[command.index()];
        *slot = (*slot).max(clk);
    }

    fn history_capacity(&self, command: Command) -> usize {
        self.cmd_history[command.index()].capacity()
    }

    /// Push `clk` onto `command`'s history, discarding the oldest entry
    /// once the deque is at its configured window size. A zero-capacity
    /// history (no constraint on this command at this level keys a
    /// window) is a no-op, matching `DRAMNodeBase::update_timing`'s
    /// `if (m_cmd_history[command].size())` guard.
    fn push_history(&mut self, command: Command, clk: Clk) {
        let cap = self.history_capacity(command);
        if cap == 0 {
            return;
        }
        let deque = &mut self.cmd_history[command.index()];
        if deque.len() == cap {
            deque.pop_back();
        }
        deque.push_front(clk);
    }

    /// The `window`-th most recent issue of `command` at this node, or
    /// `None` if there isn't enough history yet.
    fn history_at(&self, command: Command, window: usize) -> Option<Clk> {
        self.cmd_history[command.index()].get(window - 1).copied()
    }
}

/// Arena-backed tree rooted at `Channel` level.
///
/// All traversal (`update_timing`, `update_states`, `get_prereq`,
/// `check_ready`, ...) lives in `device::Device` rather than on `Node`
/// itself, since the traversal needs the per-(level, command) hook tables
/// `Device` owns -- there's no CRTP self-type to dispatch through here.
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn build(organization: &crate::device::level::Organization, timing: &TimingTable) -> (NodeArena, Vec<NodeId>) {
        let mut arena = NodeArena { nodes: Vec::new() };
        let num_channels = organization.count[Level::Channel.index()];
        let mut roots = Vec::new();
        for ch in 0..num_channels {
            let root = arena.build_subtree(Level::Channel, ch as i32, None, organization, timing);
            roots.push(root);
        }
        (arena, roots)
    }

    fn build_subtree(
        &mut self,
        level: Level,
        id: i32,
        parent: Option<NodeId>,
        organization: &crate::device::level::Organization,
        timing: &TimingTable,
    ) -> NodeId {
        let node = Node::new(level, id, parent, timing);
        let node_id = NodeId(self.nodes.len());
        self.nodes.push(node);

        // The tree stops instantiating nodes once the next level would be
        // `Row` -- row state lives in `row_state`, not as child nodes.
        if let Some(child_level) = level.child() {
            if child_level != Level::Row {
                let count = organization.count[child_level.index()];
                let mut children = Vec::with_capacity(count as usize);
                for i in 0..count {
                    children.push(self.build_subtree(child_level, i as i32, Some(node_id), organization, timing));
                }
                self.nodes[node_id.0].children = children;
            }
        }
        node_id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.0].children.get(index).copied()
    }

    /// Record `clk` as a fresh issue of `command` at `node_id` and resolve
    /// every non-sibling constraint keyed on `command` at this level.
    /// Sibling propagation is handled separately by the caller
    /// (`Device::issue_command`) since it targets a *different* node.
    pub fn record_issue_and_propagate(&mut self, node_id: NodeId, command: Command, clk: Clk, timing: &TimingTable) {
        let level = self.nodes[node_id.0].level;
        self.nodes[node_id.0].push_history(command, clk);
        for constraint in timing.lookup(level, command) {
            if constraint.sibling {
                continue;
            }
            if let Some(past) = self.nodes[node_id.0].history_at(command, constraint.window) {
                let future = past + constraint.latency;
                self.nodes[node_id.0].set_ready_clk(constraint.following, future);
            }
        }
    }

    pub fn propagate_sibling(&mut self, node_id: NodeId, command: Command, clk: Clk, timing: &TimingTable) {
        let level = self.nodes[node_id.0].level;
        for constraint in timing.lookup(level, command) {
            if !constraint.sibling {
                continue;
            }
            let future = clk + constraint.latency;
            self.nodes[node_id.0].set_ready_clk(constraint.following, future);
        }
    }
}
