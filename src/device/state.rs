/*!
Node/bank states. Grounded on `DDR4::m_states`/`m_init_states` and the FSM
walk in spec.md §3.
*/

use crate::device::level::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Opened,
    Closed,
    PowerUp,
    NotApplicable,
    Refreshing,
    OpenedPum,
    RcState,
    MajState,
    Processed,
}

impl NodeState {
    /// Initial state by level, mirroring `DDR4::m_init_states`.
    pub const fn initial(level: Level) -> NodeState {
        match level {
            Level::Channel => NodeState::NotApplicable,
            Level::Rank => NodeState::PowerUp,
            Level::BankGroup => NodeState::NotApplicable,
            Level::Bank => NodeState::Closed,
            Level::Row | Level::Column => NodeState::NotApplicable,
        }
    }

    /// True for any of the PuM mid-sequence states a bank can be in
    /// between `ACTp` and its terminal `RC`/`MAJ`/`FRAC`.
    pub const fn is_pum_in_progress(self) -> bool {
        matches!(self, NodeState::OpenedPum | NodeState::RcState | NodeState::MajState | NodeState::Processed)
    }
}
