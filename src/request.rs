/*!
Memory requests: the unit the controller schedules and the device executes.

Grounded on `Request`/`Request::Type` in
`examples/original_source/src/base/request.h` (the struct held by every
controller buffer) and on spec.md §3's Request data model.
*/

use crate::device::command::Command;
use crate::device::level::AddrVec;
use crate::device::timing::Clk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Read,
    Write,
    RowClone,
    Majority,
    Fractional,
    Refresh,
    Open,
    Close,
}

impl RequestType {
    /// The command that completes this request's sequence at the device --
    /// the one the controller waits for before retiring it from the active
    /// buffer (spec §4.2 step 9).
    pub const fn final_command(self) -> Command {
        match self {
            RequestType::Read => Command::Rd,
            RequestType::Write => Command::Wr,
            RequestType::RowClone => Command::Rc,
            RequestType::Majority => Command::Maj,
            RequestType::Fractional => Command::Frac,
            RequestType::Refresh => Command::Refab,
            RequestType::Open => Command::Act,
            RequestType::Close => Command::Pre,
        }
    }

    pub const fn is_pum(self) -> bool {
        matches!(self, RequestType::RowClone | RequestType::Majority | RequestType::Fractional)
    }
}

pub type Callback = std::rc::Rc<dyn Fn(&Request)>;

/// A single in-flight memory access.
///
/// `command` tracks the *next* command the device still needs
/// (`device::Device::get_prereq` updates it every cycle it isn't
/// satisfied); `None` is the idiomatic replacement for the original's
/// sentinel `command == -1` ("not issuable from here", e.g. a foreign
/// request arriving mid-PuM-sequence). `final_command` never changes once
/// the request is built. `is_stat_updated` exists purely to reproduce the
/// write-latency-stat gap called out in SPEC_FULL.md §6 Open Question 2
/// -- a request that forwards straight from the write buffer to being
/// served never gets its latency counted, and we keep that gap rather
/// than quietly fixing it.
#[derive(Clone)]
pub struct Request {
    pub request_type: RequestType,
    pub addr: u64,
    pub addr_vec: AddrVec,
    pub final_command: Command,
    pub command: Option<Command>,
    pub arrive: Clk,
    pub depart: Clk,
    pub source_id: u32,
    pub is_stat_updated: bool,
    pub callback: Option<Callback>,
}

impl Request {
    pub fn new(request_type: RequestType, addr: u64, addr_vec: AddrVec, arrive: Clk, source_id: u32) -> Request {
        let final_command = request_type.final_command();
        Request {
            request_type,
            addr,
            addr_vec,
            final_command,
            command: Some(final_command),
            arrive,
            depart: -1,
            source_id,
            is_stat_updated: false,
            callback: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.command == Some(self.final_command) && self.depart >= 0
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("request_type", &self.request_type)
            .field("addr", &self.addr)
            .field("command", &self.command)
            .field("final_command", &self.final_command)
            .field("arrive", &self.arrive)
            .field("depart", &self.depart)
            .field("source_id", &self.source_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::level::Level;

    #[test]
    fn new_request_starts_at_its_final_command() {
        let req = Request::new(RequestType::Read, 0x1000, AddrVec::wildcard().with(Level::Bank, 2), 5, 0);
        assert_eq!(req.command, Some(Command::Rd));
        assert!(!req.is_complete());
    }

    #[test]
    fn pum_classification() {
        assert!(RequestType::RowClone.is_pum());
        assert!(RequestType::Majority.is_pum());
        assert!(RequestType::Fractional.is_pum());
        assert!(!RequestType::Read.is_pum());
    }
}
