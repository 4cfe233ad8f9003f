/*!
The refresh manager plug-in boundary: `IRefreshManager.tick()` enqueues a
`REFab` into the priority buffer once every `nREFI` cycles.

Grounded on spec.md §6's external-interface list and
`DDR4::m_timings.nREFI`. Only all-bank refresh is modeled here; per-bank
(`REFsb`) and rank-level VRR are supplemental device commands (see
`device::command`'s doc comment) that this manager never schedules on its
own -- nothing in spec.md or the filtered original gives per-bank refresh
its own cadence policy.
*/

use crate::controller::buffer::ReqBuffer;
use crate::device::level::{AddrVec, Level};
use crate::device::timing::Clk;
use crate::request::{Request, RequestType};

pub trait RefreshManager {
    fn tick(&mut self, clk: Clk, priority_buffer: &mut ReqBuffer);
}

pub struct PeriodicRefreshManager {
    pub n_refi: Clk,
    pub num_ranks: u64,
    next_due: Vec<Clk>,
}

impl PeriodicRefreshManager {
    pub fn new(n_refi: Clk, channel: i32, num_ranks: u64) -> PeriodicRefreshManager {
        let _ = channel;
        PeriodicRefreshManager { n_refi, num_ranks, next_due: vec![n_refi; num_ranks as usize] }
    }
}

impl RefreshManager for PeriodicRefreshManager {
    fn tick(&mut self, clk: Clk, priority_buffer: &mut ReqBuffer) {
        for rank in 0..self.num_ranks {
            if clk >= self.next_due[rank as usize] {
                let addr_vec = AddrVec::wildcard().with(Level::Channel, 0).with(Level::Rank, rank as i32);
                let req = Request::new(RequestType::Refresh, 0, addr_vec, clk, u32::MAX);
                priority_buffer.enqueue(req);
                self.next_due[rank as usize] = clk + self.n_refi;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueues_refresh_once_per_interval() {
        let mut mgr = PeriodicRefreshManager::new(100, 0, 1);
        let mut buffer = ReqBuffer::new(8);
        mgr.tick(50, &mut buffer);
        assert_eq!(buffer.len(), 0);
        mgr.tick(100, &mut buffer);
        assert_eq!(buffer.len(), 1);
        mgr.tick(150, &mut buffer);
        assert_eq!(buffer.len(), 1);
        mgr.tick(200, &mut buffer);
        assert_eq!(buffer.len(), 2);
    }
}
