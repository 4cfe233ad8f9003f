/*!
The scheduler plug-in boundary: "pick one request out of a buffer."

spec.md §6 lists `IScheduler.get_best_request(buffer) -> iterator` as an
external interface the controller consumes rather than something the
core prescribes a single policy for. `FcfsScheduler` (oldest `arrive`
first) is the one concrete implementation shipped here, grounded on the
default the original's `GenericDRAMController` wires in when no
scheduler plugin config is given.
*/

use crate::controller::buffer::ReqBuffer;
use crate::device::timing::Clk;
use crate::device::Device;

pub trait Scheduler {
    /// Index of the request this policy would issue next, or `None` if
    /// the buffer is empty. Resolves the chosen entry's `command` against
    /// `device` as a side effect -- grounded on the original's own
    /// comment that read/write prerequisite resolution happens "inside
    /// of the get best request function", unlike the priority/PuM paths
    /// where the controller resolves it explicitly.
    fn get_best_request(&self, buffer: &mut ReqBuffer, device: &Device, clk: Clk) -> Option<usize>;
}

#[derive(Default)]
pub struct FcfsScheduler;

impl Scheduler for FcfsScheduler {
    fn get_best_request(&self, buffer: &mut ReqBuffer, device: &Device, clk: Clk) -> Option<usize> {
        let index = buffer.iter().enumerate().min_by_key(|(_, req)| req.arrive).map(|(index, _)| index)?;
        let req = buffer.get_mut(index);
        req.command = device.get_prereq(req.final_command, &req.addr_vec, clk);
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::level::{AddrVec, Level};
    use crate::request::{Request, RequestType};

    #[test]
    fn picks_oldest_arrival() {
        let device = Device::from_presets("DDR4_2Gb_x8", "DDR4_3200W").unwrap();
        let addr = AddrVec::wildcard().with(Level::Channel, 0).with(Level::Rank, 0).with(Level::BankGroup, 0).with(Level::Bank, 0).with(Level::Row, 1);
        let mut buffer = ReqBuffer::new(4);
        buffer.enqueue(Request::new(RequestType::Read, 0, addr, 10, 0));
        buffer.enqueue(Request::new(RequestType::Read, 4, addr, 3, 0));
        let picked = FcfsScheduler.get_best_request(&mut buffer, &device, 3).unwrap();
        assert_eq!(buffer.get(picked).arrive, 3);
    }
}
