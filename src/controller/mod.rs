/*!
The memory controller: six request buffers plus an aggregated-PuM staging
buffer, wired through one `tick()` per spec.md §4.2.

Grounded on `GenericDRAMController` in
`examples/original_source/src/dram_controller/impl/generic_dram_controller.cpp`
-- buffer layout, `move_n_matching_requests`, `check_aggregated_pum_by_
bank_and_ready`, `schedule_request`'s priority order and vetoes,
`set_write_mode`'s hysteresis, and `update_request_stats`'s row-hit/miss/
conflict classification are all transcribed from there, generalized from
the original's `std::function`-based scheduler/refresh/row-policy plugins
into the `Scheduler`/`RefreshManager`/`RowPolicy`/`ControllerPlugin`
trait objects in this module's siblings.
*/

pub mod apa;
pub mod buffer;
pub mod plugin;
pub mod refresh;
pub mod row_policy;
pub mod scheduler;

use crate::device::command::Command;
use crate::device::level::{AddrVec, Level};
use crate::device::timing::Clk;
use crate::device::Device;
use crate::request::{Request, RequestType};
use buffer::ReqBuffer;
use plugin::ControllerPlugin;
use refresh::RefreshManager;
use row_policy::RowPolicy;
use scheduler::Scheduler;
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferKind {
    Active,
    Priority,
    AggregatedPum,
    Read,
    Write,
}

/// Per-channel scheduling/row-buffer statistics. Grounded on the
/// `register_stat` fields in `GenericDRAMController`.
#[derive(Default, Debug)]
pub struct Stats {
    pub row_hits: u64,
    pub row_misses: u64,
    pub row_conflicts: u64,
    pub read_row_hits: u64,
    pub read_row_misses: u64,
    pub read_row_conflicts: u64,
    pub write_row_hits: u64,
    pub write_row_misses: u64,
    pub write_row_conflicts: u64,
    pub read_row_hits_per_core: Vec<u64>,
    pub read_row_misses_per_core: Vec<u64>,
    pub read_row_conflicts_per_core: Vec<u64>,
    pub num_read_reqs: u64,
    pub num_write_reqs: u64,
    pub num_rc_reqs: u64,
    pub num_maj_reqs: u64,
    pub num_frac_reqs: u64,
    pub num_other_reqs: u64,
    pub read_latency_total: Clk,
}

impl Stats {
    fn new(num_cores: usize) -> Stats {
        Stats {
            read_row_hits_per_core: vec![0; num_cores],
            read_row_misses_per_core: vec![0; num_cores],
            read_row_conflicts_per_core: vec![0; num_cores],
            ..Default::default()
        }
    }

    pub fn avg_read_latency(&self) -> f64 {
        if self.num_read_reqs == 0 {
            0.0
        } else {
            self.read_latency_total as f64 / self.num_read_reqs as f64
        }
    }
}

pub struct Controller {
    pub clk: Clk,
    pending: VecDeque<Request>,

    active_buffer: ReqBuffer,
    priority_buffer: ReqBuffer,
    read_buffer: ReqBuffer,
    write_buffer: ReqBuffer,
    rc_buffer: ReqBuffer,
    maj_buffer: ReqBuffer,
    aggregated_pum: ReqBuffer,

    rc_command_size: usize,
    maj_command_size: usize,
    frac_commands: usize,

    wr_low_watermark: f64,
    wr_high_watermark: f64,
    is_write_mode: bool,

    read_latency: Clk,

    scheduler: Box<dyn Scheduler>,
    refresh: Box<dyn RefreshManager>,
    row_policy: Box<dyn RowPolicy>,
    plugins: Vec<Box<dyn ControllerPlugin>>,

    pub stats: Stats,
}

impl Controller {
    pub fn new(
        num_cores: usize,
        read_latency: Clk,
        refresh: Box<dyn RefreshManager>,
    ) -> Controller {
        Controller {
            clk: 0,
            pending: VecDeque::new(),
            active_buffer: ReqBuffer::new(64),
            priority_buffer: ReqBuffer::new(512 * 3 + 32),
            read_buffer: ReqBuffer::new(64),
            write_buffer: ReqBuffer::new(64),
            rc_buffer: ReqBuffer::new(512),
            maj_buffer: ReqBuffer::new(512),
            aggregated_pum: ReqBuffer::new(64),
            rc_command_size: 16,
            maj_command_size: 30,
            frac_commands: 2,
            wr_low_watermark: 0.2,
            wr_high_watermark: 0.8,
            is_write_mode: false,
            read_latency,
            scheduler: Box::new(scheduler::FcfsScheduler),
            refresh,
            row_policy: Box::new(row_policy::OpenPageRowPolicy),
            plugins: Vec::new(),
            stats: Stats::new(num_cores),
        }
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn ControllerPlugin>) {
        self.plugins.push(plugin);
    }

    fn buffer(&self, kind: BufferKind) -> &ReqBuffer {
        match kind {
            BufferKind::Active => &self.active_buffer,
            BufferKind::Priority => &self.priority_buffer,
            BufferKind::AggregatedPum => &self.aggregated_pum,
            BufferKind::Read => &self.read_buffer,
            BufferKind::Write => &self.write_buffer,
        }
    }

    fn buffer_mut(&mut self, kind: BufferKind) -> &mut ReqBuffer {
        match kind {
            BufferKind::Active => &mut self.active_buffer,
            BufferKind::Priority => &mut self.priority_buffer,
            BufferKind::AggregatedPum => &mut self.aggregated_pum,
            BufferKind::Read => &mut self.read_buffer,
            BufferKind::Write => &mut self.write_buffer,
        }
    }

    /// `GenericDRAMController::send`: enqueue an externally-arriving
    /// request, forwarding reads that hit a still-buffered write.
    pub fn send(&mut self, mut req: Request) -> bool {
        match req.request_type {
            RequestType::Read => self.stats.num_read_reqs += 1,
            RequestType::Write => self.stats.num_write_reqs += 1,
            RequestType::RowClone => self.stats.num_rc_reqs += 1,
            RequestType::Majority => self.stats.num_maj_reqs += 1,
            RequestType::Fractional => self.stats.num_frac_reqs += 1,
            _ => self.stats.num_other_reqs += 1,
        }

        if req.request_type == RequestType::Read {
            if self.write_buffer.iter().any(|w| w.addr == req.addr) {
                req.depart = self.clk + 1;
                self.pending.push_back(req);
                return true;
            }
        }

        req.arrive = self.clk;
        let enqueued = match req.request_type {
            RequestType::Read => self.read_buffer.enqueue(req.clone()),
            RequestType::Write => self.write_buffer.enqueue(req.clone()),
            RequestType::RowClone => self.rc_buffer.enqueue(req.clone()),
            RequestType::Majority => self.maj_buffer.enqueue(req.clone()),
            RequestType::Fractional => self.aggregated_pum.enqueue(req.clone()),
            _ => false,
        };
        enqueued
    }

    /// `GenericDRAMController::priority_send`: maintenance requests (e.g.
    /// refresh) that bypass the read/write buffers entirely.
    pub fn priority_send(&mut self, req: Request) -> bool {
        self.priority_buffer.enqueue(req)
    }

    fn serve_completed_reads(&mut self) {
        if let Some(req) = self.pending.front() {
            if req.depart <= self.clk {
                let req = self.pending.pop_front().unwrap();
                if req.depart - req.arrive > 1 {
                    self.stats.read_latency_total += req.depart - req.arrive;
                }
                if let Some(callback) = &req.callback {
                    callback(&req);
                }
            }
        }
    }

    fn set_write_mode(&mut self) {
        if !self.is_write_mode {
            if self.write_buffer.len() as f64 > self.wr_high_watermark * self.write_buffer.max_size as f64 || self.read_buffer.is_empty() {
                self.is_write_mode = true;
            }
        } else if (self.write_buffer.len() as f64) < self.wr_low_watermark * self.write_buffer.max_size as f64 && !self.read_buffer.is_empty() {
            self.is_write_mode = false;
        }
    }

    /// `GenericDRAMController::move_n_matching_requests`: once `n` entries
    /// in `src` share an `addr_vec`, move one representative (plus, for a
    /// Majority group, `frac_commands` synthetic Fractional padding
    /// requests) into `dst` and drop the `n` originals from `src`.
    fn move_n_matching_requests(src: &mut ReqBuffer, dst: &mut ReqBuffer, n: usize, frac_commands: usize) -> bool {
        let mut groups: BTreeMap<AddrVec, Vec<usize>> = BTreeMap::new();
        for (index, req) in src.iter().enumerate() {
            groups.entry(req.addr_vec).or_default().push(index);
        }
        for (_, indices) in groups {
            if indices.len() < n {
                continue;
            }
            let representative = src.get(indices[0]).clone();
            let mut to_enqueue = Vec::new();
            if representative.request_type == RequestType::Majority {
                for _ in 0..frac_commands {
                    let mut frac = representative.clone();
                    frac.request_type = RequestType::Fractional;
                    frac.final_command = Command::Frac;
                    frac.command = Some(Command::Frac);
                    to_enqueue.push(frac);
                }
            }
            to_enqueue.push(representative);

            if dst.len() + to_enqueue.len() > dst.max_size {
                // Destination too full for this group; the original
                // stops scanning entirely rather than trying a smaller
                // group further down the map.
                break;
            }
            for req in to_enqueue {
                dst.enqueue(req);
            }
            let mut to_remove = indices[..n].to_vec();
            to_remove.sort_unstable_by(|a, b| b.cmp(a));
            for index in to_remove {
                src.remove_at(index);
            }
            return true;
        }
        false
    }

    /// `GenericDRAMController::check_aggregated_pum_by_bank_and_ready`.
    fn check_aggregated_pum_by_bank_and_ready(&mut self, device: &Device) -> Option<usize> {
        for index in 0..self.aggregated_pum.len() {
            let req = self.aggregated_pum.get_mut(index);
            req.command = device.get_prereq(req.final_command, &req.addr_vec, self.clk);
            if let Some(command) = req.command {
                if device.check_ready(command, &req.addr_vec, self.clk) {
                    return Some(index);
                }
            }
        }
        None
    }

    /// `GenericDRAMController::schedule_request`'s row-close veto (step
    /// 2.3): a `is_closing` command must not be scheduled if it would
    /// close a bank the active buffer still has an opening sequence in
    /// flight on.
    fn row_close_veto(&self, command: Command, addr_vec: &AddrVec) -> bool {
        if !command.meta().is_closing {
            return false;
        }
        self.active_buffer.iter().any(|active| active.addr_vec.overlaps_through(addr_vec, Level::Bank))
    }

    /// `GenericDRAMController::schedule_request`'s APA interruption veto
    /// (step 2.4): never delay an in-flight RowClone/Majority step badly
    /// enough to blow its own window.
    fn apa_veto(&self, device: &Device, command: Command, final_command: Command, addr_vec: &AddrVec) -> bool {
        for active in self.active_buffer.iter() {
            let Some(active_command) = active.command else { continue };
            if !matches!(active_command, Command::Actv | Command::Prej | Command::Prev | Command::Actp) {
                continue;
            }
            if active.addr_vec.get(Level::Channel) != addr_vec.get(Level::Channel) {
                continue;
            }
            let same_bankgroup = active.addr_vec.get(Level::BankGroup) == addr_vec.get(Level::BankGroup);
            let active_ready = device.ready_cycle(active_command, &active.addr_vec);
            let found_ready = device.ready_cycle(command, addr_vec);
            let allowed = apa::check_interruption_with_delay(
                active_command,
                active.final_command,
                command,
                final_command,
                active_ready,
                found_ready,
                same_bankgroup,
            );
            if !allowed {
                return true;
            }
        }
        false
    }

    /// `GenericDRAMController::schedule_request`. Returns the buffer and
    /// index of the request to issue this cycle, after both vetoes.
    fn schedule_request(&mut self, device: &Device) -> Option<(BufferKind, usize)> {
        if let Some(index) = self.scheduler.get_best_request(&mut self.active_buffer, device, self.clk) {
            let req = self.active_buffer.get(index);
            if let Some(command) = req.command {
                if device.check_ready(command, &req.addr_vec, self.clk) {
                    // Step 2.1 of the original: an active-buffer pick that's
                    // ready issues immediately, bypassing the row-close and
                    // APA vetoes below (those exist to protect an in-flight
                    // active-buffer sequence, not to gate it against itself).
                    return Some((BufferKind::Active, index));
                }
            }
        }

        if !self.priority_buffer.is_empty() {
            let req = self.priority_buffer.get_mut(0);
            req.command = device.get_prereq(req.final_command, &req.addr_vec, self.clk);
            let ready = req.command.is_some_and(|c| device.check_ready(c, &req.addr_vec, self.clk));
            if ready {
                return self.finish_schedule(device, BufferKind::Priority, 0);
            }
            // A maintenance request occupies the priority buffer and
            // can't issue yet: the whole cycle stalls rather than
            // falling through to PuM/read/write, matching the original.
            return None;
        }

        if self.aggregated_pum.len() + 1 <= self.aggregated_pum.max_size {
            Self::move_n_matching_requests(&mut self.maj_buffer, &mut self.aggregated_pum, self.maj_command_size, self.frac_commands);
            Self::move_n_matching_requests(&mut self.rc_buffer, &mut self.aggregated_pum, self.rc_command_size, self.frac_commands);
        }

        if !self.aggregated_pum.is_empty() {
            if let Some(index) = self.check_aggregated_pum_by_bank_and_ready(device) {
                return self.finish_schedule(device, BufferKind::AggregatedPum, index);
            }
        }

        self.set_write_mode();
        let kind = if self.is_write_mode { BufferKind::Write } else { BufferKind::Read };
        let index = match kind {
            BufferKind::Write => self.scheduler.get_best_request(&mut self.write_buffer, device, self.clk),
            BufferKind::Read => self.scheduler.get_best_request(&mut self.read_buffer, device, self.clk),
            _ => unreachable!(),
        };
        if let Some(index) = index {
            let req = self.buffer(kind).get(index);
            if let Some(command) = req.command {
                if device.check_ready(command, &req.addr_vec, self.clk) {
                    return self.finish_schedule(device, kind, index);
                }
            }
        }
        None
    }

    /// Applies the row-close and APA vetoes once a candidate has been
    /// found; returns `None` if either rejects it.
    fn finish_schedule(&mut self, device: &Device, kind: BufferKind, index: usize) -> Option<(BufferKind, usize)> {
        let req = self.buffer(kind).get(index);
        let command = req.command?;
        let addr_vec = req.addr_vec;
        let final_command = req.final_command;
        if self.row_close_veto(command, &addr_vec) {
            return None;
        }
        if self.apa_veto(device, command, final_command, &addr_vec) {
            return None;
        }
        Some((kind, index))
    }

    fn is_row_hit(&self, device: &Device, req: &Request) -> bool {
        device.check_rowbuffer_hit(req.final_command, &req.addr_vec, self.clk)
    }

    fn is_row_open(&self, device: &Device, req: &Request) -> bool {
        device.check_node_open(req.final_command, &req.addr_vec, self.clk)
    }

    fn update_request_stats(&mut self, device: &Device, kind: BufferKind, index: usize) {
        let req = self.buffer_mut(kind).get_mut(index);
        req.is_stat_updated = true;
        let req = self.buffer(kind).get(index).clone();

        match req.request_type {
            RequestType::Read => {
                if self.is_row_hit(device, &req) {
                    self.stats.read_row_hits += 1;
                    self.stats.row_hits += 1;
                    if (req.source_id as usize) < self.stats.read_row_hits_per_core.len() {
                        self.stats.read_row_hits_per_core[req.source_id as usize] += 1;
                    }
                } else if self.is_row_open(device, &req) {
                    self.stats.read_row_conflicts += 1;
                    self.stats.row_conflicts += 1;
                    if (req.source_id as usize) < self.stats.read_row_conflicts_per_core.len() {
                        self.stats.read_row_conflicts_per_core[req.source_id as usize] += 1;
                    }
                } else {
                    self.stats.read_row_misses += 1;
                    self.stats.row_misses += 1;
                    if (req.source_id as usize) < self.stats.read_row_misses_per_core.len() {
                        self.stats.read_row_misses_per_core[req.source_id as usize] += 1;
                    }
                }
            }
            RequestType::Write => {
                if self.is_row_hit(device, &req) {
                    self.stats.write_row_hits += 1;
                    self.stats.row_hits += 1;
                } else if self.is_row_open(device, &req) {
                    self.stats.write_row_conflicts += 1;
                    self.stats.row_conflicts += 1;
                } else {
                    self.stats.write_row_misses += 1;
                    self.stats.row_misses += 1;
                }
            }
            _ => {}
        }
    }

    /// One full clock cycle: serve completions, tick refresh, schedule
    /// and issue at most one command, drive row-policy/plugins. Mirrors
    /// `GenericDRAMController::tick` step for step.
    pub fn tick(&mut self, device: &mut Device) {
        self.clk += 1;
        device.tick(self.clk);

        self.serve_completed_reads();
        self.refresh.tick(self.clk, &mut self.priority_buffer);

        let scheduled = self.schedule_request(device);

        let issued_ref = scheduled.map(|(kind, index)| self.buffer(kind).get(index).clone());
        self.row_policy.update(scheduled.is_some(), issued_ref.as_ref());
        for plugin in self.plugins.iter_mut() {
            plugin.update(scheduled.is_some(), issued_ref.as_ref());
        }

        if let Some((kind, index)) = scheduled {
            if !self.buffer(kind).get(index).is_stat_updated {
                self.update_request_stats(device, kind, index);
            }

            let req = self.buffer(kind).get(index).clone();
            let command = req.command.expect("scheduled request always has a resolved command");
            tracing::trace!(?kind, ?command, clk = self.clk, "scheduled");
            device.issue_command(command, req.addr_vec, self.clk);

            if command == req.final_command {
                let mut completed = req;
                if completed.request_type == RequestType::Read {
                    completed.depart = self.clk + self.read_latency;
                    self.pending.push_back(completed);
                }
                self.buffer_mut(kind).remove_at(index);
            } else {
                if command.meta().is_opening && kind != BufferKind::Active {
                    if self.active_buffer.enqueue(req) {
                        self.buffer_mut(kind).remove_at(index);
                    }
                } else if kind != BufferKind::Active {
                    self.buffer_mut(kind).get_mut(index).command = Some(command);
                } else {
                    self.active_buffer.get_mut(index).command = Some(command);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::level::Level;
    use crate::device::Device;
    use refresh::PeriodicRefreshManager;

    fn test_device() -> Device {
        Device::from_presets("DDR4_2Gb_x8", "DDR4_3200W").unwrap()
    }

    fn test_controller() -> Controller {
        Controller::new(1, 26, Box::new(PeriodicRefreshManager::new(100_000, 0, 1)))
    }

    #[test]
    fn read_miss_then_hit_issues_activate_then_read() {
        let mut dev = test_device();
        let mut ctl = test_controller();
        let addr = AddrVec::wildcard().with(Level::Channel, 0).with(Level::Rank, 0).with(Level::BankGroup, 0).with(Level::Bank, 0).with(Level::Row, 7);
        assert!(ctl.send(Request::new(RequestType::Read, 0x1000, addr, 0, 0)));

        let mut issued_act = false;
        let mut issued_rd = false;
        for _ in 0..200 {
            ctl.tick(&mut dev);
            let bank = dev.arena.get(dev.node_at(&addr, Level::Bank));
            if bank.state == crate::device::state::NodeState::Opened {
                issued_act = true;
            }
            if issued_act && ctl.read_buffer.is_empty() && ctl.active_buffer.is_empty() {
                issued_rd = true;
                break;
            }
        }
        assert!(issued_act);
        assert!(issued_rd);
    }

    #[test]
    fn write_then_read_same_address_forwards() {
        let mut ctl = test_controller();
        let addr = AddrVec::wildcard().with(Level::Channel, 0).with(Level::Rank, 0).with(Level::BankGroup, 0).with(Level::Bank, 0).with(Level::Row, 2);
        ctl.send(Request::new(RequestType::Write, 0x2000, addr, 0, 0));
        assert!(ctl.send(Request::new(RequestType::Read, 0x2000, addr, 0, 0)));
        assert_eq!(ctl.pending.len(), 1);
    }

    #[test]
    fn move_n_matching_requires_full_group() {
        let mut src = ReqBuffer::new(32);
        let mut dst = ReqBuffer::new(32);
        let addr = AddrVec::wildcard().with(Level::Bank, 1);
        for i in 0..3 {
            src.enqueue(Request::new(RequestType::RowClone, i, addr, 0, 0));
        }
        assert!(!Controller::move_n_matching_requests(&mut src, &mut dst, 4, 2));
        assert_eq!(src.len(), 3);

        src.enqueue(Request::new(RequestType::RowClone, 9, addr, 0, 0));
        assert!(Controller::move_n_matching_requests(&mut src, &mut dst, 4, 2));
        assert_eq!(src.len(), 0);
        assert_eq!(dst.len(), 1);
    }

    #[test]
    fn majority_group_pads_with_fractional_requests() {
        let mut src = ReqBuffer::new(32);
        let mut dst = ReqBuffer::new(32);
        let addr = AddrVec::wildcard().with(Level::Bank, 4);
        for i in 0..3 {
            src.enqueue(Request::new(RequestType::Majority, i, addr, 0, 0));
        }
        assert!(Controller::move_n_matching_requests(&mut src, &mut dst, 3, 2));
        assert_eq!(dst.len(), 3);
        assert_eq!(dst.iter().filter(|r| r.request_type == RequestType::Fractional).count(), 2);
    }
}
