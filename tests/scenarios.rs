//! End-to-end scenarios from spec.md §8, driving `Controller`/`Device`
//! together the way `src/bin/simulate.rs` does, without the trace/address
//! decoder adapters (those are out of core scope; these tests build
//! `AddrVec`s directly).

use pum_dram_sim::controller::refresh::PeriodicRefreshManager;
use pum_dram_sim::device::level::{AddrVec, Level};
use pum_dram_sim::device::state::NodeState;
use pum_dram_sim::device::Device;
use pum_dram_sim::request::{Request, RequestType};
use pum_dram_sim::Controller;
use std::cell::Cell;
use std::rc::Rc;

fn setup() -> (Device, Controller) {
    let device = Device::from_presets("DDR4_2Gb_x8", "DDR4_3200W").unwrap();
    let refresh = Box::new(PeriodicRefreshManager::new(device.timing_values.n_refi, 0, 1));
    let controller = Controller::new(1, device.timing_values.n_cl + device.timing_values.n_bl, refresh);
    (device, controller)
}

fn addr(bankgroup: i32, bank: i32, row: i32) -> AddrVec {
    AddrVec::wildcard()
        .with(Level::Channel, 0)
        .with(Level::Rank, 0)
        .with(Level::BankGroup, bankgroup)
        .with(Level::Bank, bank)
        .with(Level::Row, row)
        .with(Level::Column, 0)
}

fn run_to_completion(device: &mut Device, controller: &mut Controller, done: &Rc<Cell<u64>>, target: u64, max_cycles: u64) -> u64 {
    let mut cycles = 0;
    while done.get() < target && cycles < max_cycles {
        controller.tick(device);
        cycles += 1;
    }
    cycles
}

fn read_with_callback(addr_vec: AddrVec, arrive: i64, done: &Rc<Cell<u64>>) -> Request {
    let mut req = Request::new(RequestType::Read, 0, addr_vec, arrive, 0);
    let done = done.clone();
    let callback: Rc<dyn Fn(&Request)> = Rc::new(move |_| done.set(done.get() + 1));
    req.callback = Some(callback);
    req
}

// A. Simple read hit: a cold bank needs one ACT then one RD.
#[test]
fn simple_read_hit_completes() {
    let (mut device, mut controller) = setup();
    let done = Rc::new(Cell::new(0));
    assert!(controller.send(read_with_callback(addr(0, 0, 0), 0, &done)));

    let cycles = run_to_completion(&mut device, &mut controller, &done, 1, 2_000);
    assert_eq!(done.get(), 1);
    assert!(cycles > 0);
    assert_eq!(controller.stats.read_row_misses, 1);
}

// B. Read miss then hit: a second read to the same row, after the first
// opens it, should not require a second ACT.
#[test]
fn second_read_same_row_is_a_hit() {
    let (mut device, mut controller) = setup();
    let done = Rc::new(Cell::new(0));
    assert!(controller.send(read_with_callback(addr(0, 0, 3), 0, &done)));
    run_to_completion(&mut device, &mut controller, &done, 1, 2_000);

    assert!(controller.send(read_with_callback(addr(0, 0, 3), controller.clk, &done)));
    run_to_completion(&mut device, &mut controller, &done, 2, 2_000);

    assert_eq!(controller.stats.read_row_misses, 1);
    assert_eq!(controller.stats.read_row_hits, 1);
}

// C. Write -> Read forwarding: a read to an address still sitting in the
// write buffer is served straight from there, with no RD on the bus.
#[test]
fn write_then_read_forwards_without_issuing_read_command() {
    let (_device, mut controller) = setup();
    let write = Request::new(RequestType::Write, 64, addr(0, 1, 5), 0, 0);
    assert!(controller.send(write));

    let done = Rc::new(Cell::new(0));
    let read = read_with_callback(addr(0, 1, 5), 0, &done);
    assert!(controller.send(read));

    // Forwarded reads are queued directly onto `pending` at send time,
    // before any cycle has advanced.
    assert_eq!(done.get(), 0);
    assert_eq!(controller.stats.num_read_reqs, 1);
    assert_eq!(controller.stats.num_write_reqs, 1);
}

// D. RowClone aggregation: 16 matching RowClone requests collapse into
// one aggregated-PuM entry that runs the ACTp/PREv/ACTv/RC sequence and
// leaves the bank closed again.
#[test]
fn rowclone_aggregation_runs_apa_sequence_to_completion() {
    let (mut device, mut controller) = setup();
    let a = addr(1, 2, 7);
    for i in 0..16 {
        let req = Request::new(RequestType::RowClone, i, a, 0, 0);
        assert!(controller.send(req));
    }
    assert_eq!(controller.stats.num_rc_reqs, 16);

    let mut saw_rc_state = false;
    for _ in 0..20_000 {
        controller.tick(&mut device);
        let state = device.node_state(&a, Level::Bank);
        if state == NodeState::RcState || state == NodeState::OpenedPum {
            saw_rc_state = true;
        }
        if saw_rc_state && state == NodeState::Closed {
            break;
        }
    }
    assert!(saw_rc_state, "bank never entered a RowClone mid-sequence state");
    assert_eq!(device.node_state(&a, Level::Bank), NodeState::Closed);
}

// E. Majority with fractional padding: 30 matching Majority requests
// should move one MAJ plus 2 synthetic FRAC requests into aggregated_pum.
#[test]
fn majority_group_pads_aggregated_pum_with_fractional_requests() {
    let (mut device, mut controller) = setup();
    let a = addr(2, 3, 9);
    for i in 0..30 {
        let req = Request::new(RequestType::Majority, i, a, 0, 0);
        assert!(controller.send(req));
    }
    assert_eq!(controller.stats.num_maj_reqs, 30);

    // Drive a handful of cycles to let move_n_matching_requests fire.
    for _ in 0..4 {
        controller.tick(&mut device);
    }
    // The 2 padding FRAC requests are synthesized post-hoc, not counted
    // at `send` time (`num_frac_reqs` only tracks external sends) -- what
    // we actually check is that the device eventually sees a FRAC command
    // reach completion before the MAJ drains the group.
    let mut saw_frac = false;
    for _ in 0..30_000 {
        controller.tick(&mut device);
        if device.node_state(&a, Level::Bank) == NodeState::Processed {
            saw_frac = true;
            break;
        }
    }
    assert!(saw_frac, "expected at least one FRAC to reach Processed before MAJ drains the group");
}

// F. APA non-interruption: a RowClone in flight (PREv pending) must not
// be starved by a same-bankgroup read arriving mid-sequence unless the
// read has enough lead time.
#[test]
fn apa_veto_blocks_premature_interruption() {
    use pum_dram_sim::controller::apa::check_interruption_with_delay;
    use pum_dram_sim::device::command::Command;

    let allowed = check_interruption_with_delay(Command::Prev, Command::Rc, Command::Rd, Command::Rd, 100, 95, true);
    assert!(!allowed, "a same-bankgroup read only 5 cycles ahead must be vetoed (needs > 8)");

    let allowed = check_interruption_with_delay(Command::Prev, Command::Rc, Command::Rd, Command::Rd, 100, 80, true);
    assert!(allowed, "a same-bankgroup read 20 cycles ahead clears the 8-cycle margin");

    let allowed_diff_bg = check_interruption_with_delay(Command::Prev, Command::Rc, Command::Rd, Command::Rd, 100, 97, false);
    assert!(!allowed_diff_bg, "a different-bankgroup read only 3 cycles ahead must be vetoed (needs > 4)");
}
