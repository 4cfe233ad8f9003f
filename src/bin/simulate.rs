/*!
Thin demo binary: read a trace file, decode each address, drive a
`Device`/`Controller` pair to completion, print final statistics.

The address decoder here (flat addr -> `AddrVec`) is intentionally
minimal -- spec §1 places the decoder itself out of the core's scope, so
this is just enough striping (row-major within a bank, bank-major across
bankgroups) to exercise the controller end to end, not a contribution to
the tested contract.
*/

use pum_dram_sim::device::level::{AddrVec, Level, Organization};
use pum_dram_sim::device::Device;
use pum_dram_sim::request::{Request, RequestType};
use pum_dram_sim::trace::TraceReader;
use pum_dram_sim::Controller;
use std::io::BufReader;
use std::rc::Rc;

fn decode(addr: u64, organization: &Organization) -> AddrVec {
    let cols = organization.count[Level::Column.index()];
    let rows = organization.count[Level::Row.index()];
    let banks = organization.count[Level::Bank.index()];
    let bank_groups = organization.count[Level::BankGroup.index()];

    let col = addr % cols;
    let rest = addr / cols;
    let row = rest % rows;
    let rest = rest / rows;
    let bank = rest % banks;
    let rest = rest / banks;
    let bankgroup = rest % bank_groups;

    AddrVec::wildcard()
        .with(Level::Channel, 0)
        .with(Level::Rank, 0)
        .with(Level::BankGroup, bankgroup as i32)
        .with(Level::Bank, bank as i32)
        .with(Level::Row, row as i32)
        .with(Level::Column, col as i32)
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let trace_path = args.next().unwrap_or_else(|| {
        eprintln!("usage: simulate <trace-file> [org-preset] [timing-preset]");
        std::process::exit(1);
    });
    let org_preset = args.next().unwrap_or_else(|| "DDR4_2Gb_x8".to_string());
    let timing_preset = args.next().unwrap_or_else(|| "DDR4_3200W".to_string());

    let mut device = Device::from_presets(&org_preset, &timing_preset).expect("invalid preset combination");
    let organization = device.organization;

    let file = std::fs::File::open(&trace_path).unwrap_or_else(|e| {
        eprintln!("cannot open trace file {trace_path}: {e}");
        std::process::exit(1);
    });
    let entries: Vec<_> = TraceReader::new(BufReader::new(file))
        .map(|entry| entry.expect("malformed trace line"))
        .collect();

    let mut controller = Controller::new(1, device.timing_values.n_cl + device.timing_values.n_bl, Box::new(
        pum_dram_sim::controller::refresh::PeriodicRefreshManager::new(device.timing_values.n_refi, 0, 1),
    ));

    let completed = Rc::new(std::cell::Cell::new(0u64));
    let mut pending = entries.len();

    for entry in &entries {
        let addr_vec = decode(entry.addr, &organization);
        let completed = completed.clone();
        let mut req = Request::new(entry.request_type, entry.addr, addr_vec, controller.clk, 0);
        let callback: Rc<dyn Fn(&Request)> = Rc::new(move |_req: &Request| completed.set(completed.get() + 1));
        req.callback = Some(callback);
        if !controller.send(req) {
            eprintln!("dropped request for addr {} (buffer full)", entry.addr);
            pending -= 1;
        }
    }

    let max_cycles = 10_000_000;
    let mut cycles = 0u64;
    while completed.get() < pending as u64 && cycles < max_cycles {
        controller.tick(&mut device);
        cycles += 1;
    }

    println!("completed {}/{} requests in {} cycles", completed.get(), pending, cycles);
    println!("row hits: {}", controller.stats.row_hits);
    println!("row misses: {}", controller.stats.row_misses);
    println!("row conflicts: {}", controller.stats.row_conflicts);
    println!("avg read latency: {:.2}", controller.stats.avg_read_latency());
}
