/*!
Cycle-accurate DRAM timing and scheduling core: a DDR4 device timing model
plus a request-buffer-driven controller, coupled by the command/
prerequisite protocol described in `SPEC_FULL.md`. Three
Processing-using-Memory operations (RowClone, Majority, Fractional) are
modeled as extra commands and buffers alongside ordinary reads and writes.

The trace wire-format parser and the demo binary in `src/bin/` are thin,
swappable adapters around this core, not part of its tested contract.
*/

pub mod controller;
pub mod device;
pub mod error;
pub mod request;
pub mod trace;

pub use controller::Controller;
pub use device::Device;
pub use request::{Request, RequestType};
