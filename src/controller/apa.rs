/*!
The APA interruption veto: whether scheduling `found` is allowed to delay
an already-in-flight RowClone's `PREv` (the one PuM step whose window is
wide enough that something else could plausibly fit).

Grounded verbatim on `DDR4::check_interuption_with_delay`
(`examples/original_source/src/dram/impl/DDR4.cpp`). Command identity is
expressed with `Command` instead of the original's raw `int` indices;
the issuing-delay constants (4 cycles same-bank, 8 cycles same-bankgroup)
and the per-PuM-type cycle offsets are transcribed unchanged.

SPEC_FULL.md Open Question 4: a single failing comparison against any
in-flight PuM command vetoes scheduling -- there is only ever one
candidate compared per call here (`active` is one active-buffer entry at
a time), and the controller is expected to call this once per matching
active-buffer entry and AND the results together.
*/

use crate::device::command::Command;
use crate::device::level::AddrVec;
use crate::device::timing::Clk;

/// True iff scheduling `found` is allowed without jeopardizing `active`'s
/// own progress. `active` must already be one of `Actp`/`Prev`/`Prej`/
/// `Actv` -- the caller (`Controller::schedule_request`) only invokes this
/// for active-buffer entries mid-APA-sequence.
pub fn check_interruption_with_delay(
    active_command: Command,
    active_final_command: Command,
    found_command: Command,
    found_final_command: Command,
    active_ready_clk: Clk,
    found_ready_clk: Clk,
    same_bankgroup: bool,
) -> bool {
    let issuing_delay: Clk = if same_bankgroup { 8 } else { 4 };

    // The only APA step with a window wide enough for something else to
    // plausibly fit is RowClone's ACTp -> PREv gap; every other active
    // step's own timing is tight enough that the generic fallback below
    // already rejects anything that wouldn't fit.
    if active_final_command == Command::Rc && active_command == Command::Prev {
        if found_final_command == Command::Maj {
            return match found_command {
                Command::Actp => active_ready_clk > found_ready_clk + 9 + issuing_delay,
                Command::Prej => active_ready_clk > found_ready_clk + 6 + issuing_delay,
                Command::Actv => active_ready_clk > found_ready_clk + issuing_delay,
                _ => active_ready_clk > found_ready_clk + issuing_delay,
            };
        }
        if found_final_command == Command::Frac {
            return match found_command {
                Command::Actp => active_ready_clk > found_ready_clk + 1 + issuing_delay,
                _ => active_ready_clk > found_ready_clk + issuing_delay,
            };
        }
        if found_final_command == Command::Rc && found_command == Command::Actp {
            return active_ready_clk > found_ready_clk + issuing_delay && active_ready_clk > 6;
        }
    }

    active_ready_clk > found_ready_clk + issuing_delay
}

/// `AddrVec`s are "on the same DIMM" for this check iff channel and rank
/// agree (rank has full ACT/PRE parallelism so it's excluded from the
/// bankgroup-overlap test itself, matching the original's comment).
pub fn same_dimm(a: &AddrVec, b: &AddrVec) -> bool {
    use crate::device::level::Level;
    a.get(Level::Channel) == b.get(Level::Channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_majority_actp_without_enough_lead_time() {
        let allowed = check_interruption_with_delay(Command::Prev, Command::Rc, Command::Actp, Command::Maj, 100, 95, false);
        assert!(!allowed);
    }

    #[test]
    fn allows_majority_actp_with_enough_lead_time() {
        let allowed = check_interruption_with_delay(Command::Prev, Command::Rc, Command::Actp, Command::Maj, 200, 95, false);
        assert!(allowed);
    }

    #[test]
    fn non_apa_active_uses_generic_fallback() {
        let allowed = check_interruption_with_delay(Command::Act, Command::Act, Command::Act, Command::Act, 50, 40, true);
        assert!(!allowed);
        let allowed = check_interruption_with_delay(Command::Act, Command::Act, Command::Act, Command::Act, 60, 40, true);
        assert!(allowed);
    }
}
