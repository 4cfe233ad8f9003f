/*!
Error taxonomy for the simulator core.

Only configuration problems are represented as a recoverable `Result`
error type (`ConfigError`). Back-pressure is a plain `bool` return on
`Controller::send`/`priority_send`, per the "recoverable, per-request"
bucket in the design. Invariant violations are unrecoverable: the device
aborts with a `panic!` carrying a structured diagnostic (level, node id,
state, command) rather than returning an error, since nothing in the core
is meant to retry past one.
*/

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unrecognized organization preset \"{0}\"")]
    UnknownOrgPreset(String),

    #[error("unrecognized timing preset \"{0}\"")]
    UnknownTimingPreset(String),

    #[error("timing parameter \"{0}\" is not specified")]
    UnderspecifiedTiming(&'static str),

    #[error(
        "calculated chip density {calculated} Mb does not equal the declared density {declared} Mb"
    )]
    DensityMismatch { calculated: u64, declared: u64 },

    #[error("cannot change the transfer rate when using a speed preset")]
    RateConflictsWithPreset,

    #[error("unknown trace token \"{0}\"")]
    InvalidTraceToken(String),

    #[error("missing required parameter \"{0}\"")]
    MissingParameter(&'static str),
}
