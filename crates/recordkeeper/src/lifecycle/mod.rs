//! Lifecycle state machine: statuses, the transition table, sweeps and
//! the periodic sweep scheduler.

pub mod scheduler;
pub mod status;
pub mod sweep;
pub mod transition;

pub use scheduler::SweepScheduler;
pub use status::{RecordStatus, TimeValue};
pub use sweep::{evaluate_due_archival, evaluate_due_disposal_scheduling, SweepFailure, SweepReport};
pub use transition::{
    apply_transition, is_allowed, validate_transition, TransitionAudit, TransitionOutcome, Trigger,
};
