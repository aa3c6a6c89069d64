pub mod actor;
pub mod audit;
pub mod config;
pub mod db;
pub mod disposal;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod records;
pub mod retention;

pub use actor::{Actor, SYSTEM_ACTOR_ID};
pub use audit::{ActionType, DisposalActionLog, FieldChangeLog, RecordHistory};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use disposal::{AgencyInfo, Decision, DisposalDecision, NewDisposalRequest, RequestStatus};
pub use engine::{EngineSettings, LifecycleEngine};
pub use error::{ConfigError, ErrorKind, LifecycleError};
pub use lifecycle::{RecordStatus, SweepReport, SweepScheduler, TimeValue};
pub use records::{NewRecord, RecordEdit};
pub use retention::{parse_retention, BareYearsPolicy, RetentionYears};
