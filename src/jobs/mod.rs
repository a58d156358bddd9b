//! Background search jobs and the state polling clients read.

pub mod orchestrator;
pub mod probe;
pub mod retry;
pub mod store;

pub use orchestrator::{JobReport, Orchestrator, SubmitError};
pub use probe::{HostProbe, HttpProbe, StaticProbe, DEFAULT_PROBE_TIMEOUT};
pub use retry::RetryPolicy;
pub use store::{StatusStore, StatusView, TerminalUpdate, DEFAULT_STATUS_TTL};
