pub mod engine;
pub mod git_ops;
pub mod mirror;
pub mod scheduler;

pub use engine::{CycleReport, Reconciler};
pub use mirror::{GitCli, Mirror, MirrorOptions, MirrorResult};
pub use scheduler::Scheduler;
