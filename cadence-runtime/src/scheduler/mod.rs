mod builder;
mod cron;
mod engine;
mod handle;
mod runner;

pub use builder::TaskSchedulerBuilder;
pub use engine::TaskScheduler;
pub use handle::JobSnapshot;
pub use runner::TaskRunner;
