pub mod aggregator;
pub mod daily_dispatch_job;
pub mod projector;
