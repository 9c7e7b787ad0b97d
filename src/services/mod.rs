pub mod maintenance;
pub mod pipeline;
pub mod reporting;
pub mod scheduler;
