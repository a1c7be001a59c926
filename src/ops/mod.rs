pub mod backlog_ops;
pub mod clock;
pub mod generate;
pub mod import;
pub mod instance_ops;
pub mod move_ops;
pub mod progression;
pub mod rollover;
pub mod task_ops;
