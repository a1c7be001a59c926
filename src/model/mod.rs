pub mod backlog;
pub mod instance;
pub mod settings;
pub mod state;
pub mod task;

pub use backlog::*;
pub use instance::*;
pub use settings::*;
pub use state::*;
pub use task::*;
