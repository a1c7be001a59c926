pub mod lock;
pub mod recovery;
pub mod store;
pub mod sync;
pub mod watcher;
