pub mod coordinator;
pub mod error;
pub mod locks;
pub mod types;

pub use coordinator::RunCoordinator;
