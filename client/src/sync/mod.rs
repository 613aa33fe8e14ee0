pub mod capability;
pub mod engine;
pub mod state;
