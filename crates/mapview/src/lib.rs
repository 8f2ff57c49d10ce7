pub mod camera;
pub mod config;
pub mod engine;
pub mod interaction;
pub mod selection;
pub mod session;
pub mod store;

pub use session::*;
