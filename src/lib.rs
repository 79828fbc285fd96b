pub mod catalog;
pub mod core;
pub mod main_module;

pub use crate::core::shared::state::AppState;
