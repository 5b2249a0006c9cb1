pub mod dto;
pub mod repo;
mod services;

pub use services::PreferenceLoop;
