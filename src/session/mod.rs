//! Session Orchestrator: one meal slot's panels and the work that spans
//! them.

pub mod dto;
mod services;

pub use dto::{PanelLoading, Selection, SessionView};
pub use services::NutritionSession;
