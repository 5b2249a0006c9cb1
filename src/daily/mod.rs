pub mod dto;
pub mod repo;
mod services;

pub use dto::{DailySummary, MacroTotals, MealProgress};
pub use services::DailyTracker;
