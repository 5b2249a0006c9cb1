pub mod dto;
pub mod repo;
mod services;

pub use dto::{CustomFood, CustomFoodDraft, FoodItem, Nutrients, Provenance, ScaledFoodItem};
pub use services::FoodSearch;
