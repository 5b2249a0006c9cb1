pub mod dto;
pub mod repo;
mod repo_types;
mod services;

pub use dto::{totals, CommittedFood, LineItemId, MealLineItem, MealSlot};
pub use services::{parse_quantity, sanitize_quantity, MealComposer};
