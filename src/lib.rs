//! Client-side meal-tracking session for the MealMind nutrition service.
//!
//! A [`NutritionSession`] owns one meal slot: the current meal list and its
//! totals, personalised suggestions, food search with autocomplete, and the
//! daily summary. Every remote call goes through the [`gateway::Gateway`].

pub mod config;
pub mod daily;
pub mod error;
pub mod foods;
pub mod gateway;
pub mod meals;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod suggestions;
pub mod typeahead;

pub use config::ClientConfig;
pub use error::ClientError;
pub use session::{NutritionSession, SessionView};
pub use state::SessionContext;
