mod services;

pub use services::{TypeaheadController, TypeaheadPhase, TypeaheadView};
