mod breakeven;
mod engine;
mod types;

pub use breakeven::find_breakevens;
pub use engine::run_model;
pub use types::{Assumptions, RequiredInputs, Verdict, YearSnapshot};
