//! Buy-vs-rent comparison engine.
//!
//! Projects the net worth impact of buying a home against renting the
//! equivalent and investing the difference, month by month over a fixed
//! horizon, then reports a year-by-year verdict with breakeven points.

pub mod api;
pub mod core;
pub mod export;
