//! aiie-analytics — Assessment scoring and results analytics.
//!
//! Turns graded answers into a percentage and verdict, then rolls them up
//! into category and difficulty breakdowns, missed-question detail, weak
//! areas, and targeted practice recommendations.

pub mod aggregate;
pub mod report;
pub mod scorer;
