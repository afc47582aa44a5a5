pub mod catalog;
pub mod config;
pub mod run;

pub use run::{Delivery, Pipeline, RunOutcome};
