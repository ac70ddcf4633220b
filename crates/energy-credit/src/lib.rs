//! Credit risk scoring for pay-as-you-go energy customers.
//!
//! The [`credit`] module holds the scoring core (feature schema, model engine, explanations and
//! the decision policy) together with the service facade and HTTP router built on top of it.

pub mod config;
pub mod credit;
pub mod error;
pub mod telemetry;
