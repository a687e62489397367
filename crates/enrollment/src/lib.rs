//! Eligibility-driven enrollment workflow for the youth entrepreneurship program.
//!
//! The wizard side (`workflows::enrollment::wizard`) walks an applicant through eight steps,
//! persisting progress through a [`ProgressBackend`](workflows::enrollment::ProgressBackend);
//! the intake side (`workflows::enrollment::intake`) is the reference backend those calls land on.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
