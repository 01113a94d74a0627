//! # Keel Middleware
//!
//! Request lifecycle filters for the Keel chassis.
//!
//! This crate provides:
//!
//! - [`Pipeline`] - The fixed-order filter chain every request flows through
//! - [`Filter`] / [`Next`] - The stage trait and chain callback
//! - [`GatewayFilter`] - Correlation, body capture, start/end checkpoints
//! - [`FailureResponder`] - Failure classification and envelope shaping
//! - [`CaptureBody`] / [`CaptureBuffer`] - Streaming body capture

#![doc(html_root_url = "https://docs.rs/keel-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod capture;
mod classifier;
mod filter;
mod gateway;
mod pipeline;
mod types;

pub use capture::{CaptureBody, CaptureBuffer};
pub use classifier::FailureResponder;
pub use filter::{BoxFuture, Filter, FnFilter, Next};
pub use gateway::GatewayFilter;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use types::{
    empty_body, envelope_response, full_body, BoxBody, Request, Response, TRANSACTION_ID_HEADER,
};
