//! `batch-sort-server` sorts batches of integer sequences over HTTP.
//!
//! Each request carries a list of sub-arrays. `/process-single` sorts them one after another on
//! the request task; `/process-concurrent` sorts each on its own worker and gathers the results
//! back in input order. Both report the time spent sorting, in nanoseconds.
//!
//! Core modules:
//! - [`sort`]: sorting a single sequence
//! - [`processor`]: sequential and fan-out/fan-in batch processors
//! - [`model`]: request/response wire types + batch limits
//! - [`config`]: server config (YAML)
//! - [`server`]: axum server wiring

pub mod config;
pub mod model;
pub mod processor;
pub mod server;
pub mod sort;
