//! Integration Tests Module
//!
//! End-to-end tests for the fission/execution/aggregation pipeline. No real
//! provider calls are made; tests use the actual Database service with
//! in-memory SQLite and a scripted mock generator.

// Shared mock generator and pipeline builders
mod common;

// Full submit -> fission -> execute -> aggregate happy path
mod pipeline_test;


// Cooperative cancellation at dispatch time
mod cancel_test;

// Progress aggregation scenarios over the document store
mod aggregation_test;
