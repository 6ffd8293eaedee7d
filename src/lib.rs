//! Lead Scoring API Library
//!
//! Takes an uploaded table of sales leads through email validation, company
//! enrichment and model scoring, then exports the scored table as CSV.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Lead workflow steps and shared models/errors.
//! - `integrations`: External provider clients.
//! - `circuit_breaker`: Circuit breakers around provider calls.
//! - `config`: Configuration management.
//! - `enrichment`: Company enrichment aggregation and merge.
//! - `errors`: Error handling types.
//! - `export`: CSV export with checksum.
//! - `handlers`: HTTP request handlers.
//! - `ingest`: CSV upload parsing.
//! - `model`: Pretrained lead model interface.
//! - `models`: Lead table and data models.
//! - `normalizer`: Feature matrix construction.
//! - `pipeline`: Step sequencing for one run.
//! - `progress`: Progress reporting.
//! - `scoring`: Lead and adjusted scores.
//! - `services`: MailboxLayer, Crunchbase and B2B clients.
//! - `validation`: Concurrent email validation.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod circuit_breaker;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod ingest;
pub mod model;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod progress;
pub mod scoring;
pub mod services;
pub mod validation;
