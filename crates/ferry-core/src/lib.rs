//! # ferry-core
//!
//! Foundation types and utilities for the Ferry routing engine.
//!
//! This crate provides the shared vocabulary that all other Ferry crates
//! depend on:
//!
//! - **Branded IDs**: [`ids::RequestId`], [`ids::ThreadId`] as newtypes
//! - **Units**: [`unit::Unit`] — the closed set of query destinations
//! - **Queries**: [`query::Query`] and [`query::Attachment`]
//! - **Signals**: [`signal::Signal`] routing evidence with fixed strengths
//! - **Decisions**: [`decision::RouterDecision`], [`decision::SupervisorVerdict`]
//! - **Dispatch contract**: [`dispatch::AgentResult`], [`dispatch::DispatchContext`]
//! - **Events**: [`events::PipelineEvent`] stage-transition status events
//! - **Fingerprints**: [`text::fingerprint`] for exact cache keys
//! - **Retry**: [`retry::RetryConfig`] and backoff calculation
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other ferry crates.

#![deny(unsafe_code)]

pub mod decision;
pub mod dispatch;
pub mod events;
pub mod ids;
pub mod query;
pub mod retry;
pub mod signal;
pub mod text;
pub mod unit;
