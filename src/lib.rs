//! Innkeeper: travel inquiry pipeline.
//!
//! Free-text accommodation inquiries go in; structured booking intent,
//! matched and ranked inventory, and a reply draft come out. The core is
//! extraction → completeness gate → availability matching → ranking → draft,
//! driven in batches by the [`pipeline::Orchestrator`].
//!
//! See `DESIGN.md` for the architecture and decisions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod providers;
pub mod types;

pub mod composer;
pub mod extractors;
pub mod gate;
pub mod inventory;
pub mod matcher;
pub mod ranking;

pub mod api;
pub mod outbound;
pub mod pipeline;
pub mod store;
