//! Provisioning agent for per-participant EDC dataspace stacks.
//!
//! The agent pulls provisioning jobs from Fulcrum Core, reconciles the
//! requested participant stack against a Kubernetes cluster, waits for the
//! deployed workloads to become ready, and then seeds the fresh stack with
//! initial assets, policies, and identity data via the downstream REST APIs.
//!
//! A direct HTTP API on `/api/v1/resources` allows creating and deleting
//! participant stacks without going through the job queue.

pub mod bootstrap;
pub mod clients;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod model;
pub mod provisioner;
pub mod seed;
pub mod server;
pub mod store;
