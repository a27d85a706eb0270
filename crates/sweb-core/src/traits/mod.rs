//! Core traits for the SpaceWeb DNS client
//!
//! This module defines the abstract interfaces the orchestrator is written against.
//!
//! - [`DnsZone`]: List, find and mutate zone records

pub mod zone;

pub use zone::DnsZone;
