// # sweb-core
//
// Core library for publishing DNS-01 challenges through the SpaceWeb control panel.
//
// ## Architecture Overview
//
// This library holds everything that does not talk HTTP:
// - **DnsRecord**: Tagged view of the panel's heterogeneous zone records
// - **DnsZone**: Trait for listing, finding and editing zone records
// - **ChallengeEngine**: Publishes and removes challenge TXT records
// - **Pacer**: Jittered delays between requests
// - **ChallengeTokens**: Tokens published during the current run
//
// The panel session and JSON-RPC protocol live in `sweb-client`, which
// implements `DnsZone` on top of them.
//
// ## Design Principles
//
// 1. **Parse once**: record categories are resolved at the boundary, not at every call site
// 2. **No retries**: every failure propagates to the caller
// 3. **Sequential**: one request at a time, paced
// 4. **No persistence**: state lives only as long as the engine

pub mod config;
pub mod engine;
pub mod error;
pub mod pacing;
pub mod record;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{ChallengeConfig, Credentials, PacingConfig, PanelEndpoints, SwebConfig};
pub use engine::{ChallengeEngine, ChallengeState, EngineEvent, PublishOutcome};
pub use error::{Error, Result};
pub use pacing::Pacer;
pub use record::{DnsRecord, RecordIndex, RecordType, TxtEdit};
pub use state::ChallengeTokens;
pub use traits::DnsZone;
