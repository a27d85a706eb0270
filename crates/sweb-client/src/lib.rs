// # sweb-client
//
// HTTP side of the SpaceWeb DNS client.
//
// ## Architecture Overview
//
// - **SwebClient**: cookie-carrying session, scraped login, JSON-RPC transport
// - **SwebApi**: typed wrappers over `domains/dns` and `vh/ssl`; implements `DnsZone`
//
// The panel has no public API. Everything here mirrors what its web UI
// does, so URLs, markers and headers are configurable through
// `PanelEndpoints`.
//
// ## Security Requirements
//
// - The password is only sent in the login form and never logged
// - Debug output of the client redacts the password

pub mod api;
pub mod client;
pub mod login;
pub mod rpc;
pub mod session;
pub mod ssl;

pub use api::SwebApi;
pub use client::SwebClient;
pub use login::LoginState;
pub use rpc::{RpcRequest, RpcResponse};
pub use session::Session;
pub use ssl::INSTALL_RETRY_CODE;
