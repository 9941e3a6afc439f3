// Nixora — AI chat agent for the Sui blockchain.
//
// The crate is organized around one request-scoped pipeline:
//   intent → provider stream → tool-call reassembly → dispatch → frames
//
// `orchestrator` drives the pipeline; `tools` holds the catalog and the
// per-tool handlers; `bridge` is the consumer-side counterpart that turns
// transfer frames into wallet actions.

pub mod amount;
pub mod bridge;
pub mod config;
pub mod error;
pub mod fragment;
pub mod intent;
pub mod orchestrator;
pub mod provider;
pub mod server;
pub mod sui;
pub mod tools;
pub mod types;

pub use error::{AgentError, AgentResult};
