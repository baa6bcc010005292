//! Production providers behind the environment traits
//!
//! [`http`] adapts [`moihub_api::MoiHubClient`] to the gateway and event
//! source traits; [`memory`] is the session-scoped draft store.

pub mod http;
pub mod memory;

pub use memory::MemoryDraftStore;
