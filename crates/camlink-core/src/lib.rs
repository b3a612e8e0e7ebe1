pub mod config;
pub mod logging;

// Pipeline layers, leaf-first: retry executor, request pipeline,
// device session, poller, transfer orchestrator.
pub mod checksum;
pub mod device;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod poller;
pub mod retry;
pub mod store;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testutil;
