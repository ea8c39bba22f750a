pub mod classify;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod mcp_api;
pub mod mongo;
pub mod redis;
pub mod retry;
pub mod store;

#[cfg(test)]
mod testing;
