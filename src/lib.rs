//! Repo Monitor - rate-limited, retrying GitHub access with branch drift
//! detection and rollback guidance.
//!
//! [`github`] holds the API client stack (transport, retry, rate budget and
//! response caching), [`analysis`] the pure drift and rollback rules, and
//! [`commands`] the operations built on top of them.

pub mod analysis;
pub mod cache;
pub mod commands;
pub mod config;
pub mod github;
pub mod types;

#[cfg(test)]
mod test_utils;
