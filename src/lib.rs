//! Terminal chat client for hosted agents.
//!
//! ## Backend bootstrap
//!
//! A backend is picked with `--backend`, `--mock`, or `AGENT_CHAT_BACKEND`:
//!
//! - `agents` (default) talks to the hosted agents API through
//!   [`agents_api::RunOrchestrator`]
//! - `mock` replies offline, for demos and tests
//!
//! The `agents` backend reads its credentials from the `--config` JSON file
//! first, then from `AGENT_CHAT_ENDPOINT`, `AGENT_CHAT_API_KEY` and
//! `AGENT_CHAT_AGENT_ID`. `--agent-id` replaces the agent id of every source.
//!
//! ## Turn contract
//!
//! One turn is in flight at a time. Every accepted turn appends the user
//! message and then exactly one assistant message: the reply, or
//! `Sorry, an error occurred: <reason>` when the run failed, timed out, or
//! was cancelled. The conversation keeps the server thread id of the last
//! successful turn and continues it on the next one.

pub mod cli;
pub mod commands;
pub mod conversation;
pub mod logging;
pub mod provider;
pub mod providers;
pub mod repl;
pub mod runner;
