//! luamod language server and CLI support.
//!
//! [`registry::Registry`] indexes every `module(...)` file under the
//! configured module directories; [`query`] answers cursor questions against
//! it; [`server::Backend`] exposes both over LSP.

pub mod config;
pub mod discover;
pub mod logging;
pub mod query;
pub mod registry;
pub mod server;

pub use registry::{IndexError, LoadProgress, LoadSummary, Registry};
