// Library surface shared by the binary and the integration tests.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod lang;
pub mod leaderboard;
pub mod metrics;
pub mod record;
pub mod runtime;
pub mod session;
pub mod store;
pub mod submit;
pub mod text_supply;
pub mod typing_policy;
