//! Configuration distribution service.
//!
//! Clients read the effective configuration of their
//! (app, cluster, env, namespace) and long-poll for changes to it:
//!
//! - [`cache::ReleaseCache`] serves releases from memory, reloading single-flight
//!   from the durable store when a release message invalidates an entry or a
//!   client shows it already knows of a newer one
//! - [`watch::NotificationService`] holds long-poll requests until a release
//!   message arrives for one of the request's watch keys
//! - [`message::ReleaseMessageBus`] fans release messages out to both, fed by the
//!   publisher directly or by [`message::ReleaseMessageScanner`] tailing the store
//!
//! [`server::ConfigServerBuilder`] wires these together behind the HTTP routes.

pub mod cache;
pub mod config;
pub mod constants;
pub mod keys;
pub mod message;
pub mod metrics;
pub mod model;
pub mod server;
pub mod service;
pub mod utils;
pub mod watch;

mod errors;
mod storage;

pub use errors::*;
pub use storage::*;

pub use cache::ReleaseCache;
pub use config::ServiceConfig;
pub use message::ReleaseMessageBus;
pub use message::ReleaseMessageListener;
pub use server::ConfigServer;
pub use server::ConfigServerBuilder;
pub use service::ConfigService;
pub use watch::NotificationService;
