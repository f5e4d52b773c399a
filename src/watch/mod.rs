//! Long-poll change notification.
//!
//! A client long-polls with the namespaces it holds and the latest
//! notification id it has seen for each. [`NotificationService`] resolves the
//! watch keys of those namespaces ([`WatchKeyAssembler`]), answers at once if
//! the store already has newer release messages, and otherwise parks a
//! [`DeferredNotification`] in the [`NotificationRegistry`] until a release
//! message for one of its keys arrives or the request times out.

mod assembler;
mod holder;
mod notification_service;
mod registry;
pub use assembler::*;
pub use holder::*;
pub use notification_service::*;
pub use registry::*;
