//! Status broadcast to operators
//!
//! This module handles:
//! - Direct delivery of status events to every operator connection
//! - The observer list that receives drone snapshots

mod notifier;
mod observer;

pub use notifier::BroadcastNotifier;
pub use observer::{OperatorObserver, StatusObserver};
