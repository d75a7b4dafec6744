//! This crate lets a synchronous API run asynchronous work to completion on a
//! thread that must never stop servicing its queue.
//!
//! # Overview
//!
//! Hosts like IDEs have a single designated thread, the [`Apartment`], that
//! owns the host's object model. Other threads that need something from that
//! object model post a job to the apartment and wait for it to be executed.
//! A synchronous API that is implemented with asynchronous code cannot simply
//! block the apartment thread while its future is pending: if that future (or
//! any work it waits on) needs the apartment thread to make progress, the
//! host deadlocks.
//!
//! The [`PumpingBridge`] solves this by driving the future on the calling
//! thread and, whenever the future is pending, executing the jobs that are
//! posted to the apartment until the future is woken up again. Jobs may in
//! turn call back into the bridge, which pushes a nested frame.
//!
//! Components that need to block on asynchronous work receive a
//! [`SyncBridge`] instead of constructing one. Tests and hosts without a queue
//! can use the [`BlockOnBridge`] which does not pump.

mod apartment;
mod bridge;

pub use apartment::Apartment;
pub use bridge::{BlockOnBridge, BridgeError, BridgeState, PumpingBridge, SyncBridge};
