use std::{
    future::Future,
    pin::pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use futures::task::ArcWake;
use miette::Diagnostic;
use thiserror::Error;

use crate::{Apartment, apartment::ApartmentMessage};

#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum BridgeError {
    /// The caller is not running on the thread that owns the apartment.
    #[error("the operation must be invoked on the apartment thread '{0}'")]
    #[diagnostic(
        code(bridge::not_on_apartment_thread),
        help("synchronous installer calls may only be made from the host's main thread")
    )]
    NotOnApartmentThread(String),

    /// A job posted to the apartment was dropped before it produced a result.
    #[error("the apartment dropped the job before it completed")]
    JobDropped,
}

/// Runs asynchronous work to completion from synchronous code.
pub trait SyncBridge {
    /// Constructs the future with `work` and blocks the calling thread until
    /// it resolves.
    ///
    /// The result of the future is returned as is, errors are never wrapped.
    /// Errors of the bridge itself are converted into `E`.
    fn run_blocking<F, Fut, T, E>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<BridgeError>;
}

/// The state of a single [`PumpingBridge::run_blocking`] invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeState {
    /// No work is being executed.
    Idle,
    /// The future is being driven.
    Running,
    /// The future is pending and a job that was posted to the apartment is
    /// being executed.
    ReentrantDispatch,
    /// The future resolved successfully.
    Completed,
    /// The future resolved with an error.
    Failed,
}

impl BridgeState {
    /// Returns true if a frame in this state may move to `next`.
    pub fn can_transition_to(self, next: BridgeState) -> bool {
        use BridgeState::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Running, ReentrantDispatch)
                | (ReentrantDispatch, Running)
                | (Running, Completed)
                | (Running, Failed)
        )
    }

    pub fn is_finished(self) -> bool {
        matches!(self, BridgeState::Completed | BridgeState::Failed)
    }
}

/// A [`SyncBridge`] that keeps executing the jobs posted to its
/// [`Apartment`] while the future it blocks on is pending.
///
/// Every invocation of [`SyncBridge::run_blocking`] pushes a frame. Jobs that
/// are executed while a frame waits may call the bridge again, these calls
/// push a nested frame that has to finish before the outer frame continues.
#[derive(Debug, Clone)]
pub struct PumpingBridge {
    apartment: Apartment,
}

impl PumpingBridge {
    pub fn new(apartment: Apartment) -> Self {
        Self { apartment }
    }

    pub fn apartment(&self) -> &Apartment {
        &self.apartment
    }

    /// Returns the state of the innermost active frame, or
    /// [`BridgeState::Idle`] if the bridge is not blocking.
    pub fn state(&self) -> BridgeState {
        self.apartment
            .frames()
            .lock()
            .last()
            .copied()
            .unwrap_or(BridgeState::Idle)
    }

    /// The number of active frames.
    pub fn depth(&self) -> usize {
        self.apartment.frames().lock().len()
    }
}

impl SyncBridge for PumpingBridge {
    fn run_blocking<F, Fut, T, E>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<BridgeError>,
    {
        self.apartment.ensure_current()?;

        let frame = Frame::enter(&self.apartment);
        let frame_waker = Arc::new(FrameWaker {
            woken: AtomicBool::new(true),
            apartment: self.apartment.clone(),
        });
        let waker = futures::task::waker(frame_waker.clone());
        let mut cx = Context::from_waker(&waker);

        let mut future = pin!(work());
        loop {
            if frame_waker.woken.swap(false, Ordering::AcqRel) {
                if let Poll::Ready(result) = future.as_mut().poll(&mut cx) {
                    frame.transition(if result.is_ok() {
                        BridgeState::Completed
                    } else {
                        BridgeState::Failed
                    });
                    return result;
                }
            }

            match self.apartment.receive() {
                ApartmentMessage::Dispatch(job) => {
                    frame.transition(BridgeState::ReentrantDispatch);
                    job();
                    frame.transition(BridgeState::Running);
                }
                ApartmentMessage::Wake => {}
            }
        }
    }
}

/// Wakes a single frame. The flag belongs to the frame so a nested frame that
/// consumes the wake message can never swallow the wake-up of an outer one.
struct FrameWaker {
    woken: AtomicBool,
    apartment: Apartment,
}

impl ArcWake for FrameWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.woken.store(true, Ordering::Release);
        arc_self.apartment.wake();
    }
}

/// Tracks the state of one `run_blocking` invocation. The frame is popped
/// when this is dropped, also when the work panics.
struct Frame<'a> {
    apartment: &'a Apartment,
    depth: usize,
}

impl<'a> Frame<'a> {
    fn enter(apartment: &'a Apartment) -> Self {
        let depth = {
            let mut frames = apartment.frames().lock();
            frames.push(BridgeState::Idle);
            frames.len() - 1
        };
        let frame = Self { apartment, depth };
        frame.transition(BridgeState::Running);
        frame
    }

    fn transition(&self, next: BridgeState) {
        let mut frames = self.apartment.frames().lock();
        if let Some(state) = frames.get_mut(self.depth) {
            debug_assert!(
                state.can_transition_to(next),
                "invalid bridge transition from {state:?} to {next:?}"
            );
            tracing::trace!(depth = self.depth, from = ?*state, to = ?next, "bridge frame");
            *state = next;
        }
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.apartment.frames().lock().truncate(self.depth);
    }
}

/// A [`SyncBridge`] that blocks the calling thread without pumping anything.
///
/// This bridge is deterministic and does not require an [`Apartment`]. It
/// must not be used when the work needs the calling thread to make progress,
/// and it cannot be nested.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockOnBridge;

impl SyncBridge for BlockOnBridge {
    fn run_blocking<F, Fut, T, E>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<BridgeError>,
    {
        futures::executor::block_on(work())
    }
}
