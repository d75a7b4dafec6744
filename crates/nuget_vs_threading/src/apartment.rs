use std::{
    fmt::Debug,
    sync::Arc,
    thread::{self, ThreadId},
};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{BridgeError, BridgeState, PumpingBridge};

/// A job that is executed on the apartment thread.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A message sent to the apartment thread.
pub(crate) enum ApartmentMessage {
    /// Execute a job that was posted to the apartment.
    Dispatch(Job),

    /// A bridge frame on the apartment thread was woken. This only unblocks a
    /// thread that is waiting for messages, the frame itself tracks whether
    /// it was woken.
    Wake,
}

/// The designated thread of the host together with the queue of work that
/// has been posted to it.
///
/// An [`Apartment`] can be cloned and shared with other threads. Those
/// threads can post jobs to it or await work that must run on it. Draining
/// the queue is only possible on the apartment thread itself.
#[derive(Clone)]
pub struct Apartment {
    inner: Arc<ApartmentInner>,
}

struct ApartmentInner {
    thread: ThreadId,
    thread_name: String,

    sender: Sender<ApartmentMessage>,

    /// The apartment keeps its own sender alive, so receiving from this
    /// channel never fails.
    receiver: Receiver<ApartmentMessage>,

    /// The states of the bridge frames that are currently active on the
    /// apartment thread, innermost last.
    frames: Mutex<Vec<BridgeState>>,
}

impl Debug for Apartment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Apartment")
            .field("thread", &self.inner.thread_name)
            .field("pending", &self.inner.receiver.len())
            .finish()
    }
}

impl Apartment {
    /// Turns the calling thread into an apartment.
    pub fn current() -> Self {
        let current = thread::current();
        let (sender, receiver) = crossbeam_channel::unbounded();
        let thread_name = current
            .name()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("{:?}", current.id()));
        tracing::debug!("created apartment on thread '{thread_name}'");
        Self {
            inner: Arc::new(ApartmentInner {
                thread: current.id(),
                thread_name,
                sender,
                receiver,
                frames: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns a bridge that blocks on futures while pumping this apartment.
    pub fn bridge(&self) -> PumpingBridge {
        PumpingBridge::new(self.clone())
    }

    pub fn thread_id(&self) -> ThreadId {
        self.inner.thread
    }

    pub fn thread_name(&self) -> &str {
        &self.inner.thread_name
    }

    /// Returns true if this is called from the apartment thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread
    }

    /// Posts a job to the apartment. The job runs the next time the apartment
    /// thread drains its queue.
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(ApartmentMessage::Dispatch(Box::new(job)));
    }

    /// Runs `f` on the apartment thread and returns its result.
    ///
    /// When called on the apartment thread `f` is executed immediately,
    /// otherwise it is posted to the apartment and the returned future
    /// completes once the apartment executed it.
    pub async fn run<F, T>(&self, f: F) -> Result<T, BridgeError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_current() {
            return Ok(f());
        }

        let (tx, rx) = oneshot::channel();
        self.post(move || {
            // The receiving side might have been dropped.
            let _ = tx.send(f());
        });
        rx.await.map_err(|_| BridgeError::JobDropped)
    }

    /// Executes all the jobs that are currently queued without blocking.
    ///
    /// Returns the number of executed jobs.
    pub fn pump_pending(&self) -> Result<usize, BridgeError> {
        self.ensure_current()?;
        let mut executed = 0;
        loop {
            match self.inner.receiver.try_recv() {
                Ok(ApartmentMessage::Dispatch(job)) => {
                    job();
                    executed += 1;
                }
                Ok(ApartmentMessage::Wake) => {}
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        Ok(executed)
    }

    pub(crate) fn ensure_current(&self) -> Result<(), BridgeError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(BridgeError::NotOnApartmentThread(
                self.inner.thread_name.clone(),
            ))
        }
    }

    /// Unblocks the apartment thread if it is waiting for messages.
    pub(crate) fn wake(&self) {
        self.send(ApartmentMessage::Wake);
    }

    /// Blocks until a message is available.
    pub(crate) fn receive(&self) -> ApartmentMessage {
        match self.inner.receiver.recv() {
            Ok(message) => message,
            Err(_) => unreachable!("the apartment owns a sender of its own channel"),
        }
    }

    pub(crate) fn frames(&self) -> &Mutex<Vec<BridgeState>> {
        &self.inner.frames
    }

    fn send(&self, message: ApartmentMessage) {
        // The apartment owns the receiver, so the channel is never disconnected.
        let _ = self.inner.sender.send(message);
    }
}
