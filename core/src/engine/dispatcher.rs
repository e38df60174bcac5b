//! Main-thread dispatcher
//!
//! One consumer loop owns a FIFO job queue. Whatever thread calls
//! [`MainThreadDispatcher::run`] becomes "the main thread": every job
//! submitted through a [`DispatcherHandle`] runs there, one at a time, in
//! arrival order, across all sessions.
//!
//! ```ignore
//! let (dispatcher, handle) = MainThreadDispatcher::new();
//! std::thread::spawn(move || serve_requests(handle));
//! dispatcher.run(); // returns once every handle is dropped
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::bridge::panic_message;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatcherError {
    #[error("main-thread dispatcher is not running")]
    Unavailable,
    #[error("main-thread job panicked: {0}")]
    JobPanicked(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatcherState {
    /// Queue empty, waiting for work
    Idle,
    /// Executing one dequeued job
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatcherStatus {
    pub state: DispatcherState,
    /// Jobs waiting behind the running one
    pub queued: usize,
}

#[derive(Debug, Default)]
struct Shared {
    running: AtomicBool,
    queued: AtomicUsize,
    thread: OnceLock<ThreadId>,
}

/// The consumer side; owned by the thread that will run jobs
pub struct MainThreadDispatcher {
    receiver: mpsc::UnboundedReceiver<Job>,
    shared: Arc<Shared>,
}

/// Cloneable submit side
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::UnboundedSender<Job>,
    shared: Arc<Shared>,
}

impl MainThreadDispatcher {
    pub fn new() -> (Self, DispatcherHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        (
            Self {
                receiver,
                shared: Arc::clone(&shared),
            },
            DispatcherHandle { sender, shared },
        )
    }

    /// Start the loop on a dedicated, named thread
    pub fn spawn() -> std::io::Result<DispatcherHandle> {
        let (dispatcher, handle) = Self::new();
        thread::Builder::new()
            .name("reprise-main".to_string())
            .spawn(move || dispatcher.run())?;
        Ok(handle)
    }

    /// Run jobs on the current thread until every handle is dropped
    pub fn run(mut self) {
        let _ = self.shared.thread.set(thread::current().id());
        info!("Main-thread dispatcher started");

        while let Some(job) = self.receiver.blocking_recv() {
            self.shared.queued.fetch_sub(1, Ordering::SeqCst);
            self.shared.running.store(true, Ordering::SeqCst);
            debug!("Dispatcher running job");

            // Jobs report their own panics; this only keeps the loop alive
            if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
                error!(panic = %panic_message(payload.as_ref()), "Main-thread job panicked");
            }

            self.shared.running.store(false, Ordering::SeqCst);
            debug!("Dispatcher idle");
        }

        info!("Main-thread dispatcher stopped");
    }
}

impl DispatcherHandle {
    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            state: if self.shared.running.load(Ordering::SeqCst) {
                DispatcherState::Running
            } else {
                DispatcherState::Idle
            },
            queued: self.shared.queued.load(Ordering::SeqCst),
        }
    }

    /// Whether the caller is already on the dispatcher thread
    pub fn is_dispatcher_thread(&self) -> bool {
        self.shared.thread.get() == Some(&thread::current().id())
    }

    fn enqueue<F, R>(&self, f: F) -> Result<oneshot::Receiver<thread::Result<R>>, DispatcherError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();
        let job: Job = Box::new(move || {
            let _ = reply.send(catch_unwind(AssertUnwindSafe(f)));
        });

        self.shared.queued.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(job).is_err() {
            self.shared.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(DispatcherError::Unavailable);
        }
        Ok(receiver)
    }

    /// Run `f` on the dispatcher thread and block until it finishes.
    ///
    /// Must be called from a blocking context (a plain thread or
    /// `spawn_blocking`), never from inside an async task. A submit made
    /// from the dispatcher thread itself runs inline instead of queueing
    /// behind itself.
    pub fn submit<F, R>(&self, f: F) -> Result<R, DispatcherError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_dispatcher_thread() {
            return catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| DispatcherError::JobPanicked(panic_message(payload.as_ref())));
        }

        let receiver = self.enqueue(f)?;
        match receiver.blocking_recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(DispatcherError::JobPanicked(panic_message(payload.as_ref()))),
            Err(_) => Err(DispatcherError::Unavailable),
        }
    }

    /// Async variant of [`submit`](Self::submit)
    pub async fn submit_async<F, R>(&self, f: F) -> Result<R, DispatcherError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let receiver = self.enqueue(f)?;
        match receiver.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(DispatcherError::JobPanicked(panic_message(payload.as_ref()))),
            Err(_) => Err(DispatcherError::Unavailable),
        }
    }
}

impl std::fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherHandle")
            .field("status", &self.status())
            .finish()
    }
}
