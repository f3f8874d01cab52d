//! Cooperative sub-tasks driven by their owner.
//!
//! A [`SubTask`] runs one task body until the body suspends itself, hands the
//! suspension code back to the caller and waits to be resumed with an argument.
//! The body is an `async` block or function: every suspension point becomes a
//! state of the compiler-generated state machine, so a task never needs a
//! private stack and the driver never needs an executor.
//!
//! # Example
//!
//! ```rust
//! use core::pin::pin;
//! use picows::system::sub_task::{Channel, Step, SubTask};
//!
//! let channel: Channel<u8, u32> = Channel::new();
//! let yielder = channel.yielder();
//! let body = pin!(async move {
//!     let got = yielder.suspend(1).await;
//!     assert_eq!(got, 42);
//! });
//!
//! let mut task = SubTask::new(&channel);
//! assert_eq!(task.run(body), Ok(Step::Yielded(1)));
//! assert_eq!(task.resume(42), Ok(Step::Finished));
//! ```

use core::cell::Cell;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use critical_section::Mutex;

/// Lifecycle misuse of a [`SubTask`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TaskError {
    /// `run` was called on a task that is not idle.
    AlreadyStarted,
    /// `resume` was called on a task that is not suspended.
    NotSuspended,
    /// The task body has already completed.
    Finished,
    /// The task body returned `Pending` without suspending through its yielder.
    ForeignPending,
    /// The owner of the task is busy running it.
    Busy,
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            TaskError::AlreadyStarted => defmt::write!(f, "AlreadyStarted"),
            TaskError::NotSuspended => defmt::write!(f, "NotSuspended"),
            TaskError::Finished => defmt::write!(f, "Finished"),
            TaskError::ForeignPending => defmt::write!(f, "ForeignPending"),
            TaskError::Busy => defmt::write!(f, "Busy"),
        }
    }
}

/// Outcome of driving a task until it stops.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Step<Y> {
    /// The body suspended itself with this code.
    Yielded(Y),
    /// The body ran to completion.
    Finished,
}

/// Lifecycle state of a [`SubTask`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TaskState {
    /// No body attached yet.
    Idle,
    /// The body is being polled.
    Running,
    /// The body is parked at a suspension point.
    Suspended,
    /// The body completed or was abandoned.
    Finished,
}

/// Rendezvous between a task body and its driver.
///
/// The body posts its suspension code here and picks up the resume argument
/// from here. Both slots live behind a critical section so a channel can sit
/// in a `static`.
pub struct Channel<Y, R> {
    yielded: Mutex<Cell<Option<Y>>>,
    resumed: Mutex<Cell<Option<R>>>,
    driving: Mutex<Cell<bool>>,
}

impl<Y, R> Channel<Y, R> {
    /// Creates an empty channel.
    pub const fn new() -> Self {
        Self {
            yielded: Mutex::new(Cell::new(None)),
            resumed: Mutex::new(Cell::new(None)),
            driving: Mutex::new(Cell::new(false)),
        }
    }

    /// Returns the handle a task body suspends through.
    pub fn yielder(&self) -> Yielder<'_, Y, R> {
        Yielder { channel: self }
    }

    fn clear(&self) {
        critical_section::with(|cs| {
            self.yielded.borrow(cs).take();
            self.resumed.borrow(cs).take();
            self.driving.borrow(cs).set(false);
        });
    }

    fn set_driving(&self, driving: bool) {
        critical_section::with(|cs| self.driving.borrow(cs).set(driving));
    }

    fn take_yielded(&self) -> Option<Y> {
        critical_section::with(|cs| self.yielded.borrow(cs).take())
    }

    fn post_resume(&self, arg: R) {
        critical_section::with(|cs| self.resumed.borrow(cs).set(Some(arg)));
    }
}

impl<Y, R> Default for Channel<Y, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Y, R> fmt::Debug for Channel<Y, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel").finish_non_exhaustive()
    }
}

/// Handle used by a task body to suspend itself.
pub struct Yielder<'a, Y, R> {
    channel: &'a Channel<Y, R>,
}

impl<Y, R> Clone for Yielder<'_, Y, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Y, R> Copy for Yielder<'_, Y, R> {}

impl<Y, R> fmt::Debug for Yielder<'_, Y, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Yielder").finish_non_exhaustive()
    }
}

impl<'a, Y, R> Yielder<'a, Y, R> {
    /// Suspends the calling task with `code`; completes with the argument the
    /// driver resumes it with.
    pub fn suspend(&self, code: Y) -> Suspend<'a, Y, R> {
        Suspend {
            channel: self.channel,
            code: Some(code),
        }
    }
}

/// Future returned by [`Yielder::suspend`].
#[must_use = "a suspension does nothing unless awaited"]
pub struct Suspend<'a, Y, R> {
    channel: &'a Channel<Y, R>,
    code: Option<Y>,
}

impl<Y, R> fmt::Debug for Suspend<'_, Y, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspend")
            .field("posted", &self.code.is_none())
            .finish_non_exhaustive()
    }
}

impl<Y: Unpin, R> Future for Suspend<'_, Y, R> {
    type Output = R;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<R> {
        let this = self.get_mut();
        critical_section::with(|cs| {
            if !this.channel.driving.borrow(cs).get() {
                log::error!("sub-task suspended outside of its driver");
                debug_assert!(false, "sub-task suspended outside of its driver");
                return Poll::Pending;
            }
            if let Some(code) = this.code.take() {
                this.channel.yielded.borrow(cs).set(Some(code));
                return Poll::Pending;
            }
            match this.channel.resumed.borrow(cs).take() {
                Some(arg) => Poll::Ready(arg),
                None => Poll::Pending,
            }
        })
    }
}

/// Pinned task body, borrowed for the lifetime of the task.
pub type TaskBody<'a> = Pin<&'a mut (dyn Future<Output = ()> + Send + 'a)>;

/// A task body plus the lifecycle around it.
pub struct SubTask<'a, Y, R> {
    channel: &'a Channel<Y, R>,
    body: Option<TaskBody<'a>>,
    state: TaskState,
}

impl<Y, R> fmt::Debug for SubTask<'_, Y, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubTask")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a, Y, R> SubTask<'a, Y, R> {
    /// Creates an idle task bound to `channel`.
    pub fn new(channel: &'a Channel<Y, R>) -> Self {
        Self {
            channel,
            body: None,
            state: TaskState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Returns `true` once the body has completed.
    pub fn is_finished(&self) -> bool {
        self.state == TaskState::Finished
    }

    /// Starts `body` and drives it to its first suspension or to completion.
    pub fn run(&mut self, body: TaskBody<'a>) -> Result<Step<Y>, TaskError> {
        if self.state != TaskState::Idle {
            return Err(TaskError::AlreadyStarted);
        }
        self.channel.clear();
        self.body = Some(body);
        self.drive()
    }

    /// Continues a suspended body; `arg` becomes the result of its pending
    /// suspension.
    pub fn resume(&mut self, arg: R) -> Result<Step<Y>, TaskError> {
        match self.state {
            TaskState::Suspended => {}
            TaskState::Finished => return Err(TaskError::Finished),
            _ => return Err(TaskError::NotSuspended),
        }
        self.channel.post_resume(arg);
        self.drive()
    }

    /// Drops the body and returns the task to [`TaskState::Idle`].
    pub fn reset(&mut self) {
        self.body = None;
        self.state = TaskState::Idle;
        self.channel.clear();
    }

    fn drive(&mut self) -> Result<Step<Y>, TaskError> {
        let Some(body) = self.body.as_mut() else {
            return Err(TaskError::NotSuspended);
        };
        self.state = TaskState::Running;
        self.channel.set_driving(true);
        let mut cx = Context::from_waker(Waker::noop());
        let poll = body.as_mut().poll(&mut cx);
        self.channel.set_driving(false);

        match poll {
            Poll::Ready(()) => {
                self.finish();
                Ok(Step::Finished)
            }
            Poll::Pending => match self.channel.take_yielded() {
                Some(code) => {
                    self.state = TaskState::Suspended;
                    Ok(Step::Yielded(code))
                }
                None => {
                    log::error!("sub-task pending without a suspension code");
                    self.finish();
                    Err(TaskError::ForeignPending)
                }
            },
        }
    }

    fn finish(&mut self) {
        self.body = None;
        self.state = TaskState::Finished;
    }
}
