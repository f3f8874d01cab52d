//! Serialized resumption of a connection task.
//!
//! Network callbacks may fire at any time, including while the task they want
//! to wake is already running. [`IoLock`] owns the task between resumptions and
//! guarantees that only one caller drives it at a time: a notification that
//! arrives mid-run is folded into a re-check performed by the caller that is
//! already driving the task, and the task is resumed again from a loop rather
//! than from a nested call.

use core::cell::RefCell;
use core::fmt;

use critical_section::Mutex;

use super::sub_task::{Channel, Step, SubTask, TaskBody, TaskError};
use crate::network::error::Error;

/// What a suspended connection task is waiting for.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum YieldReason {
    /// The task is finished (or was never started).
    End,
    /// Inbound bytes.
    Recv,
    /// All queued outbound frames acknowledged.
    Flush,
    /// Transport send capacity.
    SendBuf,
    /// Any acknowledgement that frees ring space or marker slots.
    Ack,
}

impl YieldReason {
    /// Order in which callbacks offer wakeups.
    pub const PRIORITY: [YieldReason; 4] = [
        YieldReason::Recv,
        YieldReason::Flush,
        YieldReason::SendBuf,
        YieldReason::Ack,
    ];
}

#[cfg(feature = "defmt")]
impl defmt::Format for YieldReason {
    fn format(&self, f: defmt::Formatter) {
        match self {
            YieldReason::End => defmt::write!(f, "End"),
            YieldReason::Recv => defmt::write!(f, "Recv"),
            YieldReason::Flush => defmt::write!(f, "Flush"),
            YieldReason::SendBuf => defmt::write!(f, "SendBuf"),
            YieldReason::Ack => defmt::write!(f, "Ack"),
        }
    }
}

/// Value a suspended task is resumed with.
pub type Wake = Result<(), Error>;

/// Channel type connecting a connection task to its [`IoLock`].
pub type TaskChannel = Channel<YieldReason, Wake>;

/// A connection task.
pub type Task<'a> = SubTask<'a, YieldReason, Wake>;

/// Decides whether a task parked on a reason may continue.
pub trait ResumeCheck {
    /// Returns `true` if a task waiting for `reason` can make progress.
    /// Must return `false` for [`YieldReason::End`].
    fn should_resume(&self, reason: YieldReason, error: Option<Error>) -> bool;
}

/// Who currently holds the task.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Phase {
    /// Parked in the lock; the next matching notification resumes it.
    Idle,
    /// Being driven by some caller.
    Running,
    /// Being driven, and a notification arrived in the meantime.
    PendingRecheck,
}

struct Inner<'a> {
    task: Option<Task<'a>>,
    waiting: YieldReason,
    error: Option<Error>,
    phase: Phase,
    finished: bool,
}

/// Owner of a connection task and gate for every resumption of it.
pub struct IoLock<'a, C> {
    ctx: &'a C,
    inner: Mutex<RefCell<Inner<'a>>>,
}

impl<C> fmt::Debug for IoLock<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (waiting, phase) = critical_section::with(|cs| {
            let inner = self.inner.borrow_ref(cs);
            (inner.waiting, inner.phase)
        });
        f.debug_struct("IoLock")
            .field("waiting", &waiting)
            .field("phase", &phase)
            .finish_non_exhaustive()
    }
}

enum Next<'a> {
    Resume(Task<'a>, Wake),
    Parked,
}

impl<'a, C: ResumeCheck> IoLock<'a, C> {
    /// Creates an empty lock consulting `ctx` for readiness.
    pub const fn new(ctx: &'a C) -> Self {
        Self {
            ctx,
            inner: Mutex::new(RefCell::new(Inner {
                task: None,
                waiting: YieldReason::End,
                error: None,
                phase: Phase::Idle,
                finished: false,
            })),
        }
    }

    /// Reason the parked task waits for; [`YieldReason::End`] when none.
    pub fn waiting(&self) -> YieldReason {
        critical_section::with(|cs| self.inner.borrow_ref(cs).waiting)
    }

    /// Returns `true` once the task has completed.
    pub fn is_finished(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).finished)
    }

    /// Current ownership phase.
    pub fn phase(&self) -> Phase {
        critical_section::with(|cs| self.inner.borrow_ref(cs).phase)
    }

    /// Starts `body` on `task` and keeps it running while its wait conditions
    /// are already met.
    ///
    /// A lock whose previous task finished is re-armed; a lock with a live
    /// task is refused with [`TaskError::Busy`].
    pub fn task_run(&self, mut task: Task<'a>, body: TaskBody<'a>) -> Result<(), TaskError> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let live = inner.phase != Phase::Idle || (inner.task.is_some() && !inner.finished);
            if live {
                return Err(TaskError::Busy);
            }
            inner.task = None;
            inner.waiting = YieldReason::End;
            inner.error = None;
            inner.phase = Phase::Running;
            inner.finished = false;
            Ok(())
        })?;

        log::trace!("task started");
        let step = task.run(body);
        self.drive(task, step)
    }

    /// Offers the task a wakeup for `reason`, optionally carrying a
    /// connection-fatal `error`.
    ///
    /// Returns `Ok(true)` if this call resumed the task.
    pub fn notify(&self, reason: YieldReason, error: Option<Error>) -> Result<bool, TaskError> {
        let next = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.finished {
                return Next::Parked;
            }
            if let Some(error) = error {
                inner.error.get_or_insert(error);
            }
            match inner.phase {
                Phase::Running | Phase::PendingRecheck => {
                    inner.phase = Phase::PendingRecheck;
                    return Next::Parked;
                }
                Phase::Idle => {}
            }
            if inner.waiting != reason && inner.error.is_none() {
                return Next::Parked;
            }
            let Some(task) = inner.task.take() else {
                return Next::Parked;
            };
            inner.phase = Phase::Running;
            let wake = inner.error.take().map_or(Ok(()), Err);
            Next::Resume(task, wake)
        });

        match next {
            Next::Parked => Ok(false),
            Next::Resume(mut task, wake) => {
                log::trace!("resuming task parked on {:?}", reason);
                let step = task.resume(wake);
                self.drive(task, step).map(|()| true)
            }
        }
    }

    fn drive(
        &self,
        mut task: Task<'a>,
        mut step: Result<Step<YieldReason>, TaskError>,
    ) -> Result<(), TaskError> {
        loop {
            let reason = match step {
                Ok(Step::Yielded(reason)) => reason,
                Ok(Step::Finished) => YieldReason::End,
                Err(e) => {
                    self.retire(task);
                    return Err(e);
                }
            };
            if reason == YieldReason::End {
                log::trace!("task finished");
                self.retire(task);
                return Ok(());
            }

            let next = critical_section::with(move |cs| {
                let mut inner = self.inner.borrow_ref_mut(cs);
                if inner.phase == Phase::PendingRecheck {
                    log::trace!("re-checking {:?} after a notification mid-run", reason);
                }
                let ready = inner.error.is_some() || self.ctx.should_resume(reason, None);
                if ready {
                    inner.phase = Phase::Running;
                    let wake = inner.error.take().map_or(Ok(()), Err);
                    Next::Resume(task, wake)
                } else {
                    inner.task = Some(task);
                    inner.waiting = reason;
                    inner.phase = Phase::Idle;
                    Next::Parked
                }
            });

            match next {
                Next::Parked => return Ok(()),
                Next::Resume(mut resumed, wake) => {
                    step = resumed.resume(wake);
                    task = resumed;
                }
            }
        }
    }

    fn retire(&self, task: Task<'a>) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.task = Some(task);
            inner.waiting = YieldReason::End;
            inner.phase = Phase::Idle;
            inner.finished = true;
            inner.error = None;
        });
    }
}
