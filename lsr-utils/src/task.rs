//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio::{task, time};
use tracing::{Instrument, error};

/// Owned handle to a spawned asynchronous task.
///
/// Dropping the handle aborts the task unless [`Task::detach`] was called.
/// Awaiting it yields the task's output.
#[derive(Debug)]
pub struct Task<T> {
    join_handle: task::JoinHandle<T>,
    detached: bool,
}

/// Handle to a one-shot timer created by [`TimeoutTask::new`].
///
/// The callback runs once when the timer expires. Dropping the handle
/// cancels the timer.
#[derive(Debug)]
pub struct TimeoutTask {
    _task: Task<()>,
    control: UnboundedSender<Control>,
    deadline: Deadline,
}

/// Handle to a periodic timer created by [`IntervalTask::new`].
///
/// Dropping the handle cancels the timer.
#[derive(Debug)]
pub struct IntervalTask {
    _task: Task<()>,
    control: UnboundedSender<Control>,
    deadline: Deadline,
}

// Control messages sent from a timer handle to its task.
#[derive(Debug)]
enum Control {
    Reset(Option<Duration>),
}

// Instant of the next timer expiration, shared between handle and task.
#[derive(Clone, Debug)]
struct Deadline(Arc<Mutex<Instant>>);

// ===== impl Task =====

impl<T> Task<T> {
    /// Spawns a new asynchronous task, returning a handle for it.
    pub fn spawn<Fut>(future: Fut) -> Task<T>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        Task {
            join_handle: task::spawn(future),
            detached: false,
        }
    }

    /// Spawns a task that is restarted whenever it panics.
    ///
    /// The task ends for good once the future returned by `spawn_fn`
    /// completes normally. Receive loops that parse untrusted input run this
    /// way, so a single bad packet can't take the whole instance down.
    pub fn spawn_supervised<F, Fut>(spawn_fn: F) -> Task<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let join_handle = tokio::spawn(
            async move {
                loop {
                    let worker = Task::spawn(spawn_fn());
                    match worker.await {
                        Ok(_) => break,
                        Err(error) if error.is_panic() => {
                            error!("task panicked, restarting...");
                        }
                        Err(error) => {
                            error!(%error, "task failed");
                            break;
                        }
                    }
                }
            }
            .in_current_span(),
        );
        Task {
            join_handle,
            detached: false,
        }
    }

    /// Detaches the task, so dropping the handle no longer cancels it.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    /// Returns true if the task has run to completion (or was aborted).
    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T, task::JoinError>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        Pin::new(&mut self.join_handle).poll(cx)
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        if !self.detached {
            self.join_handle.abort();
        }
    }
}

// ===== impl TimeoutTask =====

impl TimeoutTask {
    /// Spawns a timer that runs `cb` once `timeout` elapses.
    pub fn new<F, Fut>(timeout: Duration, cb: F) -> TimeoutTask
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let deadline = Deadline::new(Instant::now() + timeout);
        let deadline_child = deadline.clone();

        let task = Task::spawn(
            async move {
                let sleep = time::sleep(timeout);
                tokio::pin!(sleep);

                loop {
                    tokio::select! {
                        _ = &mut sleep => {
                            (cb)().await;
                            break;
                        }
                        control = control_rx.recv() => match control {
                            Some(Control::Reset(new_timeout)) => {
                                let next = Instant::now()
                                    + new_timeout.unwrap_or(timeout);
                                sleep.as_mut().reset(next);
                                deadline_child.set(next);
                            }
                            // Handle dropped.
                            None => break,
                        }
                    }
                }
            }
            .in_current_span(),
        );

        TimeoutTask {
            _task: task,
            control: control_tx,
            deadline,
        }
    }

    /// Restarts the timer, whether it already expired or not.
    ///
    /// Passing `None` reuses the timeout the timer was created with.
    pub fn reset(&mut self, timeout: Option<Duration>) {
        if self.control.send(Control::Reset(timeout)).is_err() {
            error!("failed to reset timeout");
        }
    }

    /// Returns the time left before the timer expires.
    pub fn remaining(&self) -> Duration {
        self.deadline.remaining()
    }
}

// ===== impl IntervalTask =====

impl IntervalTask {
    /// Spawns a timer that runs `cb` every `interval`.
    ///
    /// When `tick_on_start` is set the first tick happens immediately.
    pub fn new<F, Fut>(
        interval: Duration,
        tick_on_start: bool,
        mut cb: F,
    ) -> IntervalTask
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let deadline = Deadline::new(Instant::now() + interval);
        let deadline_child = deadline.clone();

        let task = Task::spawn(
            async move {
                let mut period = interval;
                let mut ticker = if tick_on_start {
                    time::interval(period)
                } else {
                    time::interval_at(Instant::now() + period, period)
                };

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let next = Instant::now() + period;
                            (cb)().await;
                            deadline_child.set(next);
                        }
                        control = control_rx.recv() => match control {
                            Some(Control::Reset(new_interval)) => {
                                if let Some(new_interval) = new_interval {
                                    period = new_interval;
                                }
                                ticker = time::interval(period);
                                deadline_child.set(Instant::now() + period);
                            }
                            // Handle dropped.
                            None => break,
                        }
                    }
                }
            }
            .in_current_span(),
        );

        IntervalTask {
            _task: task,
            control: control_tx,
            deadline,
        }
    }

    /// Restarts the interval, optionally with a new period.
    pub fn reset(&mut self, interval: Option<Duration>) {
        if self.control.send(Control::Reset(interval)).is_err() {
            error!("failed to reset interval");
        }
    }

    /// Returns the time left before the next tick.
    pub fn remaining(&self) -> Duration {
        self.deadline.remaining()
    }
}

// ===== impl Deadline =====

impl Deadline {
    fn new(instant: Instant) -> Deadline {
        Deadline(Arc::new(Mutex::new(instant)))
    }

    fn set(&self, instant: Instant) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }

    fn remaining(&self) -> Duration {
        let next = *self.0.lock().unwrap_or_else(PoisonError::into_inner);
        next.saturating_duration_since(Instant::now())
    }
}

// ===== unit tests =====
