// src/scheduler.rs
use std::ops::ControlFlow;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use log::{debug, warn};
/// Background activity that runs `tick` every `period` until stopped.
///
/// The task owns its state and hands it back from [`RecurringTask::stop`].
/// A tick can also end the task by returning `ControlFlow::Break`.
pub struct RecurringTask<S> {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<S>>,
}
impl<S: Send + 'static> RecurringTask<S> {
    pub fn spawn<F>(name: &str, period: Duration, mut state: S, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut(&mut S) -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
            loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        if tick(&mut state).is_break() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            state
        })?;
        debug!("started recurring task {name} every {period:?}");
        Ok(Self {
            name: name.to_owned(),
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }
    /// True once the task's thread has exited, whether stopped or self-terminated.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
    /// Cancels the task and returns its state. Safe after the task already ended.
    pub fn stop(mut self) -> Option<S> {
        self.shutdown()
    }
    fn shutdown(&mut self) -> Option<S> {
        if let Some(tx) = self.stop_tx.take() {
            tx.send(()).ok();
        }
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(state) => {
                debug!("stopped recurring task {}", self.name);
                Some(state)
            }
            Err(_) => {
                warn!("recurring task {} panicked", self.name);
                None
            }
        }
    }
}
impl<S> Drop for RecurringTask<S> {
    fn drop(&mut self) {
        // Dropping the sender wakes the thread; it exits on its own.
        self.stop_tx.take();
    }
}
