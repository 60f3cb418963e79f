//! Background work with a pollable result.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// A closure running on a worker thread.
///
/// The owner polls with [`try_result`](Job::try_result) from its own loop, or
/// blocks with [`wait`](Job::wait). Nothing is delivered to the owner's
/// thread behind its back.
#[derive(Debug)]
pub struct Job<T> {
    receiver: Receiver<T>,
    handle: Option<thread::JoinHandle<()>>,
}

impl<T: Send + 'static> Job<T> {
    pub fn spawn<F>(name: &str, work: F) -> Result<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (sender, receiver) = bounded(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _ = sender.send(work());
            })?;
        Ok(Self {
            receiver,
            handle: Some(handle),
        })
    }

    /// The result, if the worker has finished.
    pub fn try_result(&mut self) -> Result<Option<T>> {
        match self.receiver.try_recv() {
            Ok(value) => {
                self.reap();
                Ok(Some(value))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::WorkerLost),
        }
    }

    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<T>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(value) => {
                self.reap();
                Ok(Some(value))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::WorkerLost),
        }
    }

    /// Block until the worker finishes.
    pub fn wait(mut self) -> Result<T> {
        let value = self.receiver.recv().map_err(|_| Error::WorkerLost)?;
        self.reap();
        Ok(value)
    }

    fn reap(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait() {
        let job = Job::spawn("test", || 6 * 7).unwrap();
        assert_eq!(job.wait().unwrap(), 42);
    }

    #[test]
    fn test_poll() {
        let (release, gate) = bounded::<()>(0);
        let mut job = Job::spawn("test", move || {
            let _ = gate.recv();
            "done"
        })
        .unwrap();
        assert_eq!(job.try_result().unwrap(), None);
        release.send(()).unwrap();
        assert_eq!(job.wait_timeout(Duration::from_secs(10)).unwrap(), Some("done"));
    }

    #[test]
    fn test_panicking_worker() {
        let job: Job<u8> = Job::spawn("test", || panic!("boom")).unwrap();
        assert!(matches!(job.wait(), Err(Error::WorkerLost)));
    }
}
