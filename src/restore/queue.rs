// restoretool/src/restore/queue.rs
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::job::Job;

/// FIFO of restore jobs shared by every worker of a phase.
///
/// Taking a job and deciding that the queue is empty happen under the same lock,
/// so workers loop on [`JobQueue::try_take`] instead of checking
/// [`JobQueue::is_empty`] first.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, job: Job) {
        self.lock().push_back(job);
    }

    /// Removes and returns the front job, or `None` when the queue is drained.
    pub fn try_take(&self) -> Option<Job> {
        self.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Removes every remaining job, front first.
    pub fn drain(&self) -> Vec<Job> {
        self.lock().drain(..).collect()
    }
}

impl FromIterator<Job> for JobQueue {
    fn from_iter<I: IntoIterator<Item = Job>>(iter: I) -> Self {
        Self {
            jobs: Mutex::new(iter.into_iter().collect()),
        }
    }
}
