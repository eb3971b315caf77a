//! Lock-guarded job registry
//!
//! Readers take the shared lock, every mutation takes the exclusive lock, and
//! no lock is held across an await or a network call.
//!
//! Every registration gets a fresh run number. Writes that come from a
//! background crawl carry that number as an owner guard, so a late write from
//! a stopped run can never land on a newer job registered under the same id.
//! The run's cancellation token lives next to the job and never leaves the
//! registry inside a snapshot.

use crate::crawler::CrawlJobResult;
use crate::state::{CrawlJob, CrawlStatus};
use crate::{CrawlError, JobError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;

pub(crate) const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Owner handle returned by [`JobRegistry::try_register`]
#[derive(Debug, Clone)]
pub struct Registration {
    pub run: u64,
    /// Cancelled by [`JobRegistry::stop`]
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct Entry {
    job: CrawlJob,
    run: u64,
    cancel: CancellationToken,
}

impl Entry {
    fn owned_by(&self, run: u64) -> bool {
        self.run == run && !self.job.is_terminal()
    }
}

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<i64, Entry>>,
    next_run: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<i64, Entry>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<i64, Entry>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of one job
    pub fn get(&self, id: i64) -> Option<CrawlJob> {
        self.read().get(&id).map(|entry| entry.job.clone())
    }

    /// Whether a non-terminal job is registered under `id`
    pub fn has_live_job(&self, id: i64) -> bool {
        self.read().get(&id).is_some_and(|entry| !entry.job.is_terminal())
    }

    /// Registers a job, replacing a finished job with the same id
    pub fn try_register(&self, job: CrawlJob) -> Result<Registration, JobError> {
        let mut jobs = self.write();
        if jobs.get(&job.id).is_some_and(|entry| !entry.job.is_terminal()) {
            return Err(JobError::AlreadyInProgress(job.id));
        }

        let registration = Registration {
            run: self.next_run.fetch_add(1, Ordering::Relaxed),
            cancel: CancellationToken::new(),
        };
        jobs.insert(
            job.id,
            Entry {
                job,
                run: registration.run,
                cancel: registration.cancel.clone(),
            },
        );
        Ok(registration)
    }

    /// Whether `run` still owns the live job under `id`
    pub fn is_owner(&self, id: i64, run: u64) -> bool {
        self.read().get(&id).is_some_and(|entry| entry.owned_by(run))
    }

    /// Applies a non-terminal progress report from the job's own crawl
    pub fn apply_progress(
        &self,
        id: i64,
        run: u64,
        status: CrawlStatus,
        message: &str,
        progress: f64,
    ) -> bool {
        let mut jobs = self.write();
        match jobs.get_mut(&id) {
            Some(entry) if entry.owned_by(run) => {
                entry.job.apply_progress(status, message, progress)
            }
            _ => false,
        }
    }

    /// Moves a job into a terminal state together with its result
    ///
    /// Returns `false` when the job is gone, already terminal, or belongs to
    /// another run.
    pub fn finish(
        &self,
        id: i64,
        run: u64,
        status: CrawlStatus,
        message: &str,
        result: CrawlJobResult,
    ) -> bool {
        let mut jobs = self.write();
        match jobs.get_mut(&id) {
            Some(entry) if entry.owned_by(run) => {
                entry.job.finish(status, message, result);
                true
            }
            _ => false,
        }
    }

    /// Signals cancellation and fails the job immediately
    pub fn stop(&self, id: i64) -> Result<(), JobError> {
        let mut jobs = self.write();
        let entry = jobs.get_mut(&id).ok_or(JobError::NoActiveJob(id))?;
        if entry.job.is_terminal() {
            return Err(JobError::AlreadyFinished(id));
        }

        entry.cancel.cancel();
        let result = CrawlJobResult::failed(entry.job.url.clone(), CrawlError::Cancelled);
        entry.job.finish(CrawlStatus::Failed, CANCELLED_MESSAGE, result);
        Ok(())
    }

    /// Snapshots of every non-terminal job
    pub fn active_jobs(&self) -> HashMap<i64, CrawlJob> {
        self.read()
            .iter()
            .filter(|(_, entry)| !entry.job.is_terminal())
            .map(|(id, entry)| (*id, entry.job.clone()))
            .collect()
    }

    /// Total number of jobs and the count per status
    pub fn status_counts(&self) -> (usize, BTreeMap<CrawlStatus, usize>) {
        let jobs = self.read();
        let mut counts = BTreeMap::new();
        for entry in jobs.values() {
            *counts.entry(entry.job.status).or_insert(0) += 1;
        }
        (jobs.len(), counts)
    }

    /// Removes terminal jobs that ended before `cutoff`
    pub fn remove_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, entry| {
            let job = &entry.job;
            !(job.is_terminal() && job.end_time.is_some_and(|end| end < cutoff))
        });
        before - jobs.len()
    }

    #[cfg(test)]
    pub(crate) fn insert(&self, job: CrawlJob) {
        let entry = Entry {
            run: self.next_run.fetch_add(1, Ordering::Relaxed),
            cancel: CancellationToken::new(),
            job,
        };
        self.write().insert(entry.job.id, entry);
    }
}
