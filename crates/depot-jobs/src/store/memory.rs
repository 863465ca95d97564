//! In-process job store.
//!
//! Keeps the whole job table behind one mutex, which trivially provides the
//! two atomicity guarantees the orchestrator needs: the coalescing
//! check-then-insert and the exactly-once claim. Used by tests and by
//! embedders that run the orchestrator without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use depot_core::result::AppResult;
use depot_core::types::pagination::PageRequest;
use depot_core::AppError;
use depot_entity::data::kind::{JobDataEncoding, JobDataKind};
use depot_entity::data::model::JobData;
use depot_entity::job::model::{Job, JobAssignment};
use depot_entity::job::spec::JobSpecification;
use depot_entity::job::status::JobStatus;

use super::JobStore;

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<String, Job>,
    /// Keyed by job code; one claim per job, ever.
    assignments: HashMap<String, JobAssignment>,
    datas: HashMap<String, JobData>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Job store holding all rows in process memory.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
}

impl MemoryJobStore {
    /// Create an empty in-memory job store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filters(job: &Job, owner_nickname: Option<&str>, statuses: &[JobStatus]) -> bool {
    if let Some(owner) = owner_nickname {
        if job.owner_nickname.as_deref() != Some(owner) {
            return false;
        }
    }
    statuses.is_empty() || statuses.contains(&job.status)
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_coalescing(
        &self,
        code: &str,
        spec: &JobSpecification,
        coalesce_statuses: &[JobStatus],
        expiry_timestamp: DateTime<Utc>,
    ) -> AppResult<(Job, bool)> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");

        if !coalesce_statuses.is_empty() {
            let mut candidates: Vec<&Job> = inner
                .jobs
                .values()
                .filter(|job| {
                    coalesce_statuses.contains(&job.status) && job.matches_specification(spec)
                })
                .collect();

            // Most recently active first, as the database store orders them.
            candidates.sort_by(|a, b| {
                b.start_timestamp
                    .cmp(&a.start_timestamp)
                    .then(b.queue_timestamp.cmp(&a.queue_timestamp))
                    .then(b.id.cmp(&a.id))
            });

            if let Some(existing) = candidates.first() {
                return Ok(((*existing).clone(), false));
            }
        }

        // Check all supplied-data attachments before mutating anything.
        for data_code in &spec.supplied_data_codes {
            let attachable = inner.datas.get(data_code).is_some_and(|d| {
                d.kind == JobDataKind::Supplied && d.job_code.is_none()
            });
            if !attachable {
                return Err(AppError::validation(format!(
                    "supplied data [{data_code}] is missing or already attached to a job"
                )));
            }
        }

        let now = Utc::now();
        let job = Job {
            id: inner.next_id(),
            code: code.to_string(),
            job_type_code: spec.job_type_code.clone(),
            owner_nickname: spec.owner_nickname.clone(),
            specification: spec.parameters.clone(),
            status: JobStatus::Queued,
            progress_percent: None,
            queue_timestamp: now,
            start_timestamp: None,
            finish_timestamp: None,
            fail_timestamp: None,
            cancel_timestamp: None,
            expiry_timestamp,
            create_timestamp: now,
            modify_timestamp: now,
        };
        job.check_invariants()?;

        for data_code in &spec.supplied_data_codes {
            if let Some(data) = inner.datas.get_mut(data_code) {
                data.job_code = Some(code.to_string());
            }
        }

        inner.jobs.insert(code.to_string(), job.clone());
        Ok((job, true))
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Job>> {
        let inner = self.inner.lock().expect("job store lock poisoned");
        Ok(inner.jobs.get(code).cloned())
    }

    async fn claim_next(&self, runner_id: &str) -> AppResult<Option<Job>> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");

        let next_code = inner
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Queued)
            .min_by_key(|job| (job.queue_timestamp, job.id))
            .map(|job| job.code.clone());

        let Some(code) = next_code else {
            return Ok(None);
        };

        if inner.assignments.contains_key(&code) {
            return Err(AppError::conflict(format!(
                "job [{code}] is already assigned"
            )));
        }
        let assignment = JobAssignment {
            id: inner.next_id(),
            code: code.clone(),
            runner_id: runner_id.to_string(),
            create_timestamp: Utc::now(),
        };
        inner.assignments.insert(code.clone(), assignment);

        let job = inner.jobs.get_mut(&code).expect("job disappeared");
        job.status = JobStatus::Started;
        job.start_timestamp = Some(Utc::now());
        job.progress_percent = Some(0);
        job.modify_timestamp = Utc::now();
        job.check_invariants()?;

        Ok(Some(job.clone()))
    }

    async fn mark_finished(&self, code: &str) -> AppResult<bool> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        let Some(job) = inner.jobs.get_mut(code) else {
            return Ok(false);
        };
        if job.status != JobStatus::Started {
            return Ok(false);
        }
        job.status = JobStatus::Finished;
        job.finish_timestamp = Some(Utc::now());
        job.progress_percent = Some(100);
        job.modify_timestamp = Utc::now();
        job.check_invariants()?;
        Ok(true)
    }

    async fn mark_failed(&self, code: &str) -> AppResult<bool> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        let Some(job) = inner.jobs.get_mut(code) else {
            return Ok(false);
        };
        if job.status != JobStatus::Started {
            return Ok(false);
        }
        job.status = JobStatus::Failed;
        job.fail_timestamp = Some(Utc::now());
        job.modify_timestamp = Utc::now();
        job.check_invariants()?;
        Ok(true)
    }

    async fn mark_cancelled(&self, code: &str) -> AppResult<bool> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        let Some(job) = inner.jobs.get_mut(code) else {
            return Ok(false);
        };
        if job.status.is_terminal() {
            return Ok(false);
        }
        job.status = JobStatus::Cancelled;
        job.cancel_timestamp = Some(Utc::now());
        job.modify_timestamp = Utc::now();
        job.check_invariants()?;
        Ok(true)
    }

    async fn set_progress(&self, code: &str, progress_percent: i32) -> AppResult<bool> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        let Some(job) = inner.jobs.get_mut(code) else {
            return Ok(false);
        };
        if job.status != JobStatus::Started {
            return Ok(false);
        }
        job.progress_percent = Some(progress_percent);
        job.modify_timestamp = Utc::now();
        job.check_invariants()?;
        Ok(true)
    }

    async fn search(
        &self,
        owner_nickname: Option<&str>,
        statuses: &[JobStatus],
        page: &PageRequest,
    ) -> AppResult<Vec<Job>> {
        let inner = self.inner.lock().expect("job store lock poisoned");

        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| matches_filters(job, owner_nickname, statuses))
            .cloned()
            .collect();

        jobs.sort_by(|a, b| {
            b.queue_timestamp
                .cmp(&a.queue_timestamp)
                .then(b.id.cmp(&a.id))
        });

        Ok(jobs
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn count(
        &self,
        owner_nickname: Option<&str>,
        statuses: &[JobStatus],
    ) -> AppResult<u64> {
        let inner = self.inner.lock().expect("job store lock poisoned");
        Ok(inner
            .jobs
            .values()
            .filter(|job| matches_filters(job, owner_nickname, statuses))
            .count() as u64)
    }

    async fn find_expired(&self) -> AppResult<Vec<Job>> {
        let now = Utc::now();
        let inner = self.inner.lock().expect("job store lock poisoned");
        Ok(inner
            .jobs
            .values()
            .filter(|job| job.status.is_terminal() && job.expiry_timestamp < now)
            .cloned()
            .collect())
    }

    async fn delete_job(&self, code: &str) -> AppResult<bool> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        inner.assignments.remove(code);
        // Detach rather than delete data rows, matching the database
        // foreign key's SET NULL behavior; the sweep removes them itself.
        for data in inner.datas.values_mut() {
            if data.job_code.as_deref() == Some(code) {
                data.job_code = None;
            }
        }
        Ok(inner.jobs.remove(code).is_some())
    }

    async fn create_data(
        &self,
        code: &str,
        use_code: &str,
        kind: JobDataKind,
        media_type_code: &str,
        encoding: JobDataEncoding,
        job_code: Option<&str>,
    ) -> AppResult<JobData> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        if inner.datas.contains_key(code) {
            return Err(AppError::conflict(format!(
                "job data [{code}] already exists"
            )));
        }
        let data = JobData {
            id: inner.next_id(),
            code: code.to_string(),
            use_code: use_code.to_string(),
            kind,
            media_type_code: media_type_code.to_string(),
            encoding,
            job_code: job_code.map(str::to_string),
            create_timestamp: Utc::now(),
        };
        inner.datas.insert(code.to_string(), data.clone());
        Ok(data)
    }

    async fn find_data_by_code(&self, code: &str) -> AppResult<Option<JobData>> {
        let inner = self.inner.lock().expect("job store lock poisoned");
        Ok(inner.datas.get(code).cloned())
    }

    async fn find_generated_by_job(&self, job_code: &str) -> AppResult<Vec<JobData>> {
        let inner = self.inner.lock().expect("job store lock poisoned");
        let mut datas: Vec<JobData> = inner
            .datas
            .values()
            .filter(|d| d.kind == JobDataKind::Generated && d.job_code.as_deref() == Some(job_code))
            .cloned()
            .collect();
        datas.sort_by_key(|d| d.id);
        Ok(datas)
    }

    async fn find_orphaned_supplied(
        &self,
        older_than: DateTime<Utc>,
    ) -> AppResult<Vec<JobData>> {
        let inner = self.inner.lock().expect("job store lock poisoned");
        Ok(inner
            .datas
            .values()
            .filter(|d| {
                d.kind == JobDataKind::Supplied
                    && d.job_code.is_none()
                    && d.create_timestamp < older_than
            })
            .cloned()
            .collect())
    }

    async fn delete_data(&self, code: &str) -> AppResult<bool> {
        let mut inner = self.inner.lock().expect("job store lock poisoned");
        Ok(inner.datas.remove(code).is_some())
    }
}
