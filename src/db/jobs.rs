//! Job persistence: upsert on every transition, bulk load on start.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::runner::{
    BackoffCriteria, BackoffPolicy, Constraints, JobId, JobInfo, JobRecord, JobRequest, JobStore,
};

#[async_trait]
impl JobStore for super::Db {
    async fn save(&self, record: &JobRecord) -> Result<()> {
        let info = &record.info;
        let request = &record.request;
        let prerequisites: Vec<Uuid> = record.prerequisites.iter().map(|id| id.0).collect();

        sqlx::query(
            "INSERT INTO jobs (id, unique_name, worker, state, run_attempt_count, input, requires_network, backoff_policy, backoff_delay_ms, prerequisites, next_run_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (id) DO UPDATE SET
                 state = EXCLUDED.state,
                 run_attempt_count = EXCLUDED.run_attempt_count,
                 prerequisites = EXCLUDED.prerequisites,
                 next_run_at = EXCLUDED.next_run_at,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(info.id.0)
        .bind(&info.unique_name)
        .bind(&info.worker)
        .bind(info.state.to_string())
        .bind(info.run_attempt_count as i32)
        .bind(serde_json::to_value(&request.input)?)
        .bind(request.constraints.requires_network)
        .bind(policy_name(request.backoff.policy))
        .bind(request.backoff.delay.as_millis() as i64)
        .bind(&prerequisites)
        .bind(record.next_run_at)
        .bind(info.created_at)
        .bind(info.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<JobRecord>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT id, unique_name, worker, state, run_attempt_count, input, requires_network, backoff_policy, backoff_delay_ms, prerequisites, next_run_at, created_at, updated_at
             FROM jobs ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::try_into_record).collect()
    }

    async fn remove(&self, ids: &[JobId]) -> Result<()> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
        sqlx::query("DELETE FROM jobs WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn policy_name(policy: BackoffPolicy) -> &'static str {
    match policy {
        BackoffPolicy::Linear => "linear",
        BackoffPolicy::Exponential => "exponential",
    }
}

fn parse_policy(name: &str) -> Result<BackoffPolicy> {
    match name {
        "linear" => Ok(BackoffPolicy::Linear),
        "exponential" => Ok(BackoffPolicy::Exponential),
        other => Err(Error::Other(format!("unknown backoff policy: {other}"))),
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    unique_name: String,
    worker: String,
    state: String,
    run_attempt_count: i32,
    input: serde_json::Value,
    requires_network: bool,
    backoff_policy: String,
    backoff_delay_ms: i64,
    prerequisites: Vec<Uuid>,
    next_run_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn try_into_record(self) -> Result<JobRecord> {
        let id = JobId(self.id);
        Ok(JobRecord {
            info: JobInfo {
                id,
                unique_name: self.unique_name,
                worker: self.worker.clone(),
                state: self.state.parse()?,
                run_attempt_count: self.run_attempt_count.max(0) as u32,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            request: JobRequest {
                id,
                worker: self.worker,
                input: serde_json::from_value(self.input)?,
                constraints: Constraints {
                    requires_network: self.requires_network,
                },
                backoff: BackoffCriteria {
                    policy: parse_policy(&self.backoff_policy)?,
                    delay: Duration::from_millis(self.backoff_delay_ms.max(0) as u64),
                },
            },
            prerequisites: self.prerequisites.into_iter().map(JobId).collect(),
            next_run_at: self.next_run_at,
        })
    }
}
