use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::storage::traits::Storage;
use crate::types::{
    AgentId, EventType, Evidence, LogEntry, Mission, MissionId, MissionStatus, Profile,
};

pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../migrations/V001__initial_schema.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn profile_from_row(r: &PgRow) -> Profile {
    let score: i32 = r.get("credibility_score");
    Profile::with_score(r.get("id"), r.get("full_name"), score as i64)
}

fn mission_from_row(r: &PgRow) -> Result<Mission> {
    let status_str: String = r.get("status");
    let status = MissionStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("unknown mission status '{}'", status_str))?;

    Ok(Mission {
        id: r.get("id"),
        agent_id: r.get("agent_id"),
        title: r.get("title"),
        description: r.get("description"),
        rank: r.get("rank"),
        status,
        created_at: r.get("created_at"),
    })
}

fn evidence_from_row(r: &PgRow) -> Evidence {
    Evidence {
        id: r.get("id"),
        mission_id: r.get("mission_id"),
        evidence_url: r.get("evidence_url"),
        note: r.get("note"),
        agent_email: r.get("agent_email"),
        created_at: r.get("created_at"),
    }
}

fn log_from_row(r: &PgRow) -> LogEntry {
    let event_type: String = r.get("event_type");
    LogEntry {
        id: r.get("id"),
        agent_email: r.get("agent_email"),
        event_type: EventType::parse(&event_type),
        mission_id: r.get("mission_id"),
        details: r.get("details"),
        created_at: r.get("created_at"),
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn create_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, full_name, credibility_score)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(profile.id)
        .bind(&profile.full_name)
        .bind(profile.credibility_score as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_profile(&self, id: AgentId) -> Result<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT id, full_name, credibility_score
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    async fn update_profile(&self, profile: &Profile) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET full_name = $2, credibility_score = $3
            WHERE id = $1
            "#,
        )
        .bind(profile.id)
        .bind(&profile.full_name)
        .bind(profile.credibility_score as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("profile {} not found", profile.id));
        }
        Ok(())
    }

    async fn create_mission(&self, mission: &Mission) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO missions (id, agent_id, title, description, rank, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(mission.id)
        .bind(mission.agent_id)
        .bind(&mission.title)
        .bind(&mission.description)
        .bind(&mission.rank)
        .bind(mission.status.as_str())
        .bind(mission.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_mission(&self, id: MissionId) -> Result<Option<Mission>> {
        let row = sqlx::query(
            r#"
            SELECT id, agent_id, title, description, rank, status, created_at
            FROM missions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(mission_from_row).transpose()
    }

    async fn list_missions(&self, agent_id: Option<AgentId>) -> Result<Vec<Mission>> {
        let rows = match agent_id {
            Some(agent) => {
                sqlx::query(
                    r#"
                    SELECT id, agent_id, title, description, rank, status, created_at
                    FROM missions
                    WHERE agent_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(agent)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, agent_id, title, description, rank, status, created_at
                    FROM missions
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(mission_from_row).collect()
    }

    async fn update_mission(&self, mission: &Mission) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE missions
            SET title = $2, description = $3, rank = $4, status = $5
            WHERE id = $1
            "#,
        )
        .bind(mission.id)
        .bind(&mission.title)
        .bind(&mission.description)
        .bind(&mission.rank)
        .bind(mission.status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("mission {} not found", mission.id));
        }
        Ok(())
    }

    async fn delete_mission(&self, id: MissionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM missions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_evidence(&self, evidence: &Evidence) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO evidences (id, mission_id, evidence_url, note, agent_email, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(evidence.id)
        .bind(evidence.mission_id)
        .bind(&evidence.evidence_url)
        .bind(&evidence.note)
        .bind(&evidence.agent_email)
        .bind(evidence.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_evidence(&self, mission_id: MissionId) -> Result<Vec<Evidence>> {
        let rows = sqlx::query(
            r#"
            SELECT id, mission_id, evidence_url, note, agent_email, created_at
            FROM evidences
            WHERE mission_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(mission_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(evidence_from_row).collect())
    }

    async fn append_log(&self, entry: &LogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO logs (id, agent_email, event_type, mission_id, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.agent_email)
        .bind(entry.event_type.as_str())
        .bind(entry.mission_id)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_email, event_type, mission_id, details, created_at
            FROM logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(log_from_row).collect())
    }

    async fn count_logs(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM logs")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count as usize)
    }
}
