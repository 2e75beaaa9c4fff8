use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::hosted::{check, HostedClient};
use crate::storage::caller::acting_token;
use crate::storage::traits::Storage;
use crate::types::{
    AgentId, EventType, Evidence, LogEntry, Mission, MissionId, MissionStatus, Profile,
};

/// Table access through the hosted provider's REST interface.
pub struct HostedStorage {
    client: HostedClient,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfileRow {
    id: AgentId,
    full_name: Option<String>,
    credibility_score: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MissionRow {
    id: MissionId,
    agent_id: AgentId,
    title: String,
    description: Option<String>,
    #[serde(default)]
    rank: Option<String>,
    status: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LogRow {
    id: uuid::Uuid,
    agent_email: String,
    event_type: String,
    mission_id: Option<MissionId>,
    details: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile::with_score(
            row.id,
            row.full_name.unwrap_or_default(),
            row.credibility_score.unwrap_or(0),
        )
    }
}

impl From<&Profile> for ProfileRow {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            full_name: Some(profile.full_name.clone()),
            credibility_score: Some(profile.credibility_score as i64),
        }
    }
}

impl TryFrom<MissionRow> for Mission {
    type Error = anyhow::Error;

    fn try_from(row: MissionRow) -> Result<Self> {
        // Rows created before statuses existed default to pending.
        let status = match row.status.as_deref() {
            Some(raw) => MissionStatus::parse(raw)
                .ok_or_else(|| anyhow!("unknown mission status '{}'", raw))?,
            None => MissionStatus::Pending,
        };

        Ok(Mission {
            id: row.id,
            agent_id: row.agent_id,
            title: row.title,
            description: row.description,
            rank: row.rank,
            status,
            created_at: row.created_at,
        })
    }
}

impl From<&Mission> for MissionRow {
    fn from(mission: &Mission) -> Self {
        Self {
            id: mission.id,
            agent_id: mission.agent_id,
            title: mission.title.clone(),
            description: mission.description.clone(),
            rank: mission.rank.clone(),
            status: Some(mission.status.as_str().to_string()),
            created_at: mission.created_at,
        }
    }
}

impl From<LogRow> for LogEntry {
    fn from(row: LogRow) -> Self {
        LogEntry {
            id: row.id,
            agent_email: row.agent_email,
            event_type: EventType::parse(&row.event_type),
            mission_id: row.mission_id,
            details: row.details.unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

impl From<&LogEntry> for LogRow {
    fn from(entry: &LogEntry) -> Self {
        Self {
            id: entry.id,
            agent_email: entry.agent_email.clone(),
            event_type: entry.event_type.as_str().to_string(),
            mission_id: entry.mission_id,
            details: Some(entry.details.clone()),
            created_at: entry.created_at,
        }
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

/// Total from a `Content-Range: 0-24/3573` header.
fn parse_total(content_range: &str) -> Option<usize> {
    content_range.rsplit('/').next()?.parse().ok()
}

impl HostedStorage {
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }

    /// Table request authorized as the acting agent, or anonymously outside
    /// an [`act_as`](crate::storage::act_as) scope.
    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = self.client.table_url(table);
        match acting_token() {
            Some(token) => self.client.user_request(method, &url, &token),
            None => self.client.request(method, &url),
        }
    }

    async fn insert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<()> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn select<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let response = self
            .request(Method::GET, table)
            .query(&[("select", "*".to_string())])
            .query(query)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn patch<T: Serialize + Sync>(&self, table: &str, id: uuid::Uuid, row: &T) -> Result<usize> {
        let response = self
            .request(Method::PATCH, table)
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let updated: Vec<serde_json::Value> = check(response).await?.json().await?;
        Ok(updated.len())
    }
}

#[async_trait]
impl Storage for HostedStorage {
    async fn create_profile(&self, profile: &Profile) -> Result<()> {
        self.insert("profiles", &ProfileRow::from(profile)).await
    }

    async fn get_profile(&self, id: AgentId) -> Result<Option<Profile>> {
        let rows: Vec<ProfileRow> = self.select("profiles", &[("id", eq(id))]).await?;
        Ok(rows.into_iter().next().map(Profile::from))
    }

    async fn update_profile(&self, profile: &Profile) -> Result<()> {
        let updated = self
            .patch("profiles", profile.id, &ProfileRow::from(profile))
            .await?;
        if updated == 0 {
            return Err(anyhow!("profile {} not found", profile.id));
        }
        Ok(())
    }

    async fn create_mission(&self, mission: &Mission) -> Result<()> {
        self.insert("missions", &MissionRow::from(mission)).await
    }

    async fn get_mission(&self, id: MissionId) -> Result<Option<Mission>> {
        let rows: Vec<MissionRow> = self.select("missions", &[("id", eq(id))]).await?;
        rows.into_iter().next().map(Mission::try_from).transpose()
    }

    async fn list_missions(&self, agent_id: Option<AgentId>) -> Result<Vec<Mission>> {
        let mut query = vec![("order", "created_at.desc".to_string())];
        if let Some(agent) = agent_id {
            query.push(("agent_id", eq(agent)));
        }
        let rows: Vec<MissionRow> = self.select("missions", &query).await?;
        rows.into_iter().map(Mission::try_from).collect()
    }

    async fn update_mission(&self, mission: &Mission) -> Result<()> {
        let updated = self
            .patch("missions", mission.id, &MissionRow::from(mission))
            .await?;
        if updated == 0 {
            return Err(anyhow!("mission {} not found", mission.id));
        }
        Ok(())
    }

    async fn delete_mission(&self, id: MissionId) -> Result<bool> {
        let response = self
            .request(Method::DELETE, "missions")
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let deleted: Vec<serde_json::Value> = check(response).await?.json().await?;
        Ok(!deleted.is_empty())
    }

    async fn create_evidence(&self, evidence: &Evidence) -> Result<()> {
        self.insert("evidences", evidence).await
    }

    async fn list_evidence(&self, mission_id: MissionId) -> Result<Vec<Evidence>> {
        self.select(
            "evidences",
            &[
                ("mission_id", eq(mission_id)),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn append_log(&self, entry: &LogEntry) -> Result<()> {
        self.insert("logs", &LogRow::from(entry)).await
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let rows: Vec<LogRow> = self
            .select(
                "logs",
                &[
                    ("order", "created_at.desc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(LogEntry::from).collect())
    }

    async fn count_logs(&self) -> Result<usize> {
        let response = self
            .request(Method::HEAD, "logs")
            .query(&[("select", "id")])
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = check(response).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_total)
            .ok_or_else(|| anyhow!("backend did not report a log count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::act_as;

    fn bearer(request: &reqwest::Request) -> &str {
        request.headers()["Authorization"].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_table_requests_carry_acting_token() {
        let storage = HostedStorage::new(HostedClient::new("https://abc.supabase.co", "anon-key"));

        let anonymous = storage.request(Method::GET, "missions").build().unwrap();
        assert_eq!(bearer(&anonymous), "Bearer anon-key");

        let scoped = act_as(Some("agent-jwt".to_string()), async {
            storage.request(Method::PATCH, "profiles").build().unwrap()
        })
        .await;
        assert_eq!(bearer(&scoped), "Bearer agent-jwt");
        assert_eq!(scoped.headers()["apikey"], "anon-key");
        assert_eq!(scoped.url().as_str(), "https://abc.supabase.co/rest/v1/profiles");
    }

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total("0-24/3573"), Some(3573));
        assert_eq!(parse_total("*/0"), Some(0));
        assert_eq!(parse_total("0-24/*"), None);
    }

    #[test]
    fn test_mission_row_accepts_legacy_status() {
        let row: MissionRow = serde_json::from_value(serde_json::json!({
            "id": "6f1c2b4e-7d1a-4a55-9a3e-0d3f8f2f9b11",
            "agent_id": "0b6d8a52-2a0f-4c7c-8d7f-5c61a7f0e0a2",
            "title": "Recon",
            "description": null,
            "status": "COMPLETED",
            "created_at": "2025-01-05T10:00:00Z"
        }))
        .unwrap();

        let mission = Mission::try_from(row).unwrap();
        assert_eq!(mission.status, MissionStatus::Completed);
        assert!(mission.rank.is_none());
    }

    #[test]
    fn test_profile_row_null_score() {
        let row: ProfileRow = serde_json::from_value(serde_json::json!({
            "id": "0b6d8a52-2a0f-4c7c-8d7f-5c61a7f0e0a2",
            "full_name": null,
            "credibility_score": null
        }))
        .unwrap();

        let profile = Profile::from(row);
        assert_eq!(profile.credibility_score, 0);
        assert_eq!(profile.full_name, "");
    }
}
