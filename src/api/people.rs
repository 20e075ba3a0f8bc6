//! Roster and group endpoints

use anyhow::{Context, Result};

use super::client::PortalClient;
use crate::models::{Employee, Group};

pub async fn list_employees(client: &PortalClient) -> Result<Vec<Employee>> {
    let resp = client.get("/api/employees").await?;
    super::parse_list(resp, "employees").await
}

pub async fn list_groups(client: &PortalClient) -> Result<Vec<Group>> {
    let resp = client.get("/api/chat/groups").await?;
    super::parse_list(resp, "groups").await
}

pub async fn create_group(
    client: &PortalClient,
    name: &str,
    creator_id: &str,
    member_ids: &[String],
) -> Result<Group> {
    let body = serde_json::json!({
        "name": name,
        "createdBy": creator_id,
        "memberIds": member_ids,
    });
    let resp = client.post("/api/chat/groups", &body).await?;
    let value: serde_json::Value = resp
        .json()
        .await
        .context("Failed to parse create-group response")?;
    // Some deployments wrap the created entity as {"group": {...}}.
    let group = match value.get("group") {
        Some(inner) => inner.clone(),
        None => value,
    };
    serde_json::from_value(group).context("Malformed group in create-group response")
}
