//! Human review feature: a queue of submissions awaiting a reviewer decision.
//!
//! ```text
//! Pending ──approve──▶ Approved
//!    └─────reject───▶ Rejected
//! ```
//! Decisions are final; deciding twice is a conflict.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::{unix_now, Feature, FeatureContext, FeatureError};
use crate::http::response::ApiError;

pub struct ReviewFeature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewItem {
    pub id: Uuid,
    /// Submission order within the queue.
    pub seq: u64,
    pub content: String,
    pub submitted_by: String,
    pub status: ReviewStatus,
    pub reviewer: Option<String>,
    pub note: Option<String>,
    pub created_at: u64,
    pub decided_at: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitItem {
    pub content: String,
    pub submitted_by: String,
}

#[derive(Debug, Deserialize)]
pub struct DecideItem {
    pub decision: Decision,
    pub reviewer: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListFilter {
    pub status: Option<ReviewStatus>,
}

#[derive(Default)]
pub struct ReviewQueue {
    items: DashMap<Uuid, ReviewItem>,
    next_seq: AtomicU64,
}

impl ReviewQueue {
    pub fn submit(&self, content: &str, submitted_by: &str) -> Result<ReviewItem, ApiError> {
        if content.trim().is_empty() || submitted_by.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "content and submitted_by are required".into(),
            ));
        }
        let item = ReviewItem {
            id: Uuid::new_v4(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            content: content.to_string(),
            submitted_by: submitted_by.trim().to_string(),
            status: ReviewStatus::Pending,
            reviewer: None,
            note: None,
            created_at: unix_now(),
            decided_at: None,
        };
        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    pub fn decide(&self, id: &Uuid, decision: &DecideItem) -> Result<ReviewItem, ApiError> {
        if decision.reviewer.trim().is_empty() {
            return Err(ApiError::BadRequest("reviewer is required".into()));
        }
        let mut item = self.items.get_mut(id).ok_or(ApiError::NotFound("review item"))?;
        if item.status != ReviewStatus::Pending {
            return Err(ApiError::Conflict(format!("review item {id} is already decided")));
        }

        item.status = match decision.decision {
            Decision::Approve => ReviewStatus::Approved,
            Decision::Reject => ReviewStatus::Rejected,
        };
        item.reviewer = Some(decision.reviewer.trim().to_string());
        item.note = decision.note.clone();
        item.decided_at = Some(unix_now());
        Ok(item.clone())
    }

    /// Items oldest first, optionally filtered by status.
    pub fn list(&self, status: Option<ReviewStatus>) -> Vec<ReviewItem> {
        let mut items: Vec<_> = self
            .items
            .iter()
            .filter(|i| status.map_or(true, |s| i.status == s))
            .map(|i| i.value().clone())
            .collect();
        items.sort_by_key(|i| i.seq);
        items
    }
}

impl Feature for ReviewFeature {
    fn name(&self) -> &'static str {
        "review"
    }

    fn routes(&self, _ctx: &FeatureContext) -> Result<Router, FeatureError> {
        Ok(Router::new()
            .route("/review/items", get(list_items).post(submit_item))
            .route("/review/items/{id}/decision", post(decide_item))
            .with_state(Arc::new(ReviewQueue::default())))
    }
}

async fn list_items(
    State(queue): State<Arc<ReviewQueue>>,
    Query(filter): Query<ListFilter>,
) -> Json<Vec<ReviewItem>> {
    Json(queue.list(filter.status))
}

async fn submit_item(
    State(queue): State<Arc<ReviewQueue>>,
    Json(req): Json<SubmitItem>,
) -> Result<(StatusCode, Json<ReviewItem>), ApiError> {
    let item = queue.submit(&req.content, &req.submitted_by)?;
    tracing::info!(item_id = %item.id, submitted_by = %item.submitted_by, "Review item submitted");
    Ok((StatusCode::CREATED, Json(item)))
}

async fn decide_item(
    State(queue): State<Arc<ReviewQueue>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DecideItem>,
) -> Result<Json<ReviewItem>, ApiError> {
    let item = queue.decide(&id, &req)?;
    tracing::info!(item_id = %id, status = ?item.status, reviewer = ?item.reviewer, "Review decided");
    Ok(Json(item))
}
