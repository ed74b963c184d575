//! Organizations feature: an in-memory organization directory.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::{unix_now, Feature, FeatureContext, FeatureError};
use crate::http::response::ApiError;

const MAX_NAME_LEN: usize = 100;

pub struct OrganizationsFeature;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
}

/// Organizations keyed by id, slugs kept unique.
#[derive(Default)]
pub struct OrganizationStore {
    by_id: DashMap<Uuid, Organization>,
    slugs: DashMap<String, Uuid>,
}

impl OrganizationStore {
    pub fn create(&self, name: &str) -> Result<Organization, ApiError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(ApiError::BadRequest(format!(
                "name must be 1 to {MAX_NAME_LEN} characters"
            )));
        }
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(ApiError::BadRequest("name must contain letters or digits".into()));
        }

        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.clone(),
            created_at: unix_now(),
        };

        // Slug reservation must be atomic under concurrent creates.
        match self.slugs.entry(slug) {
            dashmap::mapref::entry::Entry::Occupied(e) => {
                return Err(ApiError::Conflict(format!(
                    "organization '{}' already exists",
                    e.key()
                )))
            }
            dashmap::mapref::entry::Entry::Vacant(e) => {
                e.insert(org.id);
            }
        }
        self.by_id.insert(org.id, org.clone());
        Ok(org)
    }

    pub fn get(&self, id: &Uuid) -> Option<Organization> {
        self.by_id.get(id).map(|o| o.clone())
    }

    /// All organizations ordered by name.
    pub fn list(&self) -> Vec<Organization> {
        let mut orgs: Vec<_> = self.by_id.iter().map(|o| o.value().clone()).collect();
        orgs.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        orgs
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

impl Feature for OrganizationsFeature {
    fn name(&self) -> &'static str {
        "organizations"
    }

    fn routes(&self, _ctx: &FeatureContext) -> Result<Router, FeatureError> {
        Ok(Router::new()
            .route("/orgs", get(list_orgs).post(create_org))
            .route("/orgs/{id}", get(get_org))
            .with_state(Arc::new(OrganizationStore::default())))
    }
}

async fn list_orgs(State(store): State<Arc<OrganizationStore>>) -> Json<Vec<Organization>> {
    Json(store.list())
}

async fn create_org(
    State(store): State<Arc<OrganizationStore>>,
    Json(req): Json<CreateOrganization>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    let org = store.create(&req.name)?;
    tracing::info!(org_id = %org.id, slug = %org.slug, "Organization created");
    Ok((StatusCode::CREATED, Json(org)))
}

async fn get_org(
    State(store): State<Arc<OrganizationStore>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Organization>, ApiError> {
    store.get(&id).map(Json).ok_or(ApiError::NotFound("organization"))
}
