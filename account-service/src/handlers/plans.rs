use crate::services::catalog::{self, PlanSummary};
use axum::Json;

pub async fn list_plans() -> Json<Vec<PlanSummary>> {
    Json(catalog::all().iter().map(PlanSummary::from).collect())
}
