/// Admin moderation endpoints
///
/// Single-entity actions, bulk actions and the bulk-reject comment sheet.
/// Every route requires an `AdminActor`; the actor id is what ends up in the
/// audit log.
use crate::{
    auth::AdminActor,
    context::AppContext,
    error::ModerationResult,
    moderation::{
        audit, ActionPayload, ActionRequest, AdminAction, BulkResult, ModeratableEntity,
        OwnerCommentRow, PayloadResolver,
    },
    service::Notice,
    store::EntityFilter,
};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/entities", get(list_entities))
        .route("/admin/entities/:id", get(get_entity))
        .route("/admin/entities/:id/audit", get(get_audit_log))
        .route("/admin/entities/:id/actions", post(apply_action))
        .route("/admin/bulk", post(apply_bulk))
        .route("/admin/bulk/reject-sheet", post(reject_sheet))
        .route("/admin/bulk/reject", post(bulk_reject))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListEntitiesResponse {
    pub entities: Vec<ModeratableEntity>,
}

async fn list_entities(
    State(ctx): State<AppContext>,
    _admin: AdminActor,
    Query(filter): Query<EntityFilter>,
) -> ModerationResult<Json<ListEntitiesResponse>> {
    let entities = ctx.moderation.list(&filter).await?;
    Ok(Json(ListEntitiesResponse { entities }))
}

async fn get_entity(
    State(ctx): State<AppContext>,
    _admin: AdminActor,
    Path(id): Path<String>,
) -> ModerationResult<Json<ModeratableEntity>> {
    Ok(Json(ctx.moderation.get(&id).await?))
}

/// Audit trail in its line-per-entry display format
async fn get_audit_log(
    State(ctx): State<AppContext>,
    _admin: AdminActor,
    Path(id): Path<String>,
) -> ModerationResult<impl IntoResponse> {
    let entity = ctx.moderation.get(&id).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        audit::format_log(&entity.audit_log),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ActionBody {
    pub action: String,
    #[serde(flatten)]
    pub payload: ActionPayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub entity: ModeratableEntity,
    pub notice: Notice,
}

/// Apply one named action to an entity.
///
/// `feature` toggles the featured flag. `unfeature` only clears it, so sending
/// it to a listing that is not featured changes nothing: it is recorded under
/// the default audit policy and fails with `NoOpTransition` (409) under
/// `skip-noops`.
async fn apply_action(
    State(ctx): State<AppContext>,
    admin: AdminActor,
    Path(id): Path<String>,
    Json(body): Json<ActionBody>,
) -> ModerationResult<Json<ActionResponse>> {
    let entity = ctx.moderation.get(&id).await?;
    let action = AdminAction::parse(&body.action, Some(entity.kind()))?;
    let request = ActionRequest::new(action, admin.id).with_payload(body.payload);

    let entity = ctx.moderation.apply_action(&id, &request).await?;
    let notice = Notice::for_action(&entity);

    Ok(Json(ActionResponse { entity, notice }))
}

#[derive(Debug, Deserialize)]
pub struct BulkActionBody {
    #[serde(default)]
    pub ids: Vec<String>,
    pub action: String,
    #[serde(flatten)]
    pub payload: ActionPayload,
}

/// Per-item failure as reported to the admin
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkFailureView {
    pub id: String,
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkResponse {
    pub succeeded: Vec<ModeratableEntity>,
    pub failed: Vec<BulkFailureView>,
    pub notice: Notice,
}

impl BulkResponse {
    fn new(action: AdminAction, result: BulkResult) -> Self {
        let notice = Notice::for_bulk(action, &result);
        let failed = result
            .failed
            .into_iter()
            .map(|failure| BulkFailureView {
                error: failure.error.code().to_string(),
                message: failure.error.public_message(),
                id: failure.id,
            })
            .collect();

        Self {
            succeeded: result.succeeded,
            failed,
            notice,
        }
    }
}

async fn apply_bulk(
    State(ctx): State<AppContext>,
    admin: AdminActor,
    Json(body): Json<BulkActionBody>,
) -> ModerationResult<Json<BulkResponse>> {
    let action = AdminAction::parse(&body.action, None)?;
    let resolver = PayloadResolver::constant(body.payload);

    let result = ctx
        .moderation
        .apply_bulk(&body.ids, action, &admin.id, &resolver)
        .await?;

    Ok(Json(BulkResponse::new(action, result)))
}

#[derive(Debug, Deserialize)]
pub struct SelectionBody {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectSheetResponse {
    pub rows: Vec<OwnerCommentRow>,
}

async fn reject_sheet(
    State(ctx): State<AppContext>,
    _admin: AdminActor,
    Json(body): Json<SelectionBody>,
) -> ModerationResult<Json<RejectSheetResponse>> {
    let rows = ctx.moderation.reject_sheet(&body.ids).await?;
    Ok(Json(RejectSheetResponse { rows }))
}

#[derive(Debug, Deserialize)]
pub struct BulkRejectBody {
    #[serde(default)]
    pub ids: Vec<String>,
    /// Rejection comment keyed by owner id; owners without one fail
    /// with `MissingJustification`
    #[serde(default)]
    pub comments: HashMap<String, String>,
}

async fn bulk_reject(
    State(ctx): State<AppContext>,
    admin: AdminActor,
    Json(body): Json<BulkRejectBody>,
) -> ModerationResult<Json<BulkResponse>> {
    let result = ctx
        .moderation
        .bulk_reject_with_comments(&body.ids, &admin.id, body.comments)
        .await?;

    Ok(Json(BulkResponse::new(AdminAction::Reject, result)))
}
