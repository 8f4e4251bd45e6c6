use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::AuthedUser;
use crate::models::ConversationType;
use crate::services::conversation_service::{GroupChanges, LeaveOutcome};
use crate::services::ConversationService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub conversation_type: ConversationType,
    pub name: Option<String>,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConversationRequest {
    pub name: Option<String>,
    pub add_participant_ids: Option<Vec<Uuid>>,
    pub remove_participant_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// POST /api/v1/messages/conversations
/// Direct conversations take exactly one other participant and reuse an
/// existing conversation for the pair (200 instead of 201).
pub async fn create_conversation(
    user: AuthedUser,
    state: web::Data<AppState>,
    req: web::Json<CreateConversationRequest>,
) -> Result<HttpResponse> {
    match req.conversation_type {
        ConversationType::Direct => {
            if req.participant_ids.len() != 1 {
                return Err(AppError::Validation(
                    "Direct conversations take exactly one other participant".to_string(),
                ));
            }

            let (conversation, reused) =
                ConversationService::create_direct(&state.db, user.id, req.participant_ids[0])
                    .await?;

            if reused {
                Ok(HttpResponse::Ok().json(conversation))
            } else {
                Ok(HttpResponse::Created().json(conversation))
            }
        }
        ConversationType::Group => {
            let name = req.name.as_deref().ok_or_else(|| {
                AppError::Validation("Group conversations must have a name".to_string())
            })?;

            let conversation =
                ConversationService::create_group(&state.db, user.id, name, &req.participant_ids)
                    .await?;

            Ok(HttpResponse::Created().json(conversation))
        }
    }
}

/// GET /api/v1/messages/conversations
pub async fn list_conversations(
    user: AuthedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let conversations = ConversationService::list_for_user(&state.db, user.id).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

/// GET /api/v1/messages/conversations/{id}
pub async fn get_conversation(
    user: AuthedUser,
    state: web::Data<AppState>,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let detail =
        ConversationService::get_with_participants(&state.db, *conversation_id, user.id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// PUT /api/v1/messages/conversations/{id}
/// Group-only: rename, add participants, remove participants. The whole
/// change set is atomic.
pub async fn update_conversation(
    user: AuthedUser,
    state: web::Data<AppState>,
    conversation_id: web::Path<Uuid>,
    req: web::Json<UpdateConversationRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let changes = GroupChanges {
        name: req.name,
        add_participant_ids: req.add_participant_ids.unwrap_or_default(),
        remove_participant_ids: req.remove_participant_ids.unwrap_or_default(),
    };

    let conversation =
        ConversationService::update_group(&state.db, *conversation_id, user.id, changes).await?;

    Ok(HttpResponse::Ok().json(conversation))
}

/// DELETE /api/v1/messages/conversations/{id}
/// Leaves the conversation; reports whether it was merely left or dissolved
/// entirely.
pub async fn leave_conversation(
    user: AuthedUser,
    state: web::Data<AppState>,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let outcome =
        ConversationService::leave_conversation(&state.db, *conversation_id, user.id).await?;

    let result = match outcome {
        LeaveOutcome::Left => "left",
        LeaveOutcome::Deleted => "deleted",
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({ "result": result })))
}

/// GET /api/v1/messages/conversations/{id}/messages
pub async fn list_messages(
    user: AuthedUser,
    state: web::Data<AppState>,
    conversation_id: web::Path<Uuid>,
    query: web::Query<ListMessagesQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let messages =
        ConversationService::list_messages(&state.db, *conversation_id, user.id, limit, offset)
            .await?;

    Ok(HttpResponse::Ok().json(messages))
}

/// POST /api/v1/messages/conversations/{id}/messages
pub async fn send_message(
    user: AuthedUser,
    state: web::Data<AppState>,
    conversation_id: web::Path<Uuid>,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    let message =
        ConversationService::send_message(&state.db, *conversation_id, user.id, &req.content)
            .await?;

    Ok(HttpResponse::Created().json(message))
}

/// POST /api/v1/messages/conversations/{id}/read
pub async fn mark_conversation_read(
    user: AuthedUser,
    state: web::Data<AppState>,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let updated = ConversationService::mark_read(&state.db, *conversation_id, user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}
