// OpenAI models listing
use axum::{extract::State, response::IntoResponse, Json};

use crate::proxy::mappers::openai::ModelList;
use crate::proxy::server::AppState;

/// Fixed creation timestamp reported for every listed model.
const MODEL_CREATED: i64 = 1_706_745_600;

pub async fn handle_list_models(State(state): State<AppState>) -> impl IntoResponse {
    Json(ModelList::from_ids(state.models.iter().cloned(), MODEL_CREATED))
}
