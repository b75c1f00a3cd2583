use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::RngCore;
use tracing::warn;
use uuid::Uuid;

use ladle_db::models::{MemberRow, RecipeRow};
use ladle_types::api::{
    Claims, RecipeListResponse, RecipeResponse, SaveRecipeRequest, ShareLinkRequest,
    ShareLinkResponse, SharedRecipeResponse, ShareRequest,
};
use ladle_types::models::{Permission, Recipe, RecipeMember, StoredRecipe};

use crate::auth::AppState;
use crate::error::ApiError;

/// Merged "absent or insufficient permissions" message for mutations.
const NOT_FOUND_OR_FORBIDDEN: &str = "recipe not found or insufficient permissions";

/// `GET /recipes/{id}` — members only. Absent recipes and recipes the
/// caller is not a member of produce the identical NotFound.
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let rid = parse_recipe_id(&id)?.to_string();

    let (row, members) = tokio::task::spawn_blocking(move || {
        let row = db.db.get_recipe_for_member(&rid, &user_id)?;
        let members = match &row {
            Some(r) => db.db.get_members(&r.id)?,
            None => vec![],
        };
        anyhow::Ok((row, members))
    })
    .await
    .map_err(anyhow::Error::from)??;

    let row = row.ok_or(ApiError::NotFound(ApiError::RECIPE_NOT_FOUND))?;
    Ok(Json(RecipeResponse {
        recipe: stored_from_row(row, members)?,
    }))
}

/// `DELETE /recipes/{id}` — requires the `owner` permission; anything less
/// is reported as not found.
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let rid = parse_recipe_id(&id)?.to_string();

    let deleted = tokio::task::spawn_blocking(move || db.db.delete_recipe_owned(&rid, &user_id))
        .await
        .map_err(anyhow::Error::from)??;

    if !deleted {
        return Err(ApiError::NotFound(NOT_FOUND_OR_FORBIDDEN));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

/// `POST /recipes/save` — with a recipeId, idempotently add the caller as a
/// viewer of that recipe; without one, create a new recipe owned by the
/// caller with a fresh share token.
pub async fn save_recipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SaveRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();

    match req.recipe_id {
        Some(recipe_id) => {
            let db = state.clone();
            let rid = recipe_id.to_string();

            let (row, members) = tokio::task::spawn_blocking(move || {
                let row = db.db.get_recipe_by_id(&rid)?;
                if row.is_some() {
                    db.db.add_member(&rid, &user_id, Permission::Viewer.as_str())?;
                }
                let members = match &row {
                    Some(r) => db.db.get_members(&r.id)?,
                    None => vec![],
                };
                anyhow::Ok((row, members))
            })
            .await
            .map_err(anyhow::Error::from)??;

            let row = row.ok_or(ApiError::NotFound(ApiError::RECIPE_NOT_FOUND))?;
            Ok(Json(RecipeResponse {
                recipe: stored_from_row(row, members)?,
            }))
        }
        None => {
            let id = Uuid::new_v4();
            let share_token = new_share_token();
            let document = serde_json::to_string(&req.recipe)
                .map_err(|e| ApiError::BadRequest(format!("invalid recipe payload: {e}")))?;

            let db = state.clone();
            let rid = id.to_string();
            let name = req.recipe.name.clone();
            let token = share_token.clone();

            let (row, members) = tokio::task::spawn_blocking(move || {
                db.db.insert_recipe(&rid, &name, &document, &token, &user_id)?;
                let row = db.db.get_recipe_by_id(&rid)?;
                let members = db.db.get_members(&rid)?;
                anyhow::Ok((row, members))
            })
            .await
            .map_err(anyhow::Error::from)??;

            let row = row.ok_or_else(|| anyhow::anyhow!("recipe vanished after insert"))?;
            Ok(Json(RecipeResponse {
                recipe: stored_from_row(row, members)?,
            }))
        }
    }
}

/// `GET /recipes/user` — everything the caller is a member of, newest first.
pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_recipes_for_user(&user_id)?;
        let with_members = rows
            .into_iter()
            .map(|row| {
                let members = db.db.get_members(&row.id)?;
                anyhow::Ok((row, members))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        anyhow::Ok(with_members)
    })
    .await
    .map_err(anyhow::Error::from)??;

    let recipes = rows
        .into_iter()
        .map(|(row, members)| stored_from_row(row, members))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(RecipeListResponse { recipes }))
}

/// `POST /recipes/share` — owner-only collaborator addition by email.
/// Adding an existing member is a silent no-op.
pub async fn share_recipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ShareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let caller_id = claims.sub.to_string();
    let rid = req.recipe_id.to_string();
    let target_email = req.user_email.clone();
    let permission = req.permissions.unwrap_or(Permission::Viewer);

    let outcome = tokio::task::spawn_blocking(move || {
        let caller = db.db.member_permission(&rid, &caller_id)?;
        if caller.as_deref() != Some(Permission::Owner.as_str()) {
            return anyhow::Ok(ShareOutcome::NotOwner);
        }

        let Some(target) = db.db.get_user_by_email(&target_email)? else {
            return anyhow::Ok(ShareOutcome::UnknownUser);
        };

        db.db.add_member(&rid, &target.id, permission.as_str())?;
        let row = db.db.get_recipe_by_id(&rid)?;
        let members = db.db.get_members(&rid)?;
        anyhow::Ok(ShareOutcome::Shared(row, members))
    })
    .await
    .map_err(anyhow::Error::from)??;

    match outcome {
        ShareOutcome::NotOwner => Err(ApiError::NotFound(NOT_FOUND_OR_FORBIDDEN)),
        ShareOutcome::UnknownUser => Err(ApiError::NotFound(ApiError::USER_NOT_FOUND)),
        ShareOutcome::Shared(row, members) => {
            let row = row.ok_or_else(|| anyhow::anyhow!("recipe vanished during share"))?;
            Ok(Json(RecipeResponse {
                recipe: stored_from_row(row, members)?,
            }))
        }
    }
}

enum ShareOutcome {
    NotOwner,
    UnknownUser,
    Shared(Option<RecipeRow>, Vec<MemberRow>),
}

/// `POST /recipes/share/link` — any member may mint the share URL.
pub async fn share_link(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ShareLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let rid = req.recipe_id.to_string();

    let row = tokio::task::spawn_blocking(move || db.db.get_recipe_for_member(&rid, &user_id))
        .await
        .map_err(anyhow::Error::from)??
        .ok_or(ApiError::NotFound(ApiError::RECIPE_NOT_FOUND))?;

    let token = row
        .share_token
        .ok_or_else(|| anyhow::anyhow!("recipe {} has no share token", row.id))?;

    Ok(Json(ShareLinkResponse {
        share_url: format!("/recipes/shared/{token}"),
    }))
}

/// `GET /recipes/shared/{token}` — public, read-only, member list and share
/// token stripped from the response.
pub async fn get_shared_recipe(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();

    let row = tokio::task::spawn_blocking(move || db.db.get_recipe_by_share_token(&token))
        .await
        .map_err(anyhow::Error::from)??
        .ok_or(ApiError::NotFound(ApiError::SHARE_NOT_FOUND))?;

    let stored = stored_from_row(row, vec![])?;
    Ok((
        StatusCode::OK,
        Json(SharedRecipeResponse {
            recipe: stored.into(),
        }),
    ))
}

/// Path segments are extracted as strings so a malformed id yields the
/// same JSON error body as every other 400.
fn parse_recipe_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("invalid recipe id".into()))
}

/// Opaque 128-bit share token, hex-encoded.
fn new_share_token() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Assemble the API-facing recipe from its row and member rows. Corrupt
/// stored data is an internal error, never a panic.
fn stored_from_row(row: RecipeRow, member_rows: Vec<MemberRow>) -> Result<StoredRecipe, ApiError> {
    let recipe: Recipe = serde_json::from_str(&row.document)
        .map_err(|e| anyhow::anyhow!("corrupt recipe document '{}': {e}", row.id))?;

    let id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt recipe id '{}': {e}", row.id))?;

    let members = member_rows
        .into_iter()
        .filter_map(|m| {
            let user_id = m.user_id.parse().ok()?;
            let permission = m.permission.parse().ok()?;
            Some(RecipeMember {
                user_id,
                permission,
            })
        })
        .collect();

    let created_at = row
        .created_at
        .parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on recipe '{}': {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        });

    Ok(StoredRecipe {
        id,
        recipe,
        members,
        share_token: row.share_token,
        created_at,
    })
}
