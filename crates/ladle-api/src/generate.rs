use axum::{Json, extract::Multipart, extract::State, response::IntoResponse};
use ladle_ai::GenerationRequest;
use ladle_types::api::GenerateResponse;
use tracing::debug;

use crate::auth::AppState;
use crate::error::ApiError;

/// Default servings when the form omits the field.
const DEFAULT_SERVINGS: u32 = 2;

/// `POST /process` — multipart fields `text`, `servings`, `cookNow`,
/// `allergies`, `utilities` (comma-separated) and any number of `image*`
/// parts. Builds a transient GenerationRequest, runs the adapter, and
/// answers `{"result": ...}` or `{"error": ...}`.
pub async fn process(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut req = GenerationRequest {
        servings: DEFAULT_SERVINGS,
        ..GenerationRequest::default()
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => req.text = field.text().await.map_err(bad_multipart)?,
            "servings" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                req.servings = match raw.trim().parse() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        return Err(ApiError::BadRequest(
                            "servings must be a positive integer".into(),
                        ));
                    }
                };
            }
            "cookNow" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                req.cook_now = matches!(raw.trim(), "true" | "1" | "on");
            }
            "allergies" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                req.allergies = csv_list(&raw);
            }
            "utilities" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                req.utilities = csv_list(&raw);
            }
            n if n.starts_with("image") => {
                req.images.push(field.bytes().await.map_err(bad_multipart)?);
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    if req.text.trim().is_empty() && req.images.is_empty() {
        return Err(ApiError::BadRequest(
            "provide ingredient text or at least one image".into(),
        ));
    }

    let recipe = state.ai.generate(&req).await?;
    Ok(Json(GenerateResponse { result: recipe }))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("malformed multipart body: {e}"))
}

fn csv_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_list_trims_and_drops_empties() {
        assert_eq!(
            csv_list(" peanuts, shellfish ,, "),
            vec!["peanuts".to_string(), "shellfish".to_string()]
        );
        assert!(csv_list("").is_empty());
    }
}
