use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Permission, Recipe, SharedRecipe, StoredRecipe};

// -- JWT Claims --

/// JWT claims shared by the auth handlers and the bearer-token
/// middleware. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

// -- Recipes --

/// Body of `POST /recipes/save`. With `recipe_id` the caller is added
/// as a viewer to an existing recipe; without it a new recipe is
/// created from the flattened content.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecipeRequest {
    pub recipe_id: Option<Uuid>,
    #[serde(flatten)]
    pub recipe: Recipe,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub recipe_id: Uuid,
    pub user_email: String,
    pub permissions: Option<Permission>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinkRequest {
    pub recipe_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinkResponse {
    pub share_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub recipe: StoredRecipe,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SharedRecipeResponse {
    pub recipe: SharedRecipe,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeListResponse {
    pub recipes: Vec<StoredRecipe>,
}

// -- Generation --

/// Body of a successful `POST /process`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub result: Recipe,
}
