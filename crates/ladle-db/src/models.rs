/// Database row types — these map directly to SQLite rows.
/// Distinct from the ladle-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct RecipeRow {
    pub id: String,
    pub name: String,
    /// Canonical recipe content serialized as JSON.
    pub document: String,
    pub share_token: Option<String>,
    pub created_at: String,
}

pub struct MemberRow {
    pub recipe_id: String,
    pub user_id: String,
    pub permission: String,
}
