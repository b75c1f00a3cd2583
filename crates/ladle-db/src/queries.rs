use crate::Database;
use crate::models::{MemberRow, RecipeRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Recipes --

    /// Insert a recipe together with its initial owner. The two inserts run
    /// in one transaction so a persisted recipe always has an owner.
    pub fn insert_recipe(
        &self,
        id: &str,
        name: &str,
        document: &str,
        share_token: &str,
        owner_id: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO recipes (id, name, document, share_token) VALUES (?1, ?2, ?3, ?4)",
                (id, name, document, share_token),
            )?;
            tx.execute(
                "INSERT INTO recipe_members (recipe_id, user_id, permission) VALUES (?1, ?2, 'owner')",
                (id, owner_id),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_recipe_by_id(&self, id: &str) -> Result<Option<RecipeRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, document, share_token, created_at FROM recipes WHERE id = ?1",
                [id],
                recipe_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// The recipe only if `user_id` is in its member set. Non-members get
    /// `None`, indistinguishable from an absent recipe.
    pub fn get_recipe_for_member(&self, recipe_id: &str, user_id: &str) -> Result<Option<RecipeRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT r.id, r.name, r.document, r.share_token, r.created_at
                 FROM recipes r
                 JOIN recipe_members m ON m.recipe_id = r.id
                 WHERE r.id = ?1 AND m.user_id = ?2",
                (recipe_id, user_id),
                recipe_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn get_recipe_by_share_token(&self, token: &str) -> Result<Option<RecipeRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, document, share_token, created_at
                 FROM recipes WHERE share_token = ?1",
                [token],
                recipe_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Delete only when `user_id` holds the `owner` permission. Returns
    /// whether a row was deleted; a viewer/editor or a non-member sees the
    /// same `false` as an absent recipe.
    pub fn delete_recipe_owned(&self, recipe_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM recipes
                 WHERE id = ?1 AND EXISTS (
                     SELECT 1 FROM recipe_members
                     WHERE recipe_id = ?1 AND user_id = ?2 AND permission = 'owner'
                 )",
                (recipe_id, user_id),
            )?;
            Ok(deleted > 0)
        })
    }

    /// All recipes `user_id` is a member of, newest first.
    pub fn list_recipes_for_user(&self, user_id: &str) -> Result<Vec<RecipeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.name, r.document, r.share_token, r.created_at
                 FROM recipes r
                 JOIN recipe_members m ON m.recipe_id = r.id
                 WHERE m.user_id = ?1
                 ORDER BY r.created_at DESC, r.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], recipe_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Members --

    /// Add a member. `INSERT OR IGNORE` against the UNIQUE(recipe_id, user_id)
    /// constraint makes repeated adds a no-op: an existing member keeps their
    /// original permission. Returns whether a new row was inserted.
    pub fn add_member(&self, recipe_id: &str, user_id: &str, permission: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO recipe_members (recipe_id, user_id, permission)
                 VALUES (?1, ?2, ?3)",
                (recipe_id, user_id, permission),
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn get_members(&self, recipe_id: &str) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT recipe_id, user_id, permission
                 FROM recipe_members WHERE recipe_id = ?1",
            )?;
            let rows = stmt
                .query_map([recipe_id], |row| {
                    Ok(MemberRow {
                        recipe_id: row.get(0)?,
                        user_id: row.get(1)?,
                        permission: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn member_permission(&self, recipe_id: &str, user_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT permission FROM recipe_members WHERE recipe_id = ?1 AND user_id = ?2",
                (recipe_id, user_id),
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })
    }
}

fn recipe_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        name: row.get(1)?,
        document: row.get(2)?,
        share_token: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is a compile-time constant at every call site, never user input.
    let sql = format!("SELECT id, email, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_users() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice@example.com", "hash1").unwrap();
        db.create_user("u2", "bob@example.com", "hash2").unwrap();
        db
    }

    fn sample_document() -> &'static str {
        r#"{"name":"Pancakes","ingredients":[],"steps":[],"nutrition":{"calories":300.0,"protein":9.0,"fat":11.0,"carbohydrates":40.0}}"#
    }

    #[test]
    fn create_and_look_up_user() {
        let db = db_with_users();
        let user = db.get_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
        assert_eq!(db.get_user_by_id("u2").unwrap().unwrap().email, "bob@example.com");
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = db_with_users();
        assert!(db.create_user("u3", "alice@example.com", "hash3").is_err());
    }

    #[test]
    fn insert_creates_owner_membership() {
        let db = db_with_users();
        db.insert_recipe("r1", "Pancakes", sample_document(), "tok1", "u1")
            .unwrap();

        assert_eq!(
            db.member_permission("r1", "u1").unwrap().as_deref(),
            Some("owner")
        );
        let recipe = db.get_recipe_for_member("r1", "u1").unwrap().unwrap();
        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.share_token.as_deref(), Some("tok1"));
    }

    #[test]
    fn non_member_sees_nothing() {
        let db = db_with_users();
        db.insert_recipe("r1", "Pancakes", sample_document(), "tok1", "u1")
            .unwrap();

        assert!(db.get_recipe_for_member("r1", "u2").unwrap().is_none());
        assert!(db.get_recipe_for_member("missing", "u1").unwrap().is_none());
    }

    #[test]
    fn add_member_is_idempotent() {
        let db = db_with_users();
        db.insert_recipe("r1", "Pancakes", sample_document(), "tok1", "u1")
            .unwrap();

        assert!(db.add_member("r1", "u2", "viewer").unwrap());
        assert!(!db.add_member("r1", "u2", "viewer").unwrap());
        // Re-adding with a different permission does not escalate
        assert!(!db.add_member("r1", "u2", "owner").unwrap());

        let members = db.get_members("r1").unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(
            db.member_permission("r1", "u2").unwrap().as_deref(),
            Some("viewer")
        );
    }

    #[test]
    fn delete_requires_owner_permission() {
        let db = db_with_users();
        db.insert_recipe("r1", "Pancakes", sample_document(), "tok1", "u1")
            .unwrap();
        db.add_member("r1", "u2", "viewer").unwrap();

        assert!(!db.delete_recipe_owned("r1", "u2").unwrap());
        assert!(!db.delete_recipe_owned("missing", "u1").unwrap());
        assert!(db.delete_recipe_owned("r1", "u1").unwrap());
        assert!(db.get_recipe_by_id("r1").unwrap().is_none());
        // Memberships cascade with the recipe
        assert!(db.get_members("r1").unwrap().is_empty());
    }

    #[test]
    fn list_is_newest_first() {
        let db = db_with_users();
        db.insert_recipe("r1", "First", sample_document(), "tok1", "u1")
            .unwrap();
        db.insert_recipe("r2", "Second", sample_document(), "tok2", "u1")
            .unwrap();
        db.insert_recipe("r3", "Other", sample_document(), "tok3", "u2")
            .unwrap();

        let recipes = db.list_recipes_for_user("u1").unwrap();
        let names: Vec<&str> = recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[test]
    fn share_token_lookup() {
        let db = db_with_users();
        db.insert_recipe("r1", "Pancakes", sample_document(), "tok1", "u1")
            .unwrap();

        let recipe = db.get_recipe_by_share_token("tok1").unwrap().unwrap();
        assert_eq!(recipe.id, "r1");
        assert!(db.get_recipe_by_share_token("unknown").unwrap().is_none());
    }

    #[test]
    fn share_token_is_unique() {
        let db = db_with_users();
        db.insert_recipe("r1", "Pancakes", sample_document(), "tok1", "u1")
            .unwrap();
        assert!(
            db.insert_recipe("r2", "Waffles", sample_document(), "tok1", "u1")
                .is_err()
        );
    }
}
