use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            -- Canonical recipe content (ingredients, steps, nutrition) as JSON
            document    TEXT NOT NULL,
            share_token TEXT UNIQUE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_name ON recipes(name);

        CREATE TABLE IF NOT EXISTS recipe_members (
            recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            permission  TEXT NOT NULL DEFAULT 'viewer'
                        CHECK (permission IN ('owner', 'editor', 'viewer')),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(recipe_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_recipe_members_user
            ON recipe_members(user_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
