use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (groups, messages, posts, pets)");
        conn.execute_batch(
            "
            CREATE TABLE groups (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                image_url   TEXT NOT NULL DEFAULT '',
                owner_id    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            -- Member set; the group's member count is its size.
            CREATE TABLE group_members (
                group_id    TEXT NOT NULL REFERENCES groups(id),
                user_id     TEXT NOT NULL,
                joined_at   TEXT NOT NULL,
                PRIMARY KEY (group_id, user_id)
            );

            -- No foreign key: sending does not check that the group exists.
            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                group_id    TEXT NOT NULL,
                user_name   TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                body        TEXT NOT NULL,
                avatar      TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_messages_group
                ON messages(group_id, created_at);

            CREATE TABLE posts (
                id              TEXT PRIMARY KEY,
                author          TEXT NOT NULL,
                author_id       TEXT NOT NULL,
                author_avatar   TEXT NOT NULL DEFAULT '',
                content         TEXT NOT NULL,
                image_url       TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_posts_created
                ON posts(created_at);

            CREATE TABLE post_likes (
                post_id     TEXT NOT NULL REFERENCES posts(id),
                user_id     TEXT NOT NULL,
                liked_at    TEXT NOT NULL,
                UNIQUE(post_id, user_id)
            );

            CREATE TABLE post_comments (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id     TEXT NOT NULL REFERENCES posts(id),
                comment_id  TEXT NOT NULL,
                author      TEXT NOT NULL,
                author_id   TEXT NOT NULL,
                avatar      TEXT NOT NULL DEFAULT '',
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_post_comments_post
                ON post_comments(post_id, created_at);

            CREATE TABLE pets (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                breed           TEXT NOT NULL DEFAULT '',
                image_url       TEXT NOT NULL DEFAULT '',
                price           INTEGER,
                listing_type    TEXT NOT NULL CHECK (listing_type IN ('Sale', 'Adoption')),
                owner_name      TEXT,
                owner_email     TEXT,
                created_at      TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_twice_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
