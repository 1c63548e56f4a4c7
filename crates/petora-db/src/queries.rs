use std::collections::HashMap;

use crate::Database;
use crate::models::{CommentRow, GroupRow, JoinOutcome, LikeOutcome, ListingRow, MessageRow, PostRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

impl Database {
    // -- Groups --

    /// Inserts the group and seeds its owner as the first member.
    pub fn create_group(&self, group: &GroupRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO groups (id, name, description, image_url, owner_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    group.id,
                    group.name,
                    group.description,
                    group.image_url,
                    group.owner_id,
                    group.created_at
                ],
            )?;
            conn.execute(
                "INSERT OR IGNORE INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
                params![group.id, group.owner_id, group.created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_group(&self, id: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let Some(mut group) = query_group(conn, id)? else {
                return Ok(None);
            };
            group.member_ids = query_member_ids(conn, id)?;
            Ok(Some(group))
        })
    }

    /// All groups, newest first.
    pub fn list_groups(&self) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, image_url, owner_id, created_at
                 FROM groups
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let mut groups = stmt
                .query_map([], map_group)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            attach_members(conn, &mut groups)?;
            Ok(groups)
        })
    }

    /// Adds `user_id` to the member set. Returns `None` if the group does
    /// not exist. The reported count is the size of the set afterwards.
    pub fn join_group(&self, group_id: &str, user_id: &str, joined_at: &str) -> Result<Option<JoinOutcome>> {
        self.with_conn_mut(|conn| {
            let exists = conn
                .query_row("SELECT 1 FROM groups WHERE id = ?1", [group_id], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Ok(None);
            }

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
                params![group_id, user_id, joined_at],
            )?;

            let members: i64 = conn.query_row(
                "SELECT COUNT(*) FROM group_members WHERE group_id = ?1",
                [group_id],
                |row| row.get(0),
            )?;

            Ok(Some(JoinOutcome {
                joined: inserted == 1,
                members: members as usize,
            }))
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &MessageRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, group_id, user_name, user_id, body, avatar, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id,
                    message.group_id,
                    message.user_name,
                    message.user_id,
                    message.body,
                    message.avatar,
                    message.created_at
                ],
            )?;
            Ok(())
        })
    }

    /// Oldest first; insertion order breaks timestamp ties.
    pub fn get_group_messages(&self, group_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, group_id, user_name, user_id, body, avatar, created_at
                 FROM messages
                 WHERE group_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([group_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        group_id: row.get(1)?,
                        user_name: row.get(2)?,
                        user_id: row.get(3)?,
                        body: row.get(4)?,
                        avatar: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Posts --

    pub fn create_post(&self, post: &PostRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author, author_id, author_avatar, content, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    post.id,
                    post.author,
                    post.author_id,
                    post.author_avatar,
                    post.content,
                    post.image_url,
                    post.created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let post = conn
                .query_row(
                    "SELECT id, author, author_id, author_avatar, content, image_url, created_at
                     FROM posts WHERE id = ?1",
                    [id],
                    map_post,
                )
                .optional()?;

            let Some(post) = post else {
                return Ok(None);
            };
            let mut posts = [post];
            attach_engagement(conn, &mut posts)?;
            let [post] = posts;
            Ok(Some(post))
        })
    }

    /// Feed page, newest first. `before` is an exclusive created_at cursor.
    pub fn list_posts(&self, limit: u32, before: Option<&str>) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author, author_id, author_avatar, content, image_url, created_at
                 FROM posts
                 WHERE (?1 IS NULL OR created_at < ?1)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let mut posts = stmt
                .query_map(params![before, limit], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            attach_engagement(conn, &mut posts)?;
            Ok(posts)
        })
    }

    /// Removes the user's like if present, adds it otherwise.
    /// Returns `None` if the post does not exist.
    pub fn toggle_like(&self, post_id: &str, user_id: &str, at: &str) -> Result<Option<LikeOutcome>> {
        self.with_conn_mut(|conn| {
            if !post_exists(conn, post_id)? {
                return Ok(None);
            }

            let removed = conn.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
            )?;
            if removed == 0 {
                conn.execute(
                    "INSERT INTO post_likes (post_id, user_id, liked_at) VALUES (?1, ?2, ?3)",
                    params![post_id, user_id, at],
                )?;
            }

            let likes: i64 = conn.query_row(
                "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?;

            Ok(Some(LikeOutcome {
                liked: removed == 0,
                likes: likes as usize,
            }))
        })
    }

    /// Appends a comment. Returns false if the post does not exist.
    pub fn add_comment(&self, comment: &CommentRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            if !post_exists(conn, &comment.post_id)? {
                return Ok(false);
            }

            conn.execute(
                "INSERT INTO post_comments (post_id, comment_id, author, author_id, avatar, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    comment.post_id,
                    comment.comment_id,
                    comment.author,
                    comment.author_id,
                    comment.avatar,
                    comment.body,
                    comment.created_at
                ],
            )?;
            Ok(true)
        })
    }

    // -- Listings --

    pub fn create_listing(&self, listing: &ListingRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO pets (id, name, breed, image_url, price, listing_type, owner_name, owner_email, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    listing.id,
                    listing.name,
                    listing.breed,
                    listing.image_url,
                    listing.price,
                    listing.listing_type,
                    listing.owner_name,
                    listing.owner_email,
                    listing.created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_listing(&self, id: &str) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, breed, image_url, price, listing_type, owner_name, owner_email, created_at
                     FROM pets WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(ListingRow {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            breed: row.get(2)?,
                            image_url: row.get(3)?,
                            price: row.get(4)?,
                            listing_type: row.get(5)?,
                            owner_name: row.get(6)?,
                            owner_email: row.get(7)?,
                            created_at: row.get(8)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }
}

fn map_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        owner_id: row.get(4)?,
        created_at: row.get(5)?,
        member_ids: Vec::new(),
    })
}

fn map_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author: row.get(1)?,
        author_id: row.get(2)?,
        author_avatar: row.get(3)?,
        content: row.get(4)?,
        image_url: row.get(5)?,
        created_at: row.get(6)?,
        likes: Vec::new(),
        comments: Vec::new(),
    })
}

fn query_group(conn: &Connection, id: &str) -> Result<Option<GroupRow>> {
    let row = conn
        .query_row(
            "SELECT id, name, description, image_url, owner_id, created_at FROM groups WHERE id = ?1",
            [id],
            map_group,
        )
        .optional()?;
    Ok(row)
}

fn query_member_ids(conn: &Connection, group_id: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT user_id FROM group_members WHERE group_id = ?1 ORDER BY rowid ASC")?;
    let ids = stmt
        .query_map([group_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Member ids for a batch of groups in one query, join order per group.
fn attach_members(conn: &Connection, groups: &mut [GroupRow]) -> Result<()> {
    if groups.is_empty() {
        return Ok(());
    }

    let placeholders: Vec<String> = (1..=groups.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT group_id, user_id FROM group_members WHERE group_id IN ({}) ORDER BY rowid ASC",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(groups.iter().map(|g| g.id.as_str())), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut members: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        let (group_id, user_id) = row?;
        members.entry(group_id).or_default().push(user_id);
    }

    for group in groups.iter_mut() {
        group.member_ids = members.remove(&group.id).unwrap_or_default();
    }
    Ok(())
}

fn post_exists(conn: &Connection, post_id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM posts WHERE id = ?1", [post_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Batch-fetch likes and comments for a page of posts (no N+1).
fn attach_engagement(conn: &Connection, posts: &mut [PostRow]) -> Result<()> {
    if posts.is_empty() {
        return Ok(());
    }

    let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let placeholders = placeholders.join(", ");

    let mut likes: HashMap<String, Vec<String>> = HashMap::new();
    {
        let sql = format!(
            "SELECT post_id, user_id FROM post_likes WHERE post_id IN ({}) ORDER BY rowid ASC",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (post_id, user_id) = row?;
            likes.entry(post_id).or_default().push(user_id);
        }
    }

    let mut comments: HashMap<String, Vec<CommentRow>> = HashMap::new();
    {
        let sql = format!(
            "SELECT comment_id, post_id, author, author_id, avatar, body, created_at
             FROM post_comments
             WHERE post_id IN ({})
             ORDER BY created_at ASC, seq ASC",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok(CommentRow {
                comment_id: row.get(0)?,
                post_id: row.get(1)?,
                author: row.get(2)?,
                author_id: row.get(3)?,
                avatar: row.get(4)?,
                body: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        for row in rows {
            let comment = row?;
            comments.entry(comment.post_id.clone()).or_default().push(comment);
        }
    }

    for post in posts.iter_mut() {
        post.likes = likes.remove(&post.id).unwrap_or_default();
        post.comments = comments.remove(&post.id).unwrap_or_default();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, owner: &str) -> GroupRow {
        GroupRow {
            id: id.into(),
            name: "Corgi Club".into(),
            description: "Short legs, big hearts".into(),
            image_url: "https://img.example/corgi.png".into(),
            owner_id: owner.into(),
            created_at: "2024-05-01T12:00:00.000Z".into(),
            member_ids: Vec::new(),
        }
    }

    fn post(id: &str, created_at: &str) -> PostRow {
        PostRow {
            id: id.into(),
            author: "Asha".into(),
            author_id: "author-1".into(),
            author_avatar: String::new(),
            content: "Meet Biscuit".into(),
            image_url: None,
            created_at: created_at.into(),
            likes: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn comment(post_id: &str, text: &str, created_at: &str) -> CommentRow {
        CommentRow {
            comment_id: "c1714564800000".into(),
            post_id: post_id.into(),
            author: "Ravi".into(),
            author_id: "u2".into(),
            avatar: String::new(),
            body: text.into(),
            created_at: created_at.into(),
        }
    }

    fn message(id: &str, group_id: &str, body: &str, created_at: &str) -> MessageRow {
        MessageRow {
            id: id.into(),
            group_id: group_id.into(),
            user_name: "Asha".into(),
            user_id: "u1".into(),
            body: body.into(),
            avatar: String::new(),
            created_at: created_at.into(),
        }
    }

    #[test]
    fn owner_is_first_member() {
        let db = Database::open_in_memory().unwrap();
        db.create_group(&group("g1", "owner")).unwrap();

        let g = db.get_group("g1").unwrap().unwrap();
        assert_eq!(g.member_ids, vec!["owner".to_string()]);
    }

    #[test]
    fn listed_groups_carry_their_own_members() {
        let db = Database::open_in_memory().unwrap();
        db.create_group(&group("g1", "owner-a")).unwrap();
        let mut second = group("g2", "owner-b");
        second.created_at = "2024-05-02T12:00:00.000Z".into();
        db.create_group(&second).unwrap();
        db.join_group("g1", "u1", "2024-05-03T12:00:00.000Z").unwrap();
        db.join_group("g2", "u2", "2024-05-03T12:01:00.000Z").unwrap();
        db.join_group("g1", "u3", "2024-05-03T12:02:00.000Z").unwrap();

        let groups = db.list_groups().unwrap();
        let ids: Vec<_> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["g2", "g1"]);
        assert_eq!(groups[0].member_ids, vec!["owner-b", "u2"]);
        assert_eq!(groups[1].member_ids, vec!["owner-a", "u1", "u3"]);
    }

    #[test]
    fn joining_twice_keeps_one_membership_and_count() {
        let db = Database::open_in_memory().unwrap();
        db.create_group(&group("g1", "owner")).unwrap();

        let first = db.join_group("g1", "u1", "2024-05-01T12:01:00.000Z").unwrap().unwrap();
        let second = db.join_group("g1", "u1", "2024-05-01T12:02:00.000Z").unwrap().unwrap();

        assert_eq!(first, JoinOutcome { joined: true, members: 2 });
        assert_eq!(second, JoinOutcome { joined: false, members: 2 });

        let g = db.get_group("g1").unwrap().unwrap();
        assert_eq!(g.member_ids.iter().filter(|m| *m == "u1").count(), 1);
        assert_eq!(g.member_ids.len(), 2);
    }

    #[test]
    fn join_missing_group_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.join_group("nope", "u1", "2024-05-01T12:00:00.000Z").unwrap().is_none());
    }

    #[test]
    fn messages_come_back_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message(&message("m2", "g1", "second", "2024-05-01T12:00:02.000Z")).unwrap();
        db.insert_message(&message("m1", "g1", "first", "2024-05-01T12:00:01.000Z")).unwrap();
        db.insert_message(&message("m3", "g1", "tie", "2024-05-01T12:00:02.000Z")).unwrap();
        db.insert_message(&message("other", "g2", "elsewhere", "2024-05-01T12:00:00.000Z")).unwrap();

        let bodies: Vec<String> = db
            .get_group_messages("g1")
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["first", "second", "tie"]);
    }

    #[test]
    fn like_toggle_twice_restores_state() {
        let db = Database::open_in_memory().unwrap();
        db.create_post(&post("p1", "2024-05-01T12:00:00.000Z")).unwrap();

        let on = db.toggle_like("p1", "u1", "2024-05-01T12:00:01.000Z").unwrap().unwrap();
        assert_eq!(on, LikeOutcome { liked: true, likes: 1 });

        let off = db.toggle_like("p1", "u1", "2024-05-01T12:00:02.000Z").unwrap().unwrap();
        assert_eq!(off, LikeOutcome { liked: false, likes: 0 });

        assert!(db.get_post("p1").unwrap().unwrap().likes.is_empty());
    }

    #[test]
    fn likes_from_different_users_accumulate_in_order() {
        let db = Database::open_in_memory().unwrap();
        db.create_post(&post("p1", "2024-05-01T12:00:00.000Z")).unwrap();
        db.toggle_like("p1", "u2", "2024-05-01T12:00:01.000Z").unwrap();
        db.toggle_like("p1", "u1", "2024-05-01T12:00:02.000Z").unwrap();

        assert_eq!(db.get_post("p1").unwrap().unwrap().likes, vec!["u2", "u1"]);
    }

    #[test]
    fn like_on_missing_post_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.toggle_like("nope", "u1", "2024-05-01T12:00:00.000Z").unwrap().is_none());
    }

    #[test]
    fn comments_append_in_creation_order() {
        let db = Database::open_in_memory().unwrap();
        db.create_post(&post("p1", "2024-05-01T12:00:00.000Z")).unwrap();

        assert!(db.add_comment(&comment("p1", "cute!", "2024-05-01T12:00:05.000Z")).unwrap());
        assert!(db.add_comment(&comment("p1", "so fluffy", "2024-05-01T12:00:09.000Z")).unwrap());

        let p = db.get_post("p1").unwrap().unwrap();
        assert_eq!(p.comments.len(), 2);
        assert_eq!(p.comments.last().unwrap().body, "so fluffy");
    }

    #[test]
    fn comment_on_missing_post_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.add_comment(&comment("nope", "hi", "2024-05-01T12:00:00.000Z")).unwrap());
    }

    #[test]
    fn feed_pages_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.create_post(&post("p1", "2024-05-01T12:00:00.000Z")).unwrap();
        db.create_post(&post("p2", "2024-05-02T12:00:00.000Z")).unwrap();
        db.create_post(&post("p3", "2024-05-03T12:00:00.000Z")).unwrap();
        db.toggle_like("p2", "u1", "2024-05-03T13:00:00.000Z").unwrap();

        let page = db.list_posts(2, None).unwrap();
        let ids: Vec<&str> = page.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p2"]);
        assert_eq!(page[1].likes, vec!["u1"]);

        let older = db.list_posts(2, Some(&page[1].created_at)).unwrap();
        assert_eq!(older.len(), 1);
        assert_eq!(older[0].id, "p1");
    }

    #[test]
    fn listing_round_trips_optional_fields() {
        let db = Database::open_in_memory().unwrap();
        db.create_listing(&ListingRow {
            id: "pet1".into(),
            name: "Biscuit".into(),
            breed: "Beagle".into(),
            image_url: String::new(),
            price: None,
            listing_type: "Adoption".into(),
            owner_name: None,
            owner_email: Some("owner@example.com".into()),
            created_at: "2024-05-01T12:00:00.000Z".into(),
        })
        .unwrap();

        let row = db.get_listing("pet1").unwrap().unwrap();
        assert_eq!(row.price, None);
        assert_eq!(row.owner_email.as_deref(), Some("owner@example.com"));
        assert!(db.get_listing("pet2").unwrap().is_none());
    }
}
