//! Row → wire model conversion. Stored text that fails to parse is an
//! internal error, never silently defaulted.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use petora_db::models::{CommentRow, GroupRow, ListingRow, MessageRow, PostRow};
use petora_types::models::{ChatMessage, Comment, Group, Listing, ListingType, Post};
use petora_types::timestamp;

fn uuid(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt {} '{}'", what, raw))
}

fn ts(raw: &str, owner: &str) -> Result<DateTime<Utc>> {
    timestamp::parse(raw).with_context(|| format!("corrupt created_at '{}' on {}", raw, owner))
}

pub fn group(row: GroupRow) -> Result<Group> {
    Ok(Group {
        id: uuid(&row.id, "group id")?,
        created_at: ts(&row.created_at, &row.id)?,
        name: row.name,
        description: row.description,
        image_url: row.image_url,
        members: row.member_ids.len(),
        member_ids: row.member_ids,
        owner_id: row.owner_id,
    })
}

pub fn message(row: MessageRow) -> Result<ChatMessage> {
    Ok(ChatMessage {
        id: uuid(&row.id, "message id")?,
        group_id: uuid(&row.group_id, "message group_id")?,
        created_at: ts(&row.created_at, &row.id)?,
        user: row.user_name,
        user_id: row.user_id,
        message: row.body,
        avatar: row.avatar,
    })
}

pub fn comment(row: CommentRow) -> Result<Comment> {
    Ok(Comment {
        created_at: ts(&row.created_at, &row.comment_id)?,
        id: row.comment_id,
        author: row.author,
        author_id: row.author_id,
        avatar: row.avatar,
        comment: row.body,
    })
}

pub fn post(row: PostRow) -> Result<Post> {
    Ok(Post {
        id: uuid(&row.id, "post id")?,
        created_at: ts(&row.created_at, &row.id)?,
        author: row.author,
        author_id: row.author_id,
        author_avatar: row.author_avatar,
        content: row.content,
        image_url: row.image_url,
        likes: row.likes,
        comments: row.comments.into_iter().map(comment).collect::<Result<_>>()?,
    })
}

pub fn listing(row: ListingRow) -> Result<Listing> {
    let listing_type = ListingType::parse(&row.listing_type)
        .ok_or_else(|| anyhow!("corrupt listing_type '{}' on {}", row.listing_type, row.id))?;
    let price = row
        .price
        .map(u64::try_from)
        .transpose()
        .with_context(|| format!("negative price on {}", row.id))?;

    Ok(Listing {
        id: uuid(&row.id, "listing id")?,
        created_at: ts(&row.created_at, &row.id)?,
        name: row.name,
        breed: row.breed,
        image_url: row.image_url,
        price,
        listing_type,
        owner_name: row.owner_name,
        owner_email: row.owner_email,
    })
}
