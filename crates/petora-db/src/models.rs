/// Database row types. Timestamps stay as the stored RFC 3339 text;
/// the API layer owns parsing them into wire models.

pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub owner_id: String,
    pub created_at: String,
    /// Filled from `group_members` in join order.
    pub member_ids: Vec<String>,
}

pub struct MessageRow {
    pub id: String,
    pub group_id: String,
    pub user_name: String,
    pub user_id: String,
    pub body: String,
    pub avatar: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub author: String,
    pub author_id: String,
    pub author_avatar: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: String,
    pub likes: Vec<String>,
    pub comments: Vec<CommentRow>,
}

pub struct CommentRow {
    pub comment_id: String,
    pub post_id: String,
    pub author: String,
    pub author_id: String,
    pub avatar: String,
    pub body: String,
    pub created_at: String,
}

pub struct ListingRow {
    pub id: String,
    pub name: String,
    pub breed: String,
    pub image_url: String,
    pub price: Option<i64>,
    pub listing_type: String,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// False when the user was already a member.
    pub joined: bool,
    pub members: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: usize,
}
