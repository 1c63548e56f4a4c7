//! One post in the community feed: optimistic like, comment submit, share.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use petora_types::api::{CommentDraft, CommentResponse, LikeResponse};
use petora_types::models::{Comment, Post};

use crate::error::ClientError;
use crate::http::PetoraApi;
use crate::notice::Notice;
use crate::optimistic::{PendingOps, PendingToken, Reversible};
use crate::session::Viewer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub count: usize,
}

/// Flips the viewer's like. Its own inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle;

impl Reversible<LikeState> for LikeToggle {
    fn apply(&self, state: &mut LikeState) {
        if state.liked {
            state.count = state.count.saturating_sub(1);
        } else {
            state.count += 1;
        }
        state.liked = !state.liked;
    }

    fn inverse(&self, _state: &LikeState) -> Self {
        LikeToggle
    }
}

#[derive(Debug, Clone)]
pub struct PendingLike {
    token: PendingToken,
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct PendingComment {
    pub user_id: String,
    pub draft: CommentDraft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug)]
pub struct PostCardState {
    post: Post,
    like: LikeState,
    likes: PendingOps<LikeToggle>,
    draft: String,
    commenting: bool,
    notices: Vec<Notice>,
}

impl PostCardState {
    pub fn new(post: Post, viewer: Option<&Viewer>) -> Self {
        let like = LikeState {
            liked: viewer.is_some_and(|v| post.is_liked_by(&v.user_id)),
            count: post.likes.len(),
        };
        let mut post = post;
        sort_comments(&mut post.comments);
        Self {
            post,
            like,
            likes: PendingOps::new(),
            draft: String::new(),
            commenting: false,
            notices: Vec::new(),
        }
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn like(&self) -> LikeState {
        self.like
    }

    pub fn comments(&self) -> &[Comment] {
        &self.post.comments
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_commenting(&self) -> bool {
        self.commenting
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // -- Likes --

    pub fn begin_like(&mut self, viewer: Option<&Viewer>) -> Option<PendingLike> {
        let Some(viewer) = viewer else {
            self.notices.push(Notice::error("Login to like posts"));
            return None;
        };
        let token = self.likes.apply(&mut self.like, LikeToggle);
        Some(PendingLike { token, user_id: viewer.user_id.clone() })
    }

    pub fn finish_like(&mut self, pending: PendingLike, result: Result<LikeResponse, ClientError>) {
        match result {
            Ok(resp) => {
                self.likes.confirm(pending.token);
                if self.likes.is_empty() {
                    self.like = LikeState { liked: resp.liked, count: resp.likes };
                    sync_like_list(&mut self.post.likes, &pending.user_id, resp.liked);
                }
            }
            Err(e) => {
                warn!("Like on post {} failed: {}", self.post.id, e);
                self.likes.rollback(&mut self.like, pending.token);
                self.notices.push(Notice::error("Something went wrong."));
            }
        }
    }

    // -- Comments --

    pub fn begin_comment(&mut self, viewer: Option<&Viewer>) -> Option<PendingComment> {
        let text = self.draft.trim();
        let Some(viewer) = viewer else {
            self.notices.push(Notice::error("Login to comment"));
            return None;
        };
        if text.is_empty() || self.commenting {
            return None;
        }

        let draft = CommentDraft {
            author: viewer.display_name.clone(),
            avatar: viewer.avatar(),
            text: text.to_string(),
        };
        self.commenting = true;
        Some(PendingComment { user_id: viewer.user_id.clone(), draft })
    }

    /// The accepted comment, if the server took it. The caller re-reads
    /// the post next and hands both to [`Self::finish_comment_refresh`].
    pub fn finish_comment(
        &mut self,
        _pending: PendingComment,
        result: Result<CommentResponse, ClientError>,
    ) -> Option<Comment> {
        match result {
            Ok(resp) => Some(resp.comment),
            Err(e) => {
                warn!("Comment on post {} failed: {}", self.post.id, e);
                self.commenting = false;
                self.notices.push(Notice::error("Could not add comment."));
                None
            }
        }
    }

    /// Replaces the local comments with the fresh read. If the read
    /// failed, the accepted comment is appended instead.
    pub fn finish_comment_refresh(&mut self, accepted: Comment, fetched: Result<Post, ClientError>) {
        self.commenting = false;
        self.draft.clear();

        match fetched {
            Ok(post) => {
                self.post.comments = post.comments;
            }
            Err(e) => {
                debug!("Re-reading post {} failed, keeping local copy: {}", self.post.id, e);
                let seen = self
                    .post
                    .comments
                    .iter()
                    .any(|c| c.id == accepted.id && c.author_id == accepted.author_id);
                if !seen {
                    self.post.comments.push(accepted);
                }
            }
        }
        sort_comments(&mut self.post.comments);
    }

    // -- Sharing --

    pub fn share_link(&self, origin: &str) -> ShareLink {
        ShareLink {
            title: format!("Check out this post by {} on Petora Connect", self.post.author),
            url: format!("{}/community/post/{}", origin.trim_end_matches('/'), self.post.id),
        }
    }

    /// Outcome of copying the link for platforms without a share sheet.
    pub fn record_copy(&mut self, copied: bool) {
        let notice = if copied {
            Notice::info("Link Copied!").with_description("The post link has been copied to your clipboard.")
        } else {
            Notice::error("Oops!").with_description("Could not copy the link to your clipboard.")
        };
        self.notices.push(notice);
    }
}

/// Oldest first; stable so equal timestamps keep server order.
fn sort_comments(comments: &mut [Comment]) {
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}

fn sync_like_list(likes: &mut Vec<String>, user_id: &str, liked: bool) {
    let present = likes.iter().any(|u| u == user_id);
    if liked && !present {
        likes.push(user_id.to_string());
    } else if !liked && present {
        likes.retain(|u| u != user_id);
    }
}

/// Async driver for a single card.
pub struct PostCard<A> {
    api: Arc<A>,
    state: PostCardState,
}

impl<A: PetoraApi> PostCard<A> {
    pub fn new(api: Arc<A>, post: Post, viewer: Option<&Viewer>) -> Self {
        Self { api, state: PostCardState::new(post, viewer) }
    }

    pub fn id(&self) -> Uuid {
        self.state.post.id
    }

    pub fn state(&self) -> &PostCardState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PostCardState {
        &mut self.state
    }

    pub async fn toggle_like(&mut self, viewer: Option<&Viewer>) {
        let Some(pending) = self.state.begin_like(viewer) else {
            return;
        };
        let result = self.api.like_post(self.id(), &pending.user_id).await;
        self.state.finish_like(pending, result);
    }

    /// Submits the current draft. Returns true if the server accepted it.
    pub async fn submit_comment(&mut self, viewer: Option<&Viewer>) -> bool {
        let Some(pending) = self.state.begin_comment(viewer) else {
            return false;
        };
        let result = self.api.comment_post(self.id(), &pending.user_id, &pending.draft).await;
        let Some(accepted) = self.state.finish_comment(pending, result) else {
            return false;
        };

        let fetched = self.api.get_post(self.id()).await;
        self.state.finish_comment_refresh(accepted, fetched);
        true
    }
}
