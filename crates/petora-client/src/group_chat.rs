//! Group chat: polled message list, optimistic send, join.
//!
//! Fetches are single-flight: a refresh requested while one is in flight
//! is queued and runs after it. Each fetch carries a sequence number and
//! a response older than the newest applied one is dropped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use uuid::Uuid;

use petora_types::api::{GroupDetail, JoinGroupResponse, SendMessageRequest, SendMessageResponse};
use petora_types::models::{ChatMessage, Group};
use petora_types::timestamp;

use crate::error::ClientError;
use crate::http::PetoraApi;
use crate::notice::Notice;
use crate::optimistic::{PendingOps, PendingToken, Reversible};
use crate::session::Viewer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Loading,
    Ready,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Came from a server fetch.
    Confirmed,
    /// Optimistic; the send request has not settled.
    Pending,
    /// The server accepted it. `confirmed_at` is the last fetch sequence
    /// issued before the acceptance, so fetches up to it may not include it.
    Sent { confirmed_at: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub message: ChatMessage,
    pub status: EntryStatus,
}

/// Local list mutations driven by sends.
#[derive(Debug, Clone)]
pub enum ChatOp {
    Append(ChatEntry),
    Remove(Uuid),
}

impl Reversible<Vec<ChatEntry>> for ChatOp {
    fn apply(&self, entries: &mut Vec<ChatEntry>) {
        match self {
            ChatOp::Append(entry) => entries.push(entry.clone()),
            ChatOp::Remove(id) => entries.retain(|e| e.message.id != *id),
        }
    }

    fn inverse(&self, entries: &Vec<ChatEntry>) -> Self {
        match self {
            ChatOp::Append(entry) => ChatOp::Remove(entry.message.id),
            ChatOp::Remove(id) => match entries.iter().find(|e| e.message.id == *id) {
                Some(existing) => ChatOp::Append(existing.clone()),
                None => ChatOp::Remove(*id),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct PendingSend {
    token: PendingToken,
    temp_id: Uuid,
    pub request: SendMessageRequest,
}

#[derive(Debug, Clone)]
pub struct PendingJoin {
    pub user_id: String,
}

#[derive(Debug)]
pub struct ChatState {
    group_id: Uuid,
    phase: ChatPhase,
    group: Option<Group>,
    entries: Vec<ChatEntry>,
    sends: PendingOps<ChatOp>,
    issued_seq: u64,
    applied_seq: u64,
    in_flight: Option<u64>,
    refetch_queued: bool,
    joining: bool,
    notices: Vec<Notice>,
}

impl ChatState {
    pub fn new(group_id: Uuid) -> Self {
        Self {
            group_id,
            phase: ChatPhase::Loading,
            group: None,
            entries: Vec::new(),
            sends: PendingOps::new(),
            issued_seq: 0,
            applied_seq: 0,
            in_flight: None,
            refetch_queued: false,
            joining: false,
            notices: Vec::new(),
        }
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn group(&self) -> Option<&Group> {
        self.group.as_ref()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().map(|e| &e.message)
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_joining(&self) -> bool {
        self.joining
    }

    pub fn is_member(&self, viewer: &Viewer) -> bool {
        self.group.as_ref().is_some_and(|g| g.is_member(&viewer.user_id))
    }

    /// Members and the owner may post.
    pub fn can_post(&self, viewer: &Viewer) -> bool {
        self.group
            .as_ref()
            .is_some_and(|g| g.is_member(&viewer.user_id) || g.is_owner(&viewer.user_id))
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // -- Fetching --

    /// `None` when a fetch is already in flight; the request is queued instead.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() {
            self.refetch_queued = true;
            return None;
        }
        self.issued_seq += 1;
        self.in_flight = Some(self.issued_seq);
        self.refetch_queued = false;
        Some(FetchTicket { seq: self.issued_seq })
    }

    /// The request behind `ticket` was cancelled before it settled.
    pub fn abandon_fetch(&mut self, ticket: FetchTicket) {
        if self.in_flight == Some(ticket.seq) {
            debug!("Fetch #{} for group {} cancelled", ticket.seq, self.group_id);
            self.in_flight = None;
        }
    }

    /// Applies a fetch result. Returns true when a queued refresh should
    /// run now.
    pub fn finish_fetch(&mut self, ticket: FetchTicket, result: Result<GroupDetail, ClientError>) -> bool {
        if self.in_flight == Some(ticket.seq) {
            self.in_flight = None;
        }

        if ticket.seq <= self.applied_seq {
            debug!("Dropping stale fetch #{} (applied #{})", ticket.seq, self.applied_seq);
        } else {
            match result {
                Ok(detail) => {
                    self.applied_seq = ticket.seq;
                    self.apply_detail(detail, ticket.seq);
                    self.phase = ChatPhase::Ready;
                }
                Err(ClientError::NotFound) => {
                    self.applied_seq = ticket.seq;
                    self.phase = ChatPhase::NotFound;
                    self.group = None;
                }
                Err(e) => {
                    warn!("Group {} refresh failed: {}", self.group_id, e);
                    if self.phase == ChatPhase::Loading {
                        self.notices.push(Notice::error("Could not load group chat."));
                    }
                }
            }
        }

        let again = self.refetch_queued && self.in_flight.is_none();
        if again {
            self.refetch_queued = false;
        }
        again
    }

    /// Server list wins; local entries the server may not have seen yet
    /// are kept after it.
    fn apply_detail(&mut self, detail: GroupDetail, seq: u64) {
        let server_ids: HashSet<Uuid> = detail.messages.iter().map(|m| m.id).collect();

        let carried: Vec<ChatEntry> = self
            .entries
            .drain(..)
            .filter(|e| !server_ids.contains(&e.message.id))
            .filter(|e| match e.status {
                EntryStatus::Confirmed => false,
                EntryStatus::Pending => true,
                EntryStatus::Sent { confirmed_at } => confirmed_at >= seq,
            })
            .collect();

        self.entries = detail
            .messages
            .into_iter()
            .map(|message| ChatEntry { message, status: EntryStatus::Confirmed })
            .collect();
        self.entries.extend(carried);
        self.group = Some(detail.group);
    }

    // -- Sending --

    /// Appends the optimistic message and returns the request to send.
    pub fn begin_send(&mut self, viewer: Option<&Viewer>, text: &str) -> Option<PendingSend> {
        let Some(viewer) = viewer else {
            self.notices.push(Notice::error("You must be logged in to chat"));
            return None;
        };
        let text = text.trim();
        if text.is_empty() || self.group.is_none() {
            return None;
        }
        if !self.can_post(viewer) {
            self.notices
                .push(Notice::error("You must join the group to participate in the chat."));
            return None;
        }

        let request = SendMessageRequest {
            user: viewer.display_name.clone(),
            user_id: viewer.user_id.clone(),
            message: text.to_string(),
            avatar: viewer.avatar(),
        };
        let temp_id = Uuid::new_v4();
        let entry = ChatEntry {
            message: ChatMessage {
                id: temp_id,
                group_id: self.group_id,
                user: request.user.clone(),
                user_id: request.user_id.clone(),
                message: request.message.clone(),
                avatar: request.avatar.clone(),
                created_at: timestamp::now(),
            },
            status: EntryStatus::Pending,
        };

        let token = self.sends.apply(&mut self.entries, ChatOp::Append(entry));
        Some(PendingSend { token, temp_id, request })
    }

    /// Returns true when the caller should refresh right away.
    pub fn finish_send(&mut self, pending: PendingSend, result: Result<SendMessageResponse, ClientError>) -> bool {
        match result {
            Ok(resp) => {
                self.sends.confirm(pending.token);
                let already_fetched = self
                    .entries
                    .iter()
                    .any(|e| e.message.id == resp.inserted_id && e.status == EntryStatus::Confirmed);

                if already_fetched {
                    self.entries.retain(|e| e.message.id != pending.temp_id);
                } else if let Some(entry) = self.entries.iter_mut().find(|e| e.message.id == pending.temp_id) {
                    entry.message.id = resp.inserted_id;
                    entry.status = EntryStatus::Sent { confirmed_at: self.issued_seq };
                }
                true
            }
            Err(e) => {
                warn!("Send to group {} failed: {}", self.group_id, e);
                self.sends.rollback(&mut self.entries, pending.token);
                self.notices.push(Notice::error("Failed to send message"));
                false
            }
        }
    }

    // -- Joining --

    pub fn begin_join(&mut self, viewer: Option<&Viewer>) -> Option<PendingJoin> {
        let Some(viewer) = viewer else {
            self.notices.push(Notice::error("You must be logged in to join"));
            return None;
        };
        if self.joining || self.group.is_none() {
            return None;
        }
        self.joining = true;
        Some(PendingJoin { user_id: viewer.user_id.clone() })
    }

    pub fn finish_join(&mut self, pending: PendingJoin, result: Result<JoinGroupResponse, ClientError>) {
        self.joining = false;
        match result {
            Ok(resp) => {
                if let Some(group) = self.group.as_mut() {
                    if !group.is_member(&pending.user_id) {
                        group.member_ids.push(pending.user_id);
                    }
                    group.members = resp.members;
                    let notice = Notice::info(format!("Welcome to {}!", group.name))
                        .with_description("You have successfully joined the group.");
                    self.notices.push(notice);
                }
            }
            Err(e) => {
                warn!("Joining group {} failed: {}", self.group_id, e);
                self.notices.push(Notice::error("Failed to join group"));
            }
        }
    }
}

/// Async driver for one mounted chat view.
///
/// The state lock is never held across an await.
pub struct GroupChat<A> {
    api: Arc<A>,
    group_id: Uuid,
    state: Mutex<ChatState>,
}

impl<A: PetoraApi> GroupChat<A> {
    pub fn new(api: Arc<A>, group_id: Uuid) -> Arc<Self> {
        Arc::new(Self { api, group_id, state: Mutex::new(ChatState::new(group_id)) })
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch group + messages; coalesces with any fetch already running.
    /// Dropping the future mid-request releases the in-flight mark.
    pub async fn refresh(&self) {
        let Some(ticket) = self.lock().begin_fetch() else {
            return;
        };
        let mut in_flight = InFlight { state: &self.state, ticket: Some(ticket) };

        loop {
            let result = self.api.get_group(self.group_id).await;
            let Some(ticket) = in_flight.ticket.take() else {
                return;
            };
            let mut state = self.lock();
            if !state.finish_fetch(ticket, result) {
                return;
            }
            in_flight.ticket = state.begin_fetch();
            if in_flight.ticket.is_none() {
                return;
            }
        }
    }

    /// Returns true if the server accepted the message.
    pub async fn send(&self, viewer: Option<&Viewer>, text: &str) -> bool {
        let Some(pending) = self.lock().begin_send(viewer, text) else {
            return false;
        };

        let result = self.api.send_message(self.group_id, &pending.request).await;
        let accepted = result.is_ok();
        let refetch = self.lock().finish_send(pending, result);
        if refetch {
            self.refresh().await;
        }
        accepted
    }

    pub async fn join(&self, viewer: Option<&Viewer>) -> bool {
        let Some(pending) = self.lock().begin_join(viewer) else {
            return false;
        };

        let result = self.api.join_group(self.group_id, &pending.user_id).await;
        let joined = result.is_ok();
        self.lock().finish_join(pending, result);
        joined
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&ChatState) -> R) -> R {
        f(&*self.lock())
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.lock().take_notices()
    }

    /// Initial fetch, then one refresh per `every`. Polling stops when the
    /// returned handle is dropped.
    pub fn start_polling(self: &Arc<Self>, every: Duration) -> PollHandle {
        let chat = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                chat.refresh().await;
            }
        });
        PollHandle { task }
    }
}

/// Holds the ticket of the fetch a `refresh` is awaiting.
struct InFlight<'a> {
    state: &'a Mutex<ChatState>,
    ticket: Option<FetchTicket>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.abandon_fetch(ticket);
        }
    }
}

pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Aborts the poll task, cancelling any refresh it is awaiting.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
