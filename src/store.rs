//! Conversation store.
//!
//! Holds the conversation list, per-conversation transcripts, the active
//! conversation and the single [`StreamFence`] slot. The store is an
//! ordinary value: construct it, share it behind an `Arc`, reset it.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::fence::{StreamFence, StreamHandle};
use crate::models::{title_from_text, Conversation, Message, MessageStatus};

#[derive(Debug, Default)]
struct StoreState {
    /// Most recently touched first
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<Message>>,
    active_conversation_id: Option<String>,
}

impl StoreState {
    fn conversation_index(&self, id: &str) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }

    fn message_mut(&mut self, conversation_id: &str, message_id: &str) -> Option<&mut Message> {
        self.messages
            .get_mut(conversation_id)?
            .iter_mut()
            .find(|m| m.id == message_id)
    }
}

#[derive(Debug, Default)]
pub struct ChatStore {
    state: Mutex<StoreState>,
    fence: StreamFence,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Streaming request lifecycle

    /// Cancel any in-flight stream and start a new one.
    pub fn begin_streaming_request(&self) -> StreamHandle {
        self.fence.begin()
    }

    /// Retire `request_id` if it is still current.
    pub fn complete_streaming_request(&self, request_id: u64) -> bool {
        self.fence.complete(request_id)
    }

    /// Cancel the in-flight stream, if any.
    pub fn abort_streaming_request(&self) -> bool {
        self.fence.abort()
    }

    pub fn is_current_request(&self, request_id: u64) -> bool {
        self.fence.is_current(request_id)
    }

    pub fn has_active_request(&self) -> bool {
        self.fence.is_active()
    }

    /// Whether the active conversation has a message still streaming.
    pub fn is_streaming(&self) -> bool {
        let state = self.state();
        let Some(active) = state.active_conversation_id.as_deref() else {
            return false;
        };
        state
            .messages
            .get(active)
            .is_some_and(|messages| messages.iter().any(Message::is_streaming))
    }

    // Conversations

    pub fn conversations(&self) -> Vec<Conversation> {
        self.state().conversations.clone()
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        let state = self.state();
        state
            .conversation_index(id)
            .map(|i| state.conversations[i].clone())
    }

    pub fn set_conversations(&self, conversations: Vec<Conversation>) {
        self.state().conversations = conversations;
    }

    pub fn active_conversation_id(&self) -> Option<String> {
        self.state().active_conversation_id.clone()
    }

    pub fn set_active_conversation(&self, id: Option<String>) {
        self.state().active_conversation_id = id;
    }

    /// Add a local conversation at the top of the list and make it active.
    pub fn create_conversation(&self, now: i64) -> String {
        let conversation = Conversation::local(now);
        let id = conversation.id.clone();

        let mut state = self.state();
        state.conversations.insert(0, conversation);
        state.messages.insert(id.clone(), Vec::new());
        state.active_conversation_id = Some(id.clone());
        id
    }

    /// Record `message` as the latest activity and move the conversation
    /// to the top.
    pub fn touch_conversation(&self, conversation_id: &str, message: &Message, now: i64) {
        let mut state = self.state();
        if let Some(index) = state.conversation_index(conversation_id) {
            let mut conversation = state.conversations.remove(index);
            conversation.last_message = Some(Box::new(message.clone()));
            conversation.updated_at = now;
            state.conversations.insert(0, conversation);
        }
    }

    /// Close out a run: the assistant message becomes the latest message and
    /// a default title is replaced by one derived from `prompt`.
    pub fn finalize_conversation(
        &self,
        conversation_id: &str,
        message_id: &str,
        prompt: &str,
        now: i64,
    ) {
        let mut state = self.state();
        let Some(index) = state.conversation_index(conversation_id) else {
            return;
        };

        let message = state
            .messages
            .get(conversation_id)
            .and_then(|messages| messages.iter().find(|m| m.id == message_id))
            .cloned();

        let conversation = &mut state.conversations[index];
        if let Some(message) = message {
            conversation.last_message = Some(Box::new(message));
            conversation.updated_at = now;
        }
        if conversation.has_default_title() {
            conversation.title = title_from_text(prompt);
        }
    }

    /// Move a conversation from `old_id` to `new_id`.
    ///
    /// An entry already listed under `new_id` is merged into the moved one
    /// and dropped; transcripts are concatenated without duplicate message
    /// ids. Returns the id the conversation is now known by.
    pub fn rekey_conversation(
        &self,
        old_id: &str,
        new_id: &str,
        session_id: Option<&str>,
    ) -> String {
        if new_id.is_empty() {
            return old_id.to_string();
        }
        if old_id.is_empty() {
            return new_id.to_string();
        }

        let mut state = self.state();
        if old_id == new_id {
            if let (Some(index), Some(session_id)) = (state.conversation_index(new_id), session_id)
            {
                state.conversations[index].session_id = Some(session_id.to_string());
            }
            return new_id.to_string();
        }

        debug!(old_id, new_id, "Re-keying conversation");
        let old_index = state.conversation_index(old_id);
        let new_index = state.conversation_index(new_id);

        match old_index {
            Some(old) => {
                let existing = new_index.map(|i| state.conversations[i].clone());
                let conversation = &mut state.conversations[old];
                conversation.id = new_id.to_string();
                if let Some(session_id) = session_id {
                    conversation.session_id = Some(session_id.to_string());
                }
                if let Some(existing) = existing {
                    conversation.updated_at = conversation.updated_at.max(existing.updated_at);
                    if conversation.last_message.is_none() {
                        conversation.last_message = existing.last_message;
                    }
                    if conversation.session_id.is_none() {
                        conversation.session_id = existing.session_id;
                    }
                }
            }
            None => {
                if let (Some(index), Some(session_id)) = (new_index, session_id) {
                    state.conversations[index].session_id = Some(session_id.to_string());
                }
            }
        }

        if let (Some(old), Some(new)) = (old_index, new_index) {
            if old != new {
                state.conversations.remove(new);
            }
        }

        if let Some(moved) = state.messages.remove(old_id) {
            let mut merged = state.messages.remove(new_id).unwrap_or_default();
            merged.extend(moved);

            let mut seen = HashSet::new();
            merged.retain(|m| seen.insert(m.id.clone()));
            for message in &mut merged {
                message.conversation_id = new_id.to_string();
            }
            state.messages.insert(new_id.to_string(), merged);
        }

        if state.active_conversation_id.as_deref() == Some(old_id) {
            state.active_conversation_id = Some(new_id.to_string());
        }
        new_id.to_string()
    }

    /// Merge a freshly fetched conversation list into the current one.
    ///
    /// Conversations already present keep their local state and take the
    /// server's title, timestamp and session id. Local ones the server does
    /// not list yet are kept. The result is ordered newest first.
    pub fn merge_conversations(&self, remote: Vec<Conversation>) {
        let mut state = self.state();
        let remote_ids: HashSet<String> = remote.iter().map(|c| c.id.clone()).collect();

        let mut existing: HashMap<String, Conversation> = HashMap::new();
        let mut extra = Vec::new();
        for conversation in state.conversations.drain(..) {
            if remote_ids.contains(&conversation.id) {
                existing.insert(conversation.id.clone(), conversation);
            } else {
                extra.push(conversation);
            }
        }

        let mut merged: Vec<Conversation> = remote
            .into_iter()
            .map(|remote| match existing.remove(&remote.id) {
                Some(mut current) => {
                    current.title = remote.title;
                    current.updated_at = remote.updated_at;
                    current.session_id = remote.session_id;
                    if remote.last_message.is_some() {
                        current.last_message = remote.last_message;
                    }
                    current
                }
                None => remote,
            })
            .collect();
        merged.extend(extra);
        merged.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        state.conversations = merged;
    }

    // Transcripts

    pub fn messages(&self, conversation_id: &str) -> Vec<Message> {
        self.state()
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether a transcript has been loaded (possibly empty).
    pub fn has_transcript(&self, conversation_id: &str) -> bool {
        self.state().messages.contains_key(conversation_id)
    }

    pub fn set_messages(&self, conversation_id: &str, messages: Vec<Message>) {
        self.state()
            .messages
            .insert(conversation_id.to_string(), messages);
    }

    pub fn push_message(&self, conversation_id: &str, message: Message) {
        self.state()
            .messages
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
    }

    /// Apply `update` to one message. Returns false if it does not exist.
    pub fn update_message<F>(&self, conversation_id: &str, message_id: &str, update: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        match self.state().message_mut(conversation_id, message_id) {
            Some(message) => {
                update(message);
                true
            }
            None => false,
        }
    }

    pub fn message_status(&self, conversation_id: &str, message_id: &str) -> Option<MessageStatus> {
        self.state()
            .message_mut(conversation_id, message_id)
            .map(|m| m.status)
    }

    /// Abort the in-flight stream and drop all conversations.
    ///
    /// The request counter is kept so ids issued before the reset never
    /// match ids issued after it.
    pub fn reset(&self) {
        self.fence.abort();
        *self.state() = StoreState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_local() -> (ChatStore, String) {
        let store = ChatStore::new();
        let id = store.create_conversation(1_000);
        (store, id)
    }

    fn conversation(id: &str, updated_at: i64) -> Conversation {
        let mut c = Conversation::local(updated_at);
        c.id = id.to_string();
        c.title = id.to_string();
        c
    }

    #[test]
    fn test_create_conversation_is_active_and_first() {
        let store = ChatStore::new();
        let first = store.create_conversation(1);
        let second = store.create_conversation(2);

        assert_eq!(first, "local_1");
        assert_eq!(store.active_conversation_id().as_deref(), Some("local_2"));
        let ids: Vec<_> = store.conversations().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert!(store.has_transcript("local_1"));
    }

    #[test]
    fn test_is_streaming_tracks_active_conversation() {
        let (store, id) = store_with_local();
        assert!(!store.is_streaming());

        store.push_message(&id, Message::assistant_placeholder("a1", &id));
        assert!(store.is_streaming());

        store.set_active_conversation(Some("other".to_string()));
        assert!(!store.is_streaming());

        store.set_active_conversation(Some(id.clone()));
        store.update_message(&id, "a1", |m| m.status = MessageStatus::Sent);
        assert!(!store.is_streaming());
    }

    #[test]
    fn test_touch_moves_to_top() {
        let store = ChatStore::new();
        store.set_conversations(vec![conversation("a", 1), conversation("b", 2)]);
        let message = Message::user("u1", "b", "hello");
        store.touch_conversation("b", &message, 50);

        let list = store.conversations();
        assert_eq!(list[0].id, "b");
        assert_eq!(list[0].updated_at, 50);
        assert_eq!(list[0].last_message.as_ref().unwrap().content, "hello");
    }

    #[test]
    fn test_finalize_sets_title_once() {
        let (store, id) = store_with_local();
        store.push_message(&id, Message::assistant_placeholder("a1", &id));

        let long_prompt = "x".repeat(40);
        store.finalize_conversation(&id, "a1", &long_prompt, 5_000);
        let conversation = store.conversation(&id).unwrap();
        assert_eq!(conversation.title, format!("{}...", "x".repeat(30)));
        assert_eq!(conversation.updated_at, 5_000);
        assert_eq!(conversation.last_message.unwrap().id, "a1");

        store.finalize_conversation(&id, "a1", "second prompt", 6_000);
        assert_eq!(
            store.conversation(&id).unwrap().title,
            format!("{}...", "x".repeat(30))
        );
    }

    #[test]
    fn test_rekey_moves_transcript_and_active_id() {
        let (store, local) = store_with_local();
        store.push_message(&local, Message::user("u1", &local, "hi"));

        let new_id = store.rekey_conversation(&local, "thread-9", Some("thread-9"));
        assert_eq!(new_id, "thread-9");
        assert!(store.conversation(&local).is_none());
        let conversation = store.conversation("thread-9").unwrap();
        assert_eq!(conversation.session_id.as_deref(), Some("thread-9"));
        assert_eq!(store.active_conversation_id().as_deref(), Some("thread-9"));

        let messages = store.messages("thread-9");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].conversation_id, "thread-9");
        assert!(!store.has_transcript(&local));
    }

    #[test]
    fn test_rekey_merges_existing_entry() {
        let store = ChatStore::new();
        let mut remote = conversation("thread-1", 900);
        remote.session_id = Some("sess".to_string());
        store.set_conversations(vec![conversation("local_1", 100), remote]);
        store.set_messages("thread-1", vec![Message::user("shared", "thread-1", "old")]);
        store.set_messages(
            "local_1",
            vec![
                Message::user("shared", "local_1", "dup"),
                Message::user("fresh", "local_1", "new"),
            ],
        );

        store.rekey_conversation("local_1", "thread-1", None);

        let list = store.conversations();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].updated_at, 900);
        assert_eq!(list[0].session_id.as_deref(), Some("sess"));

        let ids: Vec<_> = store.messages("thread-1").into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["shared", "fresh"]);
    }

    #[test]
    fn test_rekey_same_id_updates_session() {
        let store = ChatStore::new();
        store.set_conversations(vec![conversation("t", 1)]);
        assert_eq!(store.rekey_conversation("t", "t", Some("s2")), "t");
        assert_eq!(store.conversation("t").unwrap().session_id.as_deref(), Some("s2"));
    }

    #[test]
    fn test_merge_conversations_keeps_local_state() {
        let store = ChatStore::new();
        let mut known = conversation("tree_1", 10);
        known.unread_count = 3;
        store.set_conversations(vec![conversation("local_5", 500), known]);

        let mut fresh = conversation("tree_1", 1_000);
        fresh.title = "Renamed".to_string();
        store.merge_conversations(vec![fresh, conversation("tree_2", 20)]);

        let list = store.conversations();
        let ids: Vec<_> = list.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["tree_1", "local_5", "tree_2"]);
        assert_eq!(list[0].title, "Renamed");
        assert_eq!(list[0].unread_count, 3);
    }

    #[test]
    fn test_request_lifecycle_delegates_to_fence() {
        let store = ChatStore::new();
        let first = store.begin_streaming_request();
        let second = store.begin_streaming_request();
        assert!(first.is_cancelled());
        assert!(!store.complete_streaming_request(first.request_id()));
        assert!(store.has_active_request());
        assert!(store.complete_streaming_request(second.request_id()));
        assert!(!store.has_active_request());
    }

    #[test]
    fn test_reset_keeps_counter_monotonic() {
        let (store, id) = store_with_local();
        let before = store.begin_streaming_request();
        store.push_message(&id, Message::assistant_placeholder("a1", &id));

        store.reset();
        assert!(before.is_cancelled());
        assert!(store.conversations().is_empty());
        assert!(store.active_conversation_id().is_none());
        assert!(!store.is_streaming());

        let after = store.begin_streaming_request();
        assert!(after.request_id() > before.request_id());
        assert!(!store.is_current_request(before.request_id()));
    }

    #[test]
    fn test_update_missing_message() {
        let (store, id) = store_with_local();
        assert!(!store.update_message(&id, "nope", |_| {}));
        assert_eq!(store.message_status(&id, "nope"), None);
    }
}
