use std::sync::Arc;

use time::OffsetDateTime;

use crate::{
    db::{Message, User},
    AppResult,
};

use super::store::{chat_path, RealtimeStore, Snapshot, Subscription};

/// Decodes a chat snapshot into messages ordered by timestamp. Equal
/// timestamps keep key order. Undecodable records are skipped.
pub fn messages_from_snapshot(snapshot: Snapshot) -> Vec<Message> {
    let mut messages: Vec<Message> = snapshot
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<Message>(value) {
            Ok(msg) => Some(Message { id: key, ..msg }),
            Err(e) => {
                tracing::warn!("skipping malformed chat record {key}: {e}");
                None
            }
        })
        .collect();

    messages.sort_by_key(|msg| msg.timestamp);
    messages
}

/// Appends a message from `sender`, stamped with the local clock. Blank
/// text is ignored and yields `None`.
pub async fn send_message(
    store: &RealtimeStore,
    group_id: i64,
    sender: &User,
    text: &str,
) -> AppResult<Option<String>> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    let msg = Message {
        id: String::new(),
        sender_id: sender.id,
        sender_username: sender.username.clone(),
        group_id,
        text: text.to_owned(),
        timestamp: OffsetDateTime::now_utc(),
    };
    let key = store.push(&chat_path(group_id), &msg).await?;

    tracing::debug!("u/{}#{} -> chats/{group_id}/{key}", sender.username, sender.id);
    Ok(Some(key))
}

/// A group's chat log mirrored locally: the in-process client of the chat
/// path. Websocket clients get the same contract from `/g/{id}/chat/ws`,
/// which shares `send_message` and `messages_from_snapshot` with it.
pub struct GroupChat {
    group_id: i64,
    store: Arc<RealtimeStore>,
    subscription: Subscription,
    messages: Vec<Message>,
}

impl GroupChat {
    pub fn open(store: &Arc<RealtimeStore>, group_id: i64) -> Self {
        Self {
            group_id,
            store: Arc::clone(store),
            subscription: store.subscribe(chat_path(group_id)),
            messages: Vec::new(),
        }
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    /// Sorted by timestamp.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Waits for the next snapshot (the current one on first call) and
    /// replaces the local list with it.
    pub async fn refresh(&mut self) -> Option<&[Message]> {
        let snapshot = self.subscription.next().await?;
        self.messages = messages_from_snapshot(snapshot);
        Some(&self.messages)
    }

    pub async fn send(&self, sender: &User, text: &str) -> AppResult<Option<String>> {
        send_message(&self.store, self.group_id, sender, text).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::Duration;
    use tokio::time::timeout;

    use super::*;

    fn alice() -> User {
        User { id: 1, username: "Alice".to_owned(), email: "alice@example.com".to_owned() }
    }

    fn record(text: &str, at: &str) -> serde_json::Value {
        json!({
            "senderId": 3,
            "senderUsername": "Charlie",
            "groupId": 1,
            "text": text,
            "timestamp": at,
        })
    }

    #[test]
    fn sorts_out_of_order_arrivals() {
        let snapshot: Snapshot = [
            ("a".to_owned(), record("third", "2024-05-01T10:00:03Z")),
            ("b".to_owned(), record("first", "2024-05-01T10:00:01Z")),
            ("c".to_owned(), record("second", "2024-05-01T10:00:02Z")),
        ]
        .into_iter()
        .collect();

        let texts: Vec<String> = messages_from_snapshot(snapshot).into_iter().map(|m| m.text).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn ties_keep_key_order_and_keys_become_ids() {
        let snapshot: Snapshot = [
            ("k2".to_owned(), record("later key", "2024-05-01T10:00:00Z")),
            ("k1".to_owned(), record("earlier key", "2024-05-01T10:00:00Z")),
            ("k0".to_owned(), json!({ "text": "missing fields" })),
        ]
        .into_iter()
        .collect();

        let messages = messages_from_snapshot(snapshot);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "k1");
        assert_eq!(messages[1].id, "k2");
    }

    #[tokio::test]
    async fn blank_text_is_not_sent() {
        let store = RealtimeStore::new(8);
        assert_eq!(send_message(&store, 1, &alice(), "   ").await.unwrap(), None);
        assert!(store.snapshot(&chat_path(1)).await.is_empty());
    }

    #[tokio::test]
    async fn two_clients_converge_on_sorted_log() {
        let store = Arc::new(RealtimeStore::new(16));
        let mut mine = GroupChat::open(&store, 1);
        let mut theirs = GroupChat::open(&store, 1);
        assert!(mine.refresh().await.unwrap().is_empty());
        theirs.refresh().await.unwrap();

        // a peer with a slow clock writes after us
        mine.send(&alice(), "hello").await.unwrap();
        store.push(&chat_path(1), record("earlier clock", "2000-01-01T00:00:00Z")).await.unwrap();

        timeout(std::time::Duration::from_secs(1), theirs.refresh()).await.unwrap();
        let latest = timeout(std::time::Duration::from_secs(1), theirs.refresh())
            .await
            .unwrap()
            .unwrap()
            .to_vec();
        let texts: Vec<&str> = latest.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["earlier clock", "hello"]);
        assert!(latest.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        timeout(std::time::Duration::from_secs(1), mine.refresh()).await.unwrap();
        assert_eq!(mine.messages().len(), 2);
        assert_eq!(mine.group_id(), 1);
    }

    #[tokio::test]
    async fn sent_message_carries_sender_and_group() {
        let store = RealtimeStore::new(8);
        let before = OffsetDateTime::now_utc() - Duration::seconds(1);
        let key = send_message(&store, 4, &alice(), "notes?").await.unwrap().unwrap();

        let messages = messages_from_snapshot(store.snapshot(&chat_path(4)).await);
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.id, key);
        assert_eq!((msg.sender_id, msg.sender_username.as_str(), msg.group_id), (1, "Alice", 4));
        assert!(msg.timestamp >= before);
    }
}
