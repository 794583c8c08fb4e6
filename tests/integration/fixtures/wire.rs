//! Wire payload builders shared across integration tests.

use fedicache::core::{EntityId, Handle, ListKey};
use serde_json::{Value, json};

pub fn id(s: &str) -> EntityId {
    EntityId::parse(s).expect("test id is non-empty")
}

pub fn key(s: &str) -> ListKey {
    ListKey::parse(s).expect("test list key is non-empty")
}

pub fn handle(s: &str) -> Handle {
    Handle::parse(s).expect("test handle is non-empty")
}

pub fn account_json(account_id: &str, acct: &str) -> Value {
    json!({
        "id": account_id,
        "acct": acct,
        "display_name": acct,
        "followers_count": 10,
    })
}

pub fn status_json(status_id: &str, account_id: &str, acct: &str) -> Value {
    json!({
        "id": status_id,
        "content": format!("status {status_id}"),
        "created_at": "2024-06-01T12:00:00Z",
        "account": account_json(account_id, acct),
    })
}

pub fn reblog_json(status_id: &str, reblogged_id: &str, account_id: &str) -> Value {
    json!({
        "id": status_id,
        "account": account_json(account_id, "booster"),
        "reblog": status_json(reblogged_id, "42", "alice"),
    })
}

pub fn notification_json(notification_id: &str, status_id: &str) -> Value {
    json!({
        "id": notification_id,
        "type": "favourite",
        "account": account_json("42", "alice"),
        "status": status_json(status_id, "42", "alice"),
    })
}

pub fn chat_json(chat_id: &str, message_id: &str, sender_id: &str, at: &str) -> Value {
    json!({
        "id": chat_id,
        "account": account_json(sender_id, "partner"),
        "unread": 1,
        "last_message": {
            "id": message_id,
            "chat_id": chat_id,
            "account_id": sender_id,
            "content": "hey",
            "created_at": at,
        },
    })
}
