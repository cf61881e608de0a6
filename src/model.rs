//! Core data model: contacts, messages, conversation keys, pages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contact known to a messaging instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Message direction relative to the instance owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Delivery status of an outgoing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Client-local optimistic placeholder, not yet confirmed by the backend
    Sending,
    Sent,
    Delivered,
    Read,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// Correlation id for optimistic placeholders, echoed back by the
    /// transport on confirmation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_temp_id: Option<String>,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Raw ack level from the backend (0 = pending .. 3 = read)
    #[serde(default)]
    pub ack: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl Message {
    /// True for a client-local message still waiting on backend confirmation
    pub fn is_placeholder(&self) -> bool {
        self.status == Some(MessageStatus::Sending)
    }
}

/// Composite cache key for a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub instance_id: String,
    pub contact_id: String,
}

impl ConversationKey {
    pub fn new(instance_id: &str, contact_id: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            contact_id: contact_id.to_string(),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.instance_id, self.contact_id)
    }
}

/// One page of messages returned by the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    /// Opaque token meaning "older than this point"; absent on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_message() -> Message {
        Message {
            id: "BAE5F4A2".to_string(),
            client_temp_id: None,
            direction: Direction::Incoming,
            timestamp: Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap(),
            body: Some("oi".to_string()),
            media_url: None,
            media_type: None,
            ack: 2,
            status: Some(MessageStatus::Delivered),
        }
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = sample_message();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("INCOMING"));
        assert!(json.contains("delivered"));

        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_is_placeholder() {
        let mut msg = sample_message();
        assert!(!msg.is_placeholder());

        msg.status = Some(MessageStatus::Sending);
        msg.client_temp_id = Some("tmp-1".to_string());
        assert!(msg.is_placeholder());
    }

    #[test]
    fn test_conversation_key_display() {
        let key = ConversationKey::new("main", "5511999990000");
        assert_eq!(key.to_string(), "main/5511999990000");
    }

    #[test]
    fn test_message_page_optional_cursor() {
        let json = r#"{"messages":[],"hasMore":false}"#;
        let page: MessagePage = serde_json::from_str(json).unwrap();
        assert!(page.next_cursor.is_none());
        assert!(!page.has_more);
    }
}
