//! Direct-message chats between two users.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ChatId, MessageId, UserId};

/// A chat between exactly two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: ChatId,
    /// Both participants, sorted.
    pub participants: [UserId; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Create the chat for a pair of distinct users.
    pub fn between(a: UserId, b: UserId) -> Self {
        let id = ChatId::for_pair(&a, &b);
        let participants = if a <= b { [a, b] } else { [b, a] };
        let now = Utc::now();
        Self {
            id,
            participants,
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    /// The participant that is not `user`.
    pub fn other_participant(&self, user: &UserId) -> Option<&UserId> {
        if !self.has_participant(user) {
            return None;
        }
        self.participants.iter().find(|p| *p != user)
    }
}

/// A message inside a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub chat: ChatId,
    pub sender: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(chat: ChatId, sender: UserId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            chat,
            sender,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_sorts_participants() {
        let chat = Chat::between(UserId::from("zed"), UserId::from("amy"));
        assert_eq!(chat.participants[0].as_str(), "amy");
        assert_eq!(chat.id.as_str(), "amy_zed");
    }

    #[test]
    fn test_other_participant() {
        let amy = UserId::from("amy");
        let zed = UserId::from("zed");
        let chat = Chat::between(amy.clone(), zed.clone());
        assert_eq!(chat.other_participant(&amy), Some(&zed));
        assert_eq!(chat.other_participant(&UserId::from("bob")), None);
    }
}
