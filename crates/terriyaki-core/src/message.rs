//! Messages between users, including grind invitations.
//!
//! An invitation is a message whose status moves from `pending` to either
//! `accepted` or `rejected` exactly once. Resolving it sends a follow-up
//! message back to the inviter.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    General,
    Invitation,
    InvitationAccepted,
    InvitationRejected,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::General => "general",
            MessageType::Invitation => "invitation",
            MessageType::InvitationAccepted => "invitation_accepted",
            MessageType::InvitationRejected => "invitation_rejected",
        }
    }
}

impl FromStr for MessageType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(MessageType::General),
            "invitation" => Ok(MessageType::Invitation),
            "invitation_accepted" => Ok(MessageType::InvitationAccepted),
            "invitation_rejected" => Ok(MessageType::InvitationRejected),
            other => Err(ValidationError::invalid(
                "message_type",
                format!("unknown message type '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }

    pub fn can_transition_to(&self, target: InvitationStatus) -> bool {
        matches!(
            (self, target),
            (InvitationStatus::Pending, InvitationStatus::Accepted)
                | (InvitationStatus::Pending, InvitationStatus::Rejected)
        )
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "rejected" => Ok(InvitationStatus::Rejected),
            other => Err(ValidationError::invalid(
                "invitation_status",
                format!("unknown invitation status '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub invitation_grind_id: Option<String>,
    /// Only set for invitations.
    pub invitation_status: Option<InvitationStatus>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender_id: &str,
        receiver_id: &str,
        content: String,
        message_type: MessageType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content,
            message_type,
            invitation_grind_id: None,
            invitation_status: None,
            read: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn invitation(
        sender_id: &str,
        receiver_id: &str,
        grind_id: &str,
        inviter_name: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let mut message = Self::new(
            sender_id,
            receiver_id,
            format!("You have been invited to a grind created by {inviter_name}"),
            MessageType::Invitation,
            now,
        );
        message.invitation_grind_id = Some(grind_id.to_string());
        message.invitation_status = Some(InvitationStatus::Pending);
        message
    }

    /// The follow-up sent to the inviter once `invitation` is resolved.
    pub fn invitation_reply(
        invitation: &Message,
        outcome: InvitationStatus,
        responder_name: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let (message_type, verb) = match outcome {
            InvitationStatus::Rejected => (MessageType::InvitationRejected, "rejected"),
            _ => (MessageType::InvitationAccepted, "accepted"),
        };
        let mut message = Self::new(
            &invitation.receiver_id,
            &invitation.sender_id,
            format!("Your invitation to the grind has been {verb} by {responder_name}"),
            message_type,
            now,
        );
        message.invitation_grind_id = invitation.invitation_grind_id.clone();
        message
    }

    pub fn is_invitation(&self) -> bool {
        self.message_type == MessageType::Invitation
    }
}
