use rusqlite::Connection;
use tracing::{info, warn};

use super::ledger::enroll;
use super::lifecycle::load_grind;
use super::GrindEngine;
use crate::error::{CoreError, Result, ValidationError};
use crate::message::{InvitationStatus, Message, MessageType};
use crate::storage::{grinds, messages, users};
use crate::user::User;

fn load_message(conn: &Connection, id: &str) -> Result<Message> {
    messages::get_message(conn, id)?.ok_or_else(|| CoreError::MessageNotFound(id.to_string()))
}

fn load_user(conn: &Connection, id: &str) -> Result<User> {
    users::get_user(conn, id)?.ok_or_else(|| CoreError::UserNotFound(id.to_string()))
}

fn forbidden(actor: &str, action: &str) -> CoreError {
    CoreError::Forbidden {
        actor: actor.to_string(),
        action: action.to_string(),
    }
}

impl<P> GrindEngine<P> {
    /// Store a pending invitation from `sender` to `receiver`.
    pub(super) fn invite(&self, sender: &User, receiver: &User, grind_id: &str) -> Result<Message> {
        if sender.id == receiver.id {
            return Err(ValidationError::SameSenderReceiver.into());
        }
        let message = Message::invitation(&sender.id, &receiver.id, grind_id, &sender.username, self.now());
        self.db.transaction(|conn| {
            if !grinds::grind_exists(conn, grind_id)? {
                return Err(CoreError::GrindNotFound(grind_id.to_string()));
            }
            messages::insert_message(conn, &message)
        })?;
        info!(
            invitation_id = %message.id,
            sender = %sender.id,
            receiver = %receiver.id,
            grind_id,
            "invitation sent"
        );
        Ok(message)
    }

    /// Invite a user, given by email or id, into a grind.
    pub fn create_invitation(&self, sender_id: &str, receiver: &str, grind_id: &str) -> Result<Message> {
        let sender = self.resolve_user(sender_id)?;
        let receiver = self.resolve_user(receiver)?;
        self.invite(&sender, &receiver, grind_id)
    }

    /// Accept an invitation and join its grind.
    ///
    /// Only the receiver may accept, and only while the invitation is
    /// pending. The reply to the inviter is returned.
    pub fn accept(&self, invitation_id: &str, acting_user_id: &str) -> Result<Message> {
        self.resolve(invitation_id, acting_user_id, InvitationStatus::Accepted)
    }

    /// Decline an invitation. Nobody is enrolled.
    pub fn reject(&self, invitation_id: &str, acting_user_id: &str) -> Result<Message> {
        self.resolve(invitation_id, acting_user_id, InvitationStatus::Rejected)
    }

    fn resolve(&self, invitation_id: &str, acting_user_id: &str, outcome: InvitationStatus) -> Result<Message> {
        let now = self.now();
        let reply = self.db.transaction(|conn| {
            let invitation = load_message(conn, invitation_id)?;
            let status = match invitation.invitation_status {
                Some(status) if invitation.is_invitation() => status,
                _ => return Err(ValidationError::NotAnInvitation(invitation_id.to_string()).into()),
            };
            if invitation.receiver_id != acting_user_id {
                return Err(forbidden(acting_user_id, "resolve an invitation sent to someone else"));
            }
            let not_pending = |status: InvitationStatus| CoreError::InvitationNotPending {
                id: invitation_id.to_string(),
                status,
            };
            if !status.can_transition_to(outcome) {
                return Err(not_pending(status));
            }

            if outcome == InvitationStatus::Accepted {
                let grind_id = invitation
                    .invitation_grind_id
                    .as_deref()
                    .ok_or_else(|| ValidationError::invalid("invitation_grind_id", "missing"))?;
                let grind = load_grind(conn, grind_id)?;
                if !enroll(conn, &grind, acting_user_id, now)? {
                    warn!(user_id = acting_user_id, grind_id, "invitee already participates");
                }
            }

            if messages::resolve_invitation(conn, invitation_id, outcome, &now)? == 0 {
                let current = load_message(conn, invitation_id)?
                    .invitation_status
                    .unwrap_or(InvitationStatus::Pending);
                return Err(not_pending(current));
            }

            let responder = load_user(conn, acting_user_id)?;
            let reply = Message::invitation_reply(&invitation, outcome, &responder.username, now);
            messages::insert_message(conn, &reply)?;
            Ok(reply)
        })?;
        info!(invitation_id, user_id = acting_user_id, outcome = %outcome, "invitation resolved");
        Ok(reply)
    }

    /// Send a plain message. The receiver may be given by email or id.
    pub fn send_message(&self, sender_id: &str, receiver: &str, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::invalid("content", "message must not be empty").into());
        }
        let sender = self.resolve_user(sender_id)?;
        let receiver = self.resolve_user(receiver)?;
        if sender.id == receiver.id {
            return Err(ValidationError::SameSenderReceiver.into());
        }
        let message = Message::new(&sender.id, &receiver.id, content.to_string(), MessageType::General, self.now());
        self.db.with_conn(|conn| messages::insert_message(conn, &message))?;
        Ok(message)
    }

    /// A message visible to its sender or receiver only.
    pub fn get_message(&self, message_id: &str, acting_user_id: &str) -> Result<Message> {
        let message = self.db.with_conn(|conn| load_message(conn, message_id))?;
        if message.sender_id != acting_user_id && message.receiver_id != acting_user_id {
            return Err(forbidden(acting_user_id, "read a message addressed to someone else"));
        }
        Ok(message)
    }

    pub fn inbox(&self, user_id: &str, offset: u32, limit: u32) -> Result<Vec<Message>> {
        self.db.with_conn(|conn| messages::inbox(conn, user_id, offset, limit))
    }

    pub fn sent(&self, user_id: &str, offset: u32, limit: u32) -> Result<Vec<Message>> {
        self.db.with_conn(|conn| messages::sent(conn, user_id, offset, limit))
    }

    /// Mark a received message as read. Marking it again changes nothing.
    pub fn mark_read(&self, message_id: &str, acting_user_id: &str) -> Result<Message> {
        let now = self.now();
        self.db.transaction(|conn| {
            let message = load_message(conn, message_id)?;
            if message.receiver_id != acting_user_id {
                return Err(forbidden(acting_user_id, "mark another user's message as read"));
            }
            messages::mark_read(conn, message_id, &now)?;
            load_message(conn, message_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::testing::{fixture, request};
    use crate::error::{CoreError, ErrorCode, ValidationError};
    use crate::message::{InvitationStatus, MessageType};

    #[test]
    fn accept_enrolls_and_replies() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id], fx.now))
            .unwrap();
        let invitation = fx
            .engine
            .create_invitation(&fx.alice.id, &fx.bob.email, &grind.id)
            .unwrap();
        assert_eq!(invitation.invitation_status, Some(InvitationStatus::Pending));
        assert_eq!(invitation.content, "You have been invited to a grind created by alice");

        let reply = fx.engine.accept(&invitation.id, &fx.bob.id).unwrap();
        assert_eq!(reply.message_type, MessageType::InvitationAccepted);
        assert_eq!(reply.sender_id, fx.bob.id);
        assert_eq!(reply.receiver_id, fx.alice.id);
        assert_eq!(reply.content, "Your invitation to the grind has been accepted by bob");

        assert_eq!(
            fx.engine.get_grind(&grind.id).unwrap().participants,
            vec![fx.alice.id.clone(), fx.bob.id.clone()]
        );
        assert_eq!(fx.engine.progress(&fx.bob.id, &grind.id).unwrap().len(), 3);

        let stored = fx.engine.get_message(&invitation.id, &fx.bob.id).unwrap();
        assert_eq!(stored.invitation_status, Some(InvitationStatus::Accepted));
        assert_eq!(fx.engine.inbox(&fx.alice.id, 0, 10).unwrap()[0].id, reply.id);

        let err = fx.engine.accept(&reply.id, &fx.alice.id).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::NotAnInvitation(_))));
    }

    #[test]
    fn resolved_invitations_are_terminal() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id], fx.now))
            .unwrap();
        let invitation = fx
            .engine
            .create_invitation(&fx.alice.id, &fx.bob.id, &grind.id)
            .unwrap();
        fx.engine.reject(&invitation.id, &fx.bob.id).unwrap();

        for result in [
            fx.engine.accept(&invitation.id, &fx.bob.id),
            fx.engine.reject(&invitation.id, &fx.bob.id),
        ] {
            let err = result.unwrap_err();
            assert!(matches!(
                err,
                CoreError::InvitationNotPending { status: InvitationStatus::Rejected, .. }
            ));
            assert_eq!(err.code(), ErrorCode::Conflict);
        }
        // rejection leaves the grind alone
        assert_eq!(fx.engine.get_grind(&grind.id).unwrap().participants.len(), 1);
    }

    #[test]
    fn only_receiver_may_resolve() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id], fx.now))
            .unwrap();
        let invitation = fx
            .engine
            .create_invitation(&fx.alice.id, &fx.bob.id, &grind.id)
            .unwrap();
        for actor in [&fx.alice.id, &fx.carol.id] {
            let err = fx.engine.accept(&invitation.id, actor).unwrap_err();
            assert_eq!(err.code(), ErrorCode::Forbidden);
        }
        assert!(fx.engine.accept("missing", &fx.bob.id).unwrap_err().is_not_found());
    }

    #[test]
    fn accepting_when_already_enrolled_still_resolves() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id, &fx.bob.id], fx.now))
            .unwrap();
        let invitation = fx
            .engine
            .create_invitation(&fx.alice.id, &fx.bob.id, &grind.id)
            .unwrap();
        fx.engine.accept(&invitation.id, &fx.bob.id).unwrap();
        assert_eq!(fx.engine.get_grind(&grind.id).unwrap().participants.len(), 2);
    }

    #[test]
    fn invitation_checks() {
        let fx = fixture();
        let grind = fx
            .engine
            .create_grind(request(3, 90, &[&fx.alice.id], fx.now))
            .unwrap();

        let err = fx
            .engine
            .create_invitation(&fx.alice.id, &fx.alice.email, &grind.id)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::SameSenderReceiver)));

        let err = fx
            .engine
            .create_invitation(&fx.alice.id, &fx.bob.id, "missing")
            .unwrap_err();
        assert!(matches!(err, CoreError::GrindNotFound(_)));

        let note = fx.engine.send_message(&fx.alice.id, &fx.bob.id, "hi").unwrap();
        let err = fx.engine.accept(&note.id, &fx.bob.id).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::NotAnInvitation(_))));
    }

    #[test]
    fn messages_and_read_flag() {
        let fx = fixture();
        let note = fx
            .engine
            .send_message(&fx.alice.id, &fx.bob.email, "  see you at the grind ")
            .unwrap();
        assert_eq!(note.content, "see you at the grind");
        assert!(!note.read);

        assert_eq!(fx.engine.sent(&fx.alice.id, 0, 10).unwrap().len(), 1);
        assert_eq!(fx.engine.inbox(&fx.bob.id, 0, 10).unwrap().len(), 1);

        let err = fx.engine.mark_read(&note.id, &fx.alice.id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert!(fx.engine.mark_read(&note.id, &fx.bob.id).unwrap().read);
        assert!(fx.engine.mark_read(&note.id, &fx.bob.id).unwrap().read);

        assert_eq!(
            fx.engine.get_message(&note.id, &fx.carol.id).unwrap_err().code(),
            ErrorCode::Forbidden
        );
        assert_eq!(
            fx.engine.send_message(&fx.alice.id, &fx.bob.id, "   ").unwrap_err().code(),
            ErrorCode::ValidationError
        );
    }
}
