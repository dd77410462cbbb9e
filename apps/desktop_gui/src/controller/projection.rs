//! Pure view-model helpers: form validation and per-frame projections of
//! conversation state. Everything here is synchronous and side-effect free
//! so the rules can be tested without an event loop or a window.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use shared::{
    domain::{MessageId, UserId},
    protocol::MessagePayload,
};

fn email_shape() -> &'static Regex {
    static EMAIL_SHAPE: OnceLock<Regex> = OnceLock::new();
    EMAIL_SHAPE.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").unwrap())
}

/// Per-field login form errors. `None` means the field passed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoginFieldErrors {
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl LoginFieldErrors {
    pub fn is_clean(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocusField {
    Email,
    Password,
}

/// The field the login form should focus after a failed validation pass,
/// top-most error first.
pub fn login_focus_for(errors: &LoginFieldErrors) -> Option<LoginFocusField> {
    if errors.email.is_some() {
        Some(LoginFocusField::Email)
    } else if errors.password.is_some() {
        Some(LoginFocusField::Password)
    } else {
        None
    }
}

pub fn validate_login(email: &str, password: &str) -> LoginFieldErrors {
    let mut errors = LoginFieldErrors::default();
    if !email_shape().is_match(email.trim()) {
        errors.email = Some("Valid email is required");
    }
    if password.len() < 6 {
        errors.password = Some("Password must be at least 6 characters");
    }
    errors
}

/// Conversation rows after applying the local hide set. Ordering of the
/// input is preserved; hidden ids never reach a view.
pub fn visible_messages<'a>(
    messages: &'a [MessagePayload],
    hidden: &HashSet<MessageId>,
) -> Vec<&'a MessagePayload> {
    messages
        .iter()
        .filter(|message| !hidden.contains(&message.message_id))
        .collect()
}

pub fn can_send(text: &str, has_attachment: bool, busy: bool) -> bool {
    if busy {
        return false;
    }
    !text.trim().is_empty() || has_attachment
}

/// A chime plays only for a peer's message, only when sound is enabled,
/// and never before the first user interaction with the window.
pub fn should_play_notification(
    message: &MessagePayload,
    local_user: UserId,
    sound_enabled: bool,
    has_interacted: bool,
) -> bool {
    sound_enabled && has_interacted && message.sender_id != local_user
}

/// Result of leaving the profile-name editor. `None` means nothing to
/// submit: the draft was blank or identical to the stored name.
pub fn commit_name_edit(current: &str, draft: &str) -> Option<String> {
    let trimmed = draft.trim();
    if trimmed.is_empty() || trimmed == current {
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::domain::DeliveryStatus;

    fn message(id: i64, sender: i64, receiver: i64) -> MessagePayload {
        MessagePayload {
            message_id: MessageId(id),
            sender_id: UserId(sender),
            receiver_id: UserId(receiver),
            text: Some(format!("message {id}")),
            image: None,
            status: DeliveryStatus::Sent,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn malformed_email_and_short_password_fail_together() {
        let errors = validate_login("bad", "1234");
        assert_eq!(errors.email, Some("Valid email is required"));
        assert_eq!(errors.password, Some("Password must be at least 6 characters"));
        assert!(!errors.is_clean());
    }

    #[test]
    fn plausible_credentials_pass_validation() {
        let errors = validate_login("a@b.com", "abcdef");
        assert!(errors.is_clean());
        assert_eq!(login_focus_for(&errors), None);
    }

    #[test]
    fn focus_lands_on_the_top_most_failed_field() {
        let both = validate_login("bad", "1234");
        assert_eq!(login_focus_for(&both), Some(LoginFocusField::Email));

        let password_only = validate_login("a@b.com", "1234");
        assert_eq!(login_focus_for(&password_only), Some(LoginFocusField::Password));
    }

    #[test]
    fn email_shape_is_unanchored() {
        // Addresses embedded in noise still satisfy the shape check.
        assert!(validate_login("  someone@example.org  ", "abcdef").is_clean());
    }

    #[test]
    fn hidden_messages_are_filtered_but_order_is_kept() {
        let messages = vec![message(1, 7, 9), message(2, 9, 7), message(3, 7, 9)];
        let mut hidden = HashSet::new();
        hidden.insert(MessageId(2));

        let visible = visible_messages(&messages, &hidden);
        let ids: Vec<i64> = visible.iter().map(|m| m.message_id.0).collect();
        assert_eq!(ids, vec![1, 3]);

        // Hiding the same message again changes nothing.
        hidden.insert(MessageId(2));
        assert_eq!(visible_messages(&messages, &hidden).len(), 2);
    }

    #[test]
    fn empty_hide_set_is_a_passthrough() {
        let messages = vec![message(1, 7, 9), message(2, 9, 7)];
        let visible = visible_messages(&messages, &HashSet::new());
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn send_requires_text_or_attachment() {
        assert!(!can_send("", false, false));
        assert!(!can_send("   \n", false, false));
        assert!(can_send("hello", false, false));
        assert!(can_send("", true, false));
    }

    #[test]
    fn send_is_blocked_while_a_send_is_in_flight() {
        assert!(!can_send("hello", true, true));
    }

    #[test]
    fn chime_gates_on_sender_sound_and_interaction() {
        let local = UserId(7);
        let incoming = message(1, 9, 7);
        let own = message(2, 7, 9);

        assert!(should_play_notification(&incoming, local, true, true));
        assert!(!should_play_notification(&own, local, true, true));
        assert!(!should_play_notification(&incoming, local, false, true));
        assert!(!should_play_notification(&incoming, local, true, false));
    }

    #[test]
    fn name_edit_commit_trims_and_skips_no_ops() {
        assert_eq!(commit_name_edit("Alice", "  Alice  "), None);
        assert_eq!(commit_name_edit("Alice", "   "), None);
        assert_eq!(commit_name_edit("Alice", ""), None);
        assert_eq!(commit_name_edit("Alice", " Alice Smith "), Some("Alice Smith".to_string()));
    }
}
