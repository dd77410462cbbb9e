//! UI/backend events and error modeling for the desktop controller.

use std::path::PathBuf;

use shared::{
    domain::{MessageId, UserId},
    protocol::{MessagePayload, UserProfile},
};

use crate::media::PreviewImage;

/// Everything the backend worker can report back to the UI thread.
pub enum UiEvent {
    Info(String),
    Error(UiError),
    SessionEstablished { user: UserProfile },
    SessionClosed,
    ProfileUpdated { user: UserProfile },
    ContactsLoaded { contacts: Vec<UserProfile> },
    HistoryLoaded { peer_id: UserId, messages: Vec<MessagePayload> },
    /// A message in the selected conversation, delivered live or echoed
    /// after a send. Receivers must deduplicate by message id.
    MessageArrived { message: MessagePayload },
    /// The local send completed; the composer may clear its draft.
    MessageSent { message: MessagePayload },
    MessageDeleted { message_id: MessageId },
    /// The local delete-for-both request was accepted by the server.
    MessageDeleteConfirmed { message_id: MessageId },
    PresenceChanged { user_ids: Vec<UserId> },
    AttachmentPreviewReady {
        path: PathBuf,
        image: PreviewImage,
        size_bytes: u64,
    },
    AttachmentPreviewFailed {
        path: PathBuf,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Login,
    SendMessage,
    DeleteMessage,
    Profile,
    General,
}

pub fn classify_login_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("backend worker startup failure")
        || lower.contains("failed to build backend runtime")
    {
        "Backend worker startup failure; verify local app environment and retry.".to_string()
    } else if lower.contains("failed to reach")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Server unreachable; check URL/network and retry sign-in.".to_string()
    } else if lower.contains("401")
        || lower.contains("unauthorized")
        || lower.contains("invalid credential")
    {
        "Invalid email or password.".to_string()
    } else {
        format!("Login failed: {message}")
    }
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Auth => "Authentication",
        UiErrorCategory::Transport => "Connection",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("401")
            || message_lower.contains("403")
            || message_lower.contains("unauthorized")
            || message_lower.contains("forbidden")
            || message_lower.contains("session expired")
            || message_lower.contains("invalid token")
            || message_lower.contains("invalid credential")
            || message_lower.contains("not logged in")
        {
            UiErrorCategory::Auth
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
            || message_lower.contains("refusing")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("transport")
            || message_lower.contains("unavailable")
            || message_lower.contains("unreachable")
            || message_lower.contains("failed to reach")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    /// Auth failures invalidate the session; the UI drops back to the login
    /// view instead of showing a retryable notice.
    pub fn requires_reauth(&self) -> bool {
        self.category == UiErrorCategory::Auth
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBannerSeverity {
    Error,
    Success,
}

/// Transient notice rendered above the active view until dismissed.
#[derive(Debug, Clone)]
pub struct StatusBanner {
    pub severity: StatusBannerSeverity,
    pub message: String,
}

impl StatusBanner {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: StatusBannerSeverity::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: StatusBannerSeverity::Success,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_credentials_classify_as_auth_and_require_reauth() {
        let err = UiError::from_message(
            UiErrorContext::General,
            "HTTP status client error (401 Unauthorized) for url",
        );
        assert_eq!(err.category(), UiErrorCategory::Auth);
        assert!(err.requires_reauth());
    }

    #[test]
    fn command_processor_disconnect_classifies_as_transport() {
        let err = UiError::from_message(
            UiErrorContext::General,
            "Backend command processor disconnected (possible startup/runtime failure)",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
        assert!(!err.requires_reauth());
    }

    #[test]
    fn empty_message_rejection_classifies_as_validation() {
        let err = UiError::from_message(
            UiErrorContext::SendMessage,
            "refusing to send an empty message",
        );
        assert_eq!(err.category(), UiErrorCategory::Validation);
        assert_eq!(err.context(), UiErrorContext::SendMessage);
    }

    #[test]
    fn login_failure_summary_names_unreachable_servers() {
        let text = classify_login_failure("failed to reach login endpoint at http://bad:1");
        assert!(text.contains("Server unreachable"));
    }

    #[test]
    fn login_failure_summary_names_rejected_credentials() {
        let text = classify_login_failure("HTTP status client error (401 Unauthorized)");
        assert_eq!(text, "Invalid email or password.");
    }
}
