//! Backend commands queued from UI to backend worker.

use shared::domain::{MessageId, UserId};
use std::path::PathBuf;

pub enum BackendCommand {
    Login {
        server_url: String,
        email: String,
        password: String,
    },
    Logout,
    UpdateProfile {
        full_name: Option<String>,
        avatar_path: Option<PathBuf>,
    },
    ListContacts,
    SelectConversation {
        peer_id: UserId,
    },
    ClearConversation,
    SendMessage {
        peer_id: UserId,
        text: String,
        attachment_path: Option<PathBuf>,
    },
    DeleteMessage {
        message_id: MessageId,
    },
    /// Read and decode a picked composer attachment off the UI thread; the
    /// result comes back as an attachment-preview event.
    LoadAttachmentPreview {
        path: PathBuf,
    },
    /// Play the message-arrival chime off the UI thread. Playback failure
    /// comes back as a status notice, never as an error.
    PlayMessageChime,
}
