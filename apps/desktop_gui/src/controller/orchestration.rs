//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = match &cmd {
        BackendCommand::Login { .. } => "login",
        BackendCommand::Logout => "logout",
        BackendCommand::UpdateProfile { .. } => "update_profile",
        BackendCommand::ListContacts => "list_contacts",
        BackendCommand::SelectConversation { .. } => "select_conversation",
        BackendCommand::ClearConversation => "clear_conversation",
        BackendCommand::SendMessage { .. } => "send_message",
        BackendCommand::DeleteMessage { .. } => "delete_message",
        BackendCommand::LoadAttachmentPreview { .. } => "load_attachment_preview",
        BackendCommand::PlayMessageChime => "play_message_chime",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); retry sign-in"
                    .to_string();
        }
    }
}
