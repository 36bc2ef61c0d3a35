use crate::domain::PortalId;

/// Parsed button-press payload.
///
/// Wire format is a colon-delimited `<action>:<portal_id>` string for
/// portal-scoped actions, plus a few bare action tokens for the setup and
/// delete confirmations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Verify(PortalId),
    ToggleActive(PortalId),
    ToggleRequireUsername(PortalId),
    ToggleRequirePhoto(PortalId),
    ConfirmDelete(PortalId),
    CancelDelete,
    SetupConfirm,
    SetupCancel,
}

pub const SETUP_CONFIRM_PAYLOAD: &str = "portal_setup_confirm";
pub const SETUP_CANCEL_PAYLOAD: &str = "portal_setup_cancel";
pub const CANCEL_DELETE_PAYLOAD: &str = "portal_cancel_delete";

/// Parse a raw callback payload. Unknown action tokens yield `None` and are
/// ignored by the dispatcher.
pub fn parse_callback(data: &str) -> Option<CallbackAction> {
    match data {
        SETUP_CONFIRM_PAYLOAD => return Some(CallbackAction::SetupConfirm),
        SETUP_CANCEL_PAYLOAD => return Some(CallbackAction::SetupCancel),
        CANCEL_DELETE_PAYLOAD => return Some(CallbackAction::CancelDelete),
        _ => {}
    }

    let (action, id) = data.split_once(':')?;
    if id.is_empty() {
        return None;
    }
    let id = PortalId(id.to_string());

    match action {
        "portal_verify" => Some(CallbackAction::Verify(id)),
        "portal_toggle" => Some(CallbackAction::ToggleActive(id)),
        "portal_req_username" => Some(CallbackAction::ToggleRequireUsername(id)),
        "portal_req_photo" => Some(CallbackAction::ToggleRequirePhoto(id)),
        "portal_confirm_delete" => Some(CallbackAction::ConfirmDelete(id)),
        _ => None,
    }
}

/// Payload for the verify button posted in the public channel.
pub fn verify_payload(id: &PortalId) -> String {
    format!("portal_verify:{id}")
}

pub fn toggle_payload(id: &PortalId) -> String {
    format!("portal_toggle:{id}")
}

pub fn req_username_payload(id: &PortalId) -> String {
    format!("portal_req_username:{id}")
}

pub fn req_photo_payload(id: &PortalId) -> String {
    format!("portal_req_photo:{id}")
}

pub fn confirm_delete_payload(id: &PortalId) -> String {
    format!("portal_confirm_delete:{id}")
}
