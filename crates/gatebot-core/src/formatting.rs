//! User-facing message rendering (Telegram HTML parse mode).

use crate::callback;
use crate::domain::{Portal, PortalStats};
use crate::service::PortalSummary;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn code(text: &str) -> String {
    format!("<code>{}</code>", escape_html(text))
}

fn bold(text: &str) -> String {
    format!("<b>{}</b>", escape_html(text))
}

fn on_off(v: bool) -> &'static str {
    if v {
        "✅ on"
    } else {
        "❌ off"
    }
}

/// The announcement posted into the public channel, with its verify button.
#[derive(Clone, Debug)]
pub struct ChannelPost {
    pub text: String,
    pub button_text: String,
    pub callback_data: String,
}

pub fn channel_post(portal: &Portal, invite_expiry_minutes: u64) -> ChannelPost {
    // The body is the portal's (owner-editable) welcome message; the token
    // policy footer is always appended.
    let text = format!(
        "{}\n\n⏱️ Invite link expires in {} minutes\n🔒 One-time use link for \
         security",
        escape_html(portal.welcome_message.trim()),
        invite_expiry_minutes,
    );
    ChannelPost {
        text,
        button_text: "🔓 Verify & Join".to_string(),
        callback_data: callback::verify_payload(&portal.id),
    }
}

pub fn verification_success(
    group_title: &str,
    invite_link: &str,
    expires_minutes: u64,
) -> String {
    format!(
        "✅ <b>Verification Successful!</b>\n\nYou can now join {}\n\n🔗 \
         <b>Your Invite Link:</b>\n{}\n\n⚠️ <b>Important:</b>\n• Link expires \
         in {} minutes\n• Link can only be used once\n• Click the link above \
         to join\n\nWelcome aboard! 🎉",
        bold(group_title),
        escape_html(invite_link),
        expires_minutes,
    )
}

/// Shown to the owner right after the wizard confirms.
pub fn portal_created(portal: &Portal) -> String {
    format!(
        "✅ <b>Portal Created Successfully!</b>\n\n🆔 <b>Portal ID:</b> \
         {id}\n📢 <b>Public Channel:</b> @{channel}\n🔒 <b>Private Group:</b> \
         {group}\n\n<b>Next Steps:</b>\n\n1️⃣ Post the verification message in \
         your public channel:\n   Use <code>/portal post {raw_id}</code> to \
         get the message\n\n2️⃣ Make sure the bot is admin in both:\n   • \
         Public channel (to post messages)\n   • Private group (to create \
         invite links)\n\n3️⃣ Users click \"Verify &amp; Join\" → Get one-time \
         invite link\n\n<b>Management Commands:</b>\n• <code>/portal stats \
         {raw_id}</code> - View statistics\n• <code>/portal settings \
         {raw_id}</code> - Change settings\n• <code>/portal delete \
         {raw_id}</code> - Delete portal",
        id = code(portal.id.as_str()),
        channel = escape_html(&portal.channel_handle),
        group = escape_html(&portal.group_title),
        raw_id = portal.id.as_str(),
    )
}

/// One owner-list entry. Counts only verified members for brevity.
pub fn portal_list_entry(summary: &PortalSummary) -> String {
    let portal = &summary.portal;
    let status = if portal.is_active {
        "🟢 active"
    } else {
        "🔴 inactive"
    };
    format!(
        "{} — {} → {}\n   {} · {} verified",
        code(portal.id.as_str()),
        escape_html(&format!("@{}", portal.channel_handle)),
        escape_html(&portal.group_title),
        status,
        summary.stats.verified,
    )
}

pub fn portal_list(summaries: &[PortalSummary]) -> String {
    if summaries.is_empty() {
        return "You don't have any portals yet.\n\nUse /portal setup to create one."
            .to_string();
    }
    let entries: Vec<String> = summaries.iter().map(portal_list_entry).collect();
    format!("📋 <b>Your Portals</b>\n\n{}", entries.join("\n\n"))
}

pub fn portal_stats_text(portal: &Portal, stats: &PortalStats) -> String {
    format!(
        "📊 <b>Portal Stats</b> {}\n\n🔒 Group: {}\n\n⏳ Pending: {}\n✅ \
         Verified: {}\n👥 Joined: {}\n🚫 Banned: {}",
        code(portal.id.as_str()),
        escape_html(&portal.group_title),
        stats.pending,
        stats.verified,
        stats.joined,
        stats.banned,
    )
}

pub fn portal_settings_text(portal: &Portal) -> String {
    format!(
        "⚙️ <b>Portal Settings</b> {}\n\n🔘 Active: {}\n👤 Require username: \
         {}\n🖼️ Require profile photo: {}\n\nUse the buttons below to toggle.",
        code(portal.id.as_str()),
        on_off(portal.is_active),
        on_off(portal.require_username),
        on_off(portal.require_profile_photo),
    )
}

pub fn delete_confirmation_text(portal: &Portal) -> String {
    format!(
        "⚠️ Delete portal {} for {}?\n\nAll verification records for it will \
         be removed. This cannot be undone.",
        code(portal.id.as_str()),
        bold(&portal.group_title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::testutil::make_portal;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn channel_post_carries_verify_payload() {
        let portal = make_portal(UserId(1));
        let post = channel_post(&portal, 5);

        assert!(post.text.contains("Test Group"));
        assert!(post.text.contains("5 minutes"));
        assert_eq!(
            post.callback_data,
            format!("portal_verify:{}", portal.id.as_str())
        );
    }

    #[test]
    fn channel_post_uses_custom_welcome_message() {
        let mut portal = make_portal(UserId(1));
        portal.welcome_message = "Members of <The Club> apply below.".into();
        let post = channel_post(&portal, 5);

        assert!(post.text.starts_with("Members of &lt;The Club&gt;"));
        assert!(post.text.contains("expires in 5 minutes"));
    }

    #[test]
    fn success_message_includes_link_and_expiry() {
        let text = verification_success("Test Group", "https://t.me/+abc", 5);
        assert!(text.contains("https://t.me/+abc"));
        assert!(text.contains("5 minutes"));
        assert!(text.contains("only be used once"));
    }

    #[test]
    fn created_message_escapes_group_title() {
        let mut portal = make_portal(UserId(1));
        portal.group_title = "<Club> & Friends".into();
        let text = portal_created(&portal);

        assert!(text.contains("&lt;Club&gt; &amp; Friends"));
        assert!(text.contains(&format!("/portal post {}", portal.id.as_str())));
    }

    #[test]
    fn empty_list_points_at_setup() {
        assert!(portal_list(&[]).contains("/portal setup"));
    }

    #[test]
    fn settings_text_reflects_flags() {
        let mut portal = make_portal(UserId(1));
        portal.require_username = true;
        let text = portal_settings_text(&portal);

        assert!(text.contains("Require username: ✅ on"));
        assert!(text.contains("Require profile photo: ❌ off"));
    }
}
