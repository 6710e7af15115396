//! Notification text for a new message

use super::Notification;
use crate::models::{Identity, MessageCandidate, MessageId};

pub const ANDROID_URL_TITLE: &str = "Open in Gmail for Android";

/// Pushover field limits, in characters
pub const TITLE_LIMIT: usize = 250;
pub const MESSAGE_LIMIT: usize = 1024;

/// Deep link into the Gmail web UI for the right signed-in account
pub fn web_url(identity: &Identity, id: &MessageId) -> String {
    format!(
        "https://mail.google.com/mail?authuser={}#all/{}",
        urlencoding::encode(identity.as_str()),
        id.as_str()
    )
}

/// Deep link into the Gmail Android app
pub fn android_url(id: &MessageId) -> String {
    format!("googlegmail:///cv={}", id.as_str())
}

/// Cut `text` to at most `limit` characters, marking the cut with an ellipsis
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(limit - 1).collect();
    out.push('\u{2026}');
    out
}

/// Build the notification for one new message
///
/// Long From/To headers are shortened so the links at the end of the
/// message always fit.
pub fn format_notification(candidate: &MessageCandidate, identity: &Identity) -> Notification {
    let web = web_url(identity, &candidate.id);
    let android = android_url(&candidate.id);

    let links = format!("Web URL: {}\nAndroid URL: {}", web, android);
    let (from, to) = (candidate.header("From"), candidate.header("To"));

    // "From: " + "\nTo: " + "\n"
    let room = MESSAGE_LIMIT.saturating_sub(links.chars().count() + 12);
    let (from_len, to_len) = (from.chars().count(), to.chars().count());
    let from_room = from_len.min(room.saturating_sub(to_len.min(room / 2)));
    let to_room = room - from_room;

    let message = format!(
        "From: {}\nTo: {}\n{}",
        truncate_chars(from, from_room),
        truncate_chars(to, to_room),
        links
    );

    Notification {
        title: truncate_chars(&format!("New email: {}", candidate.subject()), TITLE_LIMIT),
        message: truncate_chars(&message, MESSAGE_LIMIT),
        url: android,
        url_title: ANDROID_URL_TITLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MISSING_HEADER;

    #[test]
    fn test_format_notification() {
        let identity = Identity::parse("me@example.com").unwrap();
        let candidate = MessageCandidate::new("abc123", 1000)
            .with_header("Subject", "Lunch?")
            .with_header("From", "Bob <bob@example.com>")
            .with_header("To", "me@example.com");

        let n = format_notification(&candidate, &identity);
        assert_eq!(n.title, "New email: Lunch?");
        assert_eq!(
            n.message,
            "From: Bob <bob@example.com>\n\
             To: me@example.com\n\
             Web URL: https://mail.google.com/mail?authuser=me%40example.com#all/abc123\n\
             Android URL: googlegmail:///cv=abc123"
        );
        assert_eq!(n.url, "googlegmail:///cv=abc123");
        assert_eq!(n.url_title, "Open in Gmail for Android");
    }

    #[test]
    fn test_missing_headers_use_sentinel() {
        let identity = Identity::parse("me@example.com").unwrap();
        let candidate = MessageCandidate::new("m1", 1000);

        let n = format_notification(&candidate, &identity);
        assert_eq!(n.title, format!("New email: {}", MISSING_HEADER));
        assert!(n.message.starts_with(&format!(
            "From: {}\nTo: {}\n",
            MISSING_HEADER, MISSING_HEADER
        )));
    }

    #[test]
    fn test_web_url_encodes_identity() {
        let identity = Identity::parse("me+alerts@example.com").unwrap();
        assert_eq!(
            web_url(&identity, &MessageId::new("abc")),
            "https://mail.google.com/mail?authuser=me%2Balerts%40example.com#all/abc"
        );
    }

    #[test]
    fn test_long_headers_fit_pushover_limits() {
        let identity = Identity::parse("me@example.com").unwrap();
        let recipients: Vec<String> = (0..60)
            .map(|i| format!("Recipient {} <r{}@example.com>", i, i))
            .collect();
        let candidate = MessageCandidate::new("abc123", 1000)
            .with_header("Subject", "é".repeat(300))
            .with_header("From", "Bob <bob@example.com>")
            .with_header("To", recipients.join(", "));

        let n = format_notification(&candidate, &identity);

        assert_eq!(n.title.chars().count(), TITLE_LIMIT);
        assert!(n.title.ends_with('\u{2026}'));
        assert!(n.message.chars().count() <= MESSAGE_LIMIT);
        // Sender and links survive, only the recipient list is cut
        assert!(n.message.starts_with("From: Bob <bob@example.com>\nTo: Recipient 0"));
        assert!(n.message.ends_with(
            "Web URL: https://mail.google.com/mail?authuser=me%40example.com#all/abc123\n\
             Android URL: googlegmail:///cv=abc123"
        ));
    }

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello!", 5), "hell\u{2026}");
        assert_eq!(truncate_chars("ééééé", 3), "éé\u{2026}");
    }
}
