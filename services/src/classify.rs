use std::fmt;

use psa_core::ListenStatus;

use crate::Webhook;

/// Plex `Metadata.type` of music tracks
pub const TRACK_TYPE: &str = "track";


/// Outcome of looking at a webhook before any field is extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Listen(ListenStatus),
    Ignored(IgnoreReason),
}

/// Why a webhook will not produce a listen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UntrackedUser(Option<String>),
    NotATrack(Option<String>),
    UnsupportedEvent(Option<String>),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_missing = |v: &Option<String>| v.clone().unwrap_or_else(|| "<missing>".to_owned());
        match self {
            Self::UntrackedUser(user) => write!(f, "event belongs to untracked user {}", or_missing(user)),
            Self::NotATrack(kind) => write!(f, "media type {} is not a track", or_missing(kind)),
            Self::UnsupportedEvent(Some(event)) if event == "media.pause" => {
                f.write_str("ListenBrainz and Last.fm do not support ending \"Now Playing\"")
            },
            Self::UnsupportedEvent(event) => write!(f, "event {} is not supported", or_missing(event)),
        }
    }
}


/// Maps a Plex event name to a listen status
pub fn classify_event(event: &str) -> Option<ListenStatus> {
    match event {
        "media.play" | "media.resume" => Some(ListenStatus::Playing),
        "media.scrobble" => Some(ListenStatus::Scrobbled),
        "media.stop" => Some(ListenStatus::Stopped),
        _ => None,
    }
}

/// Gates a webhook on account, media type and event, in that order
pub fn classify(webhook: &Webhook, tracked_user: &str) -> Classification {
    let owned = |s: Option<&str>| s.map(str::to_owned);

    if webhook.account() != Some(tracked_user) {
        return Classification::Ignored(IgnoreReason::UntrackedUser(owned(webhook.account())));
    }
    if webhook.media_type() != Some(TRACK_TYPE) {
        return Classification::Ignored(IgnoreReason::NotATrack(owned(webhook.media_type())));
    }
    match webhook.event().and_then(classify_event) {
        Some(status) => Classification::Listen(status),
        None => Classification::Ignored(IgnoreReason::UnsupportedEvent(owned(webhook.event()))),
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn webhook(account: &str, kind: &str, event: &str) -> Webhook {
        Webhook::from(json!({
            "event": event,
            "Account": { "title": account },
            "Metadata": { "type": kind },
        }))
    }

    #[test]
    fn event_names() {
        assert_eq!(classify_event("media.play"), Some(ListenStatus::Playing));
        assert_eq!(classify_event("media.resume"), Some(ListenStatus::Playing));
        assert_eq!(classify_event("media.scrobble"), Some(ListenStatus::Scrobbled));
        assert_eq!(classify_event("media.stop"), Some(ListenStatus::Stopped));
        assert_eq!(classify_event("media.pause"), None);
        assert_eq!(classify_event("library.new"), None);
    }

    #[test]
    fn tracked_user_track_events() {
        assert_eq!(
            classify(&webhook("alice", "track", "media.scrobble"), "alice"),
            Classification::Listen(ListenStatus::Scrobbled)
        );
        assert_eq!(
            classify(&webhook("alice", "track", "media.resume"), "alice"),
            Classification::Listen(ListenStatus::Playing)
        );
    }

    #[test]
    fn other_users_are_ignored() {
        assert_eq!(
            classify(&webhook("bob", "track", "media.scrobble"), "alice"),
            Classification::Ignored(IgnoreReason::UntrackedUser(Some("bob".to_owned())))
        );
        assert_eq!(
            classify(&Webhook::from(json!({ "event": "media.play" })), "alice"),
            Classification::Ignored(IgnoreReason::UntrackedUser(None))
        );
    }

    #[test]
    fn other_media_is_ignored() {
        assert_eq!(
            classify(&webhook("alice", "episode", "media.play"), "alice"),
            Classification::Ignored(IgnoreReason::NotATrack(Some("episode".to_owned())))
        );
    }

    #[test]
    fn pause_is_ignored() {
        let class = classify(&webhook("alice", "track", "media.pause"), "alice");
        assert_eq!(class, Classification::Ignored(IgnoreReason::UnsupportedEvent(Some("media.pause".to_owned()))));
        let Classification::Ignored(reason) = class else { unreachable!() };
        assert!(reason.to_string().contains("Now Playing"));
    }
}
