use serde_json::json;

use super::*;

const SAMPLE: &str = r#"{
    "event": "media.scrobble",
    "user": true,
    "owner": true,
    "Account": {
        "id": 1,
        "thumb": "https://plex.tv/users/1022b120ffbaa/avatar?c=1465525047",
        "title": "alice"
    },
    "Server": {
        "title": "Office",
        "uuid": "54664a3d8acc39983675640ec9ce00b70af9cc36"
    },
    "Player": {
        "local": true,
        "publicAddress": "200.200.200.200",
        "title": "Plexamp",
        "uuid": "r6yfkdnfggbh2bdnvkffwbms"
    },
    "Metadata": {
        "librarySectionType": "artist",
        "ratingKey": "1936",
        "key": "/library/metadata/1936",
        "parentRatingKey": "1935",
        "grandparentRatingKey": "1934",
        "guid": "plex://track/5d07cdb5403c640290f4e7ad",
        "parentGuid": "plex://album/5d07c1a1403c640290b0d1a3",
        "grandparentGuid": "plex://artist/5d07bbfc403c6402904a5e85",
        "type": "track",
        "title": "Song A",
        "grandparentKey": "/library/metadata/1934",
        "parentKey": "/library/metadata/1935",
        "grandparentTitle": "Artist A",
        "parentTitle": "Album A",
        "originalTitle": "Featured Artist",
        "index": 3,
        "parentIndex": 1,
        "Guid": [
            { "id": "mbid://0b6a1bb1-5aa4-41a5-b8a6-b1ef4c1e5ba4" }
        ]
    }
}"#;

fn sample() -> Webhook { Webhook::parse(SAMPLE).expect("Failed to parse webhook") }

#[test]
fn test_envelope() {
    let webhook = sample();
    assert_eq!(webhook.account(), Some("alice"));
    assert_eq!(webhook.event(), Some("media.scrobble"));
    assert_eq!(webhook.media_type(), Some("track"));
    assert_eq!(webhook.guid(), Some("plex://track/5d07cdb5403c640290f4e7ad"));
    assert_eq!(webhook.key(), Some("/library/metadata/1936"));
}

#[test]
fn test_track_info() {
    let expected = TrackInfo {
        artist: Some("Featured Artist".to_owned()),
        album_artist: Some("Artist A".to_owned()),
        album: Some("Album A".to_owned()),
        track_title: Some("Song A".to_owned()),
        track_number: Some(3),
        track_mbid: Some("0b6a1bb1-5aa4-41a5-b8a6-b1ef4c1e5ba4".to_owned()),
        ..Default::default()
    };
    assert_eq!(sample().track_info(), expected);
}

#[test]
fn artist_falls_back_to_album_artist() {
    let webhook = Webhook::from(json!({
        "Metadata": { "grandparentTitle": "Artist A" }
    }));
    assert_eq!(webhook.artist().as_deref(), Some("Artist A"));
    assert_eq!(webhook.album_artist().as_deref(), Some("Artist A"));
}

#[test]
fn missing_fields_do_not_affect_others() {
    let webhook = Webhook::from(json!({
        "event": "media.play",
        "Metadata": {
            "type": "track",
            "title": "Song A",
            "index": "7",
            "Guid": "not a list"
        }
    }));

    let expected = TrackInfo {
        track_title: Some("Song A".to_owned()),
        track_number: Some(7),
        ..Default::default()
    };
    assert_eq!(webhook.track_info(), expected);
    assert_eq!(webhook.account(), None);
}

#[test]
fn empty_strings_are_unknown() {
    let webhook = Webhook::from(json!({
        "Metadata": { "title": "", "parentTitle": "Album A", "grandparentTitle": "" }
    }));
    assert_eq!(webhook.track_title(), None);
    assert_eq!(webhook.artist(), None);
    assert_eq!(webhook.album().as_deref(), Some("Album A"));
}

#[test]
fn no_metadata_at_all() {
    let webhook = Webhook::from(json!({ "event": "media.play" }));
    assert_eq!(webhook.track_info(), TrackInfo::default());
}

#[test]
fn rejects_malformed_json() {
    assert!(Webhook::parse("{\"event\": ").is_err());
    assert!(Webhook::parse("payload").is_err());
}
