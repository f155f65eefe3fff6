//! Catalog collaborator tests
//!
//! The catalog stands in for the REST service, so these tests pin down the
//! behavior the engine relies on: lookups, code checks and URL resolution.

use marquee_core::{
    ActivationCodeValidator, Catalog, CodeVerdict, ContentId, ContentItem, ContentRepository,
    CoreError, MediaCategory, MediaUrlResolver, Slide, Track, TrackId,
};

fn sample_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.insert(ContentItem::playlist(
        "mix",
        "Mix",
        vec![
            Track::new("t1", "One", "https://cdn/one.mp3"),
            Track::unresolved("t2", "Two"),
        ],
    ));
    catalog.insert(
        ContentItem::slideshow("show", "Gallery", vec![Slide::new("s1", "one.png", 1)])
            .protected(),
    );
    catalog.add_activation_code(ContentId::new("show"), "SLIDE123");
    catalog.set_media_url(TrackId::new("t2"), "https://cdn/two.mp3");
    catalog
}

#[tokio::test]
async fn fetch_returns_item_or_not_found() {
    let catalog = sample_catalog();

    let item = catalog.fetch(&ContentId::new("mix")).await.unwrap();
    assert_eq!(item.tracks().len(), 2);

    let err = catalog.fetch(&ContentId::new("nope")).await.unwrap_err();
    assert!(matches!(err, CoreError::ContentNotFound(id) if id.as_str() == "nope"));
}

#[tokio::test]
async fn validates_codes_per_content() {
    let catalog = sample_catalog();
    let show = ContentId::new("show");

    assert_eq!(
        catalog.validate("SLIDE123", &show).await.unwrap(),
        CodeVerdict::Accepted
    );
    assert_eq!(
        catalog.validate("WRONG", &show).await.unwrap(),
        CodeVerdict::Rejected
    );
    // Codes are scoped to the item they were issued for
    assert_eq!(
        catalog
            .validate("SLIDE123", &ContentId::new("mix"))
            .await
            .unwrap(),
        CodeVerdict::Rejected
    );
}

#[tokio::test]
async fn resolves_table_urls_before_inline_urls() {
    let catalog = sample_catalog();

    assert_eq!(
        catalog.resolve(&TrackId::new("t2")).await.unwrap(),
        "https://cdn/two.mp3"
    );
    assert_eq!(
        catalog.resolve(&TrackId::new("t1")).await.unwrap(),
        "https://cdn/one.mp3"
    );
    assert!(catalog.resolve(&TrackId::new("t9")).await.is_err());
}

#[test]
fn insert_replaces_existing_item() {
    let mut catalog = sample_catalog();
    catalog.insert(ContentItem::playlist("mix", "Replaced", vec![]));

    assert_eq!(catalog.items.len(), 2);
    assert_eq!(
        catalog.get(&ContentId::new("mix")).unwrap().title,
        "Replaced"
    );
}

#[test]
fn parses_json_document() {
    let json = r#"{
        "items": [
            {"id": "mix", "title": "Mix", "kind": "playlist",
             "tracks": [{"id": "t1", "title": "One", "media_url": "one.mp3"}]}
        ],
        "activation_codes": {"mix": ["MIX1"]}
    }"#;

    let catalog = Catalog::from_json_str(json).unwrap();
    assert_eq!(catalog.items.len(), 1);
    assert_eq!(catalog.activation_codes[&ContentId::new("mix")], vec!["MIX1"]);
    assert!(catalog.media_urls.is_empty());
}

#[test]
fn mime_type_drives_track_category() {
    let json = r#"{
        "items": [{
            "id": "mix",
            "kind": "playlist",
            "tracks": [
                { "id": "song", "title": "Song", "media_url": "song.mp3", "mime_type": "audio/mpeg" },
                { "id": "clip", "title": "Clip", "media_url": "clip.mp4", "mime_type": "video/mp4" },
                { "id": "notes", "title": "Notes", "media_url": "notes.pdf", "category": "document" }
            ]
        }]
    }"#;

    let catalog = Catalog::from_json_str(json).unwrap();
    let categories: Vec<MediaCategory> = catalog
        .get(&ContentId::new("mix"))
        .unwrap()
        .tracks()
        .iter()
        .map(|track| track.category)
        .collect();

    assert_eq!(
        categories,
        vec![
            MediaCategory::Audio,
            MediaCategory::Video,
            MediaCategory::Document
        ]
    );
}

#[test]
fn inserted_soundtrack_is_classified() {
    let mut catalog = Catalog::new();
    let soundtrack = Track::new("bg", "Theme", "theme.bin").with_mime_type("image/gif");
    catalog.insert(
        ContentItem::slideshow("show", "Gallery", vec![Slide::new("s1", "one.png", 1)])
            .with_soundtrack(soundtrack),
    );

    let item = catalog.get(&ContentId::new("show")).unwrap();
    assert_eq!(item.soundtrack().unwrap().category, MediaCategory::Image);
}
