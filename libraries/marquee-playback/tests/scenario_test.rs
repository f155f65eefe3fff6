//! End-to-end scenarios for mounted players
//!
//! Each test drives one or two `ContentPlayer`s against a shared
//! `PlaybackResource` backed by the simulated channel.

use async_trait::async_trait;
use marquee_core::{
    ActivationCodeValidator, Catalog, CodeVerdict, ContentId, ContentItem, CoreError, Slide, Track,
};
use marquee_playback::{
    AccessState, ChannelLog, ContentPlayer, EndReason, EngineConfig, EngineEvent, PlaybackError,
    PlaybackResource, SimulatedChannel, StatusSync, Surface,
};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

// ===== Test Helpers =====

mock! {
    pub Validator {}

    #[async_trait]
    impl ActivationCodeValidator for Validator {
        async fn validate(&self, code: &str, content_id: &ContentId) -> marquee_core::Result<CodeVerdict>;
    }
}

fn resource() -> (PlaybackResource, ChannelLog) {
    let channel = SimulatedChannel::new();
    let log = channel.log();
    (PlaybackResource::new(Box::new(channel)), log)
}

fn three_track_playlist() -> ContentItem {
    ContentItem::playlist(
        "mix",
        "Morning Mix",
        vec![
            Track::new("t1", "Sunrise", "sunrise.mp3"),
            Track::new("t2", "Noon", "noon.mp3"),
            Track::new("t3", "Dusk", "dusk.mp3"),
        ],
    )
}

fn protected_slideshow() -> ContentItem {
    ContentItem::slideshow(
        "gallery",
        "Gallery",
        vec![
            Slide::new("s2", "two.png", 2),
            Slide::new("s1", "one.png", 1),
            Slide::new("s3", "three.png", 3),
        ],
    )
    .protected()
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.insert(protected_slideshow());
    catalog.add_activation_code(ContentId::new("gallery"), "SLIDE123");
    catalog
}

fn access_states(events: &[EngineEvent]) -> Vec<AccessState> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::AccessStateChanged { state, .. } => Some(*state),
            _ => None,
        })
        .collect()
}

fn pump(player: &mut ContentPlayer, resource: &mut PlaybackResource) {
    let mut sync = StatusSync::new();
    for update in resource.poll_status(Duration::from_millis(100)) {
        if player.deliver_status(&update, &mut sync, resource).is_none() {
            sync.discard(&update);
        }
    }
}

// ===== Scenarios =====

#[test]
fn unprotected_playlist_plays_immediately() {
    let (mut resource, _log) = resource();
    let mut player = ContentPlayer::new(Arc::new(three_track_playlist()), EngineConfig::default());

    assert_eq!(player.evaluate(&mut resource), AccessState::Granted);
    assert!(matches!(player.surface(), Some(Surface::Playlist(_))));
    assert_eq!(player.snapshot().track_index, Some(0));

    for _ in 0..3 {
        player
            .navigate(marquee_playback::Direction::Forward, &mut resource)
            .unwrap();
    }
    assert_eq!(player.snapshot().track_index, Some(0));
}

#[tokio::test]
async fn valid_code_unlocks_slideshow() {
    let (mut resource, _log) = resource();
    let catalog = catalog();
    let mut player = ContentPlayer::new(Arc::new(protected_slideshow()), EngineConfig::default());

    assert_eq!(player.evaluate(&mut resource), AccessState::Locked);
    let state = player
        .submit_code("SLIDE123", &catalog, &mut resource)
        .await
        .unwrap();

    assert_eq!(state, AccessState::Granted);
    assert_eq!(
        access_states(&player.drain_events()),
        vec![AccessState::Validating, AccessState::Granted]
    );

    let Some(Surface::Slideshow(cycler)) = player.surface() else {
        panic!("slideshow surface expected");
    };
    let order: Vec<u32> = cycler.slides().iter().map(|slide| slide.order).collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[tokio::test]
async fn wrong_code_denies_and_clears_field() {
    let (mut resource, _log) = resource();
    let catalog = catalog();
    let mut player = ContentPlayer::new(Arc::new(protected_slideshow()), EngineConfig::default());
    player.evaluate(&mut resource);
    player.set_code_input("WRONG");

    let state = player
        .submit_code("WRONG", &catalog, &mut resource)
        .await
        .unwrap();

    assert_eq!(state, AccessState::Denied);
    let snapshot = player.snapshot();
    assert_eq!(snapshot.code_input, "");
    assert!(snapshot.last_denial.is_some());
    assert!(player.surface().is_none());
}

#[tokio::test]
async fn transport_error_is_a_retryable_denial() {
    let (mut resource, _log) = resource();
    let mut validator = MockValidator::new();
    let mut attempts = 0;
    validator.expect_validate().times(2).returning(move |_, _| {
        attempts += 1;
        if attempts == 1 {
            Err(CoreError::network("connection reset"))
        } else {
            Ok(CodeVerdict::Accepted)
        }
    });

    let mut player = ContentPlayer::new(Arc::new(protected_slideshow()), EngineConfig::default());
    player.evaluate(&mut resource);

    let first = player
        .submit_code("SLIDE123", &validator, &mut resource)
        .await
        .unwrap();
    assert_eq!(first, AccessState::Denied);

    let second = player
        .submit_code("SLIDE123", &validator, &mut resource)
        .await
        .unwrap();
    assert_eq!(second, AccessState::Granted);
}

#[test]
fn empty_code_never_reaches_validator() {
    let (mut resource, _log) = resource();
    let mut player = ContentPlayer::new(Arc::new(protected_slideshow()), EngineConfig::default());
    player.evaluate(&mut resource);

    assert!(player.begin_code_submission("  \t ").is_err());
    assert_eq!(player.access_state(), AccessState::Locked);
}

#[test]
fn preview_ticks_thirty_times_then_expires_once() {
    let (mut resource, _log) = resource();
    let mut player = ContentPlayer::new(Arc::new(protected_slideshow()), EngineConfig::default());
    player.evaluate(&mut resource);
    player.start_preview(Some(30), &mut resource).unwrap();
    player.drain_events();

    for _ in 0..45 {
        player.advance_clock(Duration::from_secs(1), &mut resource);
    }

    let events = player.drain_events();
    let ticks: Vec<u32> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::PreviewTick {
                remaining_seconds, ..
            } => Some(*remaining_seconds),
            _ => None,
        })
        .collect();
    let expiries = events
        .iter()
        .filter(|event| matches!(event, EngineEvent::PreviewExpired { .. }))
        .count();

    assert_eq!(ticks, (0..30).rev().collect::<Vec<_>>());
    assert_eq!(expiries, 1);
    assert_eq!(player.access_state(), AccessState::Expired);
    assert!(player.surface().is_none());
}

#[test]
fn cancelled_preview_never_expires() {
    let (mut resource, _log) = resource();
    let mut player = ContentPlayer::new(Arc::new(protected_slideshow()), EngineConfig::default());
    player.evaluate(&mut resource);
    player.start_preview(Some(30), &mut resource).unwrap();

    for _ in 0..10 {
        player.advance_clock(Duration::from_secs(1), &mut resource);
    }
    player.cancel_preview(&mut resource).unwrap();
    for _ in 0..30 {
        player.advance_clock(Duration::from_secs(1), &mut resource);
    }

    let events = player.drain_events();
    assert!(!events
        .iter()
        .any(|event| matches!(event, EngineEvent::PreviewExpired { .. })));
    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::SessionEnded {
            reason: EndReason::Cancelled,
            ..
        }
    )));
    assert_eq!(player.access_state(), AccessState::Locked);
}

#[test]
fn preview_counts_down_while_paused() {
    let (mut resource, _log) = resource();
    let playlist = three_track_playlist().protected();
    let mut player = ContentPlayer::new(Arc::new(playlist), EngineConfig::default());
    player.evaluate(&mut resource);
    player.start_preview(Some(10), &mut resource).unwrap();
    pump(&mut player, &mut resource);

    // Never pressed play; the countdown still runs
    for _ in 0..4 {
        player.advance_clock(Duration::from_millis(500), &mut resource);
    }
    assert_eq!(player.preview_state().unwrap().remaining_seconds, 8);
}

#[test]
fn racing_widgets_leave_one_owner() {
    let (mut resource, log) = resource();
    let mut a = ContentPlayer::new(Arc::new(three_track_playlist()), EngineConfig::default());
    let mut b = ContentPlayer::new(Arc::new(three_track_playlist()), EngineConfig::default());

    a.evaluate(&mut resource);
    b.evaluate(&mut resource);
    a.drain_events();

    // A only learns about B when it touches the channel again
    a.navigate(marquee_playback::Direction::Forward, &mut resource)
        .unwrap();

    assert_eq!(resource.owner(), b.snapshot().session);
    assert!(a.snapshot().superseded);
    assert!(a.drain_events().iter().any(|event| matches!(
        event,
        EngineEvent::SessionEnded {
            reason: EndReason::Superseded,
            ..
        }
    )));
    assert_eq!(log.snapshot().overlapping_loads, 0);
}

#[test]
fn toggle_before_load_is_not_ready() {
    let (mut resource, _log) = resource();
    let mut player = ContentPlayer::new(Arc::new(three_track_playlist()), EngineConfig::default());
    player.evaluate(&mut resource);

    assert!(matches!(
        player.toggle_play_pause(&mut resource),
        Err(PlaybackError::NotReady)
    ));
    pump(&mut player, &mut resource);
    assert!(player.toggle_play_pause(&mut resource).unwrap());
}

#[test]
fn locked_player_refuses_transport() {
    let (mut resource, _log) = resource();
    let playlist = three_track_playlist().protected();
    let mut player = ContentPlayer::new(Arc::new(playlist), EngineConfig::default());
    player.evaluate(&mut resource);

    assert!(matches!(
        player.toggle_play_pause(&mut resource),
        Err(PlaybackError::Locked)
    ));
    assert_eq!(resource.owner(), None);
}

#[test]
fn unmount_is_idempotent_and_releases_everything() {
    let (mut resource, _log) = resource();
    let show = protected_slideshow().with_soundtrack(Track::new("bgm", "Ambience", "bgm.mp3"));
    let mut player = ContentPlayer::new(Arc::new(show), EngineConfig::default());
    player.evaluate(&mut resource);
    player.start_preview(None, &mut resource).unwrap();
    assert!(resource.owner().is_some());

    player.unmount(&mut resource);
    player.unmount(&mut resource);

    assert_eq!(resource.owner(), None);
    assert!(player.is_unmounted());
    assert!(player.preview_state().is_none());

    let ended = player
        .drain_events()
        .iter()
        .filter(|event| matches!(event, EngineEvent::SessionEnded { .. }))
        .count();
    assert_eq!(ended, 1);
}

#[test]
fn late_validation_result_does_not_resurrect_view() {
    let (mut resource, _log) = resource();
    let mut player = ContentPlayer::new(Arc::new(protected_slideshow()), EngineConfig::default());
    player.evaluate(&mut resource);

    let (ticket, _code) = player.begin_code_submission("SLIDE123").unwrap();
    player.unmount(&mut resource);

    assert_eq!(
        player.complete_code_submission(ticket, Ok(CodeVerdict::Accepted), &mut resource),
        None
    );
    assert!(player.surface().is_none());
    assert_eq!(resource.owner(), None);
}

#[test]
fn slideshow_autoplay_follows_configured_interval() {
    let (mut resource, _log) = resource();
    let show = ContentItem::slideshow(
        "open",
        "Open Gallery",
        vec![Slide::new("a", "a.png", 1), Slide::new("b", "b.png", 2)],
    );
    let mut player = ContentPlayer::new(Arc::new(show), EngineConfig::default());
    player.evaluate(&mut resource);

    player.advance_clock(Duration::from_millis(2_999), &mut resource);
    assert_eq!(player.snapshot().slide_index, Some(0));
    player.advance_clock(Duration::from_millis(1), &mut resource);
    assert_eq!(player.snapshot().slide_index, Some(1));

    // Manual navigation pauses autoplay
    player
        .navigate(marquee_playback::Direction::Forward, &mut resource)
        .unwrap();
    player.advance_clock(Duration::from_secs(30), &mut resource);
    assert_eq!(player.snapshot().slide_index, Some(0));
    assert!(!player.snapshot().autoplay);
}
