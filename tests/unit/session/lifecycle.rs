use std::io::Cursor;

use super::*;
use crate::assets::fetch::StaticFetcher;
use crate::foundation::clock::SystemClock;

fn png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn lifecycle() -> (SessionLifecycle, Arc<AssetCache>) {
    let fetcher = Arc::new(StaticFetcher::new());
    fetcher.insert("a.png", png());
    fetcher.insert("b.png", png());
    fetcher.insert("cheer.wav", b"RIFF\0\0\0\0WAVEfmt ".to_vec());
    let cache = Arc::new(AssetCache::new(fetcher, Arc::new(SystemClock::new())));
    (SessionLifecycle::new(cache.clone()), cache)
}

fn session(id: &str) -> SessionStart {
    SessionStart::new(SessionId::new(id))
        .with_subject(
            Subject::new("hero")
                .with_resource("triumph", "a.png")
                .with_resource("defeat", "missing.png"),
        )
        .with_subject(Subject::new("rival").with_resource("triumph", "b.png"))
        .with_shared("sfx:cheer", "cheer.wav")
}

#[tokio::test]
async fn start_resolves_every_declared_key() {
    let (lifecycle, cache) = lifecycle();
    let report = lifecycle.handle(SessionEvent::Started(session("s1"))).await;
    assert_eq!(
        report,
        SessionReport::Started {
            session_id: SessionId::new("s1"),
            resolved: 3,
            misses: 1,
            evicted: 0,
        }
    );
    for key in ["hero:triumph", "hero:defeat", "rival:triumph", "sfx:cheer"] {
        assert!(cache.get(key).is_some(), "{key} unresolved");
    }
    assert_eq!(lifecycle.active(), Some(SessionId::new("s1")));
}

#[tokio::test]
async fn every_end_reason_evicts_once() {
    for reason in [EndReason::Ended, EndReason::Deleted, EndReason::Deactivated] {
        let (lifecycle, cache) = lifecycle();
        lifecycle.start(session("s1")).await;

        let report = lifecycle
            .handle(SessionEvent::Ended {
                session_id: SessionId::new("s1"),
                reason,
            })
            .await;
        assert_eq!(
            report,
            SessionReport::Ended {
                session_id: SessionId::new("s1"),
                released: 3,
            }
        );
        assert!(cache.get("hero:triumph").is_none());
        assert!(cache.get("hero:defeat").is_none());
        assert!(cache.get("sfx:cheer").is_some());
        assert_eq!(lifecycle.active(), None);

        assert_eq!(lifecycle.end(&SessionId::new("s1"), EndReason::Deleted), 0);
    }
}

#[tokio::test]
async fn new_session_evicts_a_dangling_one() {
    let (lifecycle, cache) = lifecycle();
    lifecycle.start(session("s1")).await;

    let next = SessionStart::new(SessionId::new("s2"))
        .with_subject(Subject::new("rival").with_resource("triumph", "b.png"));
    let report = lifecycle.start(next).await;
    assert!(matches!(report, SessionReport::Started { evicted: 3, .. }));
    assert!(cache.get("hero:triumph").is_none());
    assert!(cache.get("rival:triumph").is_some());
    assert_eq!(cache.active_sessions(), vec![SessionId::new("s2")]);
}

#[test]
fn session_events_parse_from_json() {
    let event: SessionEvent = serde_json::from_str(
        r#"{"event":"ended","session_id":"s9","reason":"deactivated"}"#,
    )
    .unwrap();
    assert_eq!(
        event,
        SessionEvent::Ended {
            session_id: SessionId::new("s9"),
            reason: EndReason::Deactivated,
        }
    );

    let event: SessionEvent = serde_json::from_str(
        r#"{"event":"started","session_id":"s1","subjects":[{"id":"hero","resources":{"triumph":"a.png"}}]}"#,
    )
    .unwrap();
    let SessionEvent::Started(start) = event else {
        panic!("expected start");
    };
    assert_eq!(start.session_requests(), vec![PreloadRequest::new("hero:triumph", "a.png")]);
}
