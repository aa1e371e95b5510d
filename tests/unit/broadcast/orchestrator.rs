use super::*;
use crate::broadcast::transport::LocalBus;
use crate::foundation::clock::SystemClock;

fn orchestrator() -> (Orchestrator, Arc<LocalBus>, Arc<SystemClock>) {
    let bus = Arc::new(LocalBus::default());
    let clock = Arc::new(SystemClock::new());
    let orch = Orchestrator::new(bus.clone(), clock.clone(), BroadcastOpts::default());
    (orch, bus, clock)
}

#[tokio::test(start_paused = true)]
async fn broadcast_stamps_a_shared_future_start() {
    let (orch, bus, clock) = orchestrator();
    let mut sub = bus.subscribe("cuecast.play").unwrap();

    let stale = BroadcastPayload::new("hero:triumph", clock.now().plus_ms(1), 10);
    tokio::time::advance(std::time::Duration::from_millis(500)).await;
    let sent = orch.broadcast(stale).await.unwrap();

    assert_eq!(sent.start_timestamp, clock.now().plus_ms(200));
    assert_eq!(sent.expiry_timestamp, sent.start_timestamp.plus_ms(4_000));

    let received = Action::from_value(sub.recv().await.unwrap()).unwrap();
    assert_eq!(received, Action::Play(sent));
}

#[tokio::test]
async fn trigger_events_map_to_payload_fields() {
    let (orch, bus, _clock) = orchestrator();
    let mut sub = bus.subscribe("cuecast.play").unwrap();

    let event = TriggerEvent {
        sfx_key: Some("sfx:cheer".to_string()),
        outcome: Some(Outcome::Positive),
        target: Some(Point::new(3.0, 4.0)),
        recipients: Some(vec![ClientId::new("alice")]),
        ..TriggerEvent::new("hero", "triumph")
    };
    let sent = orch.trigger(&event).await.unwrap();
    assert_eq!(sent.asset_key, "hero:triumph");
    assert_eq!(sent.sfx_key.as_deref(), Some("sfx:cheer"));
    assert_eq!(sent.visual.outcome, Some(Outcome::Positive));
    assert_eq!(sent.visual.target, Some(Point::new(3.0, 4.0)));
    assert!(sent.is_addressed_to(&ClientId::new("alice")));
    assert!(!sent.is_addressed_to(&ClientId::new("bob")));
    assert!(sub.recv().await.is_some());
}

#[tokio::test]
async fn preload_announcements_use_their_own_channel() {
    let (orch, bus, _clock) = orchestrator();
    let mut play = bus.subscribe("cuecast.play").unwrap();
    let mut preload = bus.subscribe("cuecast.preload").unwrap();

    orch.announce_preload("sfx:cheer", "sfx/cheer.wav").await.unwrap();
    let action = Action::from_value(preload.recv().await.unwrap()).unwrap();
    assert_eq!(
        action,
        Action::Preload {
            key: "sfx:cheer".to_string(),
            locator: "sfx/cheer.wav".to_string()
        }
    );
    bus.close();
    assert!(play.recv().await.is_none());
}
