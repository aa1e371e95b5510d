use super::*;
use crate::foundation::core::Timestamp;

#[tokio::test]
async fn every_subscriber_receives_published_messages() {
    let bus = LocalBus::default();
    let channel = channel_name("cuecast", Action::PLAY);
    assert_eq!(channel, "cuecast.play");

    let mut a = bus.subscribe(&channel).unwrap();
    let mut b = bus.subscribe(&channel).unwrap();
    assert_eq!(bus.subscriber_count(&channel), 2);

    bus.publish(&channel, serde_json::json!({"n": 1})).await.unwrap();
    assert_eq!(a.recv().await.unwrap()["n"], 1);
    assert_eq!(b.recv().await.unwrap()["n"], 1);
}

#[tokio::test]
async fn channels_are_isolated_and_late_subscribers_miss_history() {
    let bus = LocalBus::default();
    bus.publish("ns.play", serde_json::json!(1)).await.unwrap();

    let mut play = bus.subscribe("ns.play").unwrap();
    let mut preload = bus.subscribe("ns.preload").unwrap();
    bus.publish("ns.preload", serde_json::json!(2)).await.unwrap();
    bus.publish("ns.play", serde_json::json!(3)).await.unwrap();

    assert_eq!(play.recv().await, Some(serde_json::json!(3)));
    assert_eq!(preload.recv().await, Some(serde_json::json!(2)));
}

#[tokio::test]
async fn lagging_subscriber_skips_ahead() {
    let bus = LocalBus::new(2);
    let mut sub = bus.subscribe("ns.play").unwrap();
    for n in 0..5 {
        bus.publish("ns.play", serde_json::json!(n)).await.unwrap();
    }
    assert_eq!(sub.recv().await, Some(serde_json::json!(3)));
    assert_eq!(sub.recv().await, Some(serde_json::json!(4)));
}

#[tokio::test]
async fn closing_ends_streams_and_empty_names_are_rejected() {
    let bus = LocalBus::default();
    let mut sub = bus.subscribe("ns.play").unwrap();
    bus.close();
    assert_eq!(sub.recv().await, None);

    assert!(matches!(
        bus.publish(" ", serde_json::json!(null)).await,
        Err(CuecastError::Transport(_))
    ));
    assert!(bus.subscribe("").is_err());
}

#[test]
fn actions_have_a_tagged_wire_shape() {
    let play = Action::Play(BroadcastPayload::new("hero:triumph", Timestamp(100), 50));
    let value = play.to_value().unwrap();
    assert_eq!(value["action"], "play");
    assert_eq!(value["data"]["asset_key"], "hero:triumph");
    assert_eq!(value["data"]["expiry_timestamp"], 150);
    assert_eq!(Action::from_value(value).unwrap(), play);

    let preload = Action::Preload {
        key: "sfx:cheer".to_string(),
        locator: "sfx/cheer.wav".to_string(),
    };
    assert_eq!(preload.name(), "preload");
    let value = preload.to_value().unwrap();
    assert_eq!(value["data"]["locator"], "sfx/cheer.wav");

    assert!(Action::from_value(serde_json::json!({"action": "dance"})).is_err());
}
