use super::*;

fn payload(start: u64) -> BroadcastPayload {
    BroadcastPayload::new("hero:triumph", Timestamp(start), 2_000).with_sfx("sfx:cheer")
}

#[test]
fn signature_ignores_timing_fields() {
    let a = payload(1_000);
    let b = payload(1_050);
    assert_eq!(a.signature(), b.signature());

    let c = payload(1_000).with_visual(VisualParams {
        outcome: Some(Outcome::Negative),
        ..VisualParams::default()
    });
    assert_ne!(a.signature(), c.signature());

    let d = BroadcastPayload::new("hero:triumph", Timestamp(1_000), 2_000);
    assert_ne!(a.signature(), d.signature());
}

#[test]
fn signature_ignores_recipient_order() {
    let a = payload(0).with_recipients(vec![ClientId::new("a"), ClientId::new("b")]);
    let b = payload(0).with_recipients(vec![ClientId::new("b"), ClientId::new("a")]);
    assert_eq!(a.signature(), b.signature());
    assert_ne!(a.signature(), payload(0).signature());
}

#[test]
fn restamp_moves_start_but_keeps_expiry() {
    let p = payload(1_000).restamped(Timestamp(2_500));
    assert_eq!(p.start_timestamp, Timestamp(2_500));
    assert_eq!(p.expiry_timestamp, Timestamp(3_000));
    assert!(!p.is_expired_at(p.start_timestamp));

    let late = payload(1_000).restamped(Timestamp(5_000));
    assert_eq!(late.expiry_timestamp, Timestamp(3_000));
    assert!(late.is_expired_at(late.start_timestamp));
}

#[test]
fn expiry_and_addressing() {
    let p = payload(1_000);
    assert!(!p.is_expired_at(Timestamp(3_000)));
    assert!(p.is_expired_at(Timestamp(3_001)));

    assert!(p.is_addressed_to(&ClientId::new("anyone")));
    let p = p.with_recipients(vec![ClientId::new("alice")]);
    assert!(p.is_addressed_to(&ClientId::new("alice")));
    assert!(!p.is_addressed_to(&ClientId::new("bob")));
}

#[test]
fn wire_format_uses_optional_defaults() {
    let json = r#"{"start_timestamp":10,"asset_key":"k","expiry_timestamp":20}"#;
    let p: BroadcastPayload = serde_json::from_str(json).unwrap();
    assert_eq!(p.asset_key, "k");
    assert!(p.sfx_key.is_none());
    assert_eq!(p.visual, VisualParams::default());

    let outcome = serde_json::to_string(&Outcome::Emphatic).unwrap();
    assert_eq!(outcome, "\"emphatic\"");
}
