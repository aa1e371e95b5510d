use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CuecastError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        CuecastError::transport("x")
            .to_string()
            .contains("transport error:")
    );
    assert!(
        CuecastError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        CuecastError::cache_miss("hero:triumph")
            .to_string()
            .contains("'hero:triumph'")
    );
}

#[test]
fn resource_load_names_key_and_reason() {
    let err = CuecastError::resource_load("hero:triumph", "404");
    let s = err.to_string();
    assert!(s.contains("hero:triumph"));
    assert!(s.contains("404"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CuecastError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn serde_json_errors_convert() {
    let bad = serde_json::from_str::<u32>("nope").unwrap_err();
    let err = CuecastError::from(bad);
    assert!(matches!(err, CuecastError::Serde(_)));
}
