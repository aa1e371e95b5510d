use super::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "cuecast_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn normalize_path_slash_normalization() {
    assert_eq!(normalize_rel_path("a/b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("./a//b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("../x.png").is_err());
    assert!(normalize_rel_path("/abs.png").is_err());
    assert!(normalize_rel_path("").is_err());
    assert!(normalize_rel_path("./").is_err());
}

#[tokio::test]
async fn fs_fetcher_reads_relative_files() {
    let tmp = temp_dir("fs_fetcher");
    std::fs::create_dir_all(tmp.join("sfx")).unwrap();
    std::fs::write(tmp.join("sfx/cheer.ogg"), b"OggS").unwrap();

    let fetcher = FsFetcher::new(&tmp);
    assert_eq!(fetcher.fetch("sfx\\cheer.ogg").await.unwrap(), b"OggS");
    assert!(fetcher.fetch("sfx/missing.ogg").await.is_err());
    assert!(fetcher.fetch("../etc/passwd").await.is_err());

    std::fs::remove_dir_all(&tmp).ok();
}

#[tokio::test]
async fn static_fetcher_counts_every_attempt() {
    let fetcher = StaticFetcher::new();
    fetcher.insert("a.png", vec![1, 2, 3]);
    assert_eq!(fetcher.fetch("a.png").await.unwrap(), vec![1, 2, 3]);
    assert!(fetcher.fetch("b.png").await.is_err());
    assert_eq!(fetcher.fetch_count("a.png"), 1);
    assert_eq!(fetcher.fetch_count("b.png"), 1);
    assert_eq!(fetcher.fetch_count("c.png"), 0);
}
