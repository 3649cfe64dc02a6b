//! Integration tests for asset-cache

mod pipeline_tests {
    use asset_cache::cache::{CacheMap, CacheStore, DEFAULT_CACHE_FILE};
    use asset_cache::{
        fingerprint, AssetCacheError, CacheKey, FilterStage, Pipeline, Record, RunReport,
    };
    use futures_util::stream;
    use serial_test::serial;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, bytes: usize) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, vec![b'x'; bytes]).unwrap();
        path
    }

    fn pipeline(root: &Path) -> Pipeline {
        let store = CacheStore::with_root(root, DEFAULT_CACHE_FILE);
        Pipeline::new(FilterStage::with_store(Arc::new(store)))
    }

    async fn run(root: &Path, paths: &[PathBuf]) -> RunReport {
        let mut records = Vec::new();
        for path in paths {
            records.push(Record::from_file(path).await.unwrap());
        }
        pipeline(root).run(stream::iter(records)).await.unwrap()
    }

    fn forwarded_keys(root: &Path, report: &RunReport) -> Vec<String> {
        let mut keys: Vec<_> = report
            .forwarded_paths()
            .iter()
            .map(|p| CacheKey::from_path(root, p).as_str().to_string())
            .collect();
        keys.sort();
        keys
    }

    fn written(root: &Path) -> CacheMap {
        CacheStore::load(&root.join(DEFAULT_CACHE_FILE))
    }

    #[tokio::test]
    async fn first_run_forwards_everything() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "img/a.jpg", 10);
        let b = write(dir.path(), "img/b.jpg", 20);

        let report = run(dir.path(), &[a, b]).await;

        assert_eq!(forwarded_keys(dir.path(), &report), ["img/a.jpg", "img/b.jpg"]);
        assert!(report.flushed);
        let cache = written(dir.path());
        assert_eq!(cache.len(), 2);
        let key = CacheKey::from("img/a.jpg");
        assert_eq!(cache.get(&key), Some(&fingerprint(&key, 10)));
    }

    #[tokio::test]
    async fn unchanged_rerun_forwards_nothing_and_keeps_cache() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            write(dir.path(), "a.jpg", 10),
            write(dir.path(), "b.jpg", 20),
        ];

        run(dir.path(), &paths).await;
        let first = fs::read_to_string(dir.path().join(DEFAULT_CACHE_FILE)).unwrap();

        let report = run(dir.path(), &paths).await;
        assert!(report.forwarded.is_empty());
        assert_eq!(report.suppressed.len(), 2);

        let second = fs::read_to_string(dir.path().join(DEFAULT_CACHE_FILE)).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn size_change_forwards_only_changed_file() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.jpg", 10);
        let b = write(dir.path(), "b.jpg", 20);
        run(dir.path(), &[a.clone(), b.clone()]).await;

        write(dir.path(), "b.jpg", 25);
        let report = run(dir.path(), &[a, b]).await;

        assert_eq!(forwarded_keys(dir.path(), &report), ["b.jpg"]);
        let key = CacheKey::from("b.jpg");
        assert_eq!(written(dir.path()).get(&key), Some(&fingerprint(&key, 25)));
    }

    #[tokio::test]
    async fn omitted_files_drop_out_of_cache() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.jpg", 10);
        let b = write(dir.path(), "b.jpg", 20);
        run(dir.path(), &[a.clone(), b]).await;

        let report = run(dir.path(), &[a]).await;

        assert!(report.forwarded.is_empty());
        let cache = written(dir.path());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key(&CacheKey::from("a.jpg")));
    }

    #[tokio::test]
    async fn renamed_file_is_new_and_old_key_evicted() {
        let dir = TempDir::new().unwrap();
        let old = write(dir.path(), "img/old.png", 10);
        run(dir.path(), &[old.clone()]).await;

        fs::rename(&old, dir.path().join("img/new.png")).unwrap();
        let report = run(dir.path(), &[dir.path().join("img/new.png")]).await;

        assert_eq!(forwarded_keys(dir.path(), &report), ["img/new.png"]);
        let keys: Vec<_> = written(dir.path())
            .keys()
            .map(|k| k.as_str().to_string())
            .collect();
        assert_eq!(keys, ["img/new.png"]);
    }

    #[tokio::test]
    async fn malformed_cache_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(DEFAULT_CACHE_FILE), "{not json").unwrap();
        let a = write(dir.path(), "a.jpg", 10);

        let report = run(dir.path(), &[a]).await;

        assert_eq!(forwarded_keys(dir.path(), &report), ["a.jpg"]);
        assert_eq!(written(dir.path()).len(), 1);
    }

    #[tokio::test]
    async fn existing_entry_suppresses_matching_file() {
        let dir = TempDir::new().unwrap();
        let foo = write(dir.path(), "test/foo.png", 42);
        let bar = write(dir.path(), "test/deep/bar.jpg", 7);
        let baz = write(dir.path(), "test/baz.gif", 3);

        let key = CacheKey::from("test/foo.png");
        let cached = serde_json::json!({ "test/foo.png": fingerprint(&key, 42) });
        fs::write(
            dir.path().join(DEFAULT_CACHE_FILE),
            serde_json::to_string(&cached).unwrap(),
        )
        .unwrap();

        let report = run(dir.path(), &[foo, bar, baz]).await;

        assert_eq!(
            forwarded_keys(dir.path(), &report),
            ["test/baz.gif", "test/deep/bar.jpg"]
        );
        assert_eq!(report.suppressed, vec![key.clone()]);

        let cache = written(dir.path());
        let keys: Vec<_> = cache.keys().map(|k| k.as_str().to_string()).collect();
        assert_eq!(keys, ["test/baz.gif", "test/deep/bar.jpg", "test/foo.png"]);
        assert_eq!(cache.get(&key), Some(&fingerprint(&key, 42)));
        let bar = CacheKey::from("test/deep/bar.jpg");
        assert_eq!(cache.get(&bar), Some(&fingerprint(&bar, 7)));
        let baz = CacheKey::from("test/baz.gif");
        assert_eq!(cache.get(&baz), Some(&fingerprint(&baz, 3)));
    }

    #[tokio::test]
    async fn cache_file_is_sorted_pretty_json() {
        let dir = TempDir::new().unwrap();
        let b = write(dir.path(), "b.jpg", 2);
        let a = write(dir.path(), "a.jpg", 1);
        run(dir.path(), &[b, a]).await;

        let content = fs::read_to_string(dir.path().join(DEFAULT_CACHE_FILE)).unwrap();
        assert!(content.ends_with('\n'));
        assert!(content.find("a.jpg").unwrap() < content.find("b.jpg").unwrap());
        assert!(!dir.path().join(".asset-cache.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_file_keeps_cached_entry() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.jpg", 10);
        let b = write(dir.path(), "b.jpg", 20);
        run(dir.path(), &[a.clone(), b.clone()]).await;

        fs::set_permissions(&b, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&b).is_ok() {
            // Permissions are not enforced (running as root)
            fs::set_permissions(&b, fs::Permissions::from_mode(0o644)).unwrap();
            return;
        }

        let report = pipeline(dir.path())
            .run_files_until(stream::iter(vec![a, b.clone()]), std::future::pending())
            .await
            .unwrap();
        fs::set_permissions(&b, fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, b);
        assert!(report.flushed);
        let key = CacheKey::from("b.jpg");
        assert_eq!(written(dir.path()).get(&key), Some(&fingerprint(&key, 20)));
    }

    #[tokio::test]
    async fn vanished_file_keeps_cached_entry() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.jpg", 10);
        let b = write(dir.path(), "b.jpg", 20);
        run(dir.path(), &[a.clone(), b.clone()]).await;

        fs::remove_file(&b).unwrap();
        let report = pipeline(dir.path())
            .run_files_until(stream::iter(vec![a, b.clone()]), std::future::pending())
            .await
            .unwrap();

        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors[0].error,
            AssetCacheError::Read { .. }
        ));
        let key = CacheKey::from("b.jpg");
        assert_eq!(written(dir.path()).get(&key), Some(&fingerprint(&key, 20)));
    }

    #[tokio::test]
    async fn streamed_record_aborts_without_flush() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.jpg", 10);

        let result = pipeline(dir.path())
            .run(stream::iter(vec![Record::streamed(
                &a,
                Box::pin(tokio::io::empty()),
            )]))
            .await;

        assert!(matches!(
            result,
            Err(AssetCacheError::StreamingUnsupported { .. })
        ));
        assert!(!dir.path().join(DEFAULT_CACHE_FILE).exists());
    }

    #[tokio::test]
    #[serial]
    async fn default_filter_uses_working_directory() {
        let dir = TempDir::new().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let filter = FilterStage::new(None).unwrap();
        let cache_path = filter.store().path().to_path_buf();
        let root = filter.store().root().to_path_buf();

        std::env::set_current_dir(original).unwrap();
        assert_eq!(cache_path, root.join(DEFAULT_CACHE_FILE));
        assert_eq!(
            root.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    /// Command isolated from the user's global and local config
    fn asset_cache(dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("asset-cache");
        cmd.current_dir(dir.path())
            .env("ASSET_CACHE_CONFIG", dir.path().join("config.toml"))
            .env_remove("ASSET_CACHE_LOG")
            .arg("--no-local");
        cmd
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("img")).unwrap();
        fs::write(dir.path().join("img/a.jpg"), "aaaa").unwrap();
        fs::write(dir.path().join("img/b.jpg"), "bb").unwrap();
        dir
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        asset_cache(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("skip build assets"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        asset_cache(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("asset-cache"));
    }

    #[test]
    fn run_prints_changed_then_nothing() {
        let dir = project();

        asset_cache(&dir)
            .args(["run", "-q", "img"])
            .assert()
            .success()
            .stdout(predicate::str::contains("img/a.jpg").and(predicate::str::contains("img/b.jpg")));
        assert!(dir.path().join(".asset-cache").exists());

        asset_cache(&dir)
            .args(["run", "-q", "img"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        fs::write(dir.path().join("img/b.jpg"), "bbbbbb").unwrap();
        asset_cache(&dir)
            .args(["run", "-q", "img"])
            .assert()
            .success()
            .stdout(predicate::str::contains("img/b.jpg").and(predicate::str::contains("a.jpg").not()));
    }

    #[test]
    fn run_dry_run_writes_nothing() {
        let dir = project();
        asset_cache(&dir)
            .args(["run", "-q", "--dry-run", "img"])
            .assert()
            .success()
            .stdout(predicate::str::contains("img/a.jpg"));
        assert!(!dir.path().join(".asset-cache").exists());
    }

    #[test]
    fn run_reads_paths_from_stdin() {
        let dir = project();
        asset_cache(&dir)
            .args(["run", "-q", "--stdin"])
            .write_stdin("img/a.jpg\n\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("img/a.jpg").and(predicate::str::contains("b.jpg").not()));
    }

    #[test]
    fn run_without_inputs_fails() {
        let dir = TempDir::new().unwrap();
        asset_cache(&dir)
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No input files"));
    }

    #[test]
    fn run_missing_path_fails() {
        let dir = TempDir::new().unwrap();
        asset_cache(&dir)
            .args(["run", "nope.png"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("nope.png"));
    }

    #[test]
    fn show_lists_entries() {
        let dir = project();
        asset_cache(&dir).args(["run", "-q", "img"]).assert().success();

        asset_cache(&dir)
            .args(["show", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("img/a.jpg").and(predicate::str::contains("img/b.jpg")));

        asset_cache(&dir)
            .args(["show", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"img/a.jpg\""));
    }

    #[test]
    fn clear_removes_cache_file() {
        let dir = project();
        asset_cache(&dir).args(["run", "-q", "img"]).assert().success();
        assert!(dir.path().join(".asset-cache").exists());

        asset_cache(&dir).args(["clear", "-y"]).assert().success();
        assert!(!dir.path().join(".asset-cache").exists());
    }

    #[test]
    fn local_config_sets_cache_path() {
        let dir = project();
        fs::write(
            dir.path().join(".asset-cache.toml"),
            "[cache]\npath = \"build-cache.json\"\n",
        )
        .unwrap();

        let mut cmd = cargo_bin_cmd!("asset-cache");
        cmd.current_dir(dir.path())
            .env("ASSET_CACHE_CONFIG", dir.path().join("config.toml"))
            .args(["run", "-q", "img"])
            .assert()
            .success();

        assert!(dir.path().join("build-cache.json").exists());
        assert!(!dir.path().join(".asset-cache").exists());
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        asset_cache(&dir)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        asset_cache(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[pipeline]"));
    }

    #[test]
    fn completions_bash() {
        let dir = TempDir::new().unwrap();
        asset_cache(&dir)
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("asset-cache"));
    }
}
