//! Integration tests for provcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Command rooted at `root`, isolated from the user's global config
    fn provcache(root: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("provcache");
        cmd.env("PROVCACHE_CONFIG", root.join("global-config.toml"))
            .env("PROVCACHE_ROOT", root)
            .env("CI", "1");
        cmd
    }

    fn write_action(root: &Path, file: &str, json: &str) -> String {
        let path = root.join(file);
        std::fs::write(&path, json).unwrap();
        path.display().to_string()
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        provcache(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Action cache"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        provcache(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("provcache"));
    }

    #[test]
    fn init_activates_cache() {
        let temp = TempDir::new().unwrap();
        provcache(temp.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache activated"));

        let state = std::fs::read_to_string(temp.path().join(".cache").join("state")).unwrap();
        assert_eq!(state.trim(), "1");
        assert!(temp.path().join(".cache").join("records.db").exists());
        assert!(temp.path().join(".provcache.toml").exists());
    }

    #[test]
    fn status_reports_inactive_cache() {
        let temp = TempDir::new().unwrap();
        provcache(temp.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("missing"))
            .stdout(predicate::str::contains("provcache init"));
    }

    #[test]
    fn record_without_activation_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        let file = write_action(
            temp.path(),
            "a1.json",
            r#"{"name": "a1", "action_type": "import"}"#,
        );

        provcache(temp.path())
            .args(["record", &file])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not activated"))
            .stderr(predicate::str::contains("Hint: Run: provcache init"));
    }

    #[test]
    fn record_twice_inserts_then_hits() {
        let temp = TempDir::new().unwrap();
        provcache(temp.path()).arg("init").assert().success();

        let file = write_action(
            temp.path(),
            "a2.json",
            r#"{
                "name": "a2",
                "action": "feature_table.filter_samples",
                "action_type": "method",
                "inputs": {"table": "a1"},
                "parameters": {"min_frequency": 10}
            }"#,
        );

        provcache(temp.path())
            .args(["record", &file, "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("inserted "));

        provcache(temp.path())
            .args(["record", &file, "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("hit "));

        provcache(temp.path())
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("feature_table.filter_samples"));
    }

    #[test]
    fn lineage_follows_inputs() {
        let temp = TempDir::new().unwrap();
        provcache(temp.path()).arg("init").assert().success();

        let a1 = write_action(
            temp.path(),
            "a1.json",
            r#"{"name": "a1", "action_type": "import", "parameters": {"path": "seqs.fastq"}}"#,
        );
        let a2 = write_action(
            temp.path(),
            "a2.json",
            r#"{"name": "a2", "action_type": "method", "inputs": {"seqs": "a1"}}"#,
        );
        provcache(temp.path()).args(["record", &a1]).assert().success();
        provcache(temp.path()).args(["record", &a2]).assert().success();

        let output = provcache(temp.path())
            .args(["lineage", "a2", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let names: Vec<&str> = records
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a1", "a2"]);
    }

    #[test]
    fn show_missing_record() {
        let temp = TempDir::new().unwrap();
        provcache(temp.path()).arg("init").assert().success();

        provcache(temp.path())
            .args(["show", "nonexistent"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Record not found"));
    }

    #[test]
    fn compare_reports_identical_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.qza"), b"artifact").unwrap();
        std::fs::write(temp.path().join("b.qza"), b"artifact").unwrap();

        provcache(temp.path())
            .current_dir(temp.path())
            .args(["compare", "a.qza", "b.qza"])
            .assert()
            .success()
            .stdout(predicate::str::contains("identical"));
    }

    #[test]
    fn compare_fails_on_different_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.qza"), b"artifact").unwrap();
        std::fs::write(temp.path().join("b.qza"), b"changed").unwrap();

        provcache(temp.path())
            .current_dir(temp.path())
            .args(["compare", "a.qza", "b.qza"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Artifacts differ"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        provcache(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("global-config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        provcache(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }
}

mod cache_tests {
    use provcache::session::SessionExit;
    use provcache::{
        ActionCache, ActionDescriptor, ActionType, CacheContext, CacheDir, CompatibilityPolicy,
        EnvironmentSnapshot, Outcome, ProvcacheError, RecordStore, SqliteStore,
    };
    use std::path::Path;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn environment() -> EnvironmentSnapshot {
        EnvironmentSnapshot::new("qiime2", "2024.5.0").with_component("q2-types", "2024.5.0")
    }

    fn filter_action(root: &Path) -> ActionDescriptor {
        ActionDescriptor::builder("a2", ActionType::Transform)
            .action("feature_table.filter_samples")
            .input("table", "a1")
            .parameter("min_frequency", &10)
            .working_dir(root)
            .build()
            .unwrap()
    }

    fn activated(root: &Path) -> CacheDir {
        let dir = CacheDir::new(root);
        dir.activate().unwrap();
        dir
    }

    #[test]
    fn pipeline_scenario() {
        let temp = TempDir::new().unwrap();
        let dir = activated(temp.path());
        let cache = ActionCache::new(SqliteStore::new(dir.store_path()), environment());
        let context = CacheContext::new(dir, cache);

        let import = ActionDescriptor::builder("a1", ActionType::Import)
            .parameter("path", "seqs.fastq")
            .working_dir(temp.path())
            .build()
            .unwrap();
        let first = context.begin(import).unwrap().decide().unwrap();
        assert_eq!(first.outcome, Outcome::SchemaInitialized);

        let inserted = context
            .begin(filter_action(temp.path()))
            .unwrap()
            .decide()
            .unwrap();
        assert_eq!(inserted.outcome, Outcome::Inserted);

        let hit = context
            .begin(filter_action(temp.path()))
            .unwrap()
            .decide()
            .unwrap();
        assert_eq!(hit.outcome, Outcome::Hit);
        assert_eq!(hit.record, inserted.record);
    }

    #[test]
    fn concurrent_checks_record_once() {
        const WORKERS: usize = 8;

        let temp = TempDir::new().unwrap();
        let db = temp.path().join("records.db");
        let root = temp.path().to_path_buf();
        let barrier = Arc::new(Barrier::new(WORKERS));

        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let db = db.clone();
                let root = root.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let cache = ActionCache::new(SqliteStore::new(db), environment());
                    let descriptor = filter_action(&root);
                    barrier.wait();
                    cache.check_or_record(&descriptor).unwrap().outcome
                })
            })
            .collect();

        let outcomes: Vec<Outcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let fresh = outcomes.iter().filter(|o| o.needs_execution()).count();
        assert_eq!(fresh, 1, "outcomes: {outcomes:?}");

        let records = SqliteStore::new(&db).records().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn imports_always_insert() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("records.db"));
        let cache = ActionCache::new(store, environment());

        let import = ActionDescriptor::builder("a1", ActionType::Import)
            .parameter("path", "seqs.fastq")
            .working_dir(temp.path())
            .build()
            .unwrap();

        let first = cache.check_or_record(&import).unwrap();
        let second = cache.check_or_record(&import).unwrap();

        assert!(second.outcome.needs_execution());
        assert_eq!(first.record.fingerprint, second.record.fingerprint);
        assert_ne!(first.record.identifier, second.record.identifier);
        assert_eq!(cache.store().records().unwrap().len(), 2);
    }

    #[test]
    fn record_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("records.db");

        let inserted = ActionCache::new(SqliteStore::new(&db), environment())
            .check_or_record(&filter_action(temp.path()))
            .unwrap();

        let stored = SqliteStore::new(&db)
            .lookup(&inserted.record.identifier)
            .unwrap()
            .unwrap();
        assert_eq!(stored, inserted.record);
    }

    #[test]
    fn environment_drift_by_policy() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("records.db");
        ActionCache::new(SqliteStore::new(&db), environment())
            .check_or_record(&filter_action(temp.path()))
            .unwrap();

        let upgraded =
            EnvironmentSnapshot::new("qiime2", "2024.5.0").with_component("q2-types", "2024.10.0");

        let lenient = ActionCache::new(SqliteStore::new(&db), upgraded.clone())
            .check_or_record(&filter_action(temp.path()))
            .unwrap();
        assert_eq!(lenient.outcome, Outcome::Hit);
        assert_eq!(lenient.drift.len(), 1);

        let err = ActionCache::new(SqliteStore::new(&db), upgraded)
            .with_policy(CompatibilityPolicy::strict())
            .check_or_record(&filter_action(temp.path()))
            .unwrap_err();
        assert!(matches!(err, ProvcacheError::StaleCacheEntry { .. }));

        let core_bump = EnvironmentSnapshot::new("qiime2", "2025.1.0")
            .with_component("q2-types", "2024.5.0");
        let err = ActionCache::new(SqliteStore::new(&db), core_bump)
            .check_or_record(&filter_action(temp.path()))
            .unwrap_err();
        assert!(matches!(err, ProvcacheError::StaleCacheEntry { .. }));
    }

    #[test]
    fn session_runs_body_only_on_miss() {
        let temp = TempDir::new().unwrap();
        let dir = activated(temp.path());
        let cache = ActionCache::new(SqliteStore::new(dir.store_path()), environment());
        let context = CacheContext::new(dir, cache);

        let mut executions = 0;
        for _ in 0..2 {
            context
                .begin(filter_action(temp.path()))
                .unwrap()
                .run(|_record, outcome| {
                    if outcome.needs_execution() {
                        executions += 1;
                    }
                    Ok::<_, ProvcacheError>(())
                })
                .unwrap();
        }
        assert_eq!(executions, 1);
    }

    #[test]
    fn session_report_is_journaled() {
        let temp = TempDir::new().unwrap();
        let dir = activated(temp.path());
        let journal = provcache::session::SessionJournal::new(dir.journal_path());
        let cache = ActionCache::new(SqliteStore::new(dir.store_path()), environment());
        let context = CacheContext::new(dir.clone(), cache).with_hook(journal);

        context
            .begin(filter_action(temp.path()))
            .unwrap()
            .decide()
            .unwrap();

        let content = std::fs::read_to_string(dir.journal_path()).unwrap();
        let entry: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(entry["event"], format!("session.{}", SessionExit::Completed));
        assert_eq!(entry["data"]["action"], "a2");
    }
}
