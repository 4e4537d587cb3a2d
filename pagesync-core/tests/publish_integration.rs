use std::fs;
use std::path::Path;

use mockall::Sequence;
use tempfile::tempdir;

use pagesync_core::config::{MatcherRule, PublishConfig};
use pagesync_core::contract::{MockCdnInvalidator, MockObjectStore, PutRequest, RemoteObject};
use pagesync_core::error::PublishError;
use pagesync_core::publish::publish;
use pagesync_core::scan::body_hash;

fn write_file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn remote(key: &str, body: &[u8]) -> RemoteObject {
    RemoteObject {
        key: key.to_string(),
        etag: Some(format!("\"{}\"", body_hash(body))),
        size: body.len() as u64,
    }
}

#[tokio::test]
async fn publishes_new_files_and_removes_stale_ones() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "index.html", b"<html>new</html>");
    write_file(dir.path(), "css/site.css", b"body{}");

    let mut store = MockObjectStore::new();
    store.expect_list().return_once(|| {
        Ok(vec![
            remote("index.html", b"<html>old</html>"),
            remote("gone.html", b"<html>gone</html>"),
        ])
    });
    store
        .expect_put()
        .withf(|req: &PutRequest<'_>| req.key == "index.html" || req.key == "css/site.css")
        .times(2)
        .returning(|_: PutRequest<'_>| Ok(()));
    store
        .expect_delete()
        .withf(|key: &str| key == "gone.html")
        .times(1)
        .returning(|_| Ok(()));

    let report = publish(dir.path(), &PublishConfig::default(), &store, None, false)
        .await
        .expect("publish should succeed");

    assert_eq!(
        report.uploaded,
        vec!["css/site.css".to_string(), "index.html".to_string()]
    );
    assert_eq!(report.deleted, vec!["gone.html".to_string()]);
    assert_eq!(report.skipped, 0);
    assert!(!report.invalidated);
    assert!(!report.dry_run);
}

#[tokio::test]
async fn deletes_only_run_after_all_uploads() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a.html", b"a");
    write_file(dir.path(), "b.html", b"b");

    let mut seq = Sequence::new();
    let mut store = MockObjectStore::new();
    store
        .expect_list()
        .return_once(|| Ok(vec![remote("stale.html", b"stale")]));
    store
        .expect_put()
        .withf(|req: &PutRequest<'_>| req.key == "a.html")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    store
        .expect_put()
        .withf(|req: &PutRequest<'_>| req.key == "b.html")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_: PutRequest<'_>| Ok(()));
    store
        .expect_delete()
        .withf(|key: &str| key == "stale.html")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    publish(dir.path(), &PublishConfig::default(), &store, None, false)
        .await
        .expect("publish should succeed");
}

#[tokio::test]
async fn upload_carries_resolved_metadata() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "css/site.css", b"body { margin: 0; }");

    let config = PublishConfig {
        matchers: vec![MatcherRule {
            pattern: r"\.css$".to_string(),
            cache_control: Some("max-age=630720000, no-transform, public".to_string()),
            gzip: true,
        }],
        ..PublishConfig::default()
    };

    let mut store = MockObjectStore::new();
    store.expect_list().return_once(|| Ok(vec![]));
    store
        .expect_put()
        .withf(|req: &PutRequest<'_>| {
            req.key == "css/site.css"
                && req.content_type == "text/css"
                && req.cache_control == Some("max-age=630720000, no-transform, public")
                && req.content_encoding == Some("gzip")
                && req.body.starts_with(&[0x1f, 0x8b])
        })
        .times(1)
        .returning(|_| Ok(()));

    publish(dir.path(), &config, &store, None, false)
        .await
        .expect("publish should succeed");
}

#[tokio::test]
async fn transient_upload_failures_are_retried() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "index.html", b"<html/>");

    let mut store = MockObjectStore::new();
    store.expect_list().return_once(|| Ok(vec![]));
    let mut calls = 0u32;
    store.expect_put().times(3).returning(move |_| {
        calls += 1;
        if calls < 3 {
            Err("connection reset".into())
        } else {
            Ok(())
        }
    });

    let report = publish(dir.path(), &PublishConfig::default(), &store, None, false)
        .await
        .expect("third attempt should succeed");

    assert_eq!(report.uploaded, vec!["index.html".to_string()]);
}

#[tokio::test]
async fn exhausted_retries_abort_and_report_progress() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a.html", b"a");
    write_file(dir.path(), "b.html", b"b");

    let config = PublishConfig {
        upload_attempts: 2,
        ..PublishConfig::default()
    };

    let mut store = MockObjectStore::new();
    store
        .expect_list()
        .return_once(|| Ok(vec![remote("stale.html", b"stale")]));
    store
        .expect_put()
        .withf(|req: &PutRequest<'_>| req.key == "a.html")
        .times(1)
        .returning(|_| Ok(()));
    store
        .expect_put()
        .withf(|req: &PutRequest<'_>| req.key == "b.html")
        .times(2)
        .returning(|_| Err("503 slow down".into()));
    // The stale delete must never run once an upload fails.

    let err = publish(dir.path(), &config, &store, None, false)
        .await
        .expect_err("publish should abort");

    match err {
        PublishError::Upload {
            key,
            attempts,
            completed,
            ..
        } => {
            assert_eq!(key, "b.html");
            assert_eq!(attempts, 2);
            assert_eq!(completed, 1);
        }
        other => panic!("expected Upload error, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_guard_aborts_before_any_mutation() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "index.html", b"<html/>");

    let config = PublishConfig {
        max_deletes: 1,
        ..PublishConfig::default()
    };

    let mut store = MockObjectStore::new();
    store.expect_list().return_once(|| {
        Ok(vec![
            remote("index.html", b"<html/>"),
            remote("a.html", b"a"),
            remote("b.html", b"b"),
        ])
    });
    // No put/delete expectations: any mutation panics the mock.

    let err = publish(dir.path(), &config, &store, None, false)
        .await
        .expect_err("delete guard should trip");

    assert!(matches!(
        err,
        PublishError::DeleteGuard {
            pending: 2,
            limit: 1
        }
    ));
}

#[tokio::test]
async fn listing_failure_aborts_before_any_mutation() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "index.html", b"<html/>");

    let mut store = MockObjectStore::new();
    store
        .expect_list()
        .return_once(|| Err("access denied".into()));

    let err = publish(dir.path(), &PublishConfig::default(), &store, None, false)
        .await
        .expect_err("publish should fail on listing");

    assert!(matches!(err, PublishError::List { .. }));
}

#[tokio::test]
async fn invalidation_covers_uploads_and_deletes() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "index.html", b"<html>new</html>");

    let mut store = MockObjectStore::new();
    store.expect_list().return_once(|| {
        Ok(vec![
            remote("index.html", b"<html>old</html>"),
            remote("gone.html", b"bye"),
        ])
    });
    store.expect_put().times(1).returning(|_| Ok(()));
    store.expect_delete().times(1).returning(|_| Ok(()));

    let mut cdn = MockCdnInvalidator::new();
    cdn.expect_invalidate()
        .withf(|paths: &[String]| paths == ["/index.html".to_string(), "/gone.html".to_string()])
        .times(1)
        .returning(|_| Ok(()));

    let report = publish(
        dir.path(),
        &PublishConfig::default(),
        &store,
        Some(&cdn),
        false,
    )
    .await
    .expect("publish should succeed");

    assert!(report.invalidated);
}

#[tokio::test]
async fn invalidation_failure_does_not_fail_the_run() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "index.html", b"<html/>");

    let mut store = MockObjectStore::new();
    store.expect_list().return_once(|| Ok(vec![]));
    store.expect_put().times(1).returning(|_| Ok(()));

    let mut cdn = MockCdnInvalidator::new();
    cdn.expect_invalidate()
        .times(1)
        .returning(|_| Err("throttled".into()));

    let report = publish(
        dir.path(),
        &PublishConfig::default(),
        &store,
        Some(&cdn),
        false,
    )
    .await
    .expect("publish should still succeed");

    assert!(!report.invalidated);
    assert_eq!(report.uploaded, vec!["index.html".to_string()]);
}

#[tokio::test]
async fn dry_run_plans_without_mutating() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "index.html", b"<html>new</html>");

    let mut store = MockObjectStore::new();
    store
        .expect_list()
        .return_once(|| Ok(vec![remote("gone.html", b"bye")]));
    // No put/delete expectations: a dry run must not mutate.

    let report = publish(dir.path(), &PublishConfig::default(), &store, None, true)
        .await
        .expect("dry run should succeed");

    assert!(report.dry_run);
    assert_eq!(report.uploaded, vec!["index.html".to_string()]);
    assert_eq!(report.deleted, vec!["gone.html".to_string()]);
}

#[tokio::test]
async fn synced_bucket_is_a_noop() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "index.html", b"<html/>");

    let mut store = MockObjectStore::new();
    store
        .expect_list()
        .return_once(|| Ok(vec![remote("index.html", b"<html/>")]));

    // An empty plan must not reach the invalidator either.
    let cdn = MockCdnInvalidator::new();

    let report = publish(
        dir.path(),
        &PublishConfig::default(),
        &store,
        Some(&cdn),
        false,
    )
    .await
    .expect("no-op publish should succeed");

    assert!(report.uploaded.is_empty());
    assert!(report.deleted.is_empty());
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn rerun_after_partial_failure_converges() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a.html", b"a-new");
    write_file(dir.path(), "b.html", b"b-new");

    let config = PublishConfig {
        upload_attempts: 1,
        ..PublishConfig::default()
    };

    // First run: a.html stores, b.html fails, run aborts.
    let mut store = MockObjectStore::new();
    store.expect_list().return_once(|| {
        Ok(vec![
            remote("a.html", b"a-old"),
            remote("b.html", b"b-old"),
        ])
    });
    store
        .expect_put()
        .withf(|req: &PutRequest<'_>| req.key == "a.html")
        .times(1)
        .returning(|_| Ok(()));
    store
        .expect_put()
        .withf(|req: &PutRequest<'_>| req.key == "b.html")
        .times(1)
        .returning(|_| Err("connection reset".into()));

    let err = publish(dir.path(), &config, &store, None, false)
        .await
        .expect_err("first run should abort");
    assert!(matches!(err, PublishError::Upload { completed: 1, .. }));

    // Second run against the bucket as the failure left it: only b.html is
    // still out of date.
    let mut store = MockObjectStore::new();
    store.expect_list().return_once(|| {
        Ok(vec![
            remote("a.html", b"a-new"),
            remote("b.html", b"b-old"),
        ])
    });
    store
        .expect_put()
        .withf(|req: &PutRequest<'_>| req.key == "b.html")
        .times(1)
        .returning(|_| Ok(()));

    let report = publish(dir.path(), &config, &store, None, false)
        .await
        .expect("re-run should converge");
    assert_eq!(report.uploaded, vec!["b.html".to_string()]);
    assert_eq!(report.skipped, 1);
}
