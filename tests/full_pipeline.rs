mod common;

use std::collections::HashMap;

use chrono::NaiveDate;

use common::{law, original_law, ymd, NoProcedures, StubSource, TableDates};
use lawgit::{
    CabinetTimeline, Deduplicator, FetchOptions, HistoryBuilder, HistoryOptions, MarkdownRenderer,
    GitHistoryStore, HistoryStore, MemoryHistoryStore, SnapshotCache,
};

fn builder<'a>(procedures: &'a NoProcedures, dates: &'a TableDates) -> HistoryBuilder<'a> {
    HistoryBuilder::new(
        procedures,
        dates,
        &MarkdownRenderer,
        CabinetTimeline::until(ymd(2026, 1, 1)),
        HistoryOptions::default(),
    )
}

#[tokio::test]
async fn unchanged_remote_is_not_fetched_twice() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SnapshotCache::new(dir.path());
    let source = StubSource::default();
    source.publish("bgb", "5c8f-58a1b2", &law("20190501", "BGB", "G v. 5.2.2019 I 54", "Text."));
    source.publish("stgb", "2b9e-58f0aa", &law("20190501", "StGB", "G v. 1.3.2019 I 58", "Text."));

    let first = lawgit::download(&cache, &source, ymd(2019, 5, 1), FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(first.stored.len(), 2);
    assert!(dir.path().join("2019-05-01/bgb/5c8f-58a1b2.zip").is_file());

    let second = lawgit::download(&cache, &source, ymd(2019, 5, 2), FetchOptions::default())
        .await
        .unwrap();
    assert!(second.stored.is_empty());
    assert_eq!(second.not_modified, vec!["bgb".to_string(), "stgb".to_string()]);
    assert!(!dir.path().join("2019-05-02").exists());
    assert_eq!(cache.list_snapshots().unwrap().len(), 2);

    let requests = source.requests.lock().unwrap();
    assert!(requests[2..]
        .iter()
        .all(|(_, precondition)| precondition.is_some()));
}

#[tokio::test]
async fn noise_only_revisions_are_deduplicated_and_history_is_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SnapshotCache::new(dir.path());
    let source = StubSource::default();

    source.publish("bgb", "a1", &law("20190501", "BGB", "G v. 5.2.2019 I 54", "Fassung 2019."));
    source.publish("stgb", "b1", &law("20190501", "StGB", "G v. 20.11.2005 I 200", "Fassung 2005."));
    lawgit::download(&cache, &source, ymd(2019, 5, 1), FetchOptions::default())
        .await
        .unwrap();

    // bgb is rebuilt without changes, stgb is amended
    source.publish("bgb", "a2", &law("20190611", "BGB", "G v. 5.2.2019 I 54", "Fassung 2019."));
    source.publish("stgb", "b2", &law("20190611", "StGB", "G v. 1.3.2019 I 58", "Fassung 2019."));
    let report = lawgit::download(&cache, &source, ymd(2019, 6, 11), FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(report.stored.len(), 2);

    let dedup = lawgit::dedup(&cache, &Deduplicator::default()).unwrap();
    assert_eq!(dedup.removed.len(), 1);
    assert_eq!(dedup.removed[0].document_id, "bgb");
    assert_eq!(dedup.removed[0].version_token, "a2");
    assert_eq!(dedup.survivors, 3);
    assert!(!dir.path().join("2019-06-11/bgb").exists());
    assert!(dir.path().join("2019-06-11/stgb/b2.zip").is_file());

    let procedures = NoProcedures;
    let dates = TableDates(HashMap::new());
    let mut store = MemoryHistoryStore::new();
    let history = lawgit::replay_history(&cache, &Deduplicator::default(), &builder(&procedures, &dates), &mut store)
        .await
        .unwrap();

    assert_eq!(history.duplicates, 0);
    let committed: Vec<(String, String)> = history
        .build
        .commits
        .iter()
        .map(|c| (c.snapshot.document_id.clone(), c.citation.date().to_string()))
        .collect();
    assert_eq!(
        committed,
        [
            ("stgb".to_string(), "2005-11-20".to_string()),
            ("bgb".to_string(), "2019-02-05".to_string()),
            ("stgb".to_string(), "2019-03-01".to_string()),
        ]
    );

    let log = store.log("master");
    assert_eq!(log[0].author.name, "Schröder cabinet II");
    assert_eq!(log[1].author.name, "Merkel cabinet IV");
    assert_eq!(log[2].message, "StGB\n\nSnapshot: stgb@2019-06-11/b2");
    let stgb = String::from_utf8(log[2].files["stgb.md"].clone()).unwrap();
    assert!(stgb.contains("Fassung 2019."));
}

#[tokio::test]
async fn equal_dates_keep_discovery_order() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SnapshotCache::new(dir.path());
    let snapshots = vec![
        cache
            .store("first", ymd(2019, 5, 1), "1", &common::zipped(&law("1", "Erstes", "G v. 1.3.2019 I 10", "a")))
            .unwrap(),
        cache
            .store("older", ymd(2019, 5, 1), "1", &common::zipped(&law("1", "Älteres", "G v. 20.11.2005 I 20", "b")))
            .unwrap(),
        cache
            .store("second", ymd(2019, 5, 1), "1", &common::zipped(&law("1", "Zweites", "G v. 1.3.2019 I 30", "c")))
            .unwrap(),
    ];

    let procedures = NoProcedures;
    let dates = TableDates(HashMap::new());
    let mut store = MemoryHistoryStore::new();
    let report = builder(&procedures, &dates)
        .build(&snapshots, &mut store)
        .await
        .unwrap();

    let order: Vec<&str> = report
        .commits
        .iter()
        .map(|c| c.snapshot.document_id.as_str())
        .collect();
    assert_eq!(order, ["older", "first", "second"]);
}

#[tokio::test]
async fn partial_citation_is_completed_by_date_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SnapshotCache::new(dir.path());
    let snapshot = cache
        .store(
            "neu",
            ymd(2019, 5, 1),
            "1",
            &common::zipped(&original_law("Neues Gesetz", "BGBl I", "2019, 58")),
        )
        .unwrap();

    let procedures = NoProcedures;
    let dates = TableDates(HashMap::from([((2019, 58), ymd(2019, 2, 5))]));
    let mut store = MemoryHistoryStore::new();
    let report = builder(&procedures, &dates)
        .build(&[snapshot], &mut store)
        .await
        .unwrap();

    assert_eq!(report.commits.len(), 1);
    let citation = &report.commits[0].citation;
    assert_eq!(citation.date(), ymd(2019, 2, 5));
    assert_eq!(citation.citation().page, Some(58));
    assert_eq!(store.log("master")[0].author.timestamp.timestamp(), 1_549_324_800);
}

#[tokio::test]
async fn replaying_twice_keeps_the_git_history_dated_forward() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SnapshotCache::new(dir.path().join("cache"));
    let source = StubSource::default();
    source.publish("stgb", "b1", &law("20190501", "StGB", "G v. 20.11.2005 I 200", "Fassung 2005."));
    source.publish("bgb", "a1", &law("20190501", "BGB", "G v. 1.3.2019 I 58", "Fassung 2019."));
    lawgit::download(&cache, &source, ymd(2019, 5, 1), FetchOptions::default())
        .await
        .unwrap();

    let procedures = NoProcedures;
    let dates = TableDates(HashMap::new());
    let mut store = GitHistoryStore::open_or_init(&dir.path().join("repo")).unwrap();
    let first = lawgit::replay_history(&cache, &Deduplicator::default(), &builder(&procedures, &dates), &mut store)
        .await
        .unwrap();
    assert_eq!(first.build.commits.len(), 2);

    source.publish("stgb", "b2", &law("20190611", "StGB", "G v. 5.4.2019 I 90", "Fassung 2019."));
    lawgit::download(&cache, &source, ymd(2019, 6, 11), FetchOptions::default())
        .await
        .unwrap();
    let second = lawgit::replay_history(&cache, &Deduplicator::default(), &builder(&procedures, &dates), &mut store)
        .await
        .unwrap();
    assert_eq!(second.build.already_recorded, 2);
    assert_eq!(second.build.commits.len(), 1);
    assert_eq!(second.build.commits[0].snapshot.version_token, "b2");

    let authored: Vec<NaiveDate> = store
        .first_parent_log("master")
        .unwrap()
        .iter()
        .rev()
        .map(|c| c.authored.date_naive())
        .collect();
    assert_eq!(authored, [ymd(2005, 11, 20), ymd(2019, 3, 1), ymd(2019, 4, 5)]);
}
