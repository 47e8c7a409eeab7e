use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use proctorcache_core::cache::{poll_into_cache, submissions_key, Queries};
use proctorcache_core::table::{actions, ActionHandler, ColumnSpec, DataTable, FilterSpec};
use proctorcache_core::{
    DataSource, MemoryStore, MutationCoordinator, QueryCache, Submission, SubmissionStatus,
    SubmissionUpdate,
};

fn seed_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/db.json")
}

fn store() -> Arc<MemoryStore> {
    let store = MemoryStore::from_path(&seed_path()).expect("seed database loads");
    Arc::new(store.with_latency(Duration::ZERO))
}

#[derive(Default)]
struct UnlockCollector {
    unlock: Vec<String>,
    notes: Vec<String>,
}

impl ActionHandler<Submission> for UnlockCollector {
    fn unlock(&mut self, record: &Submission) {
        self.unlock.push(record.id.clone());
    }

    fn notify(&mut self, message: String) {
        self.notes.push(message);
    }
}

fn table(submissions: &[Submission]) -> DataTable<Submission> {
    DataTable::new(vec![
        ColumnSpec::new("user", "Full Name").sortable(),
        ColumnSpec::new("status", "Status").sortable(),
    ])
    .with_filters(vec![FilterSpec::from_records("status", "Status", submissions)])
    .with_row_actions(actions::resolve)
}

#[tokio::test]
async fn test_filter_unlock_and_reread() {
    let store = store();
    let cache = Arc::new(QueryCache::new());
    let queries = Queries::new(Arc::clone(&store), Arc::clone(&cache));
    let coordinator = MutationCoordinator::new(Arc::clone(&store), Arc::clone(&cache));

    let submissions = queries.submissions(Some("a1")).await.unwrap().unwrap();
    assert_eq!(submissions.len(), 4);

    let mut t = table(&submissions);
    t.set_filter("status", "Manual Locked");
    let view = t.render(&submissions);
    assert_eq!(view.rows.len(), 1);
    assert!(view.show_actions);
    let locked = view.rows[0].record.clone();
    assert_eq!(locked.id, "s2");
    assert_eq!(view.rows[0].actions[0].value, "unlock");

    let mut handler = UnlockCollector::default();
    actions::dispatch("unlock", &locked, &mut handler);
    assert_eq!(handler.unlock, vec!["s2"]);
    assert!(handler.notes.is_empty());

    let updated = coordinator.unlock("s2").await.unwrap();
    assert_eq!(updated.status, SubmissionStatus::Unlocked);

    // Served from cache, now carrying the merged record
    let reread = queries.submissions(Some("a1")).await.unwrap().unwrap();
    let s2 = reread.iter().find(|s| s.id == "s2").unwrap();
    assert_eq!(s2.status.as_str(), "pending");
    assert_eq!(s2.browser, "Chrome 124");
    assert_eq!(t.render(&reread).rows.len(), 0);

    t.clear_filters();
    let view = t.render(&reread);
    assert_eq!(view.filtered_count, 4);
    assert!(view.rows.iter().all(|row| row.actions.len() == 2));
}

#[tokio::test(start_paused = true)]
async fn test_polling_feeds_cache_reads() {
    let store = store();
    let cache = Arc::new(QueryCache::new());
    let key = submissions_key("a1");

    let poll_store = Arc::clone(&store);
    let sub = poll_into_cache(Arc::clone(&cache), key.clone(), Duration::from_secs(5), move || {
        let store = Arc::clone(&poll_store);
        async move { store.list_submissions("a1").await }
    });

    tokio::time::sleep(Duration::from_millis(5_100)).await;
    let first = cache.read::<Vec<Submission>>(&key).unwrap();
    assert_eq!(first.len(), 4);

    let update = SubmissionUpdate {
        question_synced: Some(13),
        time_elapsed: Some(3700),
        ..SubmissionUpdate::default()
    };
    store.update_submission("s1", &update).await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    let second = cache.read::<Vec<Submission>>(&key).unwrap();
    let s1 = second.iter().find(|s| s.id == "s1").unwrap();
    assert_eq!(s1.question_synced, 13);
    assert_eq!(s1.time_elapsed, "3700");

    sub.shutdown().await;
    // The last snapshot stays readable once polling has stopped
    assert!(cache.state::<Vec<Submission>>(&key).data.is_some());
}
