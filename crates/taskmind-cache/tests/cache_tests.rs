use std::sync::Arc;
use std::time::Duration;
use taskmind_cache::{
    get_json, set_json, task_analysis_key, CacheStore, MemoryCacheStore, NoopCacheStore,
};
use taskmind_core::{Complexity, Sentiment, TaskAnalysis, TimeSlot};

fn sample_analysis() -> TaskAnalysis {
    TaskAnalysis {
        priority: 7.5,
        estimated_hours: 3.2,
        complexity: Complexity::High,
        sentiment: Sentiment::Negative,
        tags: vec!["database".into(), "migration".into()],
        deadline_urgency: 8.0,
        suggested_subtasks: vec!["Back up tables".into(), "Run dry-run".into()],
        optimal_time_slot: TimeSlot::Morning,
        confidence_score: 85,
    }
}

#[tokio::test]
async fn test_analysis_round_trip_is_byte_identical() {
    let store = MemoryCacheStore::new(64);
    let analysis = sample_analysis();
    let key = task_analysis_key("Migrate database", "Move to new cluster", "");

    set_json(&store, &key, Duration::from_secs(3600), &analysis)
        .await
        .unwrap();

    let raw = store.get(&key).await.unwrap().unwrap();
    assert_eq!(raw, serde_json::to_string(&analysis).unwrap());

    let restored: TaskAnalysis = get_json(&store, &key).await.unwrap().unwrap();
    assert_eq!(restored, analysis);
    assert_eq!(
        serde_json::to_string(&restored).unwrap(),
        serde_json::to_string(&analysis).unwrap()
    );
}

#[tokio::test]
async fn test_suggestion_list_expires() {
    let store = MemoryCacheStore::new(64);
    let suggestions = vec!["Plan tomorrow".to_string(), "Clear inbox".to_string()];

    set_json(&store, "task_suggestions:x", Duration::from_millis(20), &suggestions)
        .await
        .unwrap();
    let cached: Option<Vec<String>> = get_json(&store, "task_suggestions:x").await.unwrap();
    assert_eq!(cached.as_deref(), Some(&suggestions[..]));

    tokio::time::sleep(Duration::from_millis(40)).await;
    let cached: Option<Vec<String>> = get_json(&store, "task_suggestions:x").await.unwrap();
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_corrupt_entry_surfaces_cache_error() {
    let store = MemoryCacheStore::new(64);
    store
        .set_ex("task_analysis:bad", Duration::from_secs(60), "{not json".into())
        .await
        .unwrap();

    let result: taskmind_core::Result<Option<TaskAnalysis>> =
        get_json(&store, "task_analysis:bad").await;
    assert!(matches!(
        result,
        Err(taskmind_core::TaskMindError::Cache(ref m)) if m.contains("task_analysis:bad")
    ));
}

#[tokio::test]
async fn test_concurrent_access() {
    let store = Arc::new(MemoryCacheStore::new(1024));
    let mut handles = Vec::new();

    for worker in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                let key = format!("k:{}:{}", worker, i);
                store
                    .set_ex(&key, Duration::from_secs(60), i.to_string())
                    .await
                    .unwrap();
                assert_eq!(store.get(&key).await.unwrap(), Some(i.to_string()));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = store.stats().await;
    assert_eq!(stats.entries, 400);
    assert_eq!(stats.hits, 400);
}

#[tokio::test]
async fn test_noop_store_behind_trait_object() {
    let store: Arc<dyn CacheStore> = Arc::new(NoopCacheStore);
    set_json(store.as_ref(), "k", Duration::from_secs(1), &sample_analysis())
        .await
        .unwrap();
    let cached: Option<TaskAnalysis> = get_json(store.as_ref(), "k").await.unwrap();
    assert!(cached.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_new_keys_respect_capacity() {
    let store = Arc::new(MemoryCacheStore::new(4));
    let mut handles = Vec::new();

    for writer in 0..64 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .set_ex(
                    &format!("task_analysis:{}", writer),
                    Duration::from_secs(60),
                    writer.to_string(),
                )
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(store.len() <= 4);
    let stats = store.stats().await;
    assert_eq!(stats.entries, store.len());
    assert_eq!(stats.evictions as usize, 64 - store.len());
}
