//! tests/interaction_cache_tests.rs - TTL entry cache settlement semantics

#[cfg(test)]
mod tests {
    use crate::cache::{
        interaction::{InteractionCache, Step, Update},
        settlement::SettlementCause,
    };
    use crate::tests::support::{settle_pending, RecordingHandler};
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };
    use tokio::time::{sleep, timeout};

    fn participants_cache() -> (InteractionCache<Vec<String>>, Arc<RecordingHandler<Vec<String>>>) {
        let handler = RecordingHandler::<Vec<String>>::new();
        (InteractionCache::<Vec<String>>::with_handler(handler.clone()), handler)
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_fires_after_ttl_not_before() {
        let (cache, handler) = participants_cache();
        cache.set("k", Vec::new(), Duration::from_secs(1));

        sleep(Duration::from_millis(999)).await;
        assert_eq!(handler.count(), 0, "Settled before the TTL elapsed");
        assert!(cache.contains_key("k"));

        sleep(Duration::from_millis(10)).await;
        let settled = handler.settled();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].key, "k");
        assert_eq!(settled[0].cause, SettlementCause::Expired);
        assert!(settled[0].value.is_empty());
        assert!(cache.get("k").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_trigger_receives_appended_participants_in_order() {
        let (cache, handler) = participants_cache();
        cache.set("airdrop-X", Vec::new(), Duration::from_secs(180));

        for user in ["u1", "u2", "u3"] {
            cache.mutate("airdrop-X", |list| list.push(user.to_string()));
        }
        assert!(cache.trigger_early("airdrop-X"));
        settle_pending().await;

        let settled = handler.settled();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].value, vec!["u1", "u2", "u3"]);
        assert_eq!(settled[0].cause, SettlementCause::Early);
        assert!(cache.get("airdrop-X").is_none());

        // The aborted timer must not settle a second time
        sleep(Duration::from_secs(200)).await;
        assert_eq!(handler.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_after_settlement_is_noop() {
        let (cache, handler) = participants_cache();
        cache.set("k", vec!["a".to_string()], Duration::from_secs(1));
        sleep(Duration::from_secs(2)).await;

        // Step 1: expired key
        assert!(cache.mutate("k", |list| list.push("late".to_string())).is_none());
        assert!(!cache.contains_key("k"));

        // Step 2: early-settled key
        cache.set("e", Vec::new(), Duration::from_secs(60));
        assert!(cache.trigger_early("e"));
        assert!(cache.mutate("e", |list| list.push("late".to_string())).is_none());
        let update = cache.update("e", |list| {
            list.push("late".to_string());
            ((), Step::Keep)
        });
        assert_eq!(update, Update::Missing);
        assert!(!cache.trigger_early("e"));

        settle_pending().await;
        assert!(cache.is_empty());
        assert_eq!(handler.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_does_not_extend_ttl() {
        let (cache, handler) = participants_cache();
        cache.set("k", Vec::new(), Duration::from_secs(2));

        for _ in 0..3 {
            sleep(Duration::from_millis(500)).await;
            assert!(cache.get("k").is_some());
        }
        let left = cache.expires_in("k").unwrap();
        assert!(left <= Duration::from_millis(500) && left > Duration::from_millis(400));

        sleep(Duration::from_millis(600)).await;
        assert_eq!(handler.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_entry_is_not_settled() {
        let (cache, handler) = participants_cache();
        cache.set("k", vec!["old".to_string()], Duration::from_secs(1));
        cache.set("k", vec!["new".to_string()], Duration::from_secs(3));

        sleep(Duration::from_secs(2)).await;
        assert_eq!(handler.count(), 0, "Old timer settled the replacement");

        sleep(Duration::from_secs(2)).await;
        let settled = handler.settled();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].value, vec!["new"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_key_handler_overrides_default() {
        let (cache, default_handler) = participants_cache();
        let own_handler = RecordingHandler::<Vec<String>>::new();

        cache.set("plain", Vec::new(), Duration::from_secs(1));
        cache.set_with_handler("own", Vec::new(), Duration::from_secs(1), own_handler.clone());
        sleep(Duration::from_secs(2)).await;

        assert_eq!(default_handler.settled()[0].key, "plain");
        assert_eq!(default_handler.count(), 1);
        assert_eq!(own_handler.settled()[0].key, "own");
        assert_eq!(own_handler.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_errors_do_not_poison_cache() {
        let failing = RecordingHandler::<u32>::failing();
        let cache = InteractionCache::<u32>::with_handler(failing.clone());
        let healthy = RecordingHandler::<u32>::new();

        cache.set("a", 1, Duration::from_secs(1));
        cache.set_with_handler("b", 2, Duration::from_secs(2), healthy.clone());
        sleep(Duration::from_secs(3)).await;

        assert_eq!(failing.count(), 1);
        assert_eq!(healthy.settled()[0].value, 2);

        // Still usable after a failed settlement
        cache.set("c", 3, Duration::from_secs(10));
        assert!(cache.trigger_early("c"));
        settle_pending().await;
        assert_eq!(failing.count(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_settles_inside_critical_section() {
        let (cache, handler) = participants_cache();
        cache.set("k", Vec::new(), Duration::from_secs(60));

        let kept = cache.update("k", |list| {
            list.push("a".to_string());
            (list.len(), Step::Keep)
        });
        assert_eq!(kept, Update::Kept(1));

        let settled = cache.update("k", |list| {
            list.push("b".to_string());
            (list.len(), Step::Settle)
        });
        assert_eq!(settled, Update::Settled(2));
        assert!(!cache.contains_key("k"));

        settle_pending().await;
        assert_eq!(handler.settled()[0].value, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settlement_outlives_dropped_caller() {
        let handler = RecordingHandler::<Vec<String>>::slow(Duration::from_secs(5));
        let cache = InteractionCache::<Vec<String>>::with_handler(handler.clone());
        cache.set("airdrop-X", Vec::new(), Duration::from_secs(180));

        // Step 1: the caller gives up long before the handler is done
        let caller = {
            let cache = cache.clone();
            async move {
                let update = cache.update("airdrop-X", |list| {
                    list.push("u1".to_string());
                    ((), Step::Settle)
                });
                // A slow reply after the entry was taken
                sleep(Duration::from_secs(60)).await;
                update
            }
        };
        assert!(timeout(Duration::from_secs(1), caller).await.is_err());
        assert!(!cache.contains_key("airdrop-X"));
        assert_eq!(handler.started(), 1);
        assert_eq!(handler.count(), 0);

        // Step 2: the settlement still finishes, exactly once
        sleep(Duration::from_secs(400)).await;
        assert_eq!(handler.count(), 1);
        assert_eq!(handler.settled()[0].value, vec!["u1"]);
        assert_eq!(handler.settled()[0].cause, SettlementCause::Early);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_returns_before_handler_finishes() {
        let handler = RecordingHandler::<u32>::slow(Duration::from_secs(5));
        let cache = InteractionCache::<u32>::with_handler(handler.clone());
        cache.set("k", 0, Duration::from_secs(60));

        let update = cache.update("k", |n| {
            *n += 1;
            (*n, Step::Settle)
        });
        assert_eq!(update, Update::Settled(1));
        assert_eq!(handler.count(), 0);

        sleep(Duration::from_secs(6)).await;
        assert_eq!(handler.count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_triggers_settle_once() {
        let (cache, handler) = participants_cache();
        cache.set("k", vec!["a".to_string()], Duration::from_millis(20));

        let winners = Arc::new(AtomicUsize::new(0));
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            let winners = winners.clone();
            tasks.push(tokio::spawn(async move {
                if cache.trigger_early("k") {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // Let the timer race too
        sleep(Duration::from_millis(50)).await;

        let expected_winners = if handler.settled()[0].cause == SettlementCause::Early { 1 } else { 0 };
        assert_eq!(handler.count(), 1, "Settled more than once");
        assert_eq!(winners.load(Ordering::SeqCst), expected_winners);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_entries_respect_quota() {
        let (cache, handler) = participants_cache();
        cache.set("k", Vec::new(), Duration::from_secs(60));

        let mut tasks = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                cache.update("k", |list| {
                    list.push(format!("u{}", i));
                    let step = if list.len() >= 3 { Step::Settle } else { Step::Keep };
                    ((), step)
                })
            }));
        }

        let mut missing = 0;
        for task in tasks {
            if task.await.unwrap() == Update::Missing {
                missing += 1;
            }
        }

        assert_eq!(missing, 13);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(handler.count(), 1);
        assert_eq!(handler.settled()[0].value.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_cache_stops_settling() {
        let (cache, handler) = participants_cache();
        cache.set("k", Vec::new(), Duration::from_secs(1));
        drop(cache);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(handler.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_without_handler_is_dropped() {
        let cache: InteractionCache<u32> = InteractionCache::new();
        cache.set("k", 7, Duration::from_secs(1));
        assert_eq!(cache.len(), 1);

        sleep(Duration::from_secs(2)).await;
        assert!(cache.is_empty());
    }
}
