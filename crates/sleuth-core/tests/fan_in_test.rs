//! End-to-end behavior of the pool, queue and fan-in adapter
//!
//! Run with: cargo test -p sleuth-core --test fan_in_test

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use sleuth_core::prelude::*;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Drain a queue into (values, terminal error); fails the test if it never ends
async fn drain<T, E: Clone>(queue: AsyncQueue<T, E>) -> (Vec<T>, Option<E>) {
    let collect = async {
        let mut values = Vec::new();
        let mut terminal = None;
        let mut stream = Box::pin(queue.into_stream());
        while let Some(result) = stream.next().await {
            match result {
                Ok(value) => values.push(value),
                Err(error) => terminal = Some(error),
            }
        }
        (values, terminal)
    };

    tokio::time::timeout(DRAIN_TIMEOUT, collect)
        .await
        .expect("queue was never ended")
}

// ============================================
// Fan-in Scenarios
// ============================================

#[tokio::test]
async fn test_two_workers_times_ten() {
    let queue = parallel_map_to_queue(2, from_iter(vec![1, 2, 3, 4, 5]), |x| async move {
        Ok::<_, String>(x * 10)
    });

    let (mut values, terminal) = drain(queue).await;
    assert!(terminal.is_none());
    assert_eq!(values.len(), 5);

    values.sort_unstable();
    assert_eq!(values, vec![10, 20, 30, 40, 50]);
}

#[tokio::test]
async fn test_fatal_transform_ends_queue_with_error() {
    let queue = parallel_map_to_queue(2, from_iter(vec![1, 2, 3]), |x| async move {
        if x == 2 {
            Err(format!("item {x} exploded"))
        } else {
            Ok(x)
        }
    });

    let (values, terminal) = drain(queue).await;
    assert_eq!(terminal, Some("item 2 exploded".to_string()));
    assert!(values.len() <= 2);
    assert!(values.iter().all(|v| *v == 1 || *v == 3));
}

#[tokio::test]
async fn test_results_multiset_matches_transform_outputs() {
    let inputs: Vec<u64> = (0..60).collect();
    let queue = parallel_map_to_queue(7, from_iter(inputs.clone()), |n| async move {
        tokio::time::sleep(Duration::from_millis(n % 5)).await;
        Ok::<_, String>(n % 4)
    });

    let (values, terminal) = drain(queue).await;
    assert!(terminal.is_none());

    let mut expected: HashMap<u64, usize> = HashMap::new();
    for n in &inputs {
        *expected.entry(n % 4).or_default() += 1;
    }
    let mut actual: HashMap<u64, usize> = HashMap::new();
    for v in values {
        *actual.entry(v).or_default() += 1;
    }
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_every_item_transformed_exactly_once() {
    for (limit, len) in [(1, 10), (10, 10), (25, 3)] {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let queue = parallel_map_to_queue(limit, from_iter(0..len), move |n| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, String>(n) }
        });

        let (mut values, terminal) = drain(queue).await;
        assert!(terminal.is_none());
        values.sort_unstable();
        assert_eq!(values, (0..len).collect::<Vec<_>>(), "limit={limit}");
        assert_eq!(calls.load(Ordering::SeqCst), len, "limit={limit}");
    }
}

#[tokio::test]
async fn test_locally_recovered_failures_do_not_stop_the_pool() {
    let queue = parallel_map_to_queue(3, from_iter(0..9), |n| async move {
        let outcome: Result<i32, String> = if n % 3 == 0 {
            Err(format!("{n} failed"))
        } else {
            Ok(n)
        };
        // Record the failure on the result instead of propagating it
        Ok::<_, String>((n, outcome))
    });

    let (values, terminal) = drain(queue).await;
    assert!(terminal.is_none());
    assert_eq!(values.len(), 9);
    assert_eq!(values.iter().filter(|(_, r)| r.is_err()).count(), 3);
}

#[tokio::test]
async fn test_async_stream_input() {
    let source = Box::pin(futures::stream::unfold(0u32, |n| async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        (n < 6).then_some((n, n + 1))
    }));

    let queue = parallel_map_to_queue(3, source, |n| async move { Ok::<_, String>(n + 100) });

    let (mut values, terminal) = drain(queue).await;
    assert!(terminal.is_none());
    values.sort_unstable();
    assert_eq!(values, vec![100, 101, 102, 103, 104, 105]);
}

#[tokio::test]
async fn test_async_stream_shorter_than_worker_count() {
    // More workers than items: several see exhaustion on a non-fused stream
    let source = Box::pin(futures::stream::unfold(0u32, |n| async move {
        (n < 2).then_some((n, n + 1))
    }));

    let queue = parallel_map_to_queue(5, source, |n| async move { Ok::<_, String>(n) });

    let (mut values, terminal) = drain(queue).await;
    assert!(terminal.is_none());
    values.sort_unstable();
    assert_eq!(values, vec![0, 1]);
}

#[tokio::test]
async fn test_panicking_transform_ends_queue_with_error() {
    let queue = parallel_map_to_queue(3, from_iter(0..6u32), |n| async move {
        tokio::time::sleep(Duration::from_millis(u64::from(n))).await;
        if n == 3 {
            panic!("cannot handle {n}");
        }
        Ok::<_, String>(n)
    });

    let (values, terminal) = drain(queue).await;
    let terminal = terminal.expect("panic must surface as the terminal error");
    assert!(terminal.contains("cannot handle 3"), "{terminal}");
    assert!(!values.contains(&3));
}

// ============================================
// Consumer-side Ranking
// ============================================

#[tokio::test]
async fn test_top_results_from_queue() {
    let queue = parallel_map_to_queue(4, from_iter(vec![5, 3, 8, 1, 9]), |score| async move {
        tokio::time::sleep(Duration::from_millis(score)).await;
        Ok::<_, String>(score)
    });

    let mut bucket = TopResultsBucket::new(2, |score: &u64| *score);
    let (values, terminal) = drain(queue).await;
    assert!(terminal.is_none());
    for value in values {
        bucket.add(value);
    }

    let mut kept = bucket.into_items();
    kept.sort_unstable();
    assert_eq!(kept, vec![8, 9]);
}

#[tokio::test]
async fn test_parallel_reduce_over_queue_free_sequence() {
    let longest = tokio::time::timeout(
        DRAIN_TIMEOUT,
        parallel_reduce(
            3,
            0usize,
            from_iter(["a", "abcd", "ab", "abcdef", "abc"]),
            |best, word| async move { Ok::<_, ()>(best.max(word.len())) },
            usize::max,
        ),
    )
    .await
    .expect("reduce never finished");

    assert_eq!(longest, Ok(6));
}
