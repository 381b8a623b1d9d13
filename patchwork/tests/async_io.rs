use futures::future::join_all;
use patchwork::{CancelToken, MemStore, Patchwork, PatchworkError, ReadOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_readers_and_out_of_order_writes() {
    init_tracing();
    let pw = Arc::new(Patchwork::new(MemStore::new(10)));

    let readers: Vec<_> = (0..10)
        .map(|_| {
            let pw = Arc::clone(&pw);
            tokio::spawn(async move { pw.read_to_end_async().await })
        })
        .collect();

    for offset in [8, 2, 6, 0, 4] {
        pw.write_at_async(b"xy".to_vec(), offset).await.unwrap();
    }

    for result in join_all(readers).await {
        assert_eq!(result.unwrap().unwrap(), b"xyxyxyxyxy");
    }
}

#[tokio::test]
async fn test_read_range_async() {
    init_tracing();
    let pw = Arc::new(Patchwork::new(MemStore::new(8)));

    let reader = {
        let pw = Arc::clone(&pw);
        tokio::spawn(async move { pw.read_at_async(2, 3).await })
    };

    pw.write_at_async(b"abcdefgh".to_vec(), 0).await.unwrap();
    assert_eq!(reader.await.unwrap().unwrap(), b"cde");
}

#[tokio::test]
async fn test_out_of_range_async() {
    init_tracing();
    let pw = Arc::new(Patchwork::new(MemStore::new(4)));
    assert!(matches!(
        pw.read_at_async(2, 8).await,
        Err(PatchworkError::OutOfRange { .. })
    ));
}

#[tokio::test]
async fn test_oversized_async_read_is_rejected_before_allocating() {
    init_tracing();
    let pw = Arc::new(Patchwork::new(MemStore::new(4)));
    assert!(matches!(
        pw.read_at_async(0, usize::MAX).await,
        Err(PatchworkError::OutOfRange { offset: 0, capacity: 4, .. })
    ));
}

#[tokio::test]
async fn test_cancel_async_read() {
    init_tracing();
    let pw = Arc::new(Patchwork::new(MemStore::new(4)));
    let token = CancelToken::new();

    let reader = {
        let pw = Arc::clone(&pw);
        let opts = ReadOptions::default().cancel(&token);
        tokio::spawn(async move { pw.read_at_async_with(0, 4, opts).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    assert!(matches!(
        reader.await.unwrap(),
        Err(PatchworkError::Cancelled)
    ));
}

#[tokio::test]
async fn test_timeout_async_read() {
    init_tracing();
    let pw = Arc::new(Patchwork::new(MemStore::new(4)));
    let opts = ReadOptions::default().timeout(Duration::from_millis(10));

    assert!(matches!(
        pw.read_at_async_with(0, 4, opts).await,
        Err(PatchworkError::TimedOut)
    ));
}
