/*!
 * Async Bridge Tests
 * Process trees awaited from tokio, with tokio executor and timer
 */

use procflow::{
    into_future, Builder, PResult, ResultKind, TokioExecutor, TokioTimer, WaitList,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn tokio_builder() -> Builder {
    Builder::new()
        .with_executor(Arc::new(TokioExecutor::current()))
        .with_timer(Arc::new(TokioTimer::current()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_await_tree_on_tokio() {
    let b = tokio_builder();
    let root = b.starter(|b| {
        b.seq(vec![
            b.delay_millis(5),
            b.par(vec![b.delay_millis(5), b.delay_millis(10)]),
            b.func(|| {}),
        ])
    });

    let start = Instant::now();
    let result = into_future(root).await;
    assert!(result.is_done());
    assert!(start.elapsed() >= Duration::from_millis(15));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_kill_pending_future() {
    let b = tokio_builder();
    let fut = into_future(b.starter(|b| b.delay(Duration::from_secs(30))));

    fut.kill();
    let result = tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .unwrap();
    assert_eq!(result.kind(), ResultKind::Killed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_list_across_tasks() {
    let list: WaitList<u32> = WaitList::new();
    let waiting = into_future(list.wait_available());

    let producer = list.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        producer.push(42);
    });

    assert!(matches!(waiting.await, PResult::Done));
    assert_eq!(list.to_vec(), vec![42]);
}

#[tokio::test]
async fn test_rejected_second_run() {
    let b = Builder::new();
    let process = Arc::new(b.func(|| {}));

    assert!(into_future(process.clone()).await.is_done());
    assert!(matches!(
        into_future(process).await,
        PResult::Exception(procflow::ProcessError::Protocol(_))
    ));
}

#[tokio::test]
async fn test_empty_process_resolves_immediately() {
    let b = Builder::new();
    let result = into_future(b.empty()).await;
    assert!(result.is_done());
}
