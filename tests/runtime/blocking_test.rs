/*!
 * Blocking Bridge Tests
 * End-to-end runs of process trees from synchronous code
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use procflow::{
    invoke_blocking, invoke_blocking_timeout, run_blocking, Builder, Delay, Func, PResult,
    Parallel, ProcessError, ProcessExt, RuntimeConfig, Sequence, Suspend, WaitList,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_sequence_with_delay_between_steps() {
    let log: Arc<Mutex<Vec<(&str, Instant)>>> = Arc::new(Mutex::new(Vec::new()));
    let (a, b) = (log.clone(), log.clone());
    let seq = Sequence::new(vec![
        Func::infallible(move || a.lock().push(("a", Instant::now()))).boxed(),
        Delay::from_millis(50).boxed(),
        Func::infallible(move || b.lock().push(("b", Instant::now()))).boxed(),
    ]);

    invoke_blocking(&seq).unwrap();

    let log = log.lock();
    let names: Vec<&str> = log.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(log[1].1 - log[0].1 >= Duration::from_millis(50));
}

#[test]
fn test_parallel_bounded_by_slowest_child() {
    let par = Parallel::new(vec![
        Delay::from_millis(10).boxed(),
        Delay::from_millis(20).boxed(),
    ]);

    let start = Instant::now();
    invoke_blocking(&par).unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(20));
    assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
}

#[test]
fn test_wait_available_blocks_until_push() {
    let list: WaitList<&str> = WaitList::new();
    let producer = {
        let list = list.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            list.push("item");
        })
    };

    let start = Instant::now();
    invoke_blocking(&list.wait_available()).unwrap();
    producer.join().unwrap();

    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(list.pop_front(), Some("item"));
}

#[test]
fn test_consumer_loop_drains_producer() {
    const ITEMS: usize = 50;
    let list: WaitList<usize> = WaitList::new();
    let received = Arc::new(Mutex::new(Vec::new()));

    let builder = Builder::new();
    let consumer = {
        let list = list.clone();
        let received = received.clone();
        let counted = received.clone();
        builder.loop_seq(
            move || counted.lock().len() < ITEMS,
            move || {
                let list = list.clone();
                let received = received.clone();
                vec![
                    list.wait_available(),
                    Func::infallible(move || {
                        while let Some(item) = list.pop_front() {
                            received.lock().push(item);
                        }
                    })
                    .boxed(),
                ]
            },
        )
    };

    let producer = {
        let list = list.clone();
        thread::spawn(move || {
            for i in 0..ITEMS {
                list.push(i);
                if i % 10 == 0 {
                    thread::sleep(Duration::from_millis(1));
                }
            }
        })
    };

    invoke_blocking_timeout(&consumer, Duration::from_secs(10)).unwrap();
    producer.join().unwrap();
    assert_eq!(*received.lock(), (0..ITEMS).collect::<Vec<_>>());
}

#[test]
fn test_exception_surfaces_at_bridge() {
    let seq = Sequence::new(vec![
        Delay::from_millis(1).boxed(),
        Func::new(|| anyhow::bail!("disk full")).boxed(),
    ]);

    match run_blocking(&seq) {
        PResult::Exception(ProcessError::Exception(err)) => {
            assert_eq!(err.to_string(), "disk full")
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_external_resume_from_other_thread() {
    let suspend = Suspend::new(|resume| {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            resume.throw(ProcessError::msg("remote failure"));
        });
        None
    });

    let err = invoke_blocking(&suspend).unwrap_err();
    assert_eq!(err.to_string(), "Process failed: remote failure");
}

#[test]
fn test_config_deadline_kills_stuck_tree() {
    let config = RuntimeConfig {
        blocking_timeout: Some(Duration::from_millis(20)),
        ..RuntimeConfig::default()
    };
    let builder = Builder::from_config(&config);
    let tree = builder.starter(|b| b.seq(vec![b.empty(), b.suspend(|_| None)]));

    let err = config.run(&tree).unwrap_err();
    assert!(err.is_killed());
}
