/*!
 * Fire-Once Tests
 * Every process reports exactly one exit, even when kill and resumption race
 */

use parking_lot::Mutex;
use procflow::combinators::Resume;
use procflow::{
    BoxProcess, Closure, Completion, Delay, Empty, Func, If, PResult, Parallel, Process,
    ProcessExt, ProcessState, Sequence, Suspend, While,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn counting() -> (Completion, Arc<AtomicUsize>, Arc<Mutex<Option<PResult>>>) {
    let count = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(Mutex::new(None));
    let (c, l) = (count.clone(), last.clone());
    (
        Completion::new(move |exit| {
            c.fetch_add(1, Ordering::SeqCst);
            *l.lock() = Some(PResult::from_exit(exit));
        }),
        count,
        last,
    )
}

fn parked(slot: &Arc<Mutex<Option<Resume>>>) -> BoxProcess {
    let slot = slot.clone();
    Suspend::new(move |resume| {
        *slot.lock() = Some(resume);
        None
    })
    .boxed()
}

#[test]
fn test_every_variant_fires_once() {
    let variants: Vec<BoxProcess> = vec![
        Empty::new().boxed(),
        Func::infallible(|| {}).boxed(),
        Func::new(|| Err(anyhow::anyhow!("fails"))).boxed(),
        Sequence::new(vec![Empty::new().boxed(), Empty::new().boxed()]).boxed(),
        Parallel::new(vec![Empty::new().boxed(), Empty::new().boxed()]).boxed(),
        Closure::new(|| Empty::new().boxed()).boxed(),
        While::new(|| false, || Empty::new().boxed()).boxed(),
        If::then(|| true, Empty::new().boxed()).boxed(),
    ];

    for process in variants {
        let (completion, count, _) = counting();
        process.invoke(completion).unwrap();
        process.kill();
        process.kill();

        assert_eq!(count.load(Ordering::SeqCst), 1, "{}", process.name());
        assert_eq!(process.state(), ProcessState::Completed);
    }
}

#[test]
fn test_resume_after_kill_is_dropped() {
    let slot = Arc::new(Mutex::new(None));
    let process = parked(&slot);
    let (completion, count, last) = counting();
    process.invoke(completion).unwrap();

    process.kill();
    let resume = slot.lock().take().unwrap();
    assert!(!resume.done());
    assert!(!resume.throw(procflow::ProcessError::msg("late")));

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(matches!(last.lock().as_ref(), Some(PResult::Killed)));
}

#[test]
fn test_kill_races_resume_across_threads() {
    for _ in 0..200 {
        let slot = Arc::new(Mutex::new(None));
        let seq = Arc::new(Sequence::new(vec![parked(&slot), Empty::new().boxed()]));
        let (completion, count, _) = counting();
        seq.invoke(completion).unwrap();
        let resume = slot.lock().take().unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let killer = {
            let seq = seq.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                seq.kill();
            })
        };
        barrier.wait();
        resume.done();
        killer.join().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_parallel_children_completing_concurrently() {
    const CHILDREN: usize = 16;
    for _ in 0..50 {
        let slots: Vec<Arc<Mutex<Option<Resume>>>> =
            (0..CHILDREN).map(|_| Arc::new(Mutex::new(None))).collect();
        let par = Parallel::new(slots.iter().map(parked).collect());
        let (completion, count, last) = counting();
        par.invoke(completion).unwrap();

        let barrier = Arc::new(Barrier::new(CHILDREN));
        let handles: Vec<_> = slots
            .iter()
            .map(|slot| {
                let resume = slot.lock().take().unwrap();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    resume.done();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(last.lock().as_ref().unwrap().is_done());
    }
}

#[test]
fn test_delay_killed_while_timer_fires() {
    for _ in 0..50 {
        let delay = Arc::new(Delay::new(Duration::from_micros(200)));
        let (completion, count, _) = counting();
        delay.invoke(completion).unwrap();

        thread::sleep(Duration::from_micros(150));
        delay.kill();
        thread::sleep(Duration::from_millis(2));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
