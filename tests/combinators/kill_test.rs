/*!
 * Kill Tests
 * Cancellation in every lifecycle state, across nested trees
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use procflow::{
    invoke_blocking, run_blocking, BoxProcess, Closure, Completion, Delay, Empty, Func, If,
    PResult, Parallel, Process, ProcessExt, ResultKind, Sequence, Suspend, While,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

fn capture() -> (Completion, Arc<Mutex<Vec<PResult>>>) {
    let results = Arc::new(Mutex::new(Vec::new()));
    let r = results.clone();
    (
        Completion::new(move |exit| r.lock().push(PResult::from_exit(exit))),
        results,
    )
}

fn kinds(results: &Arc<Mutex<Vec<PResult>>>) -> Vec<ResultKind> {
    results.lock().iter().map(PResult::kind).collect()
}

fn long_delay() -> BoxProcess {
    Delay::new(Duration::from_secs(30)).boxed()
}

fn kill_after(process: Arc<dyn Process>, after: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(after);
        process.kill();
    })
}

#[test]
fn test_kill_running_composites() {
    let composites: Vec<BoxProcess> = vec![
        Sequence::new(vec![Empty::new().boxed(), long_delay()]).boxed(),
        Parallel::new(vec![long_delay(), long_delay()]).boxed(),
        While::new(|| true, long_delay).boxed(),
        If::then(|| true, long_delay()).boxed(),
        Closure::new(long_delay).boxed(),
    ];

    for process in composites {
        let process: Arc<dyn Process> = Arc::from(process);
        let start = Instant::now();
        let killer = kill_after(process.clone(), Duration::from_millis(20));

        let result = run_blocking(&process);
        killer.join().unwrap();

        assert!(matches!(result, PResult::Killed), "{}", process.name());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}

#[test]
fn test_kill_before_invoke_never_starts_work() {
    let started = Arc::new(AtomicBool::new(false));
    let s = started.clone();
    let seq = Sequence::new(vec![
        Func::infallible(move || s.store(true, Ordering::SeqCst)).boxed(),
    ]);

    seq.kill();
    let (completion, results) = capture();
    seq.invoke(completion).unwrap();

    assert!(!started.load(Ordering::SeqCst));
    assert_eq!(kinds(&results), vec![ResultKind::Killed]);
}

#[test]
fn test_kill_after_completion_is_noop() {
    let par = Parallel::new(vec![Empty::new().boxed(), Func::infallible(|| {}).boxed()]);
    let (completion, results) = capture();
    par.invoke(completion).unwrap();
    par.kill();

    assert_eq!(kinds(&results), vec![ResultKind::Done]);
}

#[test]
fn test_kill_reaches_nested_leaf() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let c = cancelled.clone();
    let leaf = Suspend::new(move |_resume| {
        Some(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }) as procflow::CancelHook)
    });
    let tree = Sequence::new(vec![
        Empty::new().boxed(),
        Parallel::new(vec![
            If::then(|| true, Closure::new(move || leaf.boxed()).boxed()).boxed(),
            long_delay(),
        ])
        .boxed(),
    ]);

    let (completion, results) = capture();
    tree.invoke(completion).unwrap();
    tree.kill();

    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(kinds(&results), vec![ResultKind::Killed]);
}

#[test]
fn test_killed_loop_ignoring_body_still_fails() {
    // The body is a Func, whose kill is a no-op
    let iterations = Arc::new(AtomicUsize::new(0));
    let i = iterations.clone();
    let lp = Arc::new(While::new(
        || true,
        move || {
            let i = i.clone();
            Func::infallible(move || {
                i.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(1));
            })
            .boxed()
        },
    ));

    let killer = kill_after(lp.clone(), Duration::from_millis(20));
    let err = invoke_blocking(&lp).unwrap_err();
    killer.join().unwrap();

    assert!(err.is_killed());
    assert!(iterations.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_timeout_by_killing_after_delay() {
    let work: Arc<dyn Process> = Arc::from(long_delay());
    let deadline = Delay::from_millis(10);

    let (completion, results) = capture();
    let w = work.clone();
    let watchdog = Sequence::new(vec![
        deadline.boxed(),
        Func::infallible(move || w.kill()).boxed(),
    ]);
    work.invoke(completion).unwrap();
    invoke_blocking(&watchdog).unwrap();

    assert_eq!(kinds(&results), vec![ResultKind::Killed]);
}

#[test]
fn test_kill_between_loop_iterations() {
    let bodies = Arc::new(AtomicUsize::new(0));
    let b = bodies.clone();
    let lp = Arc::new_cyclic(|weak: &Weak<While>| {
        let weak = weak.clone();
        let checks = AtomicUsize::new(0);
        While::new(
            move || {
                // Killed from the second predicate check, after the first body finished
                if checks.fetch_add(1, Ordering::SeqCst) == 1 {
                    if let Some(lp) = weak.upgrade() {
                        lp.kill();
                    }
                }
                true
            },
            move || {
                if b.fetch_add(1, Ordering::SeqCst) == 0 {
                    Func::infallible(|| {}).boxed()
                } else {
                    Suspend::new(|_resume| None).boxed()
                }
            },
        )
    });

    let (completion, results) = capture();
    lp.invoke(completion).unwrap();

    assert_eq!(kinds(&results), vec![ResultKind::Killed]);
    assert_eq!(lp.iterations(), 1);
    assert!(lp.state().is_completed());
}

#[test]
fn test_kill_while_sequence_advances() {
    let armed = Arc::new(AtomicBool::new(false));
    let a = armed.clone();
    let seq = Arc::new_cyclic(|weak: &Weak<Sequence>| {
        let weak = weak.clone();
        Sequence::new(vec![
            Func::infallible(move || {
                if let Some(seq) = weak.upgrade() {
                    seq.kill();
                }
            })
            .boxed(),
            Suspend::new(move |_resume| {
                a.store(true, Ordering::SeqCst);
                None
            })
            .boxed(),
        ])
    });

    let (completion, results) = capture();
    seq.invoke(completion).unwrap();

    assert_eq!(kinds(&results), vec![ResultKind::Killed]);
    assert!(!armed.load(Ordering::SeqCst));
}

#[test]
fn test_kill_while_leaf_arms_disarms_trigger() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let c = cancelled.clone();
    let tree = Arc::new_cyclic(|weak: &Weak<Sequence>| {
        let weak = weak.clone();
        Sequence::new(vec![
            Empty::new().boxed(),
            Suspend::new(move |_resume| {
                if let Some(tree) = weak.upgrade() {
                    tree.kill();
                }
                Some(Box::new(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                }) as procflow::CancelHook)
            })
            .boxed(),
        ])
    });

    let (completion, results) = capture();
    tree.invoke(completion).unwrap();

    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(kinds(&results), vec![ResultKind::Killed]);
}

#[test]
fn test_shared_child_runs_under_one_parent_only() {
    let shared = Arc::new(Suspend::new(|resume| {
        resume.done();
        None
    }));
    let first = Sequence::new(vec![shared.clone().boxed()]);
    let second = Sequence::new(vec![shared.clone().boxed()]);

    assert!(run_blocking(&first).is_done());
    let result = run_blocking(&second);
    assert!(matches!(
        result,
        PResult::Exception(procflow::ProcessError::Protocol(
            procflow::ProtocolError::AlreadyInvoked(_)
        ))
    ));

    // The extra handle still observes and kills harmlessly
    assert!(shared.state().is_completed());
    shared.kill();
}
