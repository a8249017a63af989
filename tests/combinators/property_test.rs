/*!
 * Combinator Properties
 * Ordering, iteration count and fan-in checked over generated inputs
 */

use parking_lot::Mutex;
use procflow::combinators::Resume;
use procflow::{
    BoxProcess, Completion, Func, If, PResult, Parallel, Process, ProcessExt, Sequence, Suspend,
    While,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn capture() -> (Completion, Arc<Mutex<Vec<PResult>>>) {
    let results = Arc::new(Mutex::new(Vec::new()));
    let r = results.clone();
    (
        Completion::new(move |exit| r.lock().push(PResult::from_exit(exit))),
        results,
    )
}

fn step(log: &Arc<Mutex<Vec<usize>>>, index: usize, fails: bool) -> BoxProcess {
    let log = log.clone();
    Func::new(move || {
        log.lock().push(index);
        if fails {
            anyhow::bail!("step {} failed", index);
        }
        Ok(())
    })
    .boxed()
}

proptest! {
    #[test]
    fn property_test_sequence_runs_prefix_in_order(
        len in 0usize..40,
        fail_at in proptest::option::of(0usize..40),
    ) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let seq: Sequence = (0..len)
            .map(|i| step(&log, i, fail_at == Some(i)))
            .collect();

        let (completion, results) = capture();
        seq.invoke(completion).unwrap();

        let expected: Vec<usize> = match fail_at {
            Some(k) if k < len => (0..=k).collect(),
            _ => (0..len).collect(),
        };
        prop_assert_eq!(&*log.lock(), &expected);
        prop_assert_eq!(results.lock().len(), 1);

        let failed = matches!(fail_at, Some(k) if k < len);
        prop_assert_eq!(results.lock()[0].is_done(), !failed);
    }

    #[test]
    fn property_test_while_runs_body_k_times(k in 0usize..500) {
        let remaining = Arc::new(AtomicUsize::new(k));
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        let lp = While::new(
            move || {
                remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            },
            move || {
                let r = r.clone();
                Func::infallible(move || {
                    r.fetch_add(1, Ordering::SeqCst);
                })
                .boxed()
            },
        );

        let (completion, results) = capture();
        lp.invoke(completion).unwrap();

        prop_assert_eq!(runs.load(Ordering::SeqCst), k);
        prop_assert_eq!(lp.iterations(), k as u64);
        prop_assert!(results.lock()[0].is_done());
    }

    #[test]
    fn property_test_parallel_completes_after_last_child(
        order in (1usize..20).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle()),
    ) {
        let resumes: Vec<Arc<Mutex<Option<Resume>>>> =
            order.iter().map(|_| Arc::new(Mutex::new(None))).collect();
        let par: Parallel = resumes
            .iter()
            .map(|slot| {
                let slot = slot.clone();
                Suspend::new(move |resume| {
                    *slot.lock() = Some(resume);
                    None
                })
                .boxed()
            })
            .collect();

        let (completion, results) = capture();
        par.invoke(completion).unwrap();

        for (done, &index) in order.iter().enumerate() {
            prop_assert!(results.lock().is_empty(), "completed after {} of {}", done, order.len());
            let resume = resumes[index].lock().take().unwrap();
            prop_assert!(resume.done());
        }
        prop_assert_eq!(results.lock().len(), 1);
        prop_assert!(results.lock()[0].is_done());
    }

    #[test]
    fn property_test_if_runs_only_selected_branch(condition in any::<bool>()) {
        let then_runs = Arc::new(AtomicUsize::new(0));
        let else_runs = Arc::new(AtomicUsize::new(0));
        let (t, e) = (then_runs.clone(), else_runs.clone());
        let branch = If::new(
            move || condition,
            Func::infallible(move || { t.fetch_add(1, Ordering::SeqCst); }).boxed(),
            Func::infallible(move || { e.fetch_add(1, Ordering::SeqCst); }).boxed(),
        );

        branch.invoke(Completion::noop()).unwrap();

        prop_assert_eq!(then_runs.load(Ordering::SeqCst), usize::from(condition));
        prop_assert_eq!(else_runs.load(Ordering::SeqCst), usize::from(!condition));
    }
}
