use rayon::{ThreadPool, ThreadPoolBuilder};
use std::cmp;
use std::sync::LazyLock;

/// The process-wide work-stealing pool behind every parallel operation.
///
/// No operation spawns dedicated long-lived threads; initiating calls block
/// until the recursive decomposition they submit here completes.
pub static POOL: LazyLock<ThreadPool> = LazyLock::new(|| {
    ThreadPoolBuilder::new()
        .thread_name(|i| format!("tabular-{i}"))
        .build()
        .expect("could not create thread pool")
});

/// Runs two closures, potentially in parallel, inside the shared pool.
pub(crate) fn join<A, B, RA, RB>(oper_a: A, oper_b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    POOL.install(|| rayon::join(oper_a, oper_b))
}

/// Number of workers available for recursive splitting.
#[must_use]
pub(crate) fn width() -> usize {
    POOL.current_num_threads()
}

/// Per-operation split threshold: total element count divided by the
/// available hardware concurrency, never below one.
#[must_use]
pub(crate) fn split_threshold(total: usize) -> usize {
    cmp::max(1, total / cmp::max(1, width()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_never_zero() {
        assert_eq!(split_threshold(0), 1);
        assert!(split_threshold(1_000_000) >= 1);
    }

    #[test]
    fn join_runs_both_sides() {
        let (a, b) = join(|| 40, || 2);
        assert_eq!(a + b, 42);
    }
}
