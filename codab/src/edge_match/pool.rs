//! Fixed-size pool of named worker threads sharing one job queue.
//!
//! ```text
//!   jobs ──► mpsc::channel ──► Arc<Mutex<Receiver>>
//!                                  │
//!            ┌─────────────┬───────┴──────┬─────────────┐
//!            ▼             ▼              ▼             ▼
//!      worker-0      worker-1       worker-2   ...  worker-N
//!            │             │              │             │
//!            └─────────────┴──────┬───────┴─────────────┘
//!                                 ▼
//!                     results (completion order)
//! ```
//!
//! Workers are scoped threads, so jobs may borrow from the caller. Every job
//! runs inside `catch_unwind`: a panic fails that job only.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, error};

/// Result of one job; `Err` carries the panic message.
pub type JobResult<R> = Result<R, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `work` over every job and wait for all of them.
    ///
    /// Returns once every job has finished (the barrier). Results come back
    /// in completion order.
    pub fn run<J, R, F>(&self, jobs: Vec<J>, work: F) -> Vec<(J, JobResult<R>)>
    where
        J: Send,
        R: Send,
        F: Fn(&J) -> R + Sync,
    {
        let total = jobs.len();
        let (job_sender, job_receiver) = mpsc::channel::<J>();
        for job in jobs {
            // The receiver is alive until the end of this function.
            let _ = job_sender.send(job);
        }
        drop(job_sender);

        let job_receiver = Arc::new(Mutex::new(job_receiver));
        let (result_sender, result_receiver) = mpsc::channel();
        let workers = self.threads.min(total.max(1));

        thread::scope(|scope| {
            let mut spawned = 0;
            for i in 0..workers {
                let receiver = Arc::clone(&job_receiver);
                let sender = result_sender.clone();
                let work = &work;
                let handle = thread::Builder::new()
                    .name(format!("edge-match-worker-{}", i))
                    .spawn_scoped(scope, move || worker_loop(receiver, sender, work));
                match handle {
                    Ok(_) => spawned += 1,
                    Err(e) => error!(worker = i, error = %e, "failed to spawn worker thread"),
                }
            }
            if spawned == 0 {
                worker_loop(Arc::clone(&job_receiver), result_sender.clone(), &work);
            }
        });
        drop(result_sender);

        let results: Vec<(J, JobResult<R>)> = result_receiver.into_iter().collect();
        debug!(jobs = total, completed = results.len(), "worker pool drained");
        results
    }
}

fn worker_loop<J, R, F>(
    receiver: Arc<Mutex<Receiver<J>>>,
    sender: Sender<(J, JobResult<R>)>,
    work: &F,
) where
    F: Fn(&J) -> R,
{
    loop {
        let next = {
            let guard = match receiver.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.recv()
        };
        let Ok(job) = next else {
            break;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| work(&job))).map_err(panic_message);
        if sender.send((job, result)).is_err() {
            break;
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_every_job_runs_once() {
        let counter = AtomicUsize::new(0);
        let pool = WorkerPool::new(4);
        let results = pool.run((0..20).collect(), |n: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            n * 2
        });
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        let mut doubled: Vec<u32> = results.into_iter().map(|(_, r)| r.unwrap()).collect();
        doubled.sort();
        assert_eq!(doubled, (0..20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_panic_fails_only_that_job() {
        let pool = WorkerPool::new(2);
        let results = pool.run(vec![1, 2, 3], |n: &i32| {
            if *n == 2 {
                panic!("bad job");
            }
            *n
        });
        assert_eq!(results.len(), 3);
        let failed: Vec<i32> = results
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(j, _)| *j)
            .collect();
        assert_eq!(failed, vec![2]);
        let (_, err) = results.iter().find(|(j, _)| *j == 2).unwrap();
        assert_eq!(err.as_ref().unwrap_err(), "bad job");
    }

    #[test]
    fn test_workers_are_named() {
        let pool = WorkerPool::new(3);
        let results = pool.run((0..9).collect(), |_: &u32| {
            thread::current().name().map(str::to_string)
        });
        let names: HashSet<String> = results
            .into_iter()
            .filter_map(|(_, r)| r.unwrap())
            .collect();
        assert!(!names.is_empty());
        assert!(names.iter().all(|n| n.starts_with("edge-match-worker-")));
    }

    #[test]
    fn test_empty_queue() {
        let results = WorkerPool::new(2).run(Vec::<u8>::new(), |n| *n);
        assert!(results.is_empty());
    }

    #[test]
    fn test_zero_threads_is_one() {
        assert_eq!(WorkerPool::new(0).threads(), 1);
    }
}
