//! Thread-safe FIFO task queue with blocking, interruptible consumers.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::interrupt::Interrupt;
use crate::types::Task;

/// Outcome of a blocking pop.
#[derive(Debug, PartialEq, Eq)]
pub enum Pop {
    Task(Task),
    /// The queue is closed and fully drained.
    Closed,
    /// The caller's interrupt flag was raised.
    Interrupted,
}

/// A synchronized FIFO queue of tasks.
///
/// One mutex guards both the sequence and the closed flag; the condvar
/// signals "non-empty or closed".
pub struct TaskQueue {
    inner: Mutex<TaskQueueState>,
    available: Condvar,
}

struct TaskQueueState {
    queue: VecDeque<Task>,
    closed: bool,
}

impl TaskQueue {
    /// Create an empty task queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TaskQueueState {
                queue: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Push a task; returns the task back if the queue is closed.
    pub fn push(&self, task: Task) -> Result<(), Task> {
        let mut guard = self.inner.lock().expect("task queue mutex poisoned");
        if guard.closed {
            return Err(task);
        }
        guard.queue.push_back(task);
        self.available.notify_one();
        Ok(())
    }

    /// Try to pop immediately without blocking.
    pub fn try_pop(&self) -> Option<Task> {
        let mut guard = self.inner.lock().expect("task queue mutex poisoned");
        guard.queue.pop_front()
    }

    /// Block until a task is available, the queue is closed and empty, or
    /// `interrupt` is raised.
    ///
    /// Queued tasks are handed out before [`Pop::Closed`] is reported. An
    /// interrupt wins over a queued task so a cancelled worker stops taking
    /// work.
    pub fn pop_blocking(&self, interrupt: &Interrupt) -> Pop {
        let mut guard = self.inner.lock().expect("task queue mutex poisoned");
        loop {
            if interrupt.is_raised() {
                return Pop::Interrupted;
            }
            if let Some(task) = guard.queue.pop_front() {
                return Pop::Task(task);
            }
            if guard.closed {
                return Pop::Closed;
            }
            // Wait releases the lock and re-acquires it before returning.
            guard = self.available.wait(guard).expect("condvar wait failed");
        }
    }

    /// Close the queue and wake all blocked consumers.
    pub fn close(&self) {
        let mut guard = self.inner.lock().expect("task queue mutex poisoned");
        guard.closed = true;
        self.available.notify_all();
    }

    /// Wake every blocked consumer so it re-checks its interrupt flag.
    ///
    /// Must be called after [`Interrupt::raise`]; taking the lock here
    /// orders the wakeup after any waiter's flag check.
    pub fn wake_all(&self) {
        let _guard = self.inner.lock().expect("task queue mutex poisoned");
        self.available.notify_all();
    }

    /// Current number of queued tasks.
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("task queue mutex poisoned");
        guard.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(target_os = "linux")]
    use crate::usage::thread_cpu_times;
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn tasks_are_consumed_once() {
        let queue = Arc::new(TaskQueue::new());
        let total_tasks = 100;
        for id in 0..total_tasks {
            queue.push(Task::new(id)).expect("task queue closed");
        }
        queue.close();

        let consumers = 4;
        let barrier = Arc::new(Barrier::new(consumers));
        let seen: Arc<Mutex<HashSet<u64>>> = Arc::new(Mutex::new(HashSet::new()));

        let mut handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            let seen = Arc::clone(&seen);
            handles.push(thread::spawn(move || {
                let interrupt = Interrupt::new();
                barrier.wait();
                while let Pop::Task(task) = queue.pop_blocking(&interrupt) {
                    let mut guard = seen.lock().expect("seen mutex poisoned");
                    // Each task id should be observed at most once.
                    assert!(guard.insert(task.id));
                }
            }));
        }

        for handle in handles {
            handle.join().expect("consumer thread panicked");
        }

        let guard = seen.lock().expect("seen mutex poisoned");
        assert_eq!(guard.len(), total_tasks as usize);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn single_consumer_sees_fifo_order() {
        let queue = TaskQueue::new();
        for id in [5, 1, 9, 3] {
            queue.push(Task::new(id)).expect("task queue closed");
        }
        queue.close();

        let interrupt = Interrupt::new();
        let mut order = Vec::new();
        while let Pop::Task(task) = queue.pop_blocking(&interrupt) {
            order.push(task.id);
        }
        assert_eq!(order, vec![5, 1, 9, 3]);
    }

    #[test]
    fn pop_blocking_wakes_on_push() {
        let queue = Arc::new(TaskQueue::new());
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            ready_tx.send(()).expect("send ready");
            let popped = queue_clone.pop_blocking(&Interrupt::new());
            tx.send(popped).expect("send pop");
        });

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        // Nothing should come back while the queue stays empty.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        // Pushing after the consumer blocks should wake it.
        queue.push(Task::new(99)).expect("task queue closed");

        let received = rx
            .recv_timeout(Duration::from_secs(1))
            .expect("receive pop");
        assert_eq!(received, Pop::Task(Task::new(99)));
        handle.join().expect("blocking pop thread panicked");
    }

    #[test]
    fn blocking_consumers_each_get_unique_task() {
        let queue = Arc::new(TaskQueue::new());
        let consumers = 4;
        let barrier = Arc::new(Barrier::new(consumers));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let mut handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            let ready_tx = ready_tx.clone();
            let done_tx = done_tx.clone();
            handles.push(thread::spawn(move || {
                barrier.wait();
                ready_tx.send(()).expect("ready");
                match queue.pop_blocking(&Interrupt::new()) {
                    Pop::Task(task) => done_tx.send(task.id).expect("done"),
                    other => panic!("unexpected pop outcome: {other:?}"),
                }
            }));
        }

        for _ in 0..consumers {
            ready_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("ready recv");
        }

        // Provide exactly one task per consumer.
        for id in 0..consumers as u64 {
            queue.push(Task::new(id)).expect("task queue closed");
        }

        let mut seen = HashSet::new();
        for _ in 0..consumers {
            let id = done_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("done recv");
            assert!(seen.insert(id));
        }

        for handle in handles {
            handle.join().expect("consumer thread panicked");
        }
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn pop_blocking_unblocks_on_close() {
        let queue = Arc::new(TaskQueue::new());
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            ready_tx.send(()).expect("ready");
            let popped = queue_clone.pop_blocking(&Interrupt::new());
            done_tx.send(popped).expect("done");
        });

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        queue.close();

        let popped = done_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("done recv");
        assert_eq!(popped, Pop::Closed);
        handle.join().expect("consumer thread panicked");
    }

    #[test]
    fn closed_queue_still_drains_queued_tasks() {
        let queue = TaskQueue::new();
        queue.push(Task::new(1)).expect("task queue closed");
        queue.close();
        let interrupt = Interrupt::new();
        assert_eq!(queue.pop_blocking(&interrupt), Pop::Task(Task::new(1)));
        assert_eq!(queue.pop_blocking(&interrupt), Pop::Closed);
    }

    #[test]
    fn interrupt_unblocks_waiting_consumer() {
        let queue = Arc::new(TaskQueue::new());
        let interrupt = Interrupt::new();
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let interrupt_clone = interrupt.clone();
        let handle = thread::spawn(move || {
            ready_tx.send(()).expect("ready");
            let popped = queue_clone.pop_blocking(&interrupt_clone);
            done_tx.send(popped).expect("done");
        });

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        interrupt.raise();
        queue.wake_all();

        let popped = done_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("done recv");
        assert_eq!(popped, Pop::Interrupted);
        handle.join().expect("consumer thread panicked");
        // Interrupting a consumer does not close the queue.
        assert!(queue.push(Task::new(2)).is_ok());
    }

    #[test]
    fn interrupt_wins_over_queued_task() {
        let queue = TaskQueue::new();
        queue.push(Task::new(1)).expect("task queue closed");
        let interrupt = Interrupt::new();
        interrupt.raise();
        assert_eq!(queue.pop_blocking(&interrupt), Pop::Interrupted);
        assert_eq!(queue.len(), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn blocked_consumer_uses_negligible_cpu() {
        let queue = Arc::new(TaskQueue::new());
        let (ready_tx, ready_rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            let before = thread_cpu_times().expect("getrusage failed");
            ready_tx.send(()).expect("ready");
            let popped = queue_clone.pop_blocking(&Interrupt::new());
            let after = thread_cpu_times().expect("getrusage failed");
            (popped, after.since(&before).total())
        });

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        thread::sleep(Duration::from_millis(300));
        queue.push(Task::new(1)).expect("task queue closed");

        let (popped, spent) = handle.join().expect("consumer thread panicked");
        assert_eq!(popped, Pop::Task(Task::new(1)));
        // A spinning waiter would burn most of the 300ms window.
        assert!(
            spent < Duration::from_millis(50),
            "blocked consumer burned {spent:?} of CPU"
        );
    }

    #[test]
    fn push_fails_after_close() {
        let queue = TaskQueue::new();
        queue.close();
        let result = queue.push(Task::new(1));
        assert_eq!(result, Err(Task::new(1)));
    }
}
