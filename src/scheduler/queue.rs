//! Priority queue entries and dequeue ordering.

use crate::task::Task;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// An item in the shared queue: either work or the shutdown sentinel
#[derive(Debug)]
pub(crate) enum QueueEntry {
    /// Tells the worker that dequeues it to exit
    Shutdown,
    /// A unit of work; `seq` is the enqueue sequence number used for tie-breaking
    Work { seq: u64, task: Task },
}

// Implement Ord for BinaryHeap (max-heap by default)
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (QueueEntry::Shutdown, QueueEntry::Shutdown) => Ordering::Equal,
            // The sentinel is ahead of every work priority
            (QueueEntry::Shutdown, QueueEntry::Work { .. }) => Ordering::Greater,
            (QueueEntry::Work { .. }, QueueEntry::Shutdown) => Ordering::Less,
            (
                QueueEntry::Work { seq, task },
                QueueEntry::Work {
                    seq: other_seq,
                    task: other_task,
                },
            ) => {
                // Finer-grained (later) priority wins
                match task.priority().cmp(other_task.priority()) {
                    // Equal priorities: earlier enqueue comes first
                    Ordering::Equal => other_seq.cmp(seq),
                    ordering => ordering,
                }
            }
        }
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

/// Heap plus the sequence counter for new entries
#[derive(Debug, Default)]
pub(crate) struct TaskQueue {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
}

impl TaskQueue {
    pub(crate) fn push_task(&mut self, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueueEntry::Work { seq, task });
    }

    pub(crate) fn push_shutdown(&mut self) {
        self.heap.push(QueueEntry::Shutdown);
    }

    pub(crate) fn pop(&mut self) -> Option<QueueEntry> {
        self.heap.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.next_seq = 0;
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::func_task::{FuncTask, TaskOptions};
    use crate::scheduler::WorkerContext;
    use crate::types::Priority;
    use std::sync::Arc;

    fn task(priority: &str, name: &str) -> Task {
        let options = TaskOptions::<()>::new(name).priority(Priority::new(priority).unwrap());
        FuncTask::new(
            Arc::new(|_: &mut WorkerContext, _: &()| Ok(())),
            (),
            &options,
        )
        .into_task()
    }

    fn pop_name(queue: &mut TaskQueue) -> String {
        match queue.pop().unwrap() {
            QueueEntry::Shutdown => "shutdown".to_string(),
            QueueEntry::Work { task, .. } => task.description(),
        }
    }

    #[test]
    fn deeper_priority_pops_first() {
        let mut queue = TaskQueue::default();
        queue.push_task(task("A", "spec"));
        queue.push_task(task("C", "lecture"));
        queue.push_task(task("B", "course"));

        assert_eq!(pop_name(&mut queue), "priority=C, ttl=1. lecture");
        assert_eq!(pop_name(&mut queue), "priority=B, ttl=1. course");
        assert_eq!(pop_name(&mut queue), "priority=A, ttl=1. spec");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn shutdown_sentinel_beats_every_priority() {
        let mut queue = TaskQueue::default();
        queue.push_task(task("ZZZZZZ", "leaf"));
        queue.push_shutdown();
        queue.push_task(task("C", "lecture"));

        assert_eq!(pop_name(&mut queue), "shutdown");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn equal_priorities_pop_in_enqueue_order() {
        let mut queue = TaskQueue::default();
        for name in ["first", "second", "third"] {
            queue.push_task(task("B", name));
        }
        assert_eq!(pop_name(&mut queue), "priority=B, ttl=1. first");
        assert_eq!(pop_name(&mut queue), "priority=B, ttl=1. second");
        assert_eq!(pop_name(&mut queue), "priority=B, ttl=1. third");
    }

    #[test]
    fn clear_resets_queue() {
        let mut queue = TaskQueue::default();
        queue.push_task(task("A", "x"));
        queue.push_shutdown();
        queue.clear();
        assert_eq!(queue.len(), 0);
        assert!(queue.pop().is_none());
    }
}
