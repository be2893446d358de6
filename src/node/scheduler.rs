//! Cooperative periodic-task scheduler.
//!
//! Driven by repeated polling from the node main loop against a monotonic
//! millisecond counter. A task fires when strictly more than its interval
//! has passed since it last fired; firing moves the reference point to the
//! poll time, so intervals mean "at least this long", never a fixed grid.

struct TaskSlot<T> {
    kind: T,
    interval_ms: u32,
    last_fired: u32,
}

/// Poll-driven scheduler over a set of fixed-interval tasks.
pub struct Scheduler<T> {
    tasks: Vec<TaskSlot<T>>,
}

impl<T: Copy> Scheduler<T> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Register a task. The first firing happens one full interval after
    /// `now_ms`.
    pub fn add(&mut self, kind: T, interval_ms: u32, now_ms: u32) {
        self.tasks.push(TaskSlot { kind, interval_ms, last_fired: now_ms });
    }

    /// Evaluate every task against the current counter value and return the
    /// ones that are due. Wrapping subtraction keeps the comparison correct
    /// across counter overflow.
    pub fn poll(&mut self, now_ms: u32) -> Vec<T> {
        let mut due = Vec::new();
        for task in &mut self.tasks {
            if now_ms.wrapping_sub(task.last_fired) > task.interval_ms {
                task.last_fired = now_ms;
                due.push(task.kind);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T: Copy> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_interval_not_on_grid() {
        let mut sched = Scheduler::new();
        sched.add("report", 1000, 0);
        assert_eq!(sched.poll(1000), Vec::<&str>::new(), "strictly greater-than");
        assert_eq!(sched.poll(1001), vec!["report"]);
        assert_eq!(sched.poll(1500), Vec::<&str>::new());
        assert_eq!(sched.poll(2002), vec!["report"]);
    }

    #[test]
    fn survives_counter_wraparound() {
        let mut sched = Scheduler::new();
        sched.add((), 1000, u32::MAX - 200);
        assert_eq!(sched.poll(u32::MAX - 100), Vec::<()>::new());
        // 801ms after registration in wrapped arithmetic
        assert_eq!(sched.poll(600), Vec::<()>::new());
        assert_eq!(sched.poll(801), vec![()]);
    }

    #[test]
    fn tasks_fire_independently() {
        let mut sched = Scheduler::new();
        sched.add("fast", 10, 0);
        sched.add("slow", 100, 0);
        assert_eq!(sched.poll(11), vec!["fast"]);
        assert_eq!(sched.poll(101), vec!["fast", "slow"]);
    }
}
