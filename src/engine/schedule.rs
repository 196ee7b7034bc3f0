// Timer bookkeeping on an explicit millisecond clock. The host decides what
// "now" is; nothing here reads the system time.

/// Fires once, `delay` ms after the most recent `schedule` call
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: u64,
    deadline: Option<u64>,
}

impl Debounce {
    pub fn new(delay: u64) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Push the deadline out to `now + delay`
    pub fn schedule(&mut self, now: u64) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the deadline if it has passed
    pub fn fire(&mut self, now: u64) -> bool {
        match self.deadline {
            Some(at) if at <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Fires every `period` ms after `start`, like `setInterval`
#[derive(Debug, Clone)]
pub struct Interval {
    period: u64,
    next: Option<u64>,
}

impl Interval {
    pub fn new(period: u64) -> Self {
        Self { period, next: None }
    }

    pub fn start(&mut self, now: u64) {
        self.next = Some(now + self.period.max(1));
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    pub fn next(&self) -> Option<u64> {
        self.next
    }

    /// Consume the due tick. Ticks missed while the host was late collapse
    /// into this one, as `setInterval` does in a throttled tab.
    pub fn fire(&mut self, now: u64) -> bool {
        let period = self.period.max(1);
        match self.next {
            Some(at) if at <= now => {
                self.next = Some(now + period - (now - at) % period);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_restarts_on_schedule() {
        let mut d = Debounce::new(300);
        d.schedule(0);
        d.schedule(200);
        assert!(!d.fire(300));
        assert!(d.fire(500));
        assert!(!d.fire(800));
    }

    #[test]
    fn test_debounce_cancel() {
        let mut d = Debounce::new(300);
        d.schedule(0);
        d.cancel();
        assert!(!d.is_pending());
        assert!(!d.fire(1000));
    }

    #[test]
    fn test_interval_ticks() {
        let mut i = Interval::new(5000);
        assert!(!i.fire(10_000));

        i.start(0);
        assert!(!i.fire(4999));
        assert!(i.fire(5000));
        assert_eq!(i.next(), Some(10_000));

        // missed ticks collapse into one, the schedule keeps its phase
        assert!(i.fire(21_000));
        assert!(!i.fire(21_000));
        assert_eq!(i.next(), Some(25_000));
        assert!(i.fire(25_000));
        assert_eq!(i.next(), Some(30_000));

        i.stop();
        assert!(!i.is_running());
    }
}
