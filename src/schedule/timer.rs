use std::time::Duration;

use chrono::{DateTime, Utc};

/// Wall clock plus the ability to wait, so the loop can run on fake time.
pub trait Timer {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimer;

impl Timer for SystemTimer {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    use chrono::{DateTime, Utc};

    use super::Timer;

    /// Time only moves when someone sleeps or advances it. Clones share
    /// the same clock.
    #[derive(Debug, Clone)]
    pub struct FakeTimer {
        now: Rc<Cell<DateTime<Utc>>>,
        sleeps: Rc<RefCell<Vec<Duration>>>,
    }

    impl FakeTimer {
        pub fn starting_at(now: DateTime<Utc>) -> Self {
            Self {
                now: Rc::new(Cell::new(now)),
                sleeps: Rc::new(RefCell::new(Vec::new())),
            }
        }

        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.borrow().clone()
        }

        pub fn advance(&self, by: Duration) {
            let by = chrono::Duration::from_std(by).unwrap();
            self.now.set(self.now.get() + by);
        }
    }

    impl Timer for FakeTimer {
        fn now(&self) -> DateTime<Utc> {
            self.now.get()
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
            self.advance(duration);
        }
    }
}
