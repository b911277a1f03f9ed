use std::collections::VecDeque;
use std::time::{Duration, Instant};


#[derive(Clone, Copy, Debug)]
struct Sample {
    value: u64,
    time: Instant,
}


/// Processing speed over a sliding window of samples.
///
/// Values reported within `granularity` of the last sample update it in place.
pub struct Progress {
    window: VecDeque<Sample>,
    capacity: usize,
    granularity: Duration,
    has_news: bool,
}


impl Progress {
    pub fn new(window_size: usize, granularity: Duration) -> Self {
        let capacity = window_size.max(1) + 1;
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            granularity,
            has_news: false,
        }
    }

    pub fn set_current_value(&mut self, value: u64) {
        self.set_value_at(value, Instant::now())
    }

    fn set_value_at(&mut self, value: u64, time: Instant) {
        self.has_news = true;
        let len = self.window.len();

        let Some(last) = self.window.back_mut() else {
            self.window.push_back(Sample { value, time });
            return
        };

        let value = value.max(last.value);

        if len > 1 && time <= last.time + self.granularity {
            last.value = value;
            return
        }

        if len == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(Sample { value, time });
    }

    pub fn current_value(&self) -> Option<u64> {
        self.window.back().map(|s| s.value)
    }

    pub fn has_news(&self) -> bool {
        self.has_news
    }

    /// Units per second across the window
    pub fn speed(&mut self) -> f64 {
        self.has_news = false;

        let (Some(beg), Some(end)) = (self.window.front(), self.window.back()) else {
            return 0.0
        };

        let duration = end.time.duration_since(beg.time).as_secs_f64();
        if duration == 0.0 {
            return 0.0
        }

        (end.value - beg.value) as f64 / duration
    }
}
