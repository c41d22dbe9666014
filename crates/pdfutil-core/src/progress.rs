//! Progress reporting
//!
//! Percentages are clamped to 0..=100 and never go backwards: a value lower
//! than the last one reported is dropped, so a pipeline that falls back to a
//! slower strategy cannot make a progress bar jump back.

type Callback<'a> = Box<dyn FnMut(u8, &str) + Send + 'a>;

pub struct Progress<'a> {
    callback: Option<Callback<'a>>,
    last: u8,
}

impl<'a> Progress<'a> {
    /// Report through `callback(percent, message)`
    pub fn new(callback: impl FnMut(u8, &str) + Send + 'a) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            last: 0,
        }
    }

    /// Track progress without reporting it anywhere
    pub fn silent() -> Self {
        Self {
            callback: None,
            last: 0,
        }
    }

    pub fn report(&mut self, percent: f64, message: &str) {
        let percent = percent.clamp(0.0, 100.0).round() as u8;
        if percent < self.last {
            return;
        }
        self.last = percent;
        if let Some(callback) = self.callback.as_mut() {
            callback(percent, message);
        }
    }

    /// Report `start + span * done / total`
    pub fn report_step(&mut self, start: f64, span: f64, done: usize, total: usize, message: &str) {
        let fraction = if total == 0 {
            1.0
        } else {
            done as f64 / total as f64
        };
        self.report(start + span * fraction, message);
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}

impl Default for Progress<'_> {
    fn default() -> Self {
        Self::silent()
    }
}

impl std::fmt::Debug for Progress<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("last", &self.last)
            .field("reporting", &self.callback.is_some())
            .finish()
    }
}
