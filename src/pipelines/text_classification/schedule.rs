use burn::{lr_scheduler::LrScheduler, tensor::backend::Backend, LearningRate};

/// Linear warmup followed by linear decay to zero.
///
/// For step `t`, the rate is `peak * t / warmup` while `t < warmup`, then
/// `peak * (total - t) / (total - warmup)`, never below zero.
#[derive(Debug, Clone)]
pub struct LinearWarmup {
    peak: LearningRate,
    warmup_steps: usize,
    total_steps: usize,
    current_step: usize,
}

impl LinearWarmup {
    /// Create a schedule over `total_steps` optimizer steps
    pub fn new(peak: LearningRate, warmup_steps: usize, total_steps: usize) -> Self {
        Self {
            peak,
            warmup_steps,
            total_steps,
            current_step: 0,
        }
    }

    /// The rate for the current step
    pub fn lr(&self) -> LearningRate {
        let t = self.current_step as f64;

        if self.current_step < self.warmup_steps {
            return self.peak * t / self.warmup_steps.max(1) as f64;
        }

        let remaining = self.total_steps.saturating_sub(self.current_step) as f64;
        let span = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;

        self.peak * (remaining / span).max(0.0)
    }
}

/// The record is the number of steps already taken
impl<B: Backend> LrScheduler<B> for LinearWarmup {
    type Record = usize;

    fn step(&mut self) -> LearningRate {
        let lr = self.lr();
        self.current_step += 1;

        lr
    }

    fn to_record(&self) -> Self::Record {
        self.current_step
    }

    fn load_record(mut self, record: Self::Record) -> Self {
        self.current_step = record;
        self
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use pretty_assertions::assert_eq;

    use super::*;

    type TestBackend = NdArray;

    fn step(schedule: &mut LinearWarmup) -> LearningRate {
        LrScheduler::<TestBackend>::step(schedule)
    }

    #[test]
    fn test_warmup_then_decay() {
        let mut schedule = LinearWarmup::new(1.0, 2, 6);

        let rates: Vec<_> = (0..7).map(|_| step(&mut schedule)).collect();

        assert_eq!(rates, vec![0.0, 0.5, 1.0, 0.75, 0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_no_warmup_starts_at_peak() {
        let mut schedule = LinearWarmup::new(0.1, 0, 4);

        assert_eq!(step(&mut schedule), 0.1);
    }

    #[test]
    fn test_record_restores_position() {
        let mut schedule = LinearWarmup::new(1.0, 2, 6);
        for _ in 0..4 {
            step(&mut schedule);
        }

        let record = LrScheduler::<TestBackend>::to_record(&schedule);
        assert_eq!(record, 4);

        let restored =
            LrScheduler::<TestBackend>::load_record(LinearWarmup::new(1.0, 2, 6), record);
        assert_eq!(restored.lr(), 0.5);
    }
}
