use super::StateMachine;

/// Running max/min/average over a stream of numbers.
///
/// The extremes stay unset until the first sample arrives, so a stream whose values all sit
/// above or below any fixed sentinel still reports the true extremes.
#[derive(Debug, Default)]
pub struct RunningStats {
    extremes: Option<Extremes>,
    sum: i64,
    count: i64,
    pending: bool,
}

/// Largest and smallest sample seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extremes {
    pub max: i32,
    pub min: i32,
}

/// Final aggregate of a finished stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub max: i32,
    pub min: i32,
    pub average: f32,
}

/// Returned when a summary is requested before any sample was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no samples were aggregated")]
pub struct NoSamples;

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    /// Finalize into a [`Summary`].
    ///
    /// The average is `sum / count` with integer division, truncated toward zero.
    pub fn summary(&self) -> Result<Summary, NoSamples> {
        let extremes = self.extremes.ok_or(NoSamples)?;

        Ok(Summary {
            max: extremes.max,
            min: extremes.min,
            average: (self.sum / self.count) as f32,
        })
    }

    /// Fold `num` into the aggregate and return the updated extremes.
    ///
    /// The returned extremes are also left pending for [`poll_output`](StateMachine::poll_output).
    pub fn record(&mut self, num: i32) -> Extremes {
        self.count += 1;
        self.sum += i64::from(num);

        let extremes = match self.extremes {
            None => Extremes { max: num, min: num },
            Some(Extremes { max, min }) => Extremes {
                max: if num > max { num } else { max },
                min: if num < min { num } else { min },
            },
        };
        self.extremes = Some(extremes);
        self.pending = true;
        extremes
    }

    fn poll_extremes(&mut self) -> Option<Extremes> {
        if self.pending {
            self.pending = false;
            self.extremes
        } else {
            None
        }
    }
}

pub enum StatsInput {
    Sample(i32),
}

pub enum StatsOutput {
    Extremes(Extremes),
}

impl StateMachine for RunningStats {
    type Input = StatsInput;
    type Output = StatsOutput;

    fn process_input(&mut self, input: Self::Input) {
        match input {
            StatsInput::Sample(num) => {
                self.record(num);
            }
        }
    }

    fn poll_output(&mut self) -> Option<Self::Output> {
        self.poll_extremes().map(StatsOutput::Extremes)
    }
}
