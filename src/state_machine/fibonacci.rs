use super::StateMachine;

/// Largest position whose Fibonacci value fits in an `i64`.
pub const MAX_POSITION: i32 = 92;

/// Produces the Fibonacci sequence one position per [`FibonacciInput::Step`], starting with
/// `f(1) = f(2) = 1`.
///
/// Values are computed with checked addition; once the sequence leaves the `i64` range further
/// steps produce no output.
#[derive(Debug)]
pub struct FibonacciMachine {
    prev: Option<i64>,
    curr: Option<i64>,
    position: i32,
    pending: Option<SequenceItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceItem {
    pub position: i32,
    pub value: i64,
}

impl FibonacciMachine {
    pub fn new() -> Self {
        Self {
            prev: Some(1),
            curr: Some(1),
            position: 0,
            pending: None,
        }
    }

    /// Position of the last produced item, `0` before the first step.
    pub fn position(&self) -> i32 {
        self.position
    }

    fn step(&mut self) {
        let Some(value) = self.prev else {
            self.pending = None;
            return;
        };

        self.position += 1;
        self.pending = Some(SequenceItem {
            position: self.position,
            value,
        });

        let next = match (self.prev, self.curr) {
            (Some(prev), Some(curr)) => prev.checked_add(curr),
            _ => None,
        };
        self.prev = self.curr;
        self.curr = next;
    }
}

impl Default for FibonacciMachine {
    fn default() -> Self {
        Self::new()
    }
}

pub enum FibonacciInput {
    Step,
}

pub enum FibonacciOutput {
    Item(SequenceItem),
}

impl StateMachine for FibonacciMachine {
    type Input = FibonacciInput;
    type Output = FibonacciOutput;

    fn process_input(&mut self, input: Self::Input) {
        match input {
            FibonacciInput::Step => self.step(),
        }
    }

    fn poll_output(&mut self) -> Option<Self::Output> {
        self.pending.take().map(FibonacciOutput::Item)
    }
}
