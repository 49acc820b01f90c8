pub mod fibonacci;
pub mod stats;

/// The [`StateMachine`] trait provides calling semantics for the per-call computations behind the
/// streaming handlers and indicates the upholding of invariants that guarantee deterministic
/// behavior.
///
/// # Functionality
/// A state machine operates on a defined [`Input`](StateMachine::Input) and produces a defined
/// [`Output`](StateMachine::Output). Feeding input and draining output are separate steps so the
/// handler that owns the machine decides when results leave it: the client-streaming handler
/// feeds every number and reads a summary once at end-of-stream, while the bidirectional handler
/// polls after every single number.
///
/// # Invariants
/// Implementors *must* be pure. Their behavior may not depend on anything outside the values
/// given to them through [`process_input`](StateMachine::process_input).
///
/// ## No Interior Mutability
/// All state is mutated only through `&mut self`. No [`std::cell`] or [`std::sync`] containers,
/// and no reference counted pointers.
///
/// ## No IO, Time or Randomness
/// No sockets, files, clocks or system entropy. Pacing between streamed items and deadline
/// checks belong to the handler that drives the machine, never to the machine itself.
///
/// ## No Concurrency or Async
/// A machine is owned by exactly one call and driven by that call's sequential receive/send
/// loop, so it never needs locking and never awaits.
///
/// # Example
/// ```ignore
/// let mut stats = RunningStats::new();
/// stats.process_input(StatsInput::Sample(11));
/// stats.process_input(StatsInput::Sample(52));
///
/// // Only the latest extremes are pending.
/// assert!(matches!(
///     stats.poll_output(),
///     Some(StatsOutput::Extremes(Extremes { max: 52, min: 11 }))
/// ));
/// assert!(stats.poll_output().is_none());
/// ```
pub trait StateMachine {
    /// The type of input that is [processed](StateMachine::process_input) by the state machine.
    ///
    /// This is often an enum containing all the possible variants of input, but can also be a
    /// struct when there is only one input variant.
    type Input;
    /// The type of output that is [polled](StateMachine::poll_output) by the state machine.
    type Output;

    /// Process the provided `input` into the state machine.
    fn process_input(&mut self, input: Self::Input);

    /// Poll the state machine for output, returning the first available output if present.
    fn poll_output(&mut self) -> Option<Self::Output>;
}
