//! Generic transition engine
//!
//! A fixed directed graph of allowed state changes, current-state storage,
//! and synchronous observers fired on every successful transition. Carries no
//! protocol knowledge; the adjacency is supplied as a pure function.

/// Observer invoked synchronously after every successful transition
pub type Observer<S, P> = Box<dyn FnMut(S, &P) + Send>;

/// A finite-state machine over a fixed adjacency of permitted transitions
///
/// `transition` is a silent no-op when the target is not permitted from the
/// current state; observers are never invoked for the no-op case. This makes
/// re-entering a terminal state idempotent by construction.
pub struct StateMachine<S, P>
where
    S: Copy + Eq + std::fmt::Debug + 'static,
{
    current: S,
    permitted: fn(S) -> &'static [S],
    observers: Vec<Observer<S, P>>,
}

impl<S, P> StateMachine<S, P>
where
    S: Copy + Eq + std::fmt::Debug + 'static,
{
    /// Create a machine in `initial` with the given adjacency function
    pub fn new(initial: S, permitted: fn(S) -> &'static [S]) -> Self {
        Self {
            current: initial,
            permitted,
            observers: Vec::new(),
        }
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> S {
        self.current
    }

    /// Register an observer; observers fire in registration order
    pub fn observe<F>(&mut self, observer: F)
    where
        F: FnMut(S, &P) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Attempt a transition to `next` carrying `payload`.
    ///
    /// Returns `true` if the transition happened. When `next` is not in the
    /// permitted set for the current state, nothing changes and no observer
    /// fires.
    pub fn transition(&mut self, next: S, payload: P) -> bool {
        if !(self.permitted)(self.current).contains(&next) {
            return false;
        }
        self.current = next;
        for observer in &mut self.observers {
            observer(next, &payload);
        }
        true
    }
}
