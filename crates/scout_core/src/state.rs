/// Identifies one start of the recurring timer. Each accepted start gets a
/// fresh, strictly increasing value.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    Running,
}

/// Lifecycle of the recurring poll timer. At most one timer is active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollState {
    active: Option<Generation>,
    last_generation: Generation,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PollPhase {
        match self.active {
            Some(_) => PollPhase::Running,
            None => PollPhase::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_generation(&self) -> Option<Generation> {
        self.active
    }

    pub(crate) fn begin(&mut self) -> Generation {
        self.last_generation += 1;
        self.active = Some(self.last_generation);
        self.last_generation
    }

    pub(crate) fn end(&mut self) -> Option<Generation> {
        self.active.take()
    }
}
