use crate::Generation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollMsg {
    /// Caller asked for polling to start.
    StartRequested,
    /// Caller asked for polling to stop.
    StopRequested,
    /// A fetch driven by the timer of `generation` failed at session level.
    SessionFailed { generation: Generation },
    /// An on-demand fetch failed at session level; stops whatever timer runs.
    OnDemandFailed,
}
