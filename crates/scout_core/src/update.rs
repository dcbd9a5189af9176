use crate::{PollEffect, PollMsg, PollState};

/// Pure update function: applies a message to the poll lifecycle and returns
/// the timer effects to carry out. An empty effect list means the message was
/// a no-op (start while running, stop while idle, or a stale failure).
pub fn update(mut state: PollState, msg: PollMsg) -> (PollState, Vec<PollEffect>) {
    let effects = match msg {
        PollMsg::StartRequested => {
            if state.is_running() {
                Vec::new()
            } else {
                let generation = state.begin();
                vec![PollEffect::SpawnTimer { generation }]
            }
        }
        PollMsg::StopRequested | PollMsg::OnDemandFailed => match state.end() {
            Some(generation) => vec![PollEffect::CancelTimer { generation }],
            None => Vec::new(),
        },
        PollMsg::SessionFailed { generation } => {
            // A timer that was already replaced must not take down its successor.
            if state.active_generation() == Some(generation) {
                state.end();
                vec![PollEffect::CancelTimer { generation }]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}
