use crate::Generation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEffect {
    SpawnTimer { generation: Generation },
    CancelTimer { generation: Generation },
}
