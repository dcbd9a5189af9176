//! Scout core: pure domain types, reconciliation and the poll lifecycle state machine.
mod effect;
mod fields;
mod msg;
mod reconcile;
mod record;
mod state;
mod update;

pub use effect::PollEffect;
pub use fields::{resolve_field_name, FieldAttrs, FormFieldMap};
pub use msg::PollMsg;
pub use reconcile::{diff, FieldChange, ReconciliationReport};
pub use record::{CellValue, TaskRecord};
pub use state::{Generation, PollPhase, PollState};
pub use update::update;
