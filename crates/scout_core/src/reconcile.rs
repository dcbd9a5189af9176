use serde::Serialize;

use crate::FormFieldMap;

/// A key present in both maps whose values differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub key: String,
    pub observed: String,
    pub reference: String,
}

/// Drift between a freshly scraped form and a reference submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReconciliationReport {
    /// Keys only the reference has, in reference key order.
    pub missing_in_observed: Vec<String>,
    /// Keys only the observed form has, in observed key order.
    pub missing_in_reference: Vec<String>,
    /// Value differences, walked over the observed keys only.
    pub changed: Vec<FieldChange>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.missing_in_observed.is_empty()
            && self.missing_in_reference.is_empty()
            && self.changed.is_empty()
    }
}

/// Compares `observed` against `reference`.
///
/// Value differences are only collected while walking `observed`, so a key
/// that exists solely in `reference` shows up in `missing_in_observed` and
/// nowhere else.
pub fn diff(observed: &FormFieldMap, reference: &FormFieldMap) -> ReconciliationReport {
    let missing_in_observed = reference
        .keys()
        .filter(|key| !observed.contains_key(*key))
        .cloned()
        .collect();

    let mut missing_in_reference = Vec::new();
    let mut changed = Vec::new();
    for (key, observed_value) in observed {
        match reference.get(key) {
            None => missing_in_reference.push(key.clone()),
            Some(reference_value) if reference_value != observed_value => {
                changed.push(FieldChange {
                    key: key.clone(),
                    observed: observed_value.clone(),
                    reference: reference_value.clone(),
                });
            }
            Some(_) => {}
        }
    }

    ReconciliationReport {
        missing_in_observed,
        missing_in_reference,
        changed,
    }
}
