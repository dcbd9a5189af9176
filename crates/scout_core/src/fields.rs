use std::collections::BTreeMap;

/// Flat field name to value mapping scraped from an edit form.
pub type FormFieldMap = BTreeMap<String, String>;

/// The attributes of a form control that take part in naming it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldAttrs<'a> {
    pub name: Option<&'a str>,
    pub id: Option<&'a str>,
    pub class: Option<&'a str>,
}

/// Resolves the key a form control is stored under: `name`, then `id`, then
/// the raw `class` attribute. Empty attributes count as absent. Controls with
/// none of the three are discarded.
///
/// The `id`/`class` fallback is a heuristic; such keys are not guaranteed to
/// match what the server expects on submission.
pub fn resolve_field_name(attrs: &FieldAttrs<'_>) -> Option<String> {
    [attrs.name, attrs.id, attrs.class]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.is_empty())
        .map(ToOwned::to_owned)
}
