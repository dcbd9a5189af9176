use scout_core::{resolve_field_name, FieldAttrs, FormFieldMap};
use scout_logging::{scout_debug, scout_warn};
use scraper::{ElementRef, Html, Selector};

pub const DEFAULT_FORM_NAME: &str = "incident.do";

/// Field that selects which server-side action a submission performs.
pub const ACTION_TOKEN_FIELD: &str = "sys_action";
/// Display value shown for the assignee on the submitted form.
pub const DISPLAY_LABEL_FIELD: &str = "sys_display.incident.assigned_to";

/// Values forced onto the scraped form so that submitting it performs the
/// reassignment rather than a plain save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOverrides {
    pub action_token: String,
    pub display_label: String,
}

impl Default for FormOverrides {
    fn default() -> Self {
        Self {
            action_token: "sysverb_update".to_string(),
            display_label: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormExtractor {
    form_name: String,
    overrides: FormOverrides,
}

impl Default for FormExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_FORM_NAME, FormOverrides::default())
    }
}

impl FormExtractor {
    pub fn new(form_name: impl Into<String>, overrides: FormOverrides) -> Self {
        Self {
            form_name: form_name.into(),
            overrides,
        }
    }

    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    /// Flattens the named form into field name to value pairs.
    ///
    /// Returns `None` when the page holds no `<form name=...>` matching the
    /// configured name.
    pub fn extract(&self, html: &str) -> Option<FormFieldMap> {
        let document = Html::parse_document(html);
        let form_sel = Selector::parse("form").ok()?;
        let control_sel = Selector::parse("input, select, textarea").ok()?;
        let option_sel = Selector::parse("option").ok()?;

        let Some(form) = document
            .select(&form_sel)
            .find(|form| form.value().attr("name") == Some(self.form_name.as_str()))
        else {
            scout_warn!("Form with name {:?} not found", self.form_name);
            return None;
        };

        let mut fields = FormFieldMap::new();
        let mut skipped = 0usize;
        for control in form.select(&control_sel) {
            let attrs = FieldAttrs {
                name: control.value().attr("name"),
                id: control.value().id(),
                class: control.value().attr("class"),
            };
            match resolve_field_name(&attrs) {
                Some(key) => {
                    fields.insert(key, control_value(control, &option_sel));
                }
                None => skipped += 1,
            }
        }
        scout_debug!(
            "Form {:?}: {} fields, {} unnamed controls skipped",
            self.form_name,
            fields.len(),
            skipped
        );

        fields.insert(
            ACTION_TOKEN_FIELD.to_string(),
            self.overrides.action_token.clone(),
        );
        fields.insert(
            DISPLAY_LABEL_FIELD.to_string(),
            self.overrides.display_label.clone(),
        );
        Some(fields)
    }
}

fn control_value(control: ElementRef<'_>, option_sel: &Selector) -> String {
    if let Some(value) = control.value().attr("value") {
        return value.to_string();
    }
    match control.value().name() {
        "input" => String::new(),
        "select" => {
            let mut options = control.select(option_sel);
            let chosen = control
                .select(option_sel)
                .find(|option| option.value().attr("selected").is_some())
                .or_else(|| options.next());
            match chosen {
                Some(option) => option
                    .value()
                    .attr("value")
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| trimmed_text(option)),
                None => trimmed_text(control),
            }
        }
        _ => trimmed_text(control),
    }
}

fn trimmed_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
