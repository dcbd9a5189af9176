use pretty_assertions::assert_eq;
use scout_core::FormFieldMap;
use scout_engine::{FormExtractor, FormOverrides, ACTION_TOKEN_FIELD, DISPLAY_LABEL_FIELD};

fn page(form_body: &str) -> String {
    format!(
        r#"<html><body>
        <form name="search"><input name="sysparm_search" value="outside"></form>
        <form name="incident.do" method="post">{form_body}</form>
        </body></html>"#
    )
}

fn extract(form_body: &str) -> FormFieldMap {
    FormExtractor::default()
        .extract(&page(form_body))
        .expect("form present")
}

#[test]
fn unnamed_input_falls_back_to_id() {
    let fields = extract(r#"<input id="foo" value="bar">"#);
    assert_eq!(fields.get("foo").map(String::as_str), Some("bar"));
}

#[test]
fn class_is_the_last_resort_and_bare_controls_are_dropped() {
    let fields = extract(
        r#"<input class="btn-token" value="t">
           <input value="orphan">
           <input name="" id="" class="" value="blank">"#,
    );

    assert_eq!(fields.get("btn-token").map(String::as_str), Some("t"));
    assert!(!fields.values().any(|v| v == "orphan" || v == "blank"));
}

#[test]
fn only_controls_inside_the_named_form_are_read() {
    let fields = extract(r#"<input name="incident.number" value="INC0010001">"#);
    assert!(!fields.contains_key("sysparm_search"));
    assert_eq!(fields["incident.number"], "INC0010001");
}

#[test]
fn select_and_textarea_values() {
    let fields = extract(
        r#"<select name="incident.state">
             <option value="1">New</option>
             <option value="2" selected>In Progress</option>
           </select>
           <select name="incident.urgency"><option>High</option><option>Low</option></select>
           <select name="incident.impact" value="3"><option value="1">1</option></select>
           <textarea name="incident.description">  Cannot print  </textarea>
           <input name="sysparm_ck">"#,
    );

    assert_eq!(fields["incident.state"], "2");
    assert_eq!(fields["incident.urgency"], "High");
    assert_eq!(fields["incident.impact"], "3");
    assert_eq!(fields["incident.description"], "Cannot print");
    assert_eq!(fields["sysparm_ck"], "");
}

#[test]
fn overrides_are_forced_after_the_scan() {
    let extractor = FormExtractor::new(
        "incident.do",
        FormOverrides {
            action_token: "assign_to_me".to_string(),
            display_label: "Jane Operator".to_string(),
        },
    );
    let html = page(&format!(
        r#"<input name="{ACTION_TOKEN_FIELD}" value="none">
           <input name="{DISPLAY_LABEL_FIELD}" value="Someone Else">"#
    ));

    let fields = extractor.extract(&html).expect("form present");

    assert_eq!(fields[ACTION_TOKEN_FIELD], "assign_to_me");
    assert_eq!(fields[DISPLAY_LABEL_FIELD], "Jane Operator");
}

#[test]
fn missing_form_is_reported_as_none() {
    let extractor = FormExtractor::new("change_request.do", FormOverrides::default());
    assert_eq!(extractor.extract(&page("")), None);
}

#[test]
fn later_duplicate_names_overwrite_earlier_ones() {
    let fields = extract(
        r#"<input type="hidden" name="incident.active" value="false">
           <input type="checkbox" name="incident.active" value="true">"#,
    );
    assert_eq!(fields["incident.active"], "true");
}
