use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use scout_core::FormFieldMap;
use scout_engine::{
    classify_redirect, AccessError, CredentialStore, CycleSink, DeskConfig, FailureKind,
    FetchError, FetchedPage, HeaderSet, PageSource, PollEvent, PollStatus, TaskDesk,
    ACTION_TOKEN_FIELD,
};

const LISTING_URL: &str = "https://host/task_list.do";

const LISTING_HTML: &str = r#"<table id="incident_task_table">
  <thead><tr><th>sel</th><th>#</th><th>Number</th><th>State</th></tr></thead>
  <tbody><tr><td></td><td>1</td><td><a href="incident.do?sys_id=1">INC001</a></td><td>Open</td></tr></tbody>
</table>"#;

const FORM_HTML: &str = r#"<form name="incident.do">
  <input name="incident.number" value="INC001">
  <input id="sys_uniqueValue" value="abc123">
</form>"#;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scout_logging::initialize_for_tests);
}

/// Replays queued responses, then falls back to a fixed page. Records the
/// headers of every request.
struct ScriptedSource {
    queued: Mutex<VecDeque<Result<FetchedPage, FetchError>>>,
    fallback: Result<FetchedPage, FetchError>,
    seen: Mutex<Vec<(String, HeaderSet)>>,
}

impl ScriptedSource {
    fn serving(html: &str) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: Ok(page(html)),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing(error: FetchError) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: Err(error),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn then(self, response: Result<FetchedPage, FetchError>) -> Self {
        self.queued.lock().unwrap().push_back(response);
        self
    }

    fn requests(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn last_cookie(&self) -> Option<String> {
        self.seen
            .lock()
            .unwrap()
            .last()
            .map(|(_, headers)| headers.cookie().to_string())
    }
}

#[async_trait::async_trait]
impl PageSource for ScriptedSource {
    async fn get(&self, url: &str, headers: &HeaderSet) -> Result<FetchedPage, FetchError> {
        self.seen
            .lock()
            .unwrap()
            .push((url.to_string(), headers.clone()));
        let queued = self.queued.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.fallback.clone())
    }
}

fn page(html: &str) -> FetchedPage {
    FetchedPage {
        status: 200,
        url: LISTING_URL.to_string(),
        content_type: Some("text/html".to_string()),
        html: html.to_string(),
    }
}

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<PollEvent>>,
}

impl TestSink {
    fn events(&self) -> Vec<PollEvent> {
        self.events.lock().unwrap().clone()
    }

    fn suspended(&self) -> bool {
        self.events()
            .iter()
            .any(|event| matches!(event, PollEvent::Suspended { .. }))
    }
}

impl CycleSink for TestSink {
    fn emit(&self, event: PollEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn desk(source: Arc<ScriptedSource>, period: Duration) -> (TaskDesk, Arc<TestSink>) {
    let sink = Arc::new(TestSink::default());
    let config = DeskConfig {
        poll_interval: period,
        ..DeskConfig::new(LISTING_URL)
    };
    let desk = TaskDesk::new(
        config,
        source,
        Arc::new(CredentialStore::new(HeaderSet::with_cookie("initial"))),
        sink.clone(),
    );
    (desk, sink)
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn start_twice_keeps_a_single_timer() {
    init_logging();
    let source = Arc::new(ScriptedSource::serving(LISTING_HTML));
    let (desk, _sink) = desk(source.clone(), Duration::from_millis(20));

    assert_eq!(desk.start_polling(), PollStatus::Started);
    assert_eq!(desk.start_polling(), PollStatus::AlreadyRunning);
    assert!(desk.is_polling());

    tokio::time::sleep(Duration::from_millis(110)).await;
    desk.stop_polling();

    // One 20ms timer ticks about five times in 110ms; two would double that.
    let requests = source.requests();
    assert!((1..=7).contains(&requests), "requests = {requests}");
}

#[tokio::test]
async fn zero_period_is_clamped_instead_of_panicking() {
    init_logging();
    let source = Arc::new(ScriptedSource::serving(LISTING_HTML));
    let (desk, _sink) = desk(source.clone(), Duration::ZERO);

    assert_eq!(desk.start_polling(), PollStatus::Started);
    assert!(wait_until(|| source.requests() >= 1).await);
    assert_eq!(desk.stop_polling(), PollStatus::Stopped);
    assert!(!desk.is_polling());
}

#[tokio::test]
async fn stop_twice_is_harmless_and_halts_ticks() {
    init_logging();
    let source = Arc::new(ScriptedSource::serving(LISTING_HTML));
    let (desk, _sink) = desk(source.clone(), Duration::from_millis(15));

    desk.start_polling();
    assert!(wait_until(|| source.requests() >= 1).await);
    assert_eq!(desk.stop_polling(), PollStatus::Stopped);
    assert_eq!(desk.stop_polling(), PollStatus::NotRunning);
    assert!(!desk.is_polling());

    let after_stop = source.requests();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(source.requests(), after_stop);
}

#[tokio::test]
async fn first_cycle_waits_one_period() {
    init_logging();
    let source = Arc::new(ScriptedSource::serving(LISTING_HTML));
    let (desk, _sink) = desk(source.clone(), Duration::from_secs(60));

    desk.start_polling();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(source.requests(), 0);
    desk.stop_polling();
}

#[tokio::test]
async fn timer_cycles_emit_parsed_records() {
    init_logging();
    let source = Arc::new(ScriptedSource::serving(LISTING_HTML));
    let (desk, sink) = desk(source, Duration::from_millis(10));

    desk.start_polling();
    assert!(
        wait_until(|| sink
            .events()
            .iter()
            .any(|event| matches!(event, PollEvent::CycleCompleted { .. })))
        .await
    );
    desk.stop_polling();

    let records = sink
        .events()
        .into_iter()
        .find_map(|event| match event {
            PollEvent::CycleCompleted { records, .. } => Some(records),
            _ => None,
        })
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].get("Number").and_then(|v| v.href()),
        Some("https://host/incident.do?sys_id=1")
    );
}

#[tokio::test]
async fn credential_update_is_seen_by_the_next_request() {
    init_logging();
    let source = Arc::new(ScriptedSource::serving(LISTING_HTML));
    let (desk, _sink) = desk(source.clone(), Duration::from_secs(60));

    desk.poll_once().await.unwrap();
    assert_eq!(source.last_cookie().as_deref(), Some("initial"));

    desk.update_credential("X");
    desk.poll_once().await.unwrap();
    assert_eq!(source.last_cookie().as_deref(), Some("X"));
}

#[tokio::test]
async fn sso_redirect_suspends_running_timer() {
    init_logging();
    let expired = classify_redirect(302, "https://sso.host/SSO.saml2?x=1".to_string());
    let source = Arc::new(ScriptedSource::failing(expired));
    let (desk, sink) = desk(source.clone(), Duration::from_millis(10));

    desk.start_polling();
    assert!(wait_until(|| sink.suspended()).await);
    assert!(!desk.is_polling());

    let failed = sink.events().into_iter().find_map(|event| match event {
        PollEvent::CycleFailed { error, .. } => Some(error),
        _ => None,
    });
    assert!(failed.unwrap().kind.is_auth_expired());

    // Suspended timers do not keep hammering the login redirect.
    let after = source.requests();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.requests(), after);
}

#[tokio::test]
async fn plain_redirect_also_suspends_polling() {
    init_logging();
    let redirect = classify_redirect(302, "/navpage.do".to_string());
    let source = Arc::new(ScriptedSource::failing(redirect));
    let (desk, sink) = desk(source, Duration::from_millis(10));

    desk.start_polling();
    assert!(wait_until(|| sink.suspended()).await);
    assert!(!desk.is_polling());
    assert!(sink.events().iter().any(|event| matches!(
        event,
        PollEvent::Suspended {
            reason: FailureKind::Redirected { status: 302, .. },
            ..
        }
    )));
}

#[tokio::test]
async fn polling_can_restart_after_credentials_are_refreshed() {
    init_logging();
    let expired = classify_redirect(302, "https://sso.host/SSO.saml2".to_string());
    let source = Arc::new(ScriptedSource::serving(LISTING_HTML).then(Err(expired)));
    let (desk, sink) = desk(source, Duration::from_millis(10));

    desk.start_polling();
    assert!(wait_until(|| sink.suspended()).await);

    desk.update_credential("fresh");
    assert_eq!(desk.start_polling(), PollStatus::Started);
    assert!(
        wait_until(|| sink
            .events()
            .iter()
            .any(|event| matches!(event, PollEvent::CycleCompleted { .. })))
        .await
    );
    desk.stop_polling();
}

#[tokio::test]
async fn access_task_returns_fields_with_fallback_names() {
    init_logging();
    let source = Arc::new(ScriptedSource::serving(FORM_HTML));
    let (desk, _sink) = desk(source, Duration::from_secs(60));

    let access = desk
        .access_task("https://host/incident.do?sys_id=1")
        .await
        .unwrap();

    assert_eq!(access.fields["incident.number"], "INC001");
    assert_eq!(access.fields["sys_uniqueValue"], "abc123");
    assert_eq!(access.fields[ACTION_TOKEN_FIELD], "sysverb_update");
    assert_eq!(access.drift, None);
}

#[tokio::test]
async fn access_task_reports_drift_against_reference() {
    init_logging();
    let source = Arc::new(ScriptedSource::serving(FORM_HTML));
    let (desk, _sink) = desk(source, Duration::from_secs(60));

    let mut reference = FormFieldMap::new();
    reference.insert("incident.number".to_string(), "INC000".to_string());
    reference.insert("incident.state".to_string(), "2".to_string());
    desk.set_reference(Some(reference));

    let drift = desk
        .access_task("https://host/incident.do?sys_id=1")
        .await
        .unwrap()
        .drift
        .unwrap();

    assert_eq!(drift.missing_in_observed, vec!["incident.state".to_string()]);
    assert_eq!(drift.changed.len(), 1);
    assert_eq!(drift.changed[0].key, "incident.number");
    assert!(drift.missing_in_reference.contains(&"sys_uniqueValue".to_string()));
}

#[tokio::test]
async fn missing_form_does_not_stop_polling() {
    init_logging();
    let source = Arc::new(ScriptedSource::serving("<html><body>nothing</body></html>"));
    let (desk, _sink) = desk(source, Duration::from_secs(60));

    desk.start_polling();
    let err = desk.access_task("https://host/incident.do").await.unwrap_err();

    assert!(matches!(
        err,
        AccessError::FormNotFound { ref form_name } if form_name == "incident.do"
    ));
    assert!(desk.is_polling());
    desk.stop_polling();
}

#[tokio::test]
async fn access_session_failure_stops_polling() {
    init_logging();
    let source = Arc::new(ScriptedSource::failing(FetchError::new(
        FailureKind::HttpStatus(500),
        "boom",
    )));
    let (desk, sink) = desk(source, Duration::from_secs(60));

    desk.start_polling();
    let err = desk.access_task("https://host/incident.do").await.unwrap_err();

    assert!(matches!(err, AccessError::Session(ref e) if e.kind == FailureKind::HttpStatus(500)));
    assert!(!desk.is_polling());
    assert!(sink.suspended());
}

#[tokio::test]
async fn on_demand_poll_failure_while_idle_is_quiet() {
    init_logging();
    let source = Arc::new(ScriptedSource::failing(FetchError::new(
        FailureKind::Network,
        "connection reset",
    )));
    let (desk, sink) = desk(source, Duration::from_secs(60));

    let err = desk.poll_once().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Network);
    assert!(!desk.is_polling());
    assert!(sink.events().is_empty());
}
