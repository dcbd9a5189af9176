use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use scout_core::{diff, FormFieldMap, ReconciliationReport, TaskRecord};
use scout_logging::{scout_info, scout_warn};

use crate::{
    CredentialStore, CycleSink, FetchError, FetchSettings, FormExtractor, FormOverrides,
    ListingExtractor, PageSource, PollStatus, Poller, ReqwestSession, DEFAULT_FORM_NAME,
    DEFAULT_POLL_INTERVAL, DEFAULT_TABLE_ID,
};

/// What the desk polls and scrapes.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    pub listing_url: String,
    pub table_id: String,
    pub form_name: String,
    pub overrides: FormOverrides,
    pub poll_interval: Duration,
}

impl DeskConfig {
    pub fn new(listing_url: impl Into<String>) -> Self {
        Self {
            listing_url: listing_url.into(),
            table_id: DEFAULT_TABLE_ID.to_string(),
            form_name: DEFAULT_FORM_NAME.to_string(),
            overrides: FormOverrides::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Result of an on-demand task scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAccess {
    pub fields: FormFieldMap,
    /// Drift against the reference submission, when one is loaded.
    pub drift: Option<ReconciliationReport>,
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("session failure: {0}")]
    Session(#[from] FetchError),
    #[error("form {form_name:?} not found")]
    FormNotFound { form_name: String },
}

/// Entry point for the outer layer: poll control, credential updates and
/// on-demand task access over one shared session.
pub struct TaskDesk {
    credentials: Arc<CredentialStore>,
    source: Arc<dyn PageSource>,
    poller: Poller,
    form: FormExtractor,
    reference: RwLock<Option<FormFieldMap>>,
}

impl TaskDesk {
    pub fn new(
        config: DeskConfig,
        source: Arc<dyn PageSource>,
        credentials: Arc<CredentialStore>,
        sink: Arc<dyn CycleSink>,
    ) -> Self {
        let poller = Poller::new(
            source.clone(),
            credentials.clone(),
            ListingExtractor::new(config.table_id),
            config.listing_url,
            config.poll_interval,
            sink,
        );
        Self {
            credentials,
            source,
            poller,
            form: FormExtractor::new(config.form_name, config.overrides),
            reference: RwLock::new(None),
        }
    }

    /// Builds a desk backed by a real HTTP session.
    pub fn connect(
        config: DeskConfig,
        settings: FetchSettings,
        credentials: Arc<CredentialStore>,
        sink: Arc<dyn CycleSink>,
    ) -> Result<Self, FetchError> {
        let session = ReqwestSession::new(settings)?;
        Ok(Self::new(config, Arc::new(session), credentials, sink))
    }

    pub fn start_polling(&self) -> PollStatus {
        self.poller.start()
    }

    pub fn stop_polling(&self) -> PollStatus {
        self.poller.stop()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Replaces the session cookie; the next request carries the new value.
    pub fn update_credential(&self, cookie: impl Into<String>) {
        self.credentials.update_cookie(cookie);
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Sets or clears the reference submission used to report drift.
    pub fn set_reference(&self, reference: Option<FormFieldMap>) {
        *self
            .reference
            .write()
            .unwrap_or_else(PoisonError::into_inner) = reference;
    }

    /// Runs one listing cycle now. A session failure suspends polling.
    pub async fn poll_once(&self) -> Result<Vec<TaskRecord>, FetchError> {
        let result = self.poller.poll_once().await;
        if let Err(err) = &result {
            self.poller.suspend_after(err);
        }
        result
    }

    /// Scrapes the edit form behind `link`.
    ///
    /// Session failures suspend polling and come back as
    /// [`AccessError::Session`]; a page without the form yields
    /// [`AccessError::FormNotFound`] and leaves polling alone.
    pub async fn access_task(&self, link: &str) -> Result<TaskAccess, AccessError> {
        scout_info!("Accessing task {}", link);
        let headers = self.credentials.get();
        let page = match self.source.get(link, &headers).await {
            Ok(page) => page,
            Err(err) => {
                self.poller.suspend_after(&err);
                return Err(err.into());
            }
        };

        let Some(fields) = self.form.extract(&page.html) else {
            return Err(AccessError::FormNotFound {
                form_name: self.form.form_name().to_string(),
            });
        };

        let drift = self
            .reference
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|reference| diff(&fields, reference));
        if let Some(report) = drift.as_ref().filter(|report| !report.is_clean()) {
            scout_warn!(
                "Form drift: {} missing, {} extra, {} changed",
                report.missing_in_observed.len(),
                report.missing_in_reference.len(),
                report.changed.len()
            );
        }

        Ok(TaskAccess { fields, drift })
    }
}
