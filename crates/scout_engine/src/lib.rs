//! Scout engine: authenticated session, page extraction and the poll runtime.
mod credentials;
mod decode;
mod desk;
mod fetch;
mod form;
mod listing;
mod poller;
mod types;

pub use credentials::{CredentialStore, HeaderKey, HeaderSet};
pub use decode::{decode_body, DecodedBody};
pub use desk::{AccessError, DeskConfig, TaskAccess, TaskDesk};
pub use fetch::{classify_redirect, FetchSettings, PageSource, ReqwestSession, SSO_MARKER};
pub use form::{
    FormExtractor, FormOverrides, ACTION_TOKEN_FIELD, DEFAULT_FORM_NAME, DISPLAY_LABEL_FIELD,
};
pub use listing::{ListingExtractor, DEFAULT_TABLE_ID};
pub use poller::{
    ChannelCycleSink, CycleSink, DiscardSink, PollEvent, PollStatus, Poller,
    DEFAULT_POLL_INTERVAL,
};
pub use types::{FailureKind, FetchError, FetchedPage};
