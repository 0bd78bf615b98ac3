//! Contracts for the collaborators the form talks to: the corporation
//! registry check, the submission endpoint and the exception reporter.
//! Transports live outside this crate.

use std::collections::BTreeMap;
use std::error::Error;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::form::SubmitFailure;
use crate::schema::OnboardingRecord;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Transport(String),
    #[error("request rejected with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Message suitable for surfacing verbatim, when the error carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            ClientError::Transport(message) => {
                (!message.trim().is_empty()).then_some(message.as_str())
            }
            ClientError::Rejected { message, .. } => message.as_deref(),
            ClientError::Decode(_) => None,
        }
    }
}

impl From<ClientError> for SubmitFailure {
    fn from(error: ClientError) -> Self {
        SubmitFailure {
            message: error.message().map(str::to_string),
        }
    }
}

/// Response body of the corporation registry check.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorporationCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporation_number: Option<String>,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CorporationCheck {
    pub fn from_json(body: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(body)?)
    }
}

pub trait CorporationChecker: Send + Sync + 'static {
    fn check_corporation(&self, number: &str)
    -> BoxFuture<'static, Result<CorporationCheck, ClientError>>;
}

pub trait SubmissionClient: Send + Sync + 'static {
    fn submit(&self, record: OnboardingRecord) -> BoxFuture<'static, Result<(), ClientError>>;
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReportContext {
    pub operation: &'static str,
    pub tags: BTreeMap<&'static str, String>,
}

impl ReportContext {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            tags: BTreeMap::new(),
        }
    }

    pub fn tag(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.tags.insert(key, value.into());
        self
    }
}

pub trait ExceptionReporter: Send + Sync + 'static {
    fn report(&self, error: &(dyn Error + 'static), context: &ReportContext);
}

/// Reports through `tracing`; stands in when no telemetry sink is wired.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl ExceptionReporter for TracingReporter {
    fn report(&self, error: &(dyn Error + 'static), context: &ReportContext) {
        tracing::error!(
            operation = context.operation,
            tags = ?context.tags,
            error = %error,
            "onboarding form exception"
        );
    }
}
