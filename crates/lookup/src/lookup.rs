use async_trait::async_trait;
use chrono::NaiveDate;
use citation::Gazette;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::retry::{execute_with_retry_async, RetryConfig};

/// Description of the legislative procedure behind a publication, as markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureRecord {
    pub markup: String,
}

impl ProcedureRecord {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

/// Answer of a procedure search. `NotFound` is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureOutcome {
    Found(ProcedureRecord),
    NotFound,
}

impl ProcedureOutcome {
    pub fn into_record(self) -> Option<ProcedureRecord> {
        match self {
            ProcedureOutcome::Found(record) => Some(record),
            ProcedureOutcome::NotFound => None,
        }
    }
}

/// Search for the procedure that produced the publication at `page` of
/// volume `year` of `gazette`.
#[async_trait]
pub trait ProcedureLookup: Send + Sync {
    async fn search(&self, gazette: &Gazette, year: i32, page: u32) -> Result<ProcedureOutcome, LookupError>;
}

/// Publication date of the issue containing `page` of volume `year`.
///
/// Fails with [`LookupError::NotFound`] when no issue matches.
#[async_trait]
pub trait DateLookup: Send + Sync {
    async fn resolve_date(&self, gazette: &Gazette, year: i32, page: u32) -> Result<NaiveDate, LookupError>;
}

/// Wraps a lookup and retries its transient failures.
#[derive(Debug, Clone)]
pub struct Retrying<L> {
    inner: L,
    config: RetryConfig,
}

impl<L> Retrying<L> {
    pub fn new(inner: L, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: ProcedureLookup> ProcedureLookup for Retrying<L> {
    async fn search(&self, gazette: &Gazette, year: i32, page: u32) -> Result<ProcedureOutcome, LookupError> {
        execute_with_retry_async(&self.config, |_| self.inner.search(gazette, year, page))
            .await
            .into_result()
    }
}

#[async_trait]
impl<L: DateLookup> DateLookup for Retrying<L> {
    async fn resolve_date(&self, gazette: &Gazette, year: i32, page: u32) -> Result<NaiveDate, LookupError> {
        execute_with_retry_async(&self.config, |_| self.inner.resolve_date(gazette, year, page))
            .await
            .into_result()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    struct Flaky {
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl DateLookup for Flaky {
        async fn resolve_date(&self, _: &Gazette, year: i32, _: u32) -> Result<NaiveDate, LookupError> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(LookupError::Transport("timeout".into()));
            }
            NaiveDate::from_ymd_opt(year, 2, 5).ok_or_else(|| LookupError::NotFound("date".into()))
        }
    }

    #[tokio::test]
    async fn retrying_wrapper_hides_transient_failures() {
        let lookup = Retrying::new(
            Flaky {
                failures_left: AtomicU32::new(2),
            },
            RetryConfig::default()
                .with_base_delay(Duration::from_millis(1))
                .with_jitter(false),
        );
        let date = lookup.resolve_date(&Gazette::BgblI, 2019, 58).await.unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2019, 2, 5).unwrap());
    }

    #[tokio::test]
    async fn retrying_wrapper_surfaces_exhaustion() {
        let lookup = Retrying::new(
            Flaky {
                failures_left: AtomicU32::new(10),
            },
            RetryConfig::disabled(),
        );
        let err = lookup.resolve_date(&Gazette::BgblI, 2019, 58).await.unwrap_err();
        assert!(matches!(err, LookupError::Transport(_)));
    }
}
