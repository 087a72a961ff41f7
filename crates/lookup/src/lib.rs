//! External lookups for gazette citations.
//!
//! - [`ProcedureLookup`]: which legislative procedure produced a publication
//!   ([`DipClient`] searches the Bundestag DIP).
//! - [`DateLookup`]: on which day a Bundesgesetzblatt page was published
//!   ([`OffeneGesetzeClient`]).
//!
//! Both are plain async traits so the history builder can be driven by stubs
//! in tests. [`Retrying`] adds exponential backoff to any implementation.

mod dip;
mod error;
mod lookup;
mod offenegesetze;
mod retry;
mod serde_millis;

pub use crate::dip::{crop_result_list, search_form, DipClient, DEFAULT_LANDING_URL, DEFAULT_SEARCH_URL};
pub use crate::error::LookupError;
pub use crate::lookup::{DateLookup, ProcedureLookup, ProcedureOutcome, ProcedureRecord, Retrying};
pub use crate::offenegesetze::{parse_listing, OffeneGesetzeClient, DEFAULT_API_URL};
pub use crate::retry::{execute_with_retry_async, RetryConfig, RetryResult, Retryable};
