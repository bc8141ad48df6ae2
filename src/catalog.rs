// src/catalog.rs

use crate::models::ClipRef;
use chrono::{NaiveDate, NaiveTime};
use reqwest::Client;
use thiserror::Error;
use tracing::info;

/// Query path on the catalog host.
const FILTER_PATH: &str = "/api/dmarg/filtervidios";

/// Wire format for dates in the catalog query string.
pub const DATE_FORMAT: &str = "%d-%m-%Y";
/// Wire format for times in the catalog query string.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// A rejected filter, attached to the form field it concerns.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    #[error("From Date cannot be later than To Date")]
    DateRange,
    #[error("From Time cannot be later than To Time")]
    TimeRange,
}

impl FilterError {
    /// Which input field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::DateRange => "date",
            FilterError::TimeRange => "time",
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),
    #[error("catalog request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Time window and device a catalog query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipFilter {
    pub device: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub from_time: NaiveTime,
    pub to_time: NaiveTime,
}

impl ClipFilter {
    /// Rejects inverted ranges before any network activity.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.from_date > self.to_date {
            return Err(FilterError::DateRange);
        }
        if self.from_time > self.to_time {
            return Err(FilterError::TimeRange);
        }
        Ok(())
    }
}

/// Thin client for the remote clip catalog.
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    /// Fetches clip metadata for the filter window.
    ///
    /// The filter is validated first; an invalid range never reaches the
    /// network. An empty result array is a valid "no clips" answer, not an
    /// error. Results come back sorted by start time.
    pub async fn query(&self, filter: &ClipFilter) -> Result<Vec<ClipRef>, CatalogError> {
        filter.validate()?;

        let url = format!("{}{}", self.base_url, FILTER_PATH);
        let mut clips: Vec<ClipRef> = self
            .client
            .get(&url)
            .query(&[
                ("fromdate", filter.from_date.format(DATE_FORMAT).to_string()),
                ("todate", filter.to_date.format(DATE_FORMAT).to_string()),
                ("fromtime", filter.from_time.format(TIME_FORMAT).to_string()),
                ("totime", filter.to_time.format(TIME_FORMAT).to_string()),
                ("deviceName", filter.device.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        clips.sort_by(|a, b| a.from_time.cmp(&b.from_time));
        info!(count = clips.len(), device = %filter.device, "catalog query returned");
        Ok(clips)
    }
}
