//! Derived `feed_info.txt` metadata.

use std::io::Write;

use chrono::Utc;
use gtfsflow_core::feed::FEED_INFO_COLUMNS;
use gtfsflow_store::{Filter, Store};
use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Publisher details written into every exported archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedInfoConfig {
    pub publisher_name: String,
    pub publisher_url: String,
    pub lang: String,
    pub contact_email: String,
}

impl Default for FeedInfoConfig {
    fn default() -> Self {
        Self {
            publisher_name: "gtfsflow".into(),
            publisher_url: String::new(),
            lang: "en".into(),
            contact_email: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedInfo {
    pub start_date: String,
    pub end_date: String,
    /// Export time in Unix milliseconds.
    pub version: i64,
}

impl FeedInfo {
    /// Validity window from `MIN(start_date)`/`MAX(end_date)` over the
    /// calendar rows selected by `filter`. `None` when there are none.
    pub fn from_calendar(store: &Store, filter: &Filter) -> Result<Option<Self>> {
        let sql = format!(
            "SELECT MIN(start_date), MAX(end_date) FROM calendar{}",
            filter.sql()
        );
        let (start, end): (Option<String>, Option<String>) = store
            .conn()
            .query_row(&sql, params_from_iter(filter.bind()), |r| Ok((r.get(0)?, r.get(1)?)))
            .map_err(gtfsflow_store::Error::from)?;
        Ok(match (start, end) {
            (Some(start_date), Some(end_date)) => Some(Self {
                start_date,
                end_date,
                version: Utc::now().timestamp_millis(),
            }),
            _ => None,
        })
    }

    pub fn write<W: Write>(&self, cfg: &FeedInfoConfig, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(FEED_INFO_COLUMNS)?;
        let version = self.version.to_string();
        wtr.write_record([
            cfg.publisher_name.as_str(),
            cfg.publisher_url.as_str(),
            cfg.lang.as_str(),
            self.start_date.as_str(),
            self.end_date.as_str(),
            version.as_str(),
            cfg.contact_email.as_str(),
        ])?;
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_calendar_no_feed_info() {
        let store = Store::in_memory().unwrap();
        assert!(FeedInfo::from_calendar(&store, &Filter::none()).unwrap().is_none());
    }

    #[test]
    fn window_spans_all_services() {
        let store = Store::in_memory().unwrap();
        store
            .conn()
            .execute_batch(
                "INSERT INTO calendar VALUES ('WK',1,1,1,1,1,0,0,'20240101','20240630');
                 INSERT INTO calendar VALUES ('SU',0,0,0,0,0,0,1,'20240301','20241231');",
            )
            .unwrap();
        let info = FeedInfo::from_calendar(&store, &Filter::none()).unwrap().unwrap();
        assert_eq!(info.start_date, "20240101");
        assert_eq!(info.end_date, "20241231");
        assert!(info.version > 0);

        let mut buf = Vec::new();
        info.write(&FeedInfoConfig::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("feed_publisher_name,feed_publisher_url,feed_lang,feed_start_date"));
        assert!(text.contains(",en,20240101,20241231,"));
    }
}
