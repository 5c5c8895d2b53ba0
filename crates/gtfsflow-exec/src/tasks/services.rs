//! Active service dates around a reference day.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate, Utc};

use crate::error::TaskError;
use crate::task::{ActiveServices, Task, TaskContext, TaskOutput};

const DATE_FORMAT: &str = "%Y%m%d";

/// For each service, the dates in `[today - backward_days, today +
/// forward_days]` on which it runs. Calendar weekday flags apply within the
/// validity window; calendar-date exceptions then add (1) or remove (2) a
/// day. Services active on no day are left out.
#[derive(Debug, Clone)]
pub struct ActiveServicesTask {
    pub backward_days: u32,
    pub forward_days: u32,
    /// Reference day; today in UTC when unset.
    pub today: Option<NaiveDate>,
}

impl Default for ActiveServicesTask {
    fn default() -> Self {
        Self {
            backward_days: 1,
            forward_days: 7,
            today: None,
        }
    }
}

struct Calendar {
    /// Monday first.
    weekdays: [bool; 7],
    start: String,
    end: String,
}

impl Calendar {
    fn runs_on(&self, day: NaiveDate, key: &str) -> bool {
        key >= self.start.as_str()
            && key <= self.end.as_str()
            && self.weekdays[day.weekday().num_days_from_monday() as usize]
    }
}

impl ActiveServicesTask {
    fn load(
        ctx: &TaskContext<'_>,
    ) -> Result<(BTreeMap<String, Calendar>, BTreeMap<String, Vec<(String, i64)>>), TaskError> {
        let conn = ctx.store.conn();
        let mut calendars = BTreeMap::new();
        let mut stmt = conn.prepare(
            "SELECT service_id, monday, tuesday, wednesday, thursday, friday, saturday, sunday,
                    start_date, end_date
             FROM calendar",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(r) = rows.next()? {
            let mut weekdays = [false; 7];
            for (i, day) in weekdays.iter_mut().enumerate() {
                *day = r.get::<_, Option<i64>>(i + 1)? == Some(1);
            }
            calendars.insert(
                r.get::<_, String>(0)?,
                Calendar {
                    weekdays,
                    start: r.get(8)?,
                    end: r.get(9)?,
                },
            );
        }

        let mut exceptions: BTreeMap<String, Vec<(String, i64)>> = BTreeMap::new();
        let mut stmt = conn.prepare("SELECT service_id, date, exception_type FROM calendar_dates")?;
        let mut rows = stmt.query([])?;
        while let Some(r) = rows.next()? {
            exceptions
                .entry(r.get(0)?)
                .or_default()
                .push((r.get(1)?, r.get(2)?));
        }
        Ok((calendars, exceptions))
    }
}

impl Task for ActiveServicesTask {
    fn id(&self) -> &str {
        "active_services"
    }

    fn execute(&mut self, ctx: &TaskContext<'_>) -> Result<Option<TaskOutput>, TaskError> {
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        let (calendars, exceptions) = Self::load(ctx)?;

        let days: Vec<(NaiveDate, String)> = (-i64::from(self.backward_days)..=i64::from(self.forward_days))
            .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
            .map(|day| (day, day.format(DATE_FORMAT).to_string()))
            .collect();

        let service_ids: BTreeSet<&String> = calendars.keys().chain(exceptions.keys()).collect();
        let mut active = ActiveServices::new();
        for id in service_ids {
            let calendar = calendars.get(id);
            let service_exceptions = exceptions.get(id).map(Vec::as_slice).unwrap_or_default();
            let dates: Vec<NaiveDate> = days
                .iter()
                .filter(|(day, key)| {
                    let mut on = calendar.is_some_and(|c| c.runs_on(*day, key));
                    for (date, kind) in service_exceptions {
                        if date == key {
                            match *kind {
                                1 => on = true,
                                2 => on = false,
                                _ => {}
                            }
                        }
                    }
                    on
                })
                .map(|(day, _)| *day)
                .collect();
            if !dates.is_empty() {
                active.insert(id.clone(), dates);
            }
        }

        tracing::info!(services = active.len(), %today, "active services computed");
        Ok(Some(TaskOutput::ActiveServices(active)))
    }
}
