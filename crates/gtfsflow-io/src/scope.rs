//! Export scoping: which rows of each table belong to the exported subset.

use gtfsflow_core::value::Value;
use gtfsflow_store::Filter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportScope {
    #[default]
    All,
    /// One agency and everything reachable from its routes.
    Agency(String),
}

const ROUTES: &str = "SELECT route_id FROM routes WHERE agency_id = ?1";

impl ExportScope {
    pub fn agency(id: impl Into<String>) -> Self {
        ExportScope::Agency(id.into())
    }

    /// Row filter for `table`. Tables the scope knows nothing about are
    /// exported whole.
    pub fn filter(&self, table: &str) -> Filter {
        let ExportScope::Agency(agency) = self else {
            return Filter::none();
        };
        let trips = format!("SELECT trip_id FROM trips WHERE route_id IN ({ROUTES})");
        let services = format!("SELECT DISTINCT service_id FROM trips WHERE route_id IN ({ROUTES})");
        let shapes = format!("SELECT DISTINCT shape_id FROM trips WHERE route_id IN ({ROUTES})");
        let stops = format!("SELECT DISTINCT stop_id FROM stop_times WHERE trip_id IN ({trips})");

        let clause = match table {
            "agency" | "routes" => "agency_id = ?1".to_string(),
            "trips" => format!("route_id IN ({ROUTES})"),
            "stop_times" | "frequencies" => format!("trip_id IN ({trips})"),
            "stops" => format!("stop_id IN ({stops})"),
            "calendar" | "calendar_dates" => format!("service_id IN ({services})"),
            "shapes" => format!("shape_id IN ({shapes})"),
            "transfers" => format!("from_stop_id IN ({stops}) OR to_stop_id IN ({stops})"),
            _ => return Filter::none(),
        };
        Filter::new(clause, vec![Value::from(agency.as_str())])
    }
}
