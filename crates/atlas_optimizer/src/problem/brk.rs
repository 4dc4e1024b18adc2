use jiff::SignedDuration;
use serde::Serialize;

use crate::problem::time_window::TimeWindows;

/// A driver break carried by a vehicle. Breaks are placed between route
/// steps by the timing pass, each within one of its own windows.
#[derive(Debug, Clone, Serialize)]
pub struct Break {
    external_id: String,
    time_windows: TimeWindows,
    service_duration: SignedDuration,
}

impl Break {
    pub fn new(
        external_id: impl Into<String>,
        time_windows: TimeWindows,
        service_duration: SignedDuration,
    ) -> Self {
        Break {
            external_id: external_id.into(),
            time_windows,
            service_duration,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn time_windows(&self) -> &TimeWindows {
        &self.time_windows
    }

    pub fn service_duration(&self) -> SignedDuration {
        self.service_duration
    }
}
