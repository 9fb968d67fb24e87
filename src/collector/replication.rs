//! Replication standby metrics.
//!
//! The standby application list feeds the entity tracker; the delta and
//! lag groups expand per application. Both use the accumulate merge: a
//! single application can appear once per WAL sender, and those rows must
//! sum rather than overwrite within the cycle.

use super::backend::Backend;
use super::metrics::{Merge, Metrics, fold_keyed};
use super::{CollectError, Collector, QueryFailure, QueryName, queries};

const STANDBY_KEY_PREFIX: &str = "repl_standby_app_";

impl<B: Backend> Collector<B> {
    /// Fetches the current standby application names, deduplicated while
    /// preserving first appearance.
    pub(super) fn fetch_standby_app_list(&mut self) -> Result<Vec<String>, CollectError> {
        let rows = self.fetch_metadata(QueryName::StandbyAppList, queries::standby_app_list())?;

        let mut apps: Vec<String> = Vec::new();
        for row in &rows {
            if let Some(name) = row.by_name("application_name")
                && !apps.iter().any(|a| a == name)
            {
                apps.push(name.to_string());
            }
        }
        Ok(apps)
    }

    pub(super) fn collect_standby_wal_delta(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let sql = queries::standby_app_wal_delta(self.server_version);
        let rows = self.fetch(QueryName::StandbyAppWalDelta, &sql)?;
        fold_keyed(
            &rows,
            &["application_name"],
            STANDBY_KEY_PREFIX,
            Merge::Accumulate,
            mx,
        );
        Ok(())
    }

    pub(super) fn collect_standby_wal_lag(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let rows = self.fetch(QueryName::StandbyAppWalLag, queries::standby_app_wal_lag())?;
        fold_keyed(
            &rows,
            &["application_name"],
            STANDBY_KEY_PREFIX,
            Merge::Accumulate,
            mx,
        );
        Ok(())
    }
}
