//! Per-database metrics: stats, recovery conflicts and lock counts.
//!
//! All three groups expand per database name with the overwrite merge and
//! are filtered to the tracked database list, so no query is issued for
//! databases the collector does not follow.

use super::backend::Backend;
use super::metrics::{Merge, Metrics, fold_keyed};
use super::{CollectError, Collector, QueryFailure, QueryName, queries};

const DATABASE_KEY_PREFIX: &str = "db_";

impl<B: Backend> Collector<B> {
    /// Fetches the list of connectable, non-template database names.
    pub(super) fn fetch_database_list(&mut self) -> Result<Vec<String>, CollectError> {
        let rows = self.fetch_metadata(QueryName::DatabaseList, queries::database_list())?;

        Ok(rows
            .iter()
            .filter_map(|row| row.by_name("datname").map(str::to_string))
            .collect())
    }

    pub(super) fn collect_database_stats(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let sql = queries::database_stats(self.databases.names());
        let rows = self.fetch(QueryName::DatabaseStats, &sql)?;
        fold_keyed(&rows, &["datname"], DATABASE_KEY_PREFIX, Merge::Overwrite, mx);
        Ok(())
    }

    pub(super) fn collect_database_conflicts(
        &mut self,
        mx: &mut Metrics,
    ) -> Result<(), QueryFailure> {
        let sql = queries::database_conflicts(self.databases.names());
        let rows = self.fetch(QueryName::DatabaseConflicts, &sql)?;
        fold_keyed(&rows, &["datname"], DATABASE_KEY_PREFIX, Merge::Overwrite, mx);
        Ok(())
    }

    pub(super) fn collect_database_locks(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let sql = queries::database_locks(self.databases.names());
        let rows = self.fetch(QueryName::DatabaseLocks, &sql)?;
        fold_keyed(
            &rows,
            &["datname", "mode"],
            DATABASE_KEY_PREFIX,
            Merge::Overwrite,
            mx,
        );
        Ok(())
    }
}
