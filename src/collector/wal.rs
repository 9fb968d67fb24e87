//! Write-ahead-log metrics: write volume, file counts and archive status.
//!
//! The file and archive queries read the server's data directory listing
//! and may require elevated privileges; a permission failure surfaces as a
//! regular stage-tagged query error.

use super::backend::Backend;
use super::metrics::{Metrics, fold_columns};
use super::{Collector, QueryFailure, QueryName, queries};

impl<B: Backend> Collector<B> {
    pub(super) fn collect_wal_writes(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let sql = queries::wal_writes(self.server_version);
        let writes = self.fetch_scalar(QueryName::WalWrites, &sql)?;
        mx.set("wal_writes", writes);
        Ok(())
    }

    pub(super) fn collect_wal_files(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let sql = queries::wal_files(self.server_version);
        let rows = self.fetch(QueryName::WalFiles, &sql)?;
        fold_columns(&rows, mx);
        Ok(())
    }

    pub(super) fn collect_wal_archive_files(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let sql = queries::wal_archive_files(self.server_version);
        let rows = self.fetch(QueryName::WalArchiveFiles, &sql)?;
        fold_columns(&rows, mx);
        Ok(())
    }
}
