//! Server-wide metrics: connections, checkpoints, uptime, transaction-id
//! wraparound headroom and autovacuum workers.

use super::backend::Backend;
use super::metrics::{Metrics, calc_percentage, fold_columns};
use super::{Collector, QueryFailure, QueryName, queries};

impl<B: Backend> Collector<B> {
    pub(super) fn collect_connections(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let used =
            self.fetch_scalar(QueryName::ServerConnections, queries::server_connections_used())?;

        mx.set("server_connections_used", used);
        mx.set(
            "server_connections_available",
            self.max_connections.saturating_sub(used),
        );
        mx.set(
            "server_connections_utilization",
            calc_percentage(used, self.max_connections),
        );
        Ok(())
    }

    pub(super) fn collect_checkpoints(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let rows = self.fetch(QueryName::Checkpoints, queries::checkpoints())?;
        fold_columns(&rows, mx);
        Ok(())
    }

    pub(super) fn collect_uptime(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let uptime = self.fetch_scalar(QueryName::ServerUptime, queries::server_uptime())?;
        mx.set("server_uptime", uptime);
        Ok(())
    }

    pub(super) fn collect_txid_wraparound(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let rows = self.fetch(QueryName::TxidWraparound, queries::txid_wraparound())?;
        fold_columns(&rows, mx);
        Ok(())
    }

    pub(super) fn collect_autovacuum_workers(
        &mut self,
        mx: &mut Metrics,
    ) -> Result<(), QueryFailure> {
        let rows = self.fetch(QueryName::AutovacuumWorkers, queries::autovacuum_workers())?;
        fold_columns(&rows, mx);
        Ok(())
    }
}
