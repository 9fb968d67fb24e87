//! System catalog relation metrics.
//!
//! `pg_class` rows are grouped by relation kind. The kinds form a closed
//! enumeration; rows with a code outside it are skipped rather than folded
//! into a corrupted key. All count/size keys are pre-seeded to zero so the
//! snapshot's key set stays stable even when a kind has no relations.

use tracing::debug;

use super::backend::Backend;
use super::metrics::{Metrics, parse_metric_value};
use super::{Collector, QueryFailure, QueryName, queries};

/// Relation kind codes from `pg_class.relkind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelKind {
    OrdinaryTable,
    Index,
    Sequence,
    ToastTable,
    View,
    MaterializedView,
    CompositeType,
    ForeignTable,
    PartitionedTable,
    PartitionedIndex,
}

impl RelKind {
    pub const ALL: [RelKind; 10] = [
        RelKind::OrdinaryTable,
        RelKind::Index,
        RelKind::Sequence,
        RelKind::ToastTable,
        RelKind::View,
        RelKind::MaterializedView,
        RelKind::CompositeType,
        RelKind::ForeignTable,
        RelKind::PartitionedTable,
        RelKind::PartitionedIndex,
    ];

    /// The single-character catalog code.
    pub fn code(self) -> &'static str {
        match self {
            RelKind::OrdinaryTable => "r",
            RelKind::Index => "i",
            RelKind::Sequence => "S",
            RelKind::ToastTable => "t",
            RelKind::View => "v",
            RelKind::MaterializedView => "m",
            RelKind::CompositeType => "c",
            RelKind::ForeignTable => "f",
            RelKind::PartitionedTable => "p",
            RelKind::PartitionedIndex => "I",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

/// Seeds zero count/size metrics for every relation kind.
pub(super) fn seed_relkind_zeroes(mx: &mut Metrics) {
    for kind in RelKind::ALL {
        mx.set(format!("catalog_relkind_{}_count", kind.code()), 0);
        mx.set(format!("catalog_relkind_{}_size", kind.code()), 0);
    }
}

impl<B: Backend> Collector<B> {
    pub(super) fn collect_catalog_relations(&mut self, mx: &mut Metrics) -> Result<(), QueryFailure> {
        let rows = self.fetch(QueryName::CatalogRelations, queries::catalog_relations())?;

        seed_relkind_zeroes(mx);

        for row in &rows {
            let code = row.by_name("relkind").unwrap_or("");
            let Some(kind) = RelKind::from_code(code) else {
                debug!(relkind = %code, "skipping unknown relation kind");
                continue;
            };
            for (idx, column) in row.columns().iter().enumerate() {
                if column == "relkind" {
                    continue;
                }
                let value = parse_metric_value(row.get(idx).unwrap_or(""));
                mx.set(format!("catalog_relkind_{}_{}", kind.code(), column), value);
            }
        }

        Ok(())
    }
}
