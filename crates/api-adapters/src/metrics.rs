//! Prometheus counters exposed on `/metrics`.

use domains::ErrorKind;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DeletionLabels {
    pub outcome: String,
}

pub struct Metrics {
    registry: Registry,
    domain_errors: Family<ErrorLabels, Counter>,
    account_deletions: Family<DeletionLabels, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let domain_errors = Family::<ErrorLabels, Counter>::default();
        let account_deletions = Family::<DeletionLabels, Counter>::default();
        registry.register(
            "domain_errors",
            "Domain errors returned to clients, by kind",
            domain_errors.clone(),
        );
        registry.register(
            "account_deletions",
            "Account deletion cascades, by outcome",
            account_deletions.clone(),
        );
        Self {
            registry,
            domain_errors,
            account_deletions,
        }
    }

    pub fn record_error(&self, kind: ErrorKind) {
        self.domain_errors
            .get_or_create(&ErrorLabels {
                kind: kind.as_str().to_string(),
            })
            .inc();
    }

    pub fn record_deletion(&self, completed: bool) {
        let outcome = if completed { "completed" } else { "failed" };
        self.account_deletions
            .get_or_create(&DeletionLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// OpenMetrics text exposition.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render_with_labels() {
        let metrics = Metrics::new();
        metrics.record_error(ErrorKind::Forbidden);
        metrics.record_error(ErrorKind::Forbidden);
        metrics.record_deletion(true);

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"domain_errors_total{kind="forbidden"} 2"#));
        assert!(text.contains(r#"account_deletions_total{outcome="completed"} 1"#));
    }
}
