use kestrel_core::ValidationReport;

/// Failure phrases serious enough to warrant an automatic rollback.
const CRITICAL_FAILURE_PHRASES: &[&str] = &[
    "deployment failed",
    "service unavailable",
    "health check failed",
    "performance threshold exceeded",
];

/// Commits searched when picking the rollback target.
pub const STABLE_HISTORY_WINDOW: usize = 10;

/// True when a failed validation carries at least one critical error.
pub fn should_trigger(report: &ValidationReport) -> bool {
    if report.success {
        return false;
    }
    report.errors.iter().any(|error| {
        let error = error.to_lowercase();
        CRITICAL_FAILURE_PHRASES
            .iter()
            .any(|phrase| error.contains(phrase))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_phrases_trigger_case_insensitively() {
        let report = ValidationReport::failed(
            "edge01",
            vec!["Health Check Failed for ran-du".into()],
        );
        assert!(should_trigger(&report));
    }

    #[test]
    fn routine_failures_do_not_trigger() {
        let report = ValidationReport::failed("edge01", vec!["sync pending".into()]);
        assert!(!should_trigger(&report));
    }

    #[test]
    fn success_never_triggers() {
        let mut report = ValidationReport::passed("edge01");
        report.errors.push("deployment failed earlier".into());
        assert!(!should_trigger(&report));
    }
}
