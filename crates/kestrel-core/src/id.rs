/// Run identifier: `<prefix>-<unix seconds>-<8 hex chars>`.
///
/// The random suffix keeps ids unique when two runs start within the
/// same second.
pub fn run_id(prefix: &str) -> String {
    let seconds = jiff::Timestamp::now().as_second();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{seconds}-{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = run_id("drift-scan");
        let b = run_id("drift-scan");
        assert!(a.starts_with("drift-scan-"));
        assert_ne!(a, b);
    }
}
