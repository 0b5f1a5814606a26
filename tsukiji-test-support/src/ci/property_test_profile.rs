//! Property-test run profile shared by the proptest suites.

use super::env_override::{parse_bool, parse_positive, read_env_or_default};

/// Environment variable controlling proptest case counts.
pub const PROGTEST_CASES_ENV_KEY: &str = "PROGTEST_CASES";
/// Environment variable controlling proptest process forking.
pub const TSUKIJI_PBT_FORK_ENV_KEY: &str = "TSUKIJI_PBT_FORK";

/// Runtime profile for property-test execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
    fork: bool,
}

impl ProptestRunProfile {
    /// Load a profile from environment variables with provided defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use tsukiji_test_support::ci::property_test_profile::ProptestRunProfile;
    ///
    /// let profile = ProptestRunProfile::load(64, false);
    /// assert!(profile.cases() > 0);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32, default_fork: bool) -> Self {
        let cases = read_env_or_default(PROGTEST_CASES_ENV_KEY, default_cases, parse_positive);
        let fork = read_env_or_default(TSUKIJI_PBT_FORK_ENV_KEY, default_fork, parse_bool);
        Self { cases, fork }
    }

    /// Number of cases to run per property.
    #[must_use]
    pub const fn cases(&self) -> u32 {
        self.cases
    }

    /// Whether to run proptest cases in forked subprocesses.
    #[must_use]
    pub const fn fork(&self) -> bool {
        self.fork
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::env_override::test_env::{ENV_LOCK, EnvGuard};
    use rstest::rstest;

    #[test]
    fn load_defaults_when_no_overrides_exist() {
        let _lock = ENV_LOCK.lock().expect("env lock");
        let _cases = EnvGuard::unset(PROGTEST_CASES_ENV_KEY);
        let _fork = EnvGuard::unset(TSUKIJI_PBT_FORK_ENV_KEY);

        let profile = ProptestRunProfile::load(64, false);
        assert_eq!(profile.cases(), 64);
        assert!(!profile.fork());
    }

    #[rstest]
    #[case("1", 1)]
    #[case(" 250 ", 250)]
    #[case("25000", 25_000)]
    fn load_accepts_valid_case_overrides(#[case] raw: &str, #[case] expected: u32) {
        let _lock = ENV_LOCK.lock().expect("env lock");
        let _cases = EnvGuard::set(PROGTEST_CASES_ENV_KEY, raw);
        let _fork = EnvGuard::unset(TSUKIJI_PBT_FORK_ENV_KEY);

        assert_eq!(ProptestRunProfile::load(64, false).cases(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("abc")]
    fn load_rejects_invalid_case_overrides(#[case] raw: &str) {
        let _lock = ENV_LOCK.lock().expect("env lock");
        let _cases = EnvGuard::set(PROGTEST_CASES_ENV_KEY, raw);
        let _fork = EnvGuard::unset(TSUKIJI_PBT_FORK_ENV_KEY);

        assert_eq!(ProptestRunProfile::load(64, false).cases(), 64);
    }

    #[rstest]
    #[case("true", true)]
    #[case("YES", true)]
    #[case("on", true)]
    #[case("0", false)]
    #[case("off", false)]
    fn load_accepts_valid_fork_overrides(#[case] raw: &str, #[case] expected: bool) {
        let _lock = ENV_LOCK.lock().expect("env lock");
        let _cases = EnvGuard::unset(PROGTEST_CASES_ENV_KEY);
        let _fork = EnvGuard::set(TSUKIJI_PBT_FORK_ENV_KEY, raw);

        assert_eq!(ProptestRunProfile::load(64, !expected).fork(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("maybe")]
    fn load_keeps_default_for_invalid_fork_overrides(#[case] raw: &str) {
        let _lock = ENV_LOCK.lock().expect("env lock");
        let _cases = EnvGuard::unset(PROGTEST_CASES_ENV_KEY);
        let _fork = EnvGuard::set(TSUKIJI_PBT_FORK_ENV_KEY, raw);

        assert!(ProptestRunProfile::load(64, true).fork());
    }
}
