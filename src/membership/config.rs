//! Configuration for the membership engine.

/// Tunable policy knobs shared by the managers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipConfig {
    /// Shortest freeze window accepted, in days.
    pub min_freeze_days: u32,
    /// Longest freeze window accepted, in days.
    pub max_freeze_days: u32,
    /// How many optimistic-lock retries a check-in attempts before
    /// giving up with a concurrency error.
    pub checkin_retry_limit: u32,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            min_freeze_days: super::lifecycle::MIN_FREEZE_DAYS,
            max_freeze_days: super::lifecycle::MAX_FREEZE_DAYS,
            checkin_retry_limit: 3,
        }
    }
}

impl MembershipConfig {
    /// Create a config with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder.
    #[must_use]
    pub fn builder() -> MembershipConfigBuilder {
        MembershipConfigBuilder::default()
    }
}

/// Builder for [`MembershipConfig`].
#[derive(Debug, Default)]
pub struct MembershipConfigBuilder {
    config: Option<MembershipConfig>,
}

impl MembershipConfigBuilder {
    fn config(&mut self) -> &mut MembershipConfig {
        self.config.get_or_insert_with(MembershipConfig::default)
    }

    /// Set the accepted freeze window bounds, in days.
    #[must_use]
    pub fn freeze_days(mut self, min: u32, max: u32) -> Self {
        let config = self.config();
        config.min_freeze_days = min;
        config.max_freeze_days = max;
        self
    }

    /// Set the optimistic-lock retry limit for check-ins.
    #[must_use]
    pub fn checkin_retry_limit(mut self, limit: u32) -> Self {
        self.config().checkin_retry_limit = limit;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(mut self) -> MembershipConfig {
        self.config.take().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MembershipConfig::default();
        assert_eq!(config.min_freeze_days, 1);
        assert_eq!(config.max_freeze_days, 365);
        assert_eq!(config.checkin_retry_limit, 3);
    }

    #[test]
    fn test_builder() {
        let config = MembershipConfig::builder()
            .freeze_days(7, 90)
            .checkin_retry_limit(5)
            .build();
        assert_eq!(config.min_freeze_days, 7);
        assert_eq!(config.max_freeze_days, 90);
        assert_eq!(config.checkin_retry_limit, 5);
    }
}
