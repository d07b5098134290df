use serde::{Deserialize, Serialize};
use std::fmt;

/// How a price series request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheStatus {
    /// Served straight from the document cache.
    Hit,
    /// Not cached yet; fetched upstream and stored.
    Miss,
    /// Cached entry was older than the configured TTL and was replaced.
    Refreshed,
}

impl CacheStatus {
    /// Returns true when the upstream provider was contacted.
    pub fn fetched_upstream(&self) -> bool {
        !matches!(self, CacheStatus::Hit)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Refreshed => "refreshed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_a_hit_skips_the_provider() {
        assert!(!CacheStatus::Hit.fetched_upstream());
        assert!(CacheStatus::Miss.fetched_upstream());
        assert!(CacheStatus::Refreshed.fetched_upstream());
        assert_eq!(CacheStatus::Refreshed.to_string(), "refreshed");
    }
}
