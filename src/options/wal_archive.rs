use std::time::{Duration, SystemTime};

/// Interval used whenever a size limit is involved.
pub const SIZE_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// An obsolete WAL file sitting in the archive directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedWal {
    pub number: u64,
    pub size: u64,
    pub modified: SystemTime,
}

/// Deletion policy for obsolete write-ahead logs
///
/// Derived from `wal_ttl_seconds` and `wal_size_limit_mb`:
///
/// ```text
/// ttl == 0, size == 0  -> DeleteImmediately   (nothing is archived)
/// ttl >  0, size == 0  -> Ttl                 (swept every ttl / 2)
/// ttl == 0, size >  0  -> SizeLimit           (swept every 10 min)
/// ttl >  0, size >  0  -> TtlThenSize         (swept every 10 min, ttl first)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalArchivePolicy {
    DeleteImmediately,
    Ttl { ttl: Duration },
    SizeLimit { limit_bytes: u64 },
    TtlThenSize { ttl: Duration, limit_bytes: u64 },
}

impl WalArchivePolicy {
    pub fn from_limits(ttl_seconds: u64, size_limit_mb: u64) -> Self {
        let ttl = Duration::from_secs(ttl_seconds);
        let limit_bytes = size_limit_mb.saturating_mul(1024 * 1024);
        match (ttl_seconds, size_limit_mb) {
            (0, 0) => WalArchivePolicy::DeleteImmediately,
            (_, 0) => WalArchivePolicy::Ttl { ttl },
            (0, _) => WalArchivePolicy::SizeLimit { limit_bytes },
            _ => WalArchivePolicy::TtlThenSize { ttl, limit_bytes },
        }
    }

    /// Whether obsolete logs are moved to the archive instead of deleted.
    pub fn archives(&self) -> bool {
        !matches!(self, WalArchivePolicy::DeleteImmediately)
    }

    /// How often the archive should be swept, `None` when nothing is kept.
    pub fn sweep_interval(&self) -> Option<Duration> {
        match self {
            WalArchivePolicy::DeleteImmediately => None,
            WalArchivePolicy::Ttl { ttl } => Some(*ttl / 2),
            WalArchivePolicy::SizeLimit { .. } | WalArchivePolicy::TtlThenSize { .. } => {
                Some(SIZE_SWEEP_INTERVAL)
            },
        }
    }

    /// Pick the archived logs to delete at `now`
    ///
    /// The TTL check runs first; the size check then works on whatever
    /// survived it, dropping empty files and then the oldest logs until the
    /// total fits the limit.
    pub fn select_expired(&self, files: &[ArchivedWal], now: SystemTime) -> Vec<u64> {
        let mut remaining: Vec<&ArchivedWal> = files.iter().collect();
        remaining.sort_by_key(|f| f.number);
        let mut expired = Vec::new();

        let (ttl, limit) = match *self {
            WalArchivePolicy::DeleteImmediately => {
                return remaining.iter().map(|f| f.number).collect();
            },
            WalArchivePolicy::Ttl { ttl } => (Some(ttl), None),
            WalArchivePolicy::SizeLimit { limit_bytes } => (None, Some(limit_bytes)),
            WalArchivePolicy::TtlThenSize { ttl, limit_bytes } => (Some(ttl), Some(limit_bytes)),
        };

        if let Some(ttl) = ttl {
            remaining.retain(|f| {
                let age = now.duration_since(f.modified).unwrap_or_default();
                if age > ttl {
                    expired.push(f.number);
                    false
                } else {
                    true
                }
            });
        }

        if let Some(limit) = limit {
            remaining.retain(|f| {
                if f.size == 0 {
                    expired.push(f.number);
                    false
                } else {
                    true
                }
            });

            let mut total: u64 = remaining.iter().map(|f| f.size).sum();
            for file in &remaining {
                if total <= limit {
                    break;
                }
                total -= file.size;
                expired.push(file.number);
            }
        }

        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wal(number: u64, size: u64, age_secs: u64, now: SystemTime) -> ArchivedWal {
        ArchivedWal {
            number,
            size,
            modified: now - Duration::from_secs(age_secs),
        }
    }

    #[test]
    fn test_policy_from_limits() {
        assert_eq!(
            WalArchivePolicy::from_limits(0, 0),
            WalArchivePolicy::DeleteImmediately
        );
        assert_eq!(
            WalArchivePolicy::from_limits(60, 0),
            WalArchivePolicy::Ttl {
                ttl: Duration::from_secs(60)
            }
        );
        assert_eq!(
            WalArchivePolicy::from_limits(0, 2),
            WalArchivePolicy::SizeLimit {
                limit_bytes: 2 * 1024 * 1024
            }
        );
        assert!(matches!(
            WalArchivePolicy::from_limits(60, 2),
            WalArchivePolicy::TtlThenSize { .. }
        ));
    }

    #[test]
    fn test_sweep_intervals() {
        assert_eq!(WalArchivePolicy::from_limits(0, 0).sweep_interval(), None);
        assert_eq!(
            WalArchivePolicy::from_limits(120, 0).sweep_interval(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            WalArchivePolicy::from_limits(0, 1).sweep_interval(),
            Some(SIZE_SWEEP_INTERVAL)
        );
        assert_eq!(
            WalArchivePolicy::from_limits(120, 1).sweep_interval(),
            Some(SIZE_SWEEP_INTERVAL)
        );
    }

    #[test]
    fn test_ttl_sweep_removes_only_old_files() {
        let now = SystemTime::now();
        let policy = WalArchivePolicy::from_limits(100, 0);
        let files = vec![wal(1, 10, 500, now), wal(2, 10, 150, now), wal(3, 10, 5, now)];

        assert_eq!(policy.select_expired(&files, now), vec![1, 2]);
    }

    #[test]
    fn test_size_sweep_deletes_oldest_first() {
        let now = SystemTime::now();
        let policy = WalArchivePolicy::SizeLimit { limit_bytes: 100 };
        let files = vec![
            wal(7, 60, 1, now),
            wal(5, 60, 3, now),
            wal(6, 0, 2, now),
            wal(8, 30, 0, now),
        ];

        // empty file 6 goes first, then 5 is enough to fit 90 <= 100
        assert_eq!(policy.select_expired(&files, now), vec![6, 5]);
    }

    #[test]
    fn test_ttl_applied_before_size() {
        let now = SystemTime::now();
        let policy = WalArchivePolicy::TtlThenSize {
            ttl: Duration::from_secs(100),
            limit_bytes: 50,
        };
        let files = vec![wal(1, 40, 1000, now), wal(2, 40, 10, now), wal(3, 40, 5, now)];

        // 1 expires by age; 2 and 3 still total 80 > 50, so 2 goes too
        assert_eq!(policy.select_expired(&files, now), vec![1, 2]);
    }

    #[test]
    fn test_delete_immediately_selects_everything() {
        let now = SystemTime::now();
        let policy = WalArchivePolicy::from_limits(0, 0);
        assert!(!policy.archives());
        let files = vec![wal(3, 1, 0, now), wal(4, 1, 0, now)];
        assert_eq!(policy.select_expired(&files, now), vec![3, 4]);
    }
}
