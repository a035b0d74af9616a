use std::time::Duration;

/// Rotation and retention rules for the info LOG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRollPolicy {
    /// Roll once the active file reaches this many bytes, 0 disables.
    pub max_log_file_size: u64,
    /// Roll once the active file is older than this many seconds, 0 disables.
    pub log_file_time_to_roll: u64,
    /// Number of rolled files kept around.
    pub keep_log_file_num: u64,
}

impl LogRollPolicy {
    /// Either threshold alone is enough to roll.
    pub fn should_roll(&self, size: u64, age: Duration) -> bool {
        let too_big = self.max_log_file_size > 0 && size >= self.max_log_file_size;
        let too_old =
            self.log_file_time_to_roll > 0 && age.as_secs() >= self.log_file_time_to_roll;
        too_big || too_old
    }

    /// Given rolled file ids (timestamps, ascending = oldest first), return
    /// the ones that exceed `keep_log_file_num`.
    pub fn select_purge(&self, mut rolled: Vec<u64>) -> Vec<u64> {
        rolled.sort_unstable();
        let keep = self.keep_log_file_num as usize;
        if rolled.len() <= keep {
            return Vec::new();
        }
        let excess = rolled.len() - keep;
        rolled.truncate(excess);
        rolled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_on_size_or_time() {
        let policy = LogRollPolicy {
            max_log_file_size: 1024,
            log_file_time_to_roll: 60,
            keep_log_file_num: 10,
        };

        assert!(!policy.should_roll(100, Duration::from_secs(1)));
        assert!(policy.should_roll(2048, Duration::from_secs(1)));
        assert!(policy.should_roll(100, Duration::from_secs(61)));
    }

    #[test]
    fn test_zero_disables_threshold() {
        let policy = LogRollPolicy {
            max_log_file_size: 0,
            log_file_time_to_roll: 0,
            keep_log_file_num: 10,
        };
        assert!(!policy.should_roll(u64::MAX, Duration::from_secs(u64::MAX / 2)));
    }

    #[test]
    fn test_purge_oldest_first() {
        let policy = LogRollPolicy {
            max_log_file_size: 0,
            log_file_time_to_roll: 0,
            keep_log_file_num: 2,
        };
        assert_eq!(policy.select_purge(vec![30, 10, 40, 20]), vec![10, 20]);
        assert!(policy.select_purge(vec![1, 2]).is_empty());
    }
}
