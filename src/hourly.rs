//! Hourly reduction
//!
//! Folds a session's walking bouts into 24 hour-of-day buckets holding stride
//! totals and mean walking speed.

use crate::types::WalkingBout;
use crate::HOURS_PER_DAY;
use serde::{Serialize, Serializer};

/// Accumulated activity for one hour of the day
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HourlyBucket {
    pub stride_total: u64,
    pub speed_sum: f64,
    pub speed_count: u32,
    /// `speed_sum / speed_count`, or 0 when no speed was recorded
    pub mean_speed: f64,
}

/// Fixed 24-slot table indexed by hour of day
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySpeed {
    buckets: [HourlyBucket; HOURS_PER_DAY],
}

impl Default for HourlySpeed {
    fn default() -> Self {
        Self {
            buckets: [HourlyBucket::default(); HOURS_PER_DAY],
        }
    }
}

impl HourlySpeed {
    /// Bucket for `hour`; hours wrap modulo 24
    pub fn hour(&self, hour: u8) -> &HourlyBucket {
        &self.buckets[hour as usize % HOURS_PER_DAY]
    }

    pub fn buckets(&self) -> &[HourlyBucket; HOURS_PER_DAY] {
        &self.buckets
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &HourlyBucket)> {
        self.buckets.iter().enumerate().map(|(h, b)| (h as u8, b))
    }

    pub fn stride_totals(&self) -> [u64; HOURS_PER_DAY] {
        self.buckets.map(|b| b.stride_total)
    }
}

impl Serialize for HourlySpeed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.buckets.as_slice().serialize(serializer)
    }
}

/// Reducer from bouts to hourly buckets
pub struct HourlyReducer;

impl HourlyReducer {
    pub fn reduce(bouts: &[WalkingBout]) -> HourlySpeed {
        let mut hourly = HourlySpeed::default();

        for bout in bouts {
            let bucket = &mut hourly.buckets[bout.bout_hour as usize % HOURS_PER_DAY];

            if let Some(speed) = bout.record.walking_speed_mps {
                bucket.speed_sum += speed;
                bucket.speed_count += 1;
            }

            if let Some(strides) = bout.record.n_strides {
                bucket.stride_total += u64::from(strides);
            }
        }

        for bucket in hourly.buckets.iter_mut() {
            bucket.mean_speed = if bucket.speed_count > 0 {
                bucket.speed_sum / f64::from(bucket.speed_count)
            } else {
                0.0
            };
        }

        hourly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WalkingBoutRecord;
    use chrono::{FixedOffset, TimeZone};

    fn bout_at(hour: u8, n_strides: Option<u32>, speed: Option<f64>) -> WalkingBout {
        let ts = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, hour as u32, 0, 0)
            .unwrap();
        WalkingBout {
            record: WalkingBoutRecord {
                start: 0,
                end: 100,
                duration_s: Some(1.0),
                cadence_spm: None,
                stride_length_m: None,
                walking_speed_mps: speed,
                n_strides,
            },
            start_time: ts,
            end_time: ts,
            bout_hour: hour,
        }
    }

    #[test]
    fn test_groups_by_hour_and_skips_missing_values() {
        let bouts = vec![
            bout_at(3, Some(10), Some(1.0)),
            bout_at(3, Some(5), None),
            bout_at(9, None, Some(2.0)),
        ];

        let hourly = HourlyReducer::reduce(&bouts);

        let three = hourly.hour(3);
        assert_eq!(three.stride_total, 15);
        assert_eq!(three.speed_sum, 1.0);
        assert_eq!(three.speed_count, 1);
        assert_eq!(three.mean_speed, 1.0);

        let nine = hourly.hour(9);
        assert_eq!(nine.stride_total, 0);
        assert_eq!(nine.mean_speed, 2.0);
    }

    #[test]
    fn test_no_bouts_yields_24_zero_buckets() {
        let hourly = HourlyReducer::reduce(&[]);
        assert_eq!(hourly.iter().count(), 24);
        assert!(hourly.iter().all(|(_, b)| *b == HourlyBucket::default()));
    }

    #[test]
    fn test_serializes_as_array() {
        let hourly = HourlyReducer::reduce(&[bout_at(0, Some(4), Some(1.5))]);
        let json = serde_json::to_value(&hourly).unwrap();
        let arr = json.as_array().unwrap();
        assert_eq!(arr.len(), 24);
        assert_eq!(arr[0]["stride_total"], 4);
        assert_eq!(arr[0]["mean_speed"], 1.5);
    }
}
