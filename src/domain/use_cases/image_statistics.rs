use parking_lot::RwLock;

use crate::entities::image::{ImageStatistics, SizeValidationResult};

#[derive(Debug, Default)]
struct Totals {
    count: u64,
    bytes: u64,
    largest: u64,
    smallest: u64,
}

/// Upload statistics for the lifetime of the process, plus the size limit check.
#[derive(Debug)]
pub struct ImageStatisticsTracker {
    totals: RwLock<Totals>,
    size_limit: u64,
}

impl ImageStatisticsTracker {
    pub fn new(size_limit: u64) -> Self {
        ImageStatisticsTracker {
            totals: RwLock::new(Totals::default()),
            size_limit,
        }
    }

    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    pub fn track_upload(&self, size: u64) {
        let mut totals = self.totals.write();
        totals.count += 1;
        totals.bytes += size;
        if totals.count == 1 || size < totals.smallest {
            totals.smallest = size;
        }
        if totals.count == 1 || size > totals.largest {
            totals.largest = size;
        }
    }

    pub fn validate_image_size(&self, size: u64) -> SizeValidationResult {
        let valid = size <= self.size_limit;
        SizeValidationResult {
            valid,
            message: if valid {
                "Image size is within the allowed limit".into()
            } else {
                "Image size exceeds the maximum allowed limit".into()
            },
            size_limit: self.size_limit,
            file_size: size,
        }
    }

    pub fn statistics(&self) -> ImageStatistics {
        let totals = self.totals.read();
        let average_size = if totals.count > 0 {
            totals.bytes as f64 / totals.count as f64
        } else {
            0.0
        };

        ImageStatistics {
            total_images: totals.count,
            total_size: totals.bytes,
            average_size,
            largest_image: totals.largest,
            smallest_image: totals.smallest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_extremes_and_average() {
        let tracker = ImageStatisticsTracker::new(100);
        for size in [40, 10, 70] {
            tracker.track_upload(size);
        }

        let stats = tracker.statistics();
        assert_eq!(stats.total_images, 3);
        assert_eq!(stats.total_size, 120);
        assert_eq!(stats.average_size, 40.0);
        assert_eq!(stats.largest_image, 70);
        assert_eq!(stats.smallest_image, 10);
    }

    #[test]
    fn limit_is_inclusive() {
        let tracker = ImageStatisticsTracker::new(100);
        assert!(tracker.validate_image_size(100).valid);

        let over = tracker.validate_image_size(101);
        assert!(!over.valid);
        assert_eq!(over.size_limit, 100);
        assert_eq!(over.file_size, 101);
    }
}
