use crate::models::CompositeRecord;

pub const TOP_N: usize = 10;

/// Orders records coolest first, cleaner air breaking ties, and keeps the
/// first [`TOP_N`] with ranks 1..=k. The sort is stable, so equal keys keep
/// their input order.
pub fn rank(mut records: Vec<CompositeRecord>) -> Vec<CompositeRecord> {
    records.sort_by(|a, b| {
        a.avg_temp_celsius
            .total_cmp(&b.avg_temp_celsius)
            .then(a.avg_pm25.total_cmp(&b.avg_pm25))
    });
    records.truncate(TOP_N);

    for (i, record) in records.iter_mut().enumerate() {
        record.rank = i as u32 + 1;
    }
    records
}
