/// Groups a flat list of fetched points into per-series structures.
///
/// A multi-region fetch returns one flat list mixing points from many
/// (metric, item, region) triples. The pipeline works one series at a
/// time, so this splits the list and orders each group by end date.

use std::collections::HashMap;

use crate::model::{DataPoint, Series, SeriesKey};

/// Splits `points` by series identity.
///
/// Groups come back in the order their first point appeared; points
/// within a group are sorted by `end_date` ascending.
pub fn group_into_series(points: Vec<DataPoint>) -> Vec<Series> {
    let mut order: Vec<SeriesKey> = Vec::new();
    let mut groups: HashMap<SeriesKey, Vec<DataPoint>> = HashMap::new();

    for point in points {
        let key = point.key();
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(point);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        // Each group is non-empty and single-identity, so this cannot fail.
        .filter_map(|group| Series::from_unsorted(group).ok())
        .collect()
}
