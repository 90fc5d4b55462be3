use crate::color_space::{delta_e, is_finite_lab};
use crate::sampling::LabBucket;
use palette::Lab;
use std::cmp::Ordering;

/// Largest first; ties broken on the centroid so the result does not depend
/// on the order buckets arrived in.
pub(crate) fn by_count_desc(x: &LabBucket, y: &LabBucket) -> Ordering {
    y.count
        .cmp(&x.count)
        .then_with(|| x.lab.l.total_cmp(&y.lab.l))
        .then_with(|| x.lab.a.total_cmp(&y.lab.a))
        .then_with(|| x.lab.b.total_cmp(&y.lab.b))
}

pub(crate) fn is_well_formed(bucket: &LabBucket) -> bool {
    bucket.count > 0 && is_finite_lab(&bucket.lab)
}

/// Greedily fold buckets whose centroids lie within `threshold` (CIE76).
///
/// Buckets are visited largest first. Each one joins the first already
/// accepted group closer than `threshold`, which is not necessarily the
/// nearest one, or starts a new group. Group centroids are count-weighted
/// means of everything folded in.
pub fn merge_similar_buckets(buckets: &[LabBucket], threshold: f64) -> Vec<LabBucket> {
    let mut sorted: Vec<LabBucket> = buckets.iter().copied().filter(is_well_formed).collect();
    sorted.sort_by(by_count_desc);

    let mut merged: Vec<LabBucket> = Vec::new();
    for bucket in sorted {
        match merged
            .iter_mut()
            .find(|m| delta_e(&m.lab, &bucket.lab) < threshold)
        {
            Some(target) => fold_into(target, &bucket),
            None => merged.push(bucket),
        }
    }
    merged
}

fn fold_into(target: &mut LabBucket, bucket: &LabBucket) {
    let total = target.count + bucket.count;
    let wt = target.count as f64 / total as f64;
    let wb = bucket.count as f64 / total as f64;
    target.lab = Lab::new(
        target.lab.l * wt + bucket.lab.l * wb,
        target.lab.a * wt + bucket.lab.a * wb,
        target.lab.b * wt + bucket.lab.b * wb,
    );
    target.count = total;
}
