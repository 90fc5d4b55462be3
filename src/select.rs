use crate::color_space::{LabColor, chroma, delta_e, lab_to_hex};
use crate::config::ExtractorConfig;
use crate::merge::{by_count_desc, is_well_formed, merge_similar_buckets};
use crate::sampling::LabBucket;

const NEAR_WHITE: f64 = 92.0;
const NEAR_BLACK: f64 = 10.0;

/// A merged bucket with its ranking inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredBucket {
    pub bucket: LabBucket,
    pub chroma: f64,
    pub lightness: f64,
    pub score: f64,
}

impl ScoredBucket {
    fn is_light(&self) -> bool {
        self.lightness > NEAR_WHITE
    }

    fn is_dark(&self) -> bool {
        self.lightness < NEAR_BLACK
    }
}

/// Pixel count biased toward neutral, mid-lightness surfaces.
pub fn score_bucket(bucket: &LabBucket) -> ScoredBucket {
    let c = chroma(&bucket.lab);
    let l = bucket.lab.l;

    let chroma_factor = if c < 10.0 {
        1.35
    } else if c < 22.0 {
        1.15
    } else if c > 45.0 {
        0.75
    } else {
        1.0
    };
    let lightness_factor = if l > 92.0 || l < 10.0 {
        0.6
    } else if l > 85.0 || l < 18.0 {
        0.85
    } else {
        1.0
    };

    ScoredBucket {
        bucket: *bucket,
        chroma: c,
        lightness: l,
        score: bucket.count as f64 * chroma_factor * lightness_factor,
    }
}

/// Pick up to `max_colors` distinct centroids from `buckets`, best first.
///
/// The strict pass requires `strict_distance` to every pick and admits at
/// most one near-white and one near-black color. If slots remain, a relaxed
/// pass over the same ranking ignores the light/dark cap and requires only
/// `relaxed_distance`.
pub fn select_palette(
    buckets: &[LabBucket],
    max_colors: usize,
    strict_distance: f64,
    relaxed_distance: f64,
) -> Vec<LabColor> {
    let mut ranked: Vec<ScoredBucket> = buckets
        .iter()
        .filter(|b| is_well_formed(b))
        .map(score_bucket)
        .filter(|s| s.score.is_finite())
        .collect();
    ranked.sort_by(|x, y| {
        y.score
            .total_cmp(&x.score)
            .then_with(|| by_count_desc(&x.bucket, &y.bucket))
    });

    let mut selected: Vec<LabColor> = Vec::with_capacity(max_colors);
    let mut picked_light = false;
    let mut picked_dark = false;

    for candidate in &ranked {
        if selected.len() >= max_colors {
            break;
        }
        if (candidate.is_light() && picked_light) || (candidate.is_dark() && picked_dark) {
            continue;
        }
        if is_distinct(&candidate.bucket.lab, &selected, strict_distance) {
            selected.push(candidate.bucket.lab);
            picked_light |= candidate.is_light();
            picked_dark |= candidate.is_dark();
        }
    }

    if selected.len() < max_colors {
        for candidate in &ranked {
            if selected.len() >= max_colors {
                break;
            }
            if is_distinct(&candidate.bucket.lab, &selected, relaxed_distance) {
                selected.push(candidate.bucket.lab);
            }
        }
    }

    selected
}

/// Merge, rank and select, then format as hex.
pub fn palette_from_buckets(buckets: &[LabBucket], config: &ExtractorConfig) -> Vec<String> {
    let merged = merge_similar_buckets(buckets, config.merge_threshold);
    select_palette(
        &merged,
        config.max_colors,
        config.strict_distance,
        config.relaxed_distance,
    )
    .into_iter()
    .map(lab_to_hex)
    .collect()
}

fn is_distinct(lab: &LabColor, selected: &[LabColor], min_distance: f64) -> bool {
    selected.iter().all(|s| delta_e(lab, s) >= min_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn select(buckets: &[LabBucket]) -> Vec<LabColor> {
        select_palette(buckets, 5, 20.0, 18.0)
    }

    #[test]
    fn score_applies_both_factors() {
        let cases = [
            (LabBucket::new(50.0, 0.0, 0.0, 100), 135.0),
            (LabBucket::new(50.0, 60.0, 0.0, 100), 75.0),
            (LabBucket::new(50.0, 30.0, 0.0, 100), 100.0),
            (LabBucket::new(95.0, 15.0, 0.0, 100), 69.0),
            (LabBucket::new(15.0, 30.0, 0.0, 100), 85.0),
            (LabBucket::new(5.0, 0.0, 0.0, 100), 81.0),
        ];
        for (bucket, expected) in cases {
            let scored = score_bucket(&bucket);
            assert!(
                (scored.score - expected).abs() < 1e-9,
                "{bucket:?} scored {} instead of {expected}",
                scored.score
            );
        }
    }

    #[test]
    fn light_cap_holds_in_strict_pass() {
        let light = LabBucket::new(95.0, 0.0, 0.0, 1000);
        let second_light = LabBucket::new(96.0, 40.0, 0.0, 1000);
        let buckets = [
            light,
            second_light,
            LabBucket::new(30.0, 0.0, 0.0, 300),
            LabBucket::new(50.0, 0.0, 0.0, 300),
            LabBucket::new(70.0, 0.0, 0.0, 300),
            LabBucket::new(50.0, 0.0, -30.0, 300),
        ];

        let palette = select(&buckets);

        assert_eq!(palette.len(), 5);
        assert_eq!(palette[0], light.lab);
        assert!(!palette.contains(&second_light.lab));
        assert_eq!(palette.iter().filter(|l| l.l > 92.0).count(), 1);
    }

    #[test]
    fn dark_cap_holds_in_strict_pass() {
        let dark = LabBucket::new(4.0, 0.0, 0.0, 1000);
        let second_dark = LabBucket::new(6.0, 30.0, -20.0, 900);
        let buckets = [
            dark,
            second_dark,
            LabBucket::new(40.0, 0.0, 0.0, 300),
            LabBucket::new(60.0, 0.0, 0.0, 300),
            LabBucket::new(80.0, 0.0, 0.0, 300),
            LabBucket::new(60.0, 0.0, 35.0, 300),
        ];

        let palette = select(&buckets);

        assert_eq!(palette.len(), 5);
        assert!(!palette.contains(&second_dark.lab));
        assert_eq!(palette.iter().filter(|l| l.l < 10.0).count(), 1);
    }

    #[test]
    fn relaxed_pass_fills_free_slots() {
        let palette = select(&[
            LabBucket::new(50.0, 0.0, 0.0, 100),
            LabBucket::new(69.0, 0.0, 0.0, 50),
            LabBucket::new(60.0, 0.0, 0.0, 40),
        ]);

        assert_eq!(palette, vec![LabColor::new(50.0, 0.0, 0.0), LabColor::new(69.0, 0.0, 0.0)]);
    }

    #[test]
    fn relaxed_pass_ignores_light_cap() {
        let palette = select(&[
            LabBucket::new(95.0, 0.0, 0.0, 100),
            LabBucket::new(96.0, 40.0, 0.0, 100),
        ]);
        assert_eq!(palette.len(), 2);
    }

    #[test]
    fn single_bucket_gives_single_color() {
        assert_eq!(select(&[LabBucket::new(60.0, 5.0, 5.0, 12)]).len(), 1);
        assert!(select(&[]).is_empty());
    }

    #[test]
    fn malformed_input_is_ignored() {
        let palette = select(&[
            LabBucket::new(f64::NAN, 0.0, 0.0, 10),
            LabBucket::new(40.0, 0.0, 0.0, 0),
            LabBucket::new(40.0, 0.0, 0.0, 3),
        ]);
        assert_eq!(palette, vec![LabColor::new(40.0, 0.0, 0.0)]);
    }

    #[test]
    fn never_more_than_max_and_always_distinct() {
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for _ in 0..50 {
            let buckets: Vec<LabBucket> = (0..40)
                .map(|_| {
                    LabBucket::new(
                        (next() % 100) as f64,
                        (next() % 200) as f64 - 100.0,
                        (next() % 200) as f64 - 100.0,
                        next() % 500 + 1,
                    )
                })
                .collect();

            let palette = select(&buckets);
            assert!(palette.len() <= 5);
            for (i, x) in palette.iter().enumerate() {
                for y in &palette[i + 1..] {
                    assert!(delta_e(x, y) >= 18.0);
                }
            }
        }
    }
}
