use tracing::{debug, info};

use crate::models::Listing;

/// Marketplace marker for "price on request"; treated as a missing price.
const NO_OFFER_MARKER: &str = "na upit";

/// Default z-score cutoff. Deliberately aggressive (about the outer third
/// of a normal distribution); tune via `Config::z_threshold`.
pub const DEFAULT_Z_THRESHOLD: f64 = 1.0;

/// Parse a scraped price like "1.234,50 KM" into a numeric value.
///
/// Dots are thousands separators and the comma is the decimal mark, as the
/// marketplace renders them. The "Na upit" marker and anything else that
/// fails to parse come back as `None`.
pub fn normalize_price(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.to_lowercase().contains(NO_OFFER_MARKER) {
        return None;
    }

    let cleaned: String = trimmed
        .trim_end_matches("KM")
        .trim_end_matches("km")
        .chars()
        .filter(|c| !c.is_whitespace())
        .filter(|c| *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    cleaned.parse::<f64>().ok()
}

/// Full cleaning pass: normalize prices, drop unparseable rows, then apply
/// the IQR and z-score filters in that order. Deterministic and
/// order-independent; the output is always a subset of the input.
pub fn clean(listings: Vec<Listing>, z_threshold: f64) -> Vec<Listing> {
    let before = listings.len();

    let parsed: Vec<Listing> = listings
        .into_iter()
        .filter_map(|mut listing| {
            let price = normalize_price(&listing.raw_price)?;
            listing.price = Some(price);
            Some(listing)
        })
        .collect();

    if parsed.is_empty() {
        info!("No listings with parseable prices; nothing to clean");
        return parsed;
    }
    debug!("{} of {} listings had parseable prices", parsed.len(), before);

    let bounded = quantile_bounds_cleaning(parsed);
    let cleaned = remove_z_score_outliers(bounded, z_threshold);

    info!("Cleaning kept {} of {} listings", cleaned.len(), before);
    cleaned
}

/// Keep listings whose price lies within `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`.
///
/// With one listing or fewer, or when the quartiles coincide, every listing
/// is kept.
pub fn quantile_bounds_cleaning(listings: Vec<Listing>) -> Vec<Listing> {
    if listings.len() <= 1 {
        return listings;
    }

    let prices = sorted_prices(&listings);
    let q1 = quantile(&prices, 0.25);
    let q3 = quantile(&prices, 0.75);
    let iqr = q3 - q1;
    if iqr == 0.0 {
        return listings;
    }

    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;
    debug!("IQR bounds: [{:.2}, {:.2}]", lower, upper);

    listings
        .into_iter()
        .filter(|l| {
            let p = l.price.unwrap_or(f64::NAN);
            p >= lower && p <= upper
        })
        .collect()
}

/// Drop listings whose price sits more than `threshold` sample standard
/// deviations from the mean. Degenerate inputs (one listing or zero
/// spread) are kept untouched.
pub fn remove_z_score_outliers(listings: Vec<Listing>, threshold: f64) -> Vec<Listing> {
    if listings.len() <= 1 {
        return listings;
    }

    let prices: Vec<f64> = listings.iter().filter_map(|l| l.price).collect();
    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev == 0.0 || !std_dev.is_finite() {
        return listings;
    }

    listings
        .into_iter()
        .filter(|l| {
            let p = l.price.unwrap_or(f64::NAN);
            ((p - mean) / std_dev).abs() <= threshold
        })
        .collect()
}

fn sorted_prices(listings: &[Listing]) -> Vec<f64> {
    let mut prices: Vec<f64> = listings.iter().filter_map(|l| l.price).collect();
    prices.sort_by(|a, b| a.total_cmp(b));
    prices
}

/// Linear-interpolation quantile over an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: u32, raw_price: &str) -> Listing {
        Listing {
            id,
            title: format!("item {id}"),
            raw_price: raw_price.into(),
            price: None,
            url: format!("https://olx.ba/artikal/{id}/x"),
        }
    }

    fn priced(id: u32, price: f64) -> Listing {
        Listing {
            price: Some(price),
            ..listing(id, &format!("{price} KM"))
        }
    }

    #[test]
    fn normalizes_marketplace_price_formats() {
        assert_eq!(normalize_price("1.234,50 KM"), Some(1234.50));
        assert_eq!(normalize_price("1.250 KM"), Some(1250.0));
        assert_eq!(normalize_price("950KM"), Some(950.0));
        assert_eq!(normalize_price("45,5 KM"), Some(45.5));
        assert_eq!(normalize_price("0"), Some(0.0));
    }

    #[test]
    fn no_offer_marker_and_garbage_are_missing() {
        assert_eq!(normalize_price("Na upit"), None);
        assert_eq!(normalize_price("na upit "), None);
        assert_eq!(normalize_price(""), None);
        assert_eq!(normalize_price("pozvati"), None);
    }

    #[test]
    fn clean_drops_unparseable_rows() {
        let listings = vec![listing(1, "100 KM"), listing(2, "Na upit"), listing(3, "120 KM")];
        let cleaned = clean(listings, DEFAULT_Z_THRESHOLD);
        let ids: Vec<u32> = cleaned.iter().map(|l| l.id).collect();
        assert!(!ids.contains(&2));
        assert_eq!(cleaned[0].price, Some(100.0));
    }

    #[test]
    fn clean_of_all_unparseable_is_empty_not_a_panic() {
        let listings = vec![listing(1, "Na upit"), listing(2, "???")];
        assert!(clean(listings, DEFAULT_Z_THRESHOLD).is_empty());
        assert!(clean(Vec::new(), DEFAULT_Z_THRESHOLD).is_empty());
    }

    #[test]
    fn iqr_filter_drops_extreme_outlier_only() {
        let listings = vec![
            priced(1, 100.0),
            priced(2, 110.0),
            priced(3, 105.0),
            priced(4, 95.0),
            priced(5, 10_000.0),
        ];
        let kept = quantile_bounds_cleaning(listings);
        let ids: Vec<u32> = kept.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn degenerate_inputs_are_kept_whole() {
        // single listing
        let one = vec![priced(1, 42.0)];
        assert_eq!(quantile_bounds_cleaning(one.clone()).len(), 1);
        assert_eq!(remove_z_score_outliers(one, 1.0).len(), 1);

        // identical prices: IQR = 0 and std dev = 0
        let flat: Vec<Listing> = (1..=4).map(|id| priced(id, 50.0)).collect();
        assert_eq!(quantile_bounds_cleaning(flat.clone()).len(), 4);
        assert_eq!(remove_z_score_outliers(flat, 1.0).len(), 4);
    }

    #[test]
    fn z_score_filter_respects_threshold() {
        let listings = vec![
            priced(1, 100.0),
            priced(2, 100.0),
            priced(3, 100.0),
            priced(4, 100.0),
            priced(5, 200.0),
        ];
        // at threshold 1.0 the 200 sits >1 std dev out
        let strict = remove_z_score_outliers(listings.clone(), 1.0);
        assert!(strict.iter().all(|l| l.id != 5));

        // a looser threshold keeps it
        let loose = remove_z_score_outliers(listings, 3.0);
        assert_eq!(loose.len(), 5);
    }

    #[test]
    fn filters_always_return_a_subset_and_never_panic() {
        let sequences: Vec<Vec<f64>> = vec![
            vec![1.0],
            vec![5.0, 5.0],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![0.0, 0.0, 1e9],
            (0..100).map(|i| i as f64 * 3.5).collect(),
        ];

        for prices in sequences {
            let listings: Vec<Listing> = prices
                .iter()
                .enumerate()
                .map(|(i, p)| priced(i as u32 + 1, *p))
                .collect();
            let input_ids: Vec<u32> = listings.iter().map(|l| l.id).collect();

            let out = remove_z_score_outliers(
                quantile_bounds_cleaning(listings),
                DEFAULT_Z_THRESHOLD,
            );
            assert!(out.iter().all(|l| input_ids.contains(&l.id)));
        }
    }
}
