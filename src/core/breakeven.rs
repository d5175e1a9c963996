use super::types::YearSnapshot;

pub fn find_breakevens(rows: &[YearSnapshot]) -> Vec<f64> {
    let mut points = Vec::new();

    for pair in rows.windows(2) {
        let prev = pair[0].difference;
        let curr = pair[1].difference;

        // An exact tie sits on the boundary itself; the strict sign test
        // below then skips the pair.
        if prev == 0.0 {
            points.push(f64::from(pair[0].year));
        }

        if (prev < 0.0 && curr > 0.0) || (prev > 0.0 && curr < 0.0) {
            let y0 = f64::from(pair[0].year);
            let y1 = f64::from(pair[1].year);
            let t = prev.abs() / (prev.abs() + curr.abs());
            points.push(y0 + t * (y1 - y0));
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-9;

    fn row(year: u32, difference: f64) -> YearSnapshot {
        YearSnapshot::from_totals(year, difference, 0.0, 0.0, 0.0)
    }

    fn rows_from_diffs(diffs: &[f64]) -> Vec<YearSnapshot> {
        diffs
            .iter()
            .enumerate()
            .map(|(year, diff)| row(year as u32, *diff))
            .collect()
    }

    #[test]
    fn no_crossing_reports_nothing() {
        assert!(find_breakevens(&[]).is_empty());
        assert!(find_breakevens(&rows_from_diffs(&[-5.0])).is_empty());
        assert!(find_breakevens(&rows_from_diffs(&[-5.0, -3.0, -1.0])).is_empty());
        assert!(find_breakevens(&rows_from_diffs(&[4.0, 2.0, 1.0])).is_empty());
    }

    #[test]
    fn crossing_interpolates_by_relative_magnitude() {
        let points = find_breakevens(&rows_from_diffs(&[-100.0, 300.0]));
        assert_eq!(points.len(), 1);
        assert!((points[0] - 0.25).abs() <= EPS);

        let points = find_breakevens(&rows_from_diffs(&[50.0, -150.0]));
        assert_eq!(points.len(), 1);
        assert!((points[0] - 0.25).abs() <= EPS);
    }

    #[test]
    fn equal_magnitudes_cross_at_the_midpoint() {
        let points = find_breakevens(&rows_from_diffs(&[-10.0, -2.0, 2.0]));
        assert_eq!(points.len(), 1);
        assert!((points[0] - 1.5).abs() <= EPS);
    }

    #[test]
    fn exact_zero_is_reported_once_at_its_own_year() {
        let points = find_breakevens(&rows_from_diffs(&[5.0, 0.0, -5.0]));
        assert_eq!(points, vec![1.0]);
    }

    #[test]
    fn zero_at_the_first_year_is_reported() {
        let points = find_breakevens(&rows_from_diffs(&[0.0, 7.0]));
        assert_eq!(points, vec![0.0]);
    }

    #[test]
    fn zero_on_the_final_snapshot_is_not_reported() {
        // The scan inspects the earlier endpoint of each pair, so a tie on
        // the last snapshot has no pair that reports it.
        let points = find_breakevens(&rows_from_diffs(&[5.0, 0.0]));
        assert!(points.is_empty());
    }

    #[test]
    fn multiple_crossings_come_back_in_year_order() {
        let points = find_breakevens(&rows_from_diffs(&[-10.0, 10.0, -10.0, 10.0]));
        assert_eq!(points.len(), 3);
        assert!((points[0] - 0.5).abs() <= EPS);
        assert!((points[1] - 1.5).abs() <= EPS);
        assert!((points[2] - 2.5).abs() <= EPS);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_breakevens_are_sorted_and_stay_inside_the_horizon(
            diffs in proptest::collection::vec(-1e6f64..1e6, 2..40)
        ) {
            let rows = rows_from_diffs(&diffs);
            let points = find_breakevens(&rows);

            for pair in points.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }

            let horizon = (rows.len() - 1) as f64;
            for point in &points {
                prop_assert!(*point >= 0.0);
                prop_assert!(*point <= horizon);
            }
        }
    }
}
