use proptest::prelude::*;
use trade_replay::core::{Candle, CandleSeries, aggregate};

fn candles_from(moves: &[(f64, f64, f64)]) -> Vec<Candle> {
    let mut price = 1_000.0;
    moves
        .iter()
        .enumerate()
        .map(|(i, (drift, up, down))| {
            let open = price;
            let close = price + drift;
            price = close;
            let high = open.max(close) + up;
            let low = open.min(close) - down;
            Candle::new(i as i64 * 60, open, high, low, close).expect("valid generated candle")
        })
        .collect()
}

proptest! {
    #[test]
    fn aggregated_buckets_keep_ohlc_invariants(
        moves in prop::collection::vec((-5.0f64..5.0, 0.0f64..3.0, 0.0f64..3.0), 1..200),
        bars_per_bucket in 1i64..30
    ) {
        let candles = candles_from(&moves);
        let interval = bars_per_bucket * 60;
        let aggregated = aggregate(&candles, interval).expect("aggregate");

        let expected_buckets = (candles.len() as i64 + bars_per_bucket - 1) / bars_per_bucket;
        prop_assert_eq!(aggregated.len() as i64, expected_buckets);

        for bucket in aggregated.iter() {
            prop_assert!(bucket.is_valid());
            prop_assert_eq!(bucket.time % interval, 0);
            let members: Vec<&Candle> = candles
                .iter()
                .filter(|c| c.time >= bucket.time && c.time < bucket.time + interval)
                .collect();
            let max_high = members.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            let min_low = members.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            prop_assert!((bucket.high - max_high).abs() <= 1e-9);
            prop_assert!((bucket.low - min_low).abs() <= 1e-9);
            prop_assert!((bucket.open - members[0].open).abs() <= 1e-9);
            prop_assert!((bucket.close - members[members.len() - 1].close).abs() <= 1e-9);
        }
    }

    #[test]
    fn aggregating_at_native_interval_is_identity(
        moves in prop::collection::vec((-5.0f64..5.0, 0.0f64..3.0, 0.0f64..3.0), 1..100)
    ) {
        let candles = candles_from(&moves);
        let aggregated = aggregate(&candles, 60).expect("aggregate");
        let original = CandleSeries::from_sorted(candles).expect("sorted series");
        prop_assert_eq!(aggregated, original);
    }
}
