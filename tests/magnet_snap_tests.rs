use proptest::prelude::*;
use trade_replay::core::{Candle, CandleSeries, DomainPoint};
use trade_replay::interaction::{CoordinateMapper, MagnetConfig, closest_ohlc, snap_to_candle};

fn series() -> CandleSeries {
    CandleSeries::from_sorted(vec![
        Candle::new(0, 100.0, 110.0, 95.0, 105.0).expect("candle"),
        Candle::new(60, 105.0, 112.0, 101.0, 102.0).expect("candle"),
        Candle::new(120, 102.0, 104.0, 90.0, 91.0).expect("candle"),
    ])
    .expect("series")
}

fn enabled(threshold_bars: f64) -> CoordinateMapper {
    CoordinateMapper::new(MagnetConfig {
        enabled: true,
        threshold_bars,
    })
}

#[test]
fn snaps_to_nearest_candle_and_closest_ohlc_value() {
    let snapped = enabled(1.0).snap(DomainPoint::new(70, 111.0), series().as_slice(), 60);
    assert_eq!(snapped, DomainPoint::new(60, 112.0));
}

#[test]
fn disabled_magnet_returns_raw_point() {
    let raw = DomainPoint::new(70, 111.0);
    let mapper = CoordinateMapper::default();
    assert_eq!(mapper.snap(raw, series().as_slice(), 60), raw);
}

#[test]
fn equidistant_ohlc_values_prefer_open_then_high() {
    let candle = Candle::new(0, 100.0, 110.0, 90.0, 100.0).expect("candle");
    assert!((closest_ohlc(&candle, 105.0) - 100.0).abs() <= 1e-9);

    let candle = Candle::new(0, 95.0, 110.0, 90.0, 100.0).expect("candle");
    assert!((closest_ohlc(&candle, 100.0) - 100.0).abs() <= 1e-9);
}

#[test]
fn threshold_is_inclusive_and_scales_with_timeframe() {
    let series = series();
    let at_edge = DomainPoint::new(-60, 100.0);
    assert!(snap_to_candle(at_edge, series.as_slice(), 60.0).is_some());
    assert!(snap_to_candle(DomainPoint::new(-61, 100.0), series.as_slice(), 60.0).is_none());

    let far = DomainPoint::new(-300, 100.0);
    let mapper = enabled(1.0);
    assert_eq!(mapper.snap(far, series.as_slice(), 60), far);
    assert_eq!(mapper.snap(far, series.as_slice(), 300).time, 0);
}

#[test]
fn empty_series_never_snaps() {
    let raw = DomainPoint::new(10, 1.0);
    assert_eq!(enabled(5.0).snap(raw, &[], 60), raw);
}

proptest! {
    #[test]
    fn snapped_price_is_one_of_the_candle_ohlc_values(
        time in -100i64..300,
        price in 50.0f64..150.0
    ) {
        let series = series();
        let snapped = enabled(10.0).snap(DomainPoint::new(time, price), series.as_slice(), 60);
        let candle = series
            .iter()
            .find(|candle| candle.time == snapped.time)
            .expect("snapped onto an existing candle");
        prop_assert!(candle.ohlc().contains(&snapped.price));
    }
}

#[test]
fn snapping_against_a_replay_prefix_ignores_later_candles() {
    let series = series();
    let visible = &series.as_slice()[..2];
    let snapped = enabled(1.0).snap(DomainPoint::new(115, 103.0), visible, 60);
    assert_eq!(snapped, DomainPoint::new(60, 102.0));
}
