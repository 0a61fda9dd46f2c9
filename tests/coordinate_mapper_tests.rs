use approx::assert_relative_eq;
use trade_replay::core::{ChartGeometry, DomainPoint, PaneSize, PixelPoint, PriceRange, Viewport};
use trade_replay::interaction::{PaneTransform, domain_to_pixel, pixel_to_domain};

fn geometry() -> ChartGeometry {
    ChartGeometry::new(PaneSize::new(600, 400), PriceRange::new(0.0, 400.0))
}

fn viewport() -> Viewport {
    Viewport::new(0, 6_000)
}

#[test]
fn pixel_decodes_with_inverted_price_axis() {
    let point = pixel_to_domain(300.0, 100.0, viewport(), geometry()).expect("inside pane");
    assert_eq!(point.time, 3_000);
    assert_relative_eq!(point.price, 300.0, epsilon = 1e-9);

    let top_left = pixel_to_domain(0.0, 0.0, viewport(), geometry()).expect("corner");
    assert_eq!(top_left.time, 0);
    assert_relative_eq!(top_left.price, 400.0, epsilon = 1e-9);
}

#[test]
fn decoded_time_is_rounded_to_whole_seconds() {
    let point = pixel_to_domain(0.26, 200.0, viewport(), geometry()).expect("inside pane");
    assert_eq!(point.time, 3);
}

#[test]
fn domain_round_trip_stays_within_a_pixel() {
    let original = DomainPoint::new(4_321, 123.5);
    let pixel = domain_to_pixel(original, viewport(), geometry()).expect("encode");
    let decoded = pixel_to_domain(pixel.x, pixel.y, viewport(), geometry()).expect("decode");

    assert!((decoded.time - original.time).abs() <= 10);
    assert_relative_eq!(decoded.price, original.price, epsilon = 1e-6);
}

#[test]
fn positions_outside_the_pane_are_rejected() {
    for (x, y) in [(-1.0, 10.0), (601.0, 10.0), (10.0, -0.5), (10.0, 400.5)] {
        assert!(pixel_to_domain(x, y, viewport(), geometry()).is_none());
    }
    assert!(pixel_to_domain(f64::NAN, 10.0, viewport(), geometry()).is_none());
}

#[test]
fn unlaid_out_or_degenerate_panes_decode_nothing() {
    let unsized_pane = ChartGeometry::new(PaneSize::new(0, 0), PriceRange::new(0.0, 400.0));
    assert!(pixel_to_domain(0.0, 0.0, viewport(), unsized_pane).is_none());

    let flat_prices = ChartGeometry::new(PaneSize::new(600, 400), PriceRange::new(5.0, 5.0));
    assert!(pixel_to_domain(10.0, 10.0, viewport(), flat_prices).is_none());

    let empty_window = PaneTransform::new(Viewport::new(100, 100), geometry());
    assert!(!empty_window.is_decodable());
    assert!(empty_window.pixel_to_domain(PixelPoint::new(1.0, 1.0)).is_none());
}

#[test]
fn seconds_per_pixel_follows_viewport_span() {
    let transform = PaneTransform::new(viewport(), geometry());
    assert_relative_eq!(transform.seconds_per_pixel().expect("laid out"), 10.0);
    assert_relative_eq!(transform.price_to_y(400.0).expect("price"), 0.0);
    assert_relative_eq!(transform.y_to_price(400.0).expect("y"), 0.0);
}
