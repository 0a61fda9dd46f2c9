pub mod candle;
pub mod primitives;
pub mod scale;
pub mod series;
pub mod store;
pub mod timeframe;
pub mod types;

pub use candle::Candle;
pub use scale::LinearScale;
pub use series::{CandleSeries, MergeStats, nearest_index};
pub use store::CandleStore;
pub use timeframe::{Timeframe, aggregate, aggregate_to, bucket_start};
pub use types::{
    ChartGeometry, DomainPoint, PaneSize, PixelPoint, PriceRange, UnixSeconds, Viewport,
};
