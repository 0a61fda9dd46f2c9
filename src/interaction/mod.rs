mod mapper;
mod pointer;

pub use mapper::{
    CoordinateMapper, MagnetConfig, PaneTransform, closest_ohlc, domain_to_pixel,
    pixel_to_domain, snap_to_candle,
};
pub use pointer::{Key, KeyCommand, Modifiers, PointerPhase, resolve_key_command};
