use crate::error::{ReplayError, ReplayResult};

/// Linear mapping between a domain interval and a pixel extent `[0, extent_px]`.
///
/// With `inverted` set, the domain start maps to the far edge (price axes grow
/// upwards while pixel Y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
    extent_px: f64,
    inverted: bool,
}

impl LinearScale {
    pub fn new(domain_start: f64, domain_end: f64, extent_px: f64) -> ReplayResult<Self> {
        if !domain_start.is_finite() || !domain_end.is_finite() || domain_start == domain_end {
            return Err(ReplayError::InvalidData(
                "scale domain must be finite and non-zero".to_owned(),
            ));
        }
        if !extent_px.is_finite() || extent_px <= 0.0 {
            return Err(ReplayError::InvalidData(
                "scale pixel extent must be finite and > 0".to_owned(),
            ));
        }

        Ok(Self {
            domain_start,
            domain_end,
            extent_px,
            inverted: false,
        })
    }

    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.inverted = !self.inverted;
        self
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    /// Domain units covered by one pixel.
    #[must_use]
    pub fn units_per_pixel(self) -> f64 {
        (self.domain_end - self.domain_start).abs() / self.extent_px
    }

    pub fn domain_to_pixel(self, value: f64) -> ReplayResult<f64> {
        if !value.is_finite() {
            return Err(ReplayError::InvalidData("value must be finite".to_owned()));
        }

        let span = self.domain_end - self.domain_start;
        let normalized = (value - self.domain_start) / span;
        let normalized = if self.inverted {
            1.0 - normalized
        } else {
            normalized
        };
        Ok(normalized * self.extent_px)
    }

    pub fn pixel_to_domain(self, pixel: f64) -> ReplayResult<f64> {
        if !pixel.is_finite() {
            return Err(ReplayError::InvalidData("pixel must be finite".to_owned()));
        }

        let normalized = pixel / self.extent_px;
        let normalized = if self.inverted {
            1.0 - normalized
        } else {
            normalized
        };
        let span = self.domain_end - self.domain_start;
        Ok(self.domain_start + normalized * span)
    }
}
