//! Speed unit conversions

/// km/h per m/s
pub const KMH_PER_MPS: f64 = 3.6;

/// Convert km/h to m/s
#[inline]
pub fn kmh_to_mps(kmh: f64) -> f64 {
    kmh / KMH_PER_MPS
}

/// Convert m/s to km/h
#[inline]
pub fn mps_to_kmh(mps: f64) -> f64 {
    mps * KMH_PER_MPS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert!((kmh_to_mps(36.0) - 10.0).abs() < 1e-12);
        assert!((mps_to_kmh(25.0) - 90.0).abs() < 1e-12);
        assert!((mps_to_kmh(kmh_to_mps(123.4)) - 123.4).abs() < 1e-9);
    }
}
