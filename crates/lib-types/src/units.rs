//! Physical units with type safety.
//!
//! These newtypes provide compile-time unit checking to prevent
//! mixing incompatible quantities (e.g., adding Hertz to Seconds).

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Time duration in seconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Seconds(pub f64);

impl Seconds {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_us(us: f64) -> Self {
        Self(us * 1e-6)
    }

    #[inline]
    pub fn from_ms(ms: f64) -> Self {
        Self(ms * 1e-3)
    }

    #[inline]
    pub fn as_us(&self) -> f64 {
        self.0 * 1e6
    }

    #[inline]
    pub fn as_ms(&self) -> f64 {
        self.0 * 1e3
    }

    /// Convert to frequency (reciprocal).
    #[inline]
    pub fn to_frequency(&self) -> Hertz {
        Hertz(1.0 / self.0)
    }
}

impl Add for Seconds {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Seconds {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Seconds {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for Seconds {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self(self.0 / rhs)
    }
}

impl Div<Seconds> for Seconds {
    type Output = f64;
    fn div(self, rhs: Seconds) -> f64 {
        self.0 / rhs.0
    }
}

/// Frequency in Hertz.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Hertz(pub f64);

impl Hertz {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_khz(khz: f64) -> Self {
        Self(khz * 1e3)
    }

    #[inline]
    pub fn from_mhz(mhz: f64) -> Self {
        Self(mhz * 1e6)
    }

    #[inline]
    pub fn as_khz(&self) -> f64 {
        self.0 * 1e-3
    }

    #[inline]
    pub fn as_mhz(&self) -> f64 {
        self.0 * 1e-6
    }

    /// Convert to period (reciprocal).
    #[inline]
    pub fn to_period(&self) -> Seconds {
        Seconds(1.0 / self.0)
    }

    /// Angular frequency (omega = 2 * pi * f).
    #[inline]
    pub fn angular(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.0
    }
}

impl Add for Hertz {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Hertz {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Hertz {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for Hertz {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self(self.0 / rhs)
    }
}

impl Div<Hertz> for Hertz {
    type Output = f64;
    fn div(self, rhs: Hertz) -> f64 {
        self.0 / rhs.0
    }
}

/// Voltage in Volts.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Volts(pub f64);

impl Volts {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_mv(mv: f64) -> Self {
        Self(mv * 1e-3)
    }

    #[inline]
    pub fn as_mv(&self) -> f64 {
        self.0 * 1e3
    }
}

impl Add for Volts {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Volts {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Volts {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for Volts {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self(self.0 / rhs)
    }
}

/// Resistance/impedance magnitude in Ohms.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Ohms(pub f64);

impl Ohms {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_kohm(kohm: f64) -> Self {
        Self(kohm * 1e3)
    }

    #[inline]
    pub fn as_kohm(&self) -> f64 {
        self.0 * 1e-3
    }
}

impl Add for Ohms {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Ohms {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Ohms {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_period_reciprocal() {
        let freq = Hertz::from_khz(1.0);
        let period = freq.to_period();

        assert!((period.as_ms() - 1.0).abs() < 1e-12);
        assert!((period.to_frequency().0 - freq.0).abs() < 1e-9);
    }

    #[test]
    fn test_angular_frequency() {
        let freq = Hertz(1000.0);

        // omega = 2*pi*1000
        assert!((freq.angular() - 6283.185307179586).abs() < 1e-9);
    }

    #[test]
    fn test_frequency_ratio() {
        let start = Hertz(10.0);
        let end = Hertz::from_khz(10.0);

        assert!((end / start - 1000.0).abs() < 1e-12);
    }

    #[test]
    fn test_settle_delay_arithmetic() {
        let pre = Seconds::from_ms(50.0);
        let post = Seconds::from_ms(30.0);

        assert!(((pre + post).as_ms() - 80.0).abs() < 1e-12);
        assert!((Seconds::from_us(1000.0).as_ms() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_constructors() {
        assert!((Hertz::from_mhz(62.5).0 - 62.5e6).abs() < 1e-3);
        assert!((Volts::from_mv(500.0).0 - 0.5).abs() < 1e-12);
        assert!((Ohms::from_kohm(1.0).0 - 1000.0).abs() < 1e-9);
    }
}
