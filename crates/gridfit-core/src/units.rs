//! Unit newtypes for the quantities stored in the network model.
//!
//! Network data is entered in engineering units (MW, Mvar, MVA, kV) and the
//! solver works in per-unit on the system MVA base. The wrappers keep the two
//! apart: records store `Megawatts`, the hot loops only ever see plain `f64`
//! per-unit values produced by [`Megawatts::to_per_unit`] and friends.
//!
//! ```
//! use gridfit_core::units::{Megawatts, Megavars};
//!
//! let p = Megawatts(100.0);
//! assert_eq!(p.to_per_unit(100.0), 1.0);
//!
//! // Different units do not mix:
//! // let wrong = p + Megavars(5.0);
//! let q = Megavars(50.0);
//! assert_eq!(q.to_per_unit(100.0), 0.5);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Declares a transparent `f64` newtype with arithmetic on itself.
macro_rules! unit {
    ($(#[$meta:meta])* $name:ident, $symbol:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub f64);

        impl $name {
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $symbol)
            }
        }
    };
}

/// Per-unit conversion on the system MVA base.
macro_rules! on_mva_base {
    ($name:ident) => {
        impl $name {
            #[inline]
            pub fn to_per_unit(self, base_mva: f64) -> f64 {
                self.0 / base_mva
            }
        }
    };
}

unit!(
    /// Active power (MW)
    Megawatts,
    "MW"
);
unit!(
    /// Reactive power (Mvar)
    Megavars,
    "Mvar"
);
unit!(
    /// Apparent power (MVA); thermal ratings
    MegavoltAmperes,
    "MVA"
);
unit!(
    /// Voltage magnitude (pu)
    PerUnit,
    "pu"
);
unit!(
    /// Nominal voltage (kV)
    Kilovolts,
    "kV"
);
unit!(
    /// Voltage angle (rad)
    Radians,
    "rad"
);

on_mva_base!(Megawatts);
on_mva_base!(Megavars);
on_mva_base!(MegavoltAmperes);

impl PerUnit {
    pub const ONE: Self = Self(1.0);
}

impl Radians {
    pub const ZERO: Self = Self(0.0);
}
