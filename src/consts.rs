//! Physical constants in SI units.
use crate::Float;

/// speed of light [m/s]
pub const C: Float = 299_792_458.0;
/// elementary charge [C]
pub const Q_E: Float = 1.602_176_634e-19;
/// electron mass [kg]
pub const M_E: Float = 9.109_383_7015e-31;
