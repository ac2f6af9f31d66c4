//! Distance-decay kernels
//!
//! Pure `distance -> weight` functions used by every decayed evaluator:
//! - Inverse: `1 / (d + eps)^power`
//! - Exponential: `exp(-d / scale)`
//! - Linear cutoff: `max(0, 1 - d / radius)`
//!
//! All kernels are total on `d >= 0`, non-increasing and non-negative.

use heatgis_core::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Named numeric kernel parameters (`eps`, `power`, `scale`, `radius`)
pub type DecayParams = BTreeMap<String, f64>;

const MIN_LENGTH: f64 = 1e-9;

/// Distance-decay kernel with resolved parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecayKernel {
    Inverse { eps: f64, power: f64 },
    Exponential { scale: f64 },
    LinearCutoff { radius: f64 },
}

impl Default for DecayKernel {
    fn default() -> Self {
        DecayKernel::Exponential { scale: 1000.0 }
    }
}

impl DecayKernel {
    /// Resolve a kernel from its name and parameter map.
    ///
    /// Unrecognized names fall back to exponential. Parameters the kernel
    /// does not use are ignored.
    pub fn from_name(name: &str, params: &DecayParams) -> Result<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "inverse" => "inverse",
            "exp" | "exponential" => "exp",
            "linear" | "linear_cutoff" => "linear",
            other => {
                warn!("Unknown decay kernel '{}', falling back to exponential", other);
                "exp"
            }
        };

        let known: &[&str] = match kind {
            "inverse" => &["eps", "power"],
            "exp" => &["scale"],
            _ => &["radius"],
        };
        for key in params.keys().filter(|k| !known.contains(&k.as_str())) {
            warn!("Decay parameter '{}' is not used by the {} kernel", key, kind);
        }

        let kernel = match kind {
            "inverse" => {
                let eps = params.get("eps").copied().unwrap_or(1.0);
                let power = params.get("power").copied().unwrap_or(1.0);
                if !(eps.is_finite() && eps > 0.0) {
                    return Err(Error::invalid_parameter("eps", eps, "must be finite and > 0"));
                }
                if !(power.is_finite() && power >= 0.0) {
                    return Err(Error::invalid_parameter("power", power, "must be finite and >= 0"));
                }
                DecayKernel::Inverse { eps, power }
            }
            "exp" => DecayKernel::Exponential {
                scale: length_param(params, "scale")?,
            },
            _ => DecayKernel::LinearCutoff {
                radius: length_param(params, "radius")?,
            },
        };
        Ok(kernel)
    }

    /// Weight at distance `d` (metres in the metric CRS).
    #[inline]
    pub fn weight(&self, d: f64) -> f64 {
        let d = d.max(0.0);
        match *self {
            DecayKernel::Inverse { eps, power } => 1.0 / (d + eps).powf(power),
            DecayKernel::Exponential { scale } => (-d / scale).exp(),
            DecayKernel::LinearCutoff { radius } => (1.0 - d / radius).max(0.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DecayKernel::Inverse { .. } => "inverse",
            DecayKernel::Exponential { .. } => "exp",
            DecayKernel::LinearCutoff { .. } => "linear",
        }
    }
}

impl fmt::Display for DecayKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecayKernel::Inverse { eps, power } => write!(f, "inverse(eps={eps}, power={power})"),
            DecayKernel::Exponential { scale } => write!(f, "exp(scale={scale})"),
            DecayKernel::LinearCutoff { radius } => write!(f, "linear(radius={radius})"),
        }
    }
}

/// `scale`/`radius`: default 1000, clamped to at least 1e-9.
fn length_param(params: &DecayParams, name: &'static str) -> Result<f64> {
    let v = params.get(name).copied().unwrap_or(1000.0);
    if v.is_nan() {
        return Err(Error::invalid_parameter(name, v, "must be a number"));
    }
    Ok(v.max(MIN_LENGTH))
}
