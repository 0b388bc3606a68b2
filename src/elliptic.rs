//! Complete and incomplete elliptic integrals.
//!
//! Parameter convention is m = k² throughout. Complete integrals use the
//! arithmetic-geometric mean; incomplete ones reduce to Carlson's symmetric
//! forms R_F and R_D.

use crate::error::{FieldError, Result};
use std::f64::consts::{FRAC_PI_2, PI};

const AGM_TOLERANCE: f64 = 1e-15;
const CARLSON_TOLERANCE: f64 = 1e-10;
const MAX_ITERATIONS: usize = 100;
const ANGLE_EPSILON: f64 = 1e-10;

fn check_parameter(function: &'static str, m: f64) -> Result<()> {
    if (0.0..=1.0).contains(&m) {
        Ok(())
    } else {
        Err(FieldError::Domain {
            function,
            parameter: m,
        })
    }
}

// MARK: AGM
/// K(m) and E(m) from one AGM pass. Caller guarantees 0 <= m < 1.
pub(crate) fn complete_pair(m: f64) -> (f64, f64) {
    let mut a = 1.0;
    let mut g = (1.0 - m).sqrt();
    let mut sum = 0.0;
    let mut weight = 1.0;

    for _ in 0..MAX_ITERATIONS {
        if (a - g).abs() < AGM_TOLERANCE {
            break;
        }
        let c = (a - g) / 2.0;
        let next_a = (a + g) / 2.0;
        g = (a * g).sqrt();
        a = next_a;
        sum += weight * c * c;
        weight *= 2.0;
    }

    let k = PI / (2.0 * a);
    (k, k * (1.0 - 0.5 * m - sum))
}

/// Unchecked K(m) for internal callers that already clamp m.
pub(crate) fn ellipk(m: f64) -> f64 {
    if m >= 1.0 {
        return f64::INFINITY;
    }
    complete_pair(m).0
}

/// Unchecked E(m) for internal callers that already clamp m.
pub(crate) fn ellipe(m: f64) -> f64 {
    if m >= 1.0 {
        return 1.0;
    }
    complete_pair(m).1
}

/// Complete elliptic integral of the first kind K(m).
///
/// Returns +inf at m = 1 and a domain error outside [0, 1].
pub fn complete_k(m: f64) -> Result<f64> {
    check_parameter("complete_k", m)?;
    Ok(ellipk(m))
}

/// Complete elliptic integral of the second kind E(m). E(1) = 1.
pub fn complete_e(m: f64) -> Result<f64> {
    check_parameter("complete_e", m)?;
    Ok(ellipe(m))
}

// MARK: Carlson forms
/// Carlson's symmetric integral R_F(x, y, z) by the duplication theorem.
pub fn carlson_rf(x: f64, y: f64, z: f64) -> f64 {
    let (mut x, mut y, mut z) = (x, y, z);
    let mut mean = (x + y + z) / 3.0;

    for _ in 0..MAX_ITERATIONS {
        let lambda = (x * y).sqrt() + (y * z).sqrt() + (z * x).sqrt();
        x = (x + lambda) / 4.0;
        y = (y + lambda) / 4.0;
        z = (z + lambda) / 4.0;
        mean = (mean + lambda) / 4.0;

        let dx = 1.0 - x / mean;
        let dy = 1.0 - y / mean;
        let dz = 1.0 - z / mean;

        if dx.abs().max(dy.abs()).max(dz.abs()) < CARLSON_TOLERANCE {
            let e2 = dx * dy + dy * dz + dz * dx;
            let e3 = dx * dy * dz;
            return (1.0 - e2 / 10.0 + e3 / 14.0 + e2 * e2 / 24.0 - 3.0 * e2 * e3 / 44.0)
                / mean.sqrt();
        }
    }

    1.0 / mean.sqrt()
}

/// Carlson's symmetric integral of the second kind R_D(x, y, z).
pub fn carlson_rd(x: f64, y: f64, z: f64) -> f64 {
    let (mut x, mut y, mut z) = (x, y, z);
    let mut mean = (x + y + 3.0 * z) / 5.0;
    let mut sum = 0.0;
    let mut factor = 1.0;

    for _ in 0..MAX_ITERATIONS {
        let (sx, sy, sz) = (x.sqrt(), y.sqrt(), z.sqrt());
        let lambda = sx * sy + sy * sz + sz * sx;

        sum += factor / (sz * (z + lambda));
        factor /= 4.0;

        x = (x + lambda) / 4.0;
        y = (y + lambda) / 4.0;
        z = (z + lambda) / 4.0;
        mean = (mean + lambda) / 4.0;

        let dx = 1.0 - x / mean;
        let dy = 1.0 - y / mean;
        let dz = 1.0 - z / mean;

        if dx.abs().max(dy.abs()).max(dz.abs()) < CARLSON_TOLERANCE {
            // Series in the elementary symmetric functions of (dx, dy, dz)
            let ea = dx * dy;
            let eb = dz * dz;
            let ec = ea - eb;
            let ed = ea - 6.0 * eb;
            let ee = ed + ec + ec;
            let c1 = 3.0 / 14.0;
            let c2 = 1.0 / 6.0;
            let c3 = 9.0 / 22.0;
            let c4 = 3.0 / 26.0;
            let series = 1.0
                + ed * (-c1 + 0.25 * c3 * ed - 1.5 * c4 * dz * ee)
                + dz * (c2 * ee + dz * (-c3 * ec + dz * c4 * ea));
            return 3.0 * sum + factor * series / (mean * mean.sqrt());
        }
    }

    3.0 * sum + factor / (mean * mean.sqrt())
}

// MARK: Incomplete integrals
fn incomplete_f_raw(phi: f64, m: f64) -> f64 {
    if phi.abs() < ANGLE_EPSILON {
        return 0.0;
    }
    let (s, c) = phi.sin_cos();
    if c.abs() < ANGLE_EPSILON {
        return ellipk(m);
    }
    s * carlson_rf(c * c, 1.0 - m * s * s, 1.0)
}

fn incomplete_e_raw(phi: f64, m: f64) -> f64 {
    if phi.abs() < ANGLE_EPSILON {
        return 0.0;
    }
    let (s, c) = phi.sin_cos();
    if c.abs() < ANGLE_EPSILON {
        return ellipe(m);
    }
    let x = c * c;
    let y = 1.0 - m * s * s;
    s * (carlson_rf(x, y, 1.0) - (m * s * s / 3.0) * carlson_rd(x, y, 1.0))
}

/// Incomplete elliptic integral of the first kind F(φ | m).
pub fn incomplete_f(phi: f64, m: f64) -> Result<f64> {
    check_parameter("incomplete_f", m)?;
    Ok(incomplete_f_raw(phi, m))
}

/// Incomplete elliptic integral of the second kind E(φ | m).
pub fn incomplete_e(phi: f64, m: f64) -> Result<f64> {
    check_parameter("incomplete_e", m)?;
    Ok(incomplete_e_raw(phi, m))
}

// MARK: Heuman Lambda
/// Heuman's Lambda function Λ₀(φ, k), with k clamped into [0, 1].
pub fn heuman_lambda(phi: f64, k: f64) -> f64 {
    let k = k.clamp(0.0, 1.0);
    let m = k * k;
    let m_complement = 1.0 - m;

    let (big_k, big_e) = if m < 1.0 {
        complete_pair(m)
    } else {
        (f64::INFINITY, 1.0)
    };
    if big_k.is_infinite() {
        // Λ₀(φ, 1) = 2φ/π
        return phi / FRAC_PI_2;
    }

    // k' rounds to 1 for tiny k: F(φ | 1) diverges, use Λ₀(φ, 0) = sin φ
    if m_complement >= 1.0 {
        return phi.sin();
    }
    let f_phi = incomplete_f_raw(phi, m_complement);
    if !f_phi.is_finite() {
        return phi.sin();
    }
    let e_phi = incomplete_e_raw(phi, m_complement);

    (2.0 / PI) * (big_e * f_phi + big_k * e_phi - big_k * f_phi)
}
