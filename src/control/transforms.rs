// Rotating-frame transforms shared by the rectifier, inverter and PLL
// Amplitude-invariant abc <-> dq with the q axis lagging d by 90°

use core::f32::consts::{PI, TAU};
use libm::{cosf, sinf};

// Enable idsp-based fast trigonometric functions
const USE_IDSP_COSSIN: bool = true;

/// Phase displacement between the three phases (2π/3)
pub const PHASE_OFFSET: f32 = TAU / 3.0;

const SQRT3_DIV_2: f32 = 0.866_025_4; // sqrt(3) / 2
const TWO_THIRDS: f32 = 2.0 / 3.0;

/// Three-phase quantity in the stationary frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Abc {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl Abc {
    pub const fn new(a: f32, b: f32, c: f32) -> Self {
        Self { a, b, c }
    }
}

/// Quantity in the rotating frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dq {
    pub d: f32,
    pub q: f32,
}

impl Dq {
    pub const fn new(d: f32, q: f32) -> Self {
        Self { d, q }
    }
}

/// sin/cos of `theta` and of `theta ∓ 2π/3`
///
/// One trigonometric evaluation per transform; the shifted phases follow from
/// the angle-sum identities.
#[derive(Debug, Clone, Copy)]
pub struct PhaseAngles {
    /// cos(θ), cos(θ − 2π/3), cos(θ + 2π/3)
    pub cos: [f32; 3],
    /// sin(θ), sin(θ − 2π/3), sin(θ + 2π/3)
    pub sin: [f32; 3],
}

impl PhaseAngles {
    pub fn new(theta: f32) -> Self {
        let (sin, cos) = sin_cos(theta);
        let half_cos = -0.5 * cos;
        let half_sin = -0.5 * sin;
        let r_cos = SQRT3_DIV_2 * cos;
        let r_sin = SQRT3_DIV_2 * sin;
        Self {
            cos: [cos, half_cos + r_sin, half_cos - r_sin],
            sin: [sin, half_sin - r_cos, half_sin + r_cos],
        }
    }
}

/// sin and cos of an angle in [-2π, 2π]
pub fn sin_cos(theta: f32) -> (f32, f32) {
    if USE_IDSP_COSSIN {
        sin_cos_idsp(theta)
    } else {
        (sinf(theta), cosf(theta))
    }
}

/// sin/cos using idsp::cossin() (fast, ~40 cycles on Cortex-M)
#[inline]
fn sin_cos_idsp(theta: f32) -> (f32, f32) {
    // idsp phase format spans [-π, π) over the full i32 range
    let mut normalized = theta;
    if normalized >= PI {
        normalized -= TAU;
    } else if normalized < -PI {
        normalized += TAU;
    }

    const SCALE: f32 = 2147483648.0 / PI; // 2^31 / π
    let phase: i32 = (normalized * SCALE) as i32;

    let (cos_i32, sin_i32) = idsp::cossin(phase);

    const I32_TO_F32: f32 = 1.0 / 2147483648.0; // 1 / 2^31
    (sin_i32 as f32 * I32_TO_F32, cos_i32 as f32 * I32_TO_F32)
}

/// abc → dq (Park transform including the Clarke step)
///
/// `d = 2/3 (a cos θ + b cos(θ−2π/3) + c cos(θ+2π/3))`,
/// `q = −2/3 (a sin θ + b sin(θ−2π/3) + c sin(θ+2π/3))`
pub fn abc_to_dq(x: Abc, angles: &PhaseAngles) -> Dq {
    let [c0, c1, c2] = angles.cos;
    let [s0, s1, s2] = angles.sin;
    Dq {
        d: TWO_THIRDS * (x.a * c0 + x.b * c1 + x.c * c2),
        q: -TWO_THIRDS * (x.a * s0 + x.b * s1 + x.c * s2),
    }
}

/// dq → abc
///
/// `x_k = d cos(θ + off_k) − q sin(θ + off_k)` for off = 0, −2π/3, +2π/3
pub fn dq_to_abc(x: Dq, angles: &PhaseAngles) -> Abc {
    let [c0, c1, c2] = angles.cos;
    let [s0, s1, s2] = angles.sin;
    Abc {
        a: x.d * c0 - x.q * s0,
        b: x.d * c1 - x.q * s1,
        c: x.d * c2 - x.q * s2,
    }
}

/// Advance an accumulator angle, wrapping once into [0, 2π)
///
/// The step per tick is far below 2π, so a single correction keeps the
/// result in range. A negative step (reverse phase sequence) wraps at zero.
#[inline]
pub fn advance_angle(theta: f32, step: f32) -> f32 {
    let next = theta + step;
    if next >= TAU {
        next - TAU
    } else if next < 0.0 {
        // a tiny negative angle rounds up to exactly 2π
        let wrapped = next + TAU;
        if wrapped >= TAU {
            0.0
        } else {
            wrapped
        }
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_phase_angles_match_direct_evaluation() {
        for i in 0..64 {
            let theta = i as f32 * TAU / 64.0;
            let angles = PhaseAngles::new(theta);
            assert!(approx_eq(angles.cos[1], cosf(theta - PHASE_OFFSET)));
            assert!(approx_eq(angles.cos[2], cosf(theta + PHASE_OFFSET)));
            assert!(approx_eq(angles.sin[1], sinf(theta - PHASE_OFFSET)));
            assert!(approx_eq(angles.sin[2], sinf(theta + PHASE_OFFSET)));
        }
    }

    #[test]
    fn test_balanced_set_aligned_with_d_axis() {
        // v_k = V cos(φ − k·2π/3) projects onto d = V at θ = φ
        let phi = 1.1;
        let v = 170.0;
        let x = Abc::new(
            v * cosf(phi),
            v * cosf(phi - PHASE_OFFSET),
            v * cosf(phi + PHASE_OFFSET),
        );
        let dq = abc_to_dq(x, &PhaseAngles::new(phi));
        assert!((dq.d - v).abs() < 0.01);
        assert!(dq.q.abs() < 0.01);
    }

    #[test]
    fn test_leading_grid_gives_positive_q() {
        // Grid ahead of the frame by δ: q = V sin δ
        let v = 100.0;
        let delta = 0.2;
        let x = Abc::new(
            v * cosf(delta),
            v * cosf(delta - PHASE_OFFSET),
            v * cosf(delta + PHASE_OFFSET),
        );
        let dq = abc_to_dq(x, &PhaseAngles::new(0.0));
        assert!((dq.q - v * sinf(delta)).abs() < 0.01);
    }

    #[test]
    fn test_dq_to_abc_is_balanced() {
        let abc = dq_to_abc(Dq::new(3.0, -2.0), &PhaseAngles::new(4.0));
        assert!(approx_eq(abc.a + abc.b + abc.c, 0.0));
    }

    #[test]
    fn test_dq_to_abc_zero_angle() {
        let abc = dq_to_abc(Dq::new(1.0, 0.0), &PhaseAngles::new(0.0));
        assert!(approx_eq(abc.a, 1.0));
        assert!(approx_eq(abc.b, -0.5));
        assert!(approx_eq(abc.c, -0.5));
    }

    #[test]
    fn test_advance_angle_wraps_at_tau() {
        assert!(approx_eq(advance_angle(1.0, 0.5), 1.5));
        let wrapped = advance_angle(TAU - 0.01, 0.03);
        assert!(approx_eq(wrapped, 0.02));
        assert!(wrapped >= 0.0 && wrapped < TAU);

        let reversed = advance_angle(0.01, -0.03);
        assert!(approx_eq(reversed, TAU - 0.02));
    }

    #[test]
    fn test_sin_cos_at_wrap_boundaries() {
        for theta in [0.0, PI - 1e-4, PI, -PI, 1.5 * PI, TAU - 1e-4, -TAU + 0.5] {
            let (s, c) = sin_cos(theta);
            assert!(approx_eq(s, sinf(theta)));
            assert!(approx_eq(c, cosf(theta)));
        }
    }
}
