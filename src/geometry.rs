//! Pure geometric helpers for landmark math.
//!
//! Everything in this module is a stateless function of its arguments.
//! Numeric edge cases (zero-length vectors, missing depth) are defended
//! with fallback values here so callers never see NaN; a momentary
//! degenerate frame must not end a game the player is winning.

use crate::types::Landmark;

/// Distance below which a joint vector is treated as zero-length.
const DEGENERATE_VECTOR_EPS: f32 = 1e-4;

/// Euclidean distance between two landmarks.
///
/// Uses 3D distance when both landmarks carry depth, 2D otherwise.
pub fn distance(a: &Landmark, b: &Landmark) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    match (a.z, b.z) {
        (Some(za), Some(zb)) => {
            let dz = za - zb;
            (dx * dx + dy * dy + dz * dz).sqrt()
        }
        _ => (dx * dx + dy * dy).sqrt(),
    }
}

/// Interior angle at `vertex` formed by `p1` and `p3`, in degrees.
///
/// cos(θ) = (v1 · v2) / (|v1| × |v2|) with both vectors rooted at the
/// vertex. Returns 180° (a straight joint) when either vector is
/// degenerate, so a collapsed landmark pair reads as "not bent" instead
/// of producing NaN.
pub fn angle_between(p1: &Landmark, vertex: &Landmark, p3: &Landmark) -> f32 {
    let v1 = (p1.x - vertex.x, p1.y - vertex.y);
    let v2 = (p3.x - vertex.x, p3.y - vertex.y);

    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if mag1 < DEGENERATE_VECTOR_EPS || mag2 < DEGENERATE_VECTOR_EPS {
        return 180.0;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// True when horizontal drift between two samples is within `threshold`.
///
/// Used to confirm a hop actually landed in place rather than the player
/// sliding sideways through the detection window.
pub fn is_stable_landing(prev_x: f32, curr_x: f32, threshold: f32) -> bool {
    (curr_x - prev_x).abs() < threshold
}

/// Default horizontal drift tolerance for [`is_stable_landing`].
pub const STABLE_LANDING_THRESHOLD: f32 = 0.03;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_2d() {
        let a = Landmark::new(0.0, 0.0);
        let b = Landmark::new(0.3, 0.4);
        assert_relative_eq!(distance(&a, &b), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_3d_when_depth_present() {
        let a = Landmark::with_depth(0.0, 0.0, 0.0, 1.0);
        let b = Landmark::with_depth(0.0, 0.3, 0.4, 1.0);
        assert_relative_eq!(distance(&a, &b), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_falls_back_to_2d_on_partial_depth() {
        let a = Landmark::with_depth(0.0, 0.0, 5.0, 1.0);
        let b = Landmark::new(0.3, 0.4);
        // One missing z: depth must be ignored, not treated as zero.
        assert_relative_eq!(distance(&a, &b), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_straight_leg_angle() {
        let hip = Landmark::new(0.5, 0.4);
        let knee = Landmark::new(0.5, 0.6);
        let ankle = Landmark::new(0.5, 0.8);
        assert_relative_eq!(angle_between(&hip, &knee, &ankle), 180.0, epsilon = 1.0);
    }

    #[test]
    fn test_bent_leg_angle() {
        let hip = Landmark::new(0.5, 0.4);
        let knee = Landmark::new(0.5, 0.6);
        let ankle = Landmark::new(0.7, 0.6);
        assert_relative_eq!(angle_between(&hip, &knee, &ankle), 90.0, epsilon = 1.0);
    }

    #[test]
    fn test_degenerate_angle_is_straight() {
        let p = Landmark::new(0.5, 0.5);
        // Vertex coincides with an endpoint: zero-length vector.
        let angle = angle_between(&p, &p, &Landmark::new(0.6, 0.6));
        assert_eq!(angle, 180.0);
    }

    #[test]
    fn test_stable_landing() {
        assert!(is_stable_landing(0.50, 0.52, STABLE_LANDING_THRESHOLD));
        assert!(!is_stable_landing(0.50, 0.54, STABLE_LANDING_THRESHOLD));
        // Boundary is exclusive.
        assert!(!is_stable_landing(0.50, 0.53, STABLE_LANDING_THRESHOLD));
    }
}
