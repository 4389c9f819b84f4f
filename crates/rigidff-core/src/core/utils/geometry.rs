use nalgebra::Vector3;

/// A deterministic unit vector perpendicular to `v`.
///
/// Crosses `v` with the coordinate axis it is least aligned with, so the
/// result is well conditioned for any nonzero input. The zero vector maps
/// to the x axis. Used as the fallback direction wherever a degenerate
/// configuration (colinear bend arms, zero torsion axis) leaves the true
/// direction undefined.
pub fn perpendicular_unit(v: &Vector3<f64>) -> Vector3<f64> {
    let ax = v.x.abs();
    let ay = v.y.abs();
    let az = v.z.abs();

    let axis = if ax <= ay && ax <= az {
        Vector3::x()
    } else if ay <= az {
        Vector3::y()
    } else {
        Vector3::z()
    };

    let p = v.cross(&axis);
    let n = p.norm();
    if n == 0.0 {
        Vector3::x()
    } else {
        p / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn result_is_unit_length_and_orthogonal() {
        for v in [
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(-4.0, 0.1, 0.0),
            Vector3::new(0.0, 0.0, 5.0),
            Vector3::new(1e-8, -1e8, 2.0),
        ] {
            let p = perpendicular_unit(&v);
            assert!((p.norm() - 1.0).abs() < TOLERANCE);
            assert!(p.dot(&v).abs() < TOLERANCE * v.norm());
        }
    }

    #[test]
    fn zero_vector_maps_to_x_axis() {
        assert_eq!(perpendicular_unit(&Vector3::zeros()), Vector3::x());
    }

    #[test]
    fn result_is_deterministic() {
        let v = Vector3::new(0.3, -0.7, 0.2);
        assert_eq!(perpendicular_unit(&v), perpendicular_unit(&v));
    }

    #[test]
    fn axis_aligned_inputs_avoid_the_parallel_axis() {
        let p = perpendicular_unit(&Vector3::x());
        assert!(p.dot(&Vector3::x()).abs() < TOLERANCE);
    }
}
