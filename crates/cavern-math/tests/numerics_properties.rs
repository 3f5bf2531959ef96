//! Property tests for grids, interpolation, root finding and polynomial fits.

use cavern_math::prelude::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn linspace_spans_bounds(lo in -1e4f64..1e4, width in 0.0f64..1e4, n in 1usize..300) {
        let hi = lo + width;
        let points = linspace(lo, hi, n).unwrap();

        prop_assert_eq!(points[0], lo);
        if width > 0.0 && n > 1 {
            prop_assert_eq!(points.len(), n);
            prop_assert_eq!(points[n - 1], hi);
        } else {
            prop_assert_eq!(points.len(), 1);
        }
        prop_assert!(points.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn fixed_spacing_never_exceeds_step(lo in -1e3f64..1e3, width in 0.0f64..5e3, spacing in 0.5f64..500.0) {
        let hi = lo + width;
        let points = fixed_spacing(lo, hi, spacing, 1e-9).unwrap();

        prop_assert_eq!(points[0], lo);
        prop_assert_eq!(*points.last().unwrap(), hi);
        for w in points.windows(2) {
            prop_assert!(w[1] > w[0]);
            prop_assert!(w[1] - w[0] <= spacing + 1e-9);
        }
    }

    #[test]
    fn interpolation_reproduces_lines(slope in -50.0f64..50.0, intercept in -1e3f64..1e3, x in 0.0f64..1800.0) {
        let xs = [0.0, 250.0, 700.0, 1200.0, 1800.0];
        let ys: Vec<f64> = xs.iter().map(|x| slope * x + intercept).collect();
        let y = interpolate_sorted(&xs, &ys, x, 0.0).unwrap();
        prop_assert!((y - (slope * x + intercept)).abs() <= 1e-9 * (1.0 + y.abs()));
    }

    #[test]
    fn brent_solves_monotone_cubic(target in -100.0f64..100.0) {
        let f = |x: f64| x * x * x + x - target;
        let result = brent(f, -10.0, 10.0, &SolverConfig::default()).unwrap();
        prop_assert!(f(result.root).abs() < 1e-6);
    }

    #[test]
    fn polynomial_passes_through_pillars(y0 in -300.0f64..300.0, y1 in -300.0f64..300.0, y2 in -300.0f64..300.0) {
        let xs = [0.0, 700.0, 1800.0];
        let ys = [y0, y1, y2];
        let poly = Polynomial::interpolate_points(&xs, &ys).unwrap();
        for (x, y) in xs.iter().zip(ys) {
            prop_assert!((poly.evaluate(*x) - y).abs() < 1e-7);
        }
    }
}
