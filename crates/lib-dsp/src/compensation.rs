//! Calibration compensation algebra.
//!
//! Fixture parasitics are nulled by combining the measured impedance with
//! the short/open/reference-load observations collected in the calibration
//! phases. The formulas have genuine singular points (a measured DUT
//! indistinguishable from the open fixture, a short indistinguishable from
//! the load); those surface as non-finite values in the affected step. A
//! sweep may pass through them legitimately and later steps can still be
//! fine.

use lib_types::sweep::{CalibMode, CalibPhase, CalibrationSet};
use lib_types::Complex64;

/// Combine one step's observations under the given correction model.
pub fn compensate(
    mode: CalibMode,
    z_short: Complex64,
    z_open: Complex64,
    z_load: Complex64,
    z_measured: Complex64,
    z_ref: Complex64,
) -> Complex64 {
    match mode {
        CalibMode::None => z_measured,
        CalibMode::OpenShortLoad => {
            ((z_short - z_measured) * (z_load - z_open))
                / ((z_measured - z_open) * (z_short - z_load))
                * z_ref
        }
        // The denominator keeps the (z_short - z_load) term from the
        // three-point model even though this mode nominally takes no load
        // reference; see DESIGN.md.
        CalibMode::OpenShort => {
            ((z_short - z_measured) * z_open) / ((z_measured - z_open) * (z_short - z_load))
        }
    }
}

/// Correction model actually applicable to the collected observations.
///
/// A requested correction degrades to [`CalibMode::None`] when any required
/// fixture phase collected zero observations, or when a phase's step count
/// disagrees with the measured sequence (logged; that indicates an aborted
/// collection, not a usable calibration).
pub fn effective_mode(requested: CalibMode, set: &CalibrationSet) -> CalibMode {
    if !requested.is_calibrated() {
        return CalibMode::None;
    }
    let steps = set.phase(CalibPhase::Measure).len();
    for phase in [CalibPhase::Short, CalibPhase::Open, CalibPhase::ReferenceLoad] {
        let collected = set.phase(phase).len();
        if collected == 0 {
            return CalibMode::None;
        }
        if collected != steps {
            tracing::warn!(
                phase = phase.label(),
                collected,
                steps,
                "calibration phase incomplete, reporting uncorrected impedance"
            );
            return CalibMode::None;
        }
    }
    requested
}

/// Compensate every step of a sweep.
///
/// Output length equals the measured sequence length. The effective mode is
/// resolved once for the whole sweep.
pub fn compensate_sweep(
    requested: CalibMode,
    set: &CalibrationSet,
    z_ref: Complex64,
) -> Vec<Complex64> {
    let mode = effective_mode(requested, set);
    let measured = set.phase(CalibPhase::Measure);

    match mode {
        CalibMode::None => measured.to_vec(),
        _ => {
            let short = set.phase(CalibPhase::Short);
            let open = set.phase(CalibPhase::Open);
            let load = set.phase(CalibPhase::ReferenceLoad);
            (0..measured.len())
                .map(|i| compensate(mode, short[i], open[i], load[i], measured[i], z_ref))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_uncorrected_is_identity() {
        let z = c(123.4, -56.7);
        let got = compensate(CalibMode::None, c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0), z, c(100.0, 0.0));
        assert_eq!(got, z);
    }

    #[test]
    fn test_three_point_reproduces_reference_on_load_fixture() {
        // Measuring the reference load itself must report exactly z_ref:
        // the (z_load - z_open) factors cancel against the denominator.
        let z_short = c(0.5, 0.1);
        let z_open = c(8000.0, -3000.0);
        let z_load = c(99.0, 1.5);
        let z_ref = c(100.0, 0.0);

        let got = compensate(CalibMode::OpenShortLoad, z_short, z_open, z_load, z_load, z_ref);

        assert_relative_eq!(got.re, z_ref.re, max_relative = 1e-12);
        assert_relative_eq!(got.im, z_ref.im, epsilon = 1e-9);
    }

    #[test]
    fn test_three_point_pinned_value() {
        // ((1-50)(100-1000)) / ((50-1000)(1-100)) * 100 = 44100/94050 * 100
        let got = compensate(
            CalibMode::OpenShortLoad,
            c(1.0, 0.0),
            c(1000.0, 0.0),
            c(100.0, 0.0),
            c(50.0, 0.0),
            c(100.0, 0.0),
        );
        assert_relative_eq!(got.re, 44100.0 / 94050.0 * 100.0, max_relative = 1e-12);
        assert_relative_eq!(got.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_open_short_pinned_value() {
        // ((1-50)*1000) / ((50-1000)(1-100)) = -49000/94050
        let got = compensate(
            CalibMode::OpenShort,
            c(1.0, 0.0),
            c(1000.0, 0.0),
            c(100.0, 0.0),
            c(50.0, 0.0),
            c(0.0, 0.0),
        );
        assert_relative_eq!(got.re, -49000.0 / 94050.0, max_relative = 1e-12);
    }

    #[test]
    fn test_singular_fixtures_surface_as_non_finite() {
        // z_short == z_load zeroes the denominator
        let got = compensate(
            CalibMode::OpenShortLoad,
            c(100.0, 0.0),
            c(8000.0, 0.0),
            c(100.0, 0.0),
            c(50.0, 0.0),
            c(100.0, 0.0),
        );
        assert!(!got.re.is_finite() || !got.im.is_finite());

        // z_measured == z_open likewise
        let got = compensate(
            CalibMode::OpenShortLoad,
            c(0.5, 0.0),
            c(8000.0, 0.0),
            c(100.0, 0.0),
            c(8000.0, 0.0),
            c(100.0, 0.0),
        );
        assert!(!got.re.is_finite() || !got.im.is_finite());
    }

    #[test]
    fn test_missing_phase_degrades_to_uncorrected() {
        let mut set = CalibrationSet::new();
        set.set_phase(CalibPhase::Measure, vec![c(50.0, 0.0); 3]);
        set.set_phase(CalibPhase::Short, vec![c(0.1, 0.0); 3]);
        // open and load never collected

        assert_eq!(effective_mode(CalibMode::OpenShortLoad, &set), CalibMode::None);

        let out = compensate_sweep(CalibMode::OpenShortLoad, &set, c(100.0, 0.0));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], c(50.0, 0.0));
    }

    #[test]
    fn test_incomplete_phase_degrades_to_uncorrected() {
        let mut set = CalibrationSet::new();
        set.set_phase(CalibPhase::Measure, vec![c(50.0, 0.0); 4]);
        set.set_phase(CalibPhase::Short, vec![c(0.1, 0.0); 4]);
        set.set_phase(CalibPhase::Open, vec![c(9000.0, 0.0); 2]);
        set.set_phase(CalibPhase::ReferenceLoad, vec![c(100.0, 0.0); 4]);

        assert_eq!(effective_mode(CalibMode::OpenShort, &set), CalibMode::None);
    }

    #[test]
    fn test_full_sweep_compensation() {
        let mut set = CalibrationSet::new();
        set.set_phase(CalibPhase::Short, vec![c(0.5, 0.1); 2]);
        set.set_phase(CalibPhase::Open, vec![c(8000.0, -3000.0); 2]);
        set.set_phase(CalibPhase::ReferenceLoad, vec![c(99.0, 1.5); 2]);
        set.set_phase(CalibPhase::Measure, vec![c(99.0, 1.5); 2]);

        let out = compensate_sweep(CalibMode::OpenShortLoad, &set, c(100.0, 0.0));
        assert_eq!(out.len(), 2);
        for z in out {
            assert_relative_eq!(z.re, 100.0, max_relative = 1e-9);
        }
    }
}
