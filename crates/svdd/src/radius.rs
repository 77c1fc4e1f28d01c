//! Decision radius estimation for the soft-boundary objective.
//!
//! The radius is re-estimated from each training batch alone, so it tracks
//! the most recent batch rather than a running statistic.

/// Estimate `R` from one batch of squared distances.
///
/// Returns the `(1 - nu)` quantile of `sqrt(distances)` with linear
/// interpolation between order statistics. An empty batch yields 0.
/// NaN distances sort last and are not filtered, so a batch dominated by
/// them yields a NaN radius.
pub fn estimate_radius(distances: &[f64], nu: f64) -> f64 {
    let mut radii: Vec<f64> = distances.iter().map(|d| d.sqrt()).collect();
    quantile_linear(&mut radii, 1.0 - nu)
}

/// Linear-interpolation quantile of `values` at level `q` in [0, 1].
///
/// Sorts `values` in place. With `h = (n - 1) * q` the result is
/// `x[floor(h)] + (h - floor(h)) * (x[ceil(h)] - x[floor(h)])`.
pub fn quantile_linear(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 1.0);
    let h = (values.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    values[lo] + (h - lo as f64) * (values[hi] - values[lo])
}
