use float_cmp::ApproxEqRatio as _;

const RATIO_ERROR: f64 = 0.0001;

/// Whether two floats are equal to within a relative error of 0.01%.
pub fn approx_eq(l: f64, r: f64) -> bool {
    l == r || l.approx_eq_ratio(&r, RATIO_ERROR)
}
