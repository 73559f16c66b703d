//! Graph output: PNG figures and the live terminal view.

pub mod canvas;
pub mod figure;
pub mod terminal;
pub mod text;

/// Reduce `(x, y)` pairs to at most about `columns * 2` points, keeping the
/// minimum and maximum of each column so peaks survive.
pub fn decimate(xs: &[f32], ys: &[f32], columns: usize) -> Vec<(f64, f64)> {
    let len = xs.len().min(ys.len());
    if columns == 0 || len == 0 {
        return Vec::new();
    }
    if len <= columns * 2 {
        return (0..len).map(|i| (xs[i] as f64, ys[i] as f64)).collect();
    }

    let mut points = Vec::with_capacity(columns * 2);
    for c in 0..columns {
        let start = c * len / columns;
        let end = ((c + 1) * len / columns).max(start + 1).min(len);
        let (mut lo, mut hi) = (start, start);
        for i in start..end {
            if ys[i] < ys[lo] {
                lo = i;
            }
            if ys[i] > ys[hi] {
                hi = i;
            }
        }
        let (first, second) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        points.push((xs[first] as f64, ys[first] as f64));
        if second != first {
            points.push((xs[second] as f64, ys[second] as f64));
        }
    }
    points
}

/// Finite min and max of `values`, widened when flat.
pub fn value_range<'a>(values: impl IntoIterator<Item = &'a f32>) -> (f32, f32) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo < 1e-6 {
        return (lo - 0.5, hi + 0.5);
    }
    (lo, hi)
}
