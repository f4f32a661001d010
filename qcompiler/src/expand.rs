use common::error::QueryError;
use qmodel::Quantum;

/// Step F (spec.md §4.2): computes the ordered list of `[lo, hi)` windows
/// the range `[lo, hi)` crosses, aligned to quantum boundaries.
///
/// Returns `K` windows where `K = 1 + |boundaries strictly between lo and
/// hi|`. `K` is computed arithmetically and checked against
/// `max_quanta_span` *before* any window is materialized, so a
/// pathologically wide range (e.g. spanning trillions of quanta) is
/// rejected with `TooManySubqueries` in constant time instead of looping
/// over every boundary.
pub fn expand_on_quantum_boundaries(
    quantum: &Quantum,
    lo: i64,
    hi: i64,
    max_quanta_span: u32,
) -> Result<Vec<(i64, i64)>, QueryError> {
    let width = i128::from(quantum.width_millis());
    let floor_lo = quantum.floor(lo);

    // Number of boundaries strictly between lo and hi: boundary n (n>=1)
    // is floor_lo + n*width, counted while it is < hi. Worked out in
    // i128 so the subtraction/division below can't overflow even for an
    // absurdly wide `hi`.
    let boundary_count: i128 = if hi <= floor_lo {
        0
    } else {
        (i128::from(hi) - 1 - i128::from(floor_lo)).div_euclid(width)
    };
    let k: i128 = 1 + boundary_count;

    if k > i128::from(max_quanta_span) {
        // `k` itself may be astronomically large; report it as `usize`,
        // saturating rather than risking a cast overflow.
        return Err(QueryError::TooManySubqueries(usize::try_from(k).unwrap_or(usize::MAX)));
    }
    let k = k as usize;

    let mut windows = Vec::with_capacity(k);
    let mut start = lo;
    for n in 1..k {
        let boundary = floor_lo + (n as i64) * quantum.width_millis();
        windows.push((start, boundary));
        start = boundary;
    }
    windows.push((start, hi));
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmodel::QuantumUnit;

    fn quantum() -> Quantum {
        Quantum { field: "time".into(), n: 15, unit: QuantumUnit::Seconds }
    }

    #[test]
    fn single_window_when_range_fits_in_one_quantum() {
        let windows = expand_on_quantum_boundaries(&quantum(), 3000, 5000, 5).unwrap();
        assert_eq!(windows, vec![(3000, 5000)]);
    }

    #[test]
    fn three_windows_crossing_two_boundaries() {
        let windows = expand_on_quantum_boundaries(&quantum(), 3000, 31000, 5).unwrap();
        assert_eq!(windows, vec![(3000, 15000), (15000, 30000), (30000, 31000)]);
    }

    #[test]
    fn exact_boundary_hit_does_not_add_an_empty_trailing_window() {
        // hi == 30000 is itself a boundary, but exclusive upper bound means
        // no window [30000, 30000) should be emitted.
        let windows = expand_on_quantum_boundaries(&quantum(), 3000, 30000, 5).unwrap();
        assert_eq!(windows, vec![(3000, 15000), (15000, 30000)]);
    }

    #[test]
    fn too_many_subqueries_when_span_exceeds_configured_max() {
        let err = expand_on_quantum_boundaries(&quantum(), 0, 1_000_000, 5).unwrap_err();
        assert!(matches!(err, QueryError::TooManySubqueries(_)));
    }

    /// A syntactically valid but absurdly wide range must be rejected in
    /// constant time, not by enumerating every boundary (which would hang
    /// or overflow `b += width` long before finishing).
    #[test]
    fn astronomically_wide_range_is_rejected_without_enumerating_boundaries() {
        let err = expand_on_quantum_boundaries(&quantum(), 0, 9_000_000_000_000_000, 5).unwrap_err();
        assert!(matches!(err, QueryError::TooManySubqueries(_)));
    }
}
