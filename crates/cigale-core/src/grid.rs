use crate::domain::{CigaleError, CigaleResult};

/// Integer ages (Myr) log-spaced between `start` and `stop` inclusive.
///
/// Points are rounded half-to-even, so low ages collapse onto the same
/// integer; the result is deduplicated and ascending and may therefore hold
/// fewer than `n_steps` values.
pub fn log_spaced_int_ages(start: f64, stop: f64, n_steps: usize) -> CigaleResult<Vec<i64>> {
    if !(start > 0.0) || !stop.is_finite() || stop < start {
        return Err(CigaleError::InvalidArgument(format!(
            "age grid needs 0 < start <= stop, got start={} stop={}",
            start, stop
        )));
    }
    if n_steps == 0 {
        return Err(CigaleError::InvalidArgument(
            "age grid needs at least one step".to_string(),
        ));
    }

    let low = start.log10();
    let high = stop.log10();
    let span = if n_steps > 1 {
        (high - low) / (n_steps - 1) as f64
    } else {
        0.0
    };

    let mut ages = (0..n_steps)
        .map(|index| {
            let exponent = if index + 1 == n_steps && n_steps > 1 {
                high
            } else {
                low + span * index as f64
            };
            10f64.powf(exponent).round_ties_even() as i64
        })
        .collect::<Vec<_>>();
    ages.sort_unstable();
    ages.dedup();
    Ok(ages)
}
