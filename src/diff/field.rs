use crate::types::FieldDelta;

/// Compare one numeric field against an absolute threshold.
/// Missing values count as 0. Returns `None` when `|new - old| < threshold`.
pub fn compare_field(old: Option<f64>, new: Option<f64>, threshold: f64) -> Option<FieldDelta> {
    let old = old.unwrap_or(0.0);
    let new = new.unwrap_or(0.0);
    let difference = new - old;
    if difference.abs() < threshold {
        return None;
    }

    // old == 0 with new > 0 records the absolute move but reports 0%.
    let percent_change = if old != 0.0 { difference / old * 100.0 } else { 0.0 };

    Some(FieldDelta {
        old,
        new,
        difference,
        percent_change,
    })
}
