//! Pearson correlation between two numeric fields.

use super::stats::round_to;
use crate::error::{PipelineError, Result};
use crate::models::{Dataset, Field};

/// Pearson correlation coefficient of paired samples, unrounded.
///
/// Needs at least two pairs and non-zero variance on both sides.
pub fn pearson(pairs: &[(f64, f64)]) -> Result<f64> {
    if pairs.len() < 2 {
        return Err(PipelineError::data(format!(
            "correlation needs at least 2 records, got {}",
            pairs.len()
        )));
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Err(PipelineError::data(
            "correlation is undefined for a constant sequence",
        ));
    }

    Ok((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Pearson correlation between two fields of a dataset, rounded to three decimals.
pub fn correlation(dataset: &Dataset, a: Field, b: Field) -> Result<f64> {
    for field in [a, b] {
        if !field.is_numeric() {
            return Err(PipelineError::config(format!(
                "cannot correlate non-numeric field '{}'",
                field
            )));
        }
    }
    let r = pearson(&dataset.pairs(a, b))?;
    Ok(round_to(r, 3))
}
