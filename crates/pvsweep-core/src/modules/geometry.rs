//! Array geometry and sweep enumeration.

use crate::common::constants::DEFAULT_TEMPERATURES;
use crate::domain::{ArrayShape, Dataset, Fault, NetlistJob, PvError, PvResult};

/// Every factor pair of every count, in ascending-divisor order.
pub fn enumerate_all_shapes(cell_counts: &[u32]) -> Vec<(u32, ArrayShape)> {
    let mut shapes = Vec::new();
    for &count in cell_counts {
        let divisors = divisors(count);
        for &series in &divisors {
            for &parallel in &divisors {
                // Equal factors only survive when they tile the count exactly.
                // TODO: confirm with the study owners whether (x, x) pairs need
                // any rule beyond the product check.
                if series == parallel && series * parallel != count {
                    continue;
                }
                if series * parallel == count {
                    shapes.push((count, ArrayShape::new(series, parallel)));
                }
            }
        }
    }
    shapes
}

/// Factor pairs whose `RxC` label is allow-listed. An empty allow-list selects nothing.
pub fn enumerate_shapes<S: AsRef<str>>(cell_counts: &[u32], allowed: &[S]) -> Vec<ArrayShape> {
    let mut selected: Vec<ArrayShape> = Vec::new();
    for (count, shape) in enumerate_all_shapes(cell_counts) {
        let label = shape.label();
        if !allowed.iter().any(|candidate| candidate.as_ref() == label) {
            continue;
        }
        if selected.contains(&shape) {
            continue;
        }
        tracing::info!("[{}] Will design solar arrangement {}", count, label);
        selected.push(shape);
    }
    selected
}

fn divisors(count: u32) -> Vec<u32> {
    (1..=count).filter(|candidate| count % candidate == 0).collect()
}

/// Expands `"27, 30-32"` into `[27, 30, 31, 32]`; blank input yields the built-in list.
pub fn expand_temperatures(temps: &str) -> PvResult<Vec<i32>> {
    if temps.trim().is_empty() {
        return Ok(DEFAULT_TEMPERATURES.to_vec());
    }

    let mut temperatures = Vec::new();
    for token in temps.split(',').map(str::trim) {
        temperatures.extend(expand_temperature_token(token)?);
    }
    Ok(temperatures)
}

fn expand_temperature_token(token: &str) -> PvResult<Vec<i32>> {
    let parse = |value: &str| {
        value.trim().parse::<i32>().map_err(|source| {
            PvError::input_validation(
                "INPUT.TEMPERATURE_TOKEN",
                format!("invalid temperature token '{}': {}", token, source),
            )
        })
    };

    // A leading '-' belongs to a negative single value, not to a range.
    let split_at = token
        .char_indices()
        .skip(1)
        .find(|(_, character)| *character == '-')
        .map(|(index, _)| index);

    match split_at {
        Some(index) => {
            let lower = parse(&token[..index])?;
            let upper = parse(&token[index + 1..])?;
            Ok((lower..=upper).collect())
        }
        None => Ok(vec![parse(token)?]),
    }
}

/// Fault cases for one shape, in generation order: for each `n`, the shading
/// case, then the open case while `n < C`, then the short case while
/// `n <= R*C - C`.
pub fn faults_for_shape(shape: ArrayShape) -> Vec<Fault> {
    let total = shape.cell_count();
    let max_short = total - shape.parallel;
    let mut faults = Vec::new();
    for count in 0..=total {
        faults.push(Fault::UniformShade(count));
        if count == 0 {
            continue;
        }
        if count < shape.parallel {
            faults.push(Fault::ColumnOpen(count));
        }
        if count <= max_short {
            faults.push(Fault::TerminalShort(count));
        }
    }
    faults
}

pub fn jobs_for_dataset(dataset: &Dataset, shapes: &[ArrayShape]) -> Vec<NetlistJob> {
    let mut jobs = Vec::new();
    for &temperature in &dataset.temperatures {
        for &shape in shapes {
            for fault in faults_for_shape(shape) {
                jobs.push(NetlistJob {
                    dataset: dataset.name.clone(),
                    full: dataset.full,
                    shade: dataset.shade,
                    temperature,
                    shape,
                    fault,
                });
            }
        }
    }
    jobs
}
