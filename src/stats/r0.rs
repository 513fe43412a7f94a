//! Reproduction-number data.
//!
//! For every infection date, the average number of onward infections caused
//! by the people infected on that date. Two variants are computed: one from
//! transmitter attribution on the victims' infection records, and a
//! smoothed one from each person's own transmission counter.

use crate::date::SimDate;
use crate::world::{InfectionSource, Person};
use serde_derive::Serialize;

/// Daily average R values, indexed by infection date.
#[derive(Debug, Clone, Serialize)]
pub struct R0Data {
    pub dates: Vec<SimDate>,
    pub avg_r0: Vec<f64>,
    pub smoothed_avg_r0: Vec<f64>,
}

/// Calculates daily average R data over the population.
///
/// Days on which nobody was infected carry `NaN`. The series is truncated
/// at `max_date` when one is given, otherwise it runs to the last infection
/// date. Returns `None` if no valid (dated) infections exist — seed
/// infections with cleared dates are excluded.
pub fn calculate_r0_data(population: &[Person], max_date: Option<SimDate>) -> Option<R0Data> {
    // How many onward infections each person caused, via the transmitter
    // recorded on their victims.
    let mut children = vec![0usize; population.len()];
    for person in population {
        if let Some(data) = person.get_infection_data() {
            if data.date.is_some() {
                if let InfectionSource::Environment { transmitter, .. } = data.source {
                    children[transmitter.0] += 1;
                }
            }
        }
    }

    let dated_infections: Vec<(usize, SimDate)> = population
        .iter()
        .enumerate()
        .filter_map(|(index, person)| {
            person
                .get_infection_data()
                .and_then(|data| data.date)
                .map(|date| (index, date))
        })
        .collect();
    if dated_infections.is_empty() {
        return None;
    }

    let min_date = dated_infections.iter().map(|(_, d)| *d).min().unwrap();
    let max_infection_date = dated_infections.iter().map(|(_, d)| *d).max().unwrap();

    // Per infection date: how many people were infected that day, how many
    // onward infections they caused, and their own transmission counters.
    let num_days = max_infection_date.days_since(min_date) as usize + 1;
    let mut bins = vec![(0usize, 0usize, 0usize); num_days];
    for &(index, date) in &dated_infections {
        let bin = &mut bins[date.days_since(min_date) as usize];
        bin.0 += 1;
        bin.1 += children[index];
        bin.2 += population[index].num_infections() as usize;
    }

    let cutoff = max_date.unwrap_or(max_infection_date);
    let mut dates = Vec::new();
    let mut avg_r0 = Vec::new();
    let mut smoothed_avg_r0 = Vec::new();
    for (offset, &(num_infecting, total_children, smoothed_children)) in bins.iter().enumerate() {
        let date = min_date + offset as u32;
        if date > cutoff {
            break;
        }
        dates.push(date);
        if num_infecting > 0 {
            avg_r0.push(total_children as f64 / num_infecting as f64);
            smoothed_avg_r0.push(smoothed_children as f64 / num_infecting as f64);
        } else {
            avg_r0.push(f64::NAN);
            smoothed_avg_r0.push(f64::NAN);
        }
    }
    Some(R0Data {
        dates,
        avg_r0,
        smoothed_avg_r0,
    })
}
