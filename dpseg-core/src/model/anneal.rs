use std::fmt;

/// Default number of temperature steps of an annealed schedule.
pub const DEFAULT_INCREMENTS: usize = 10;

/// Sequence of annealing exponents over a sampling run.
///
/// The "temperature" is the exponent applied to sampling probabilities:
/// values below 1 flatten the distributions, 1 samples from the posterior
/// and values above 1 sharpen it towards a maximum.
///
/// # Variants
/// - Annealed: the exponent rises from `1/increments` to 1 in equal steps,
///   each held for `iterations / increments` sweeps.
/// - Constant: one exponent for the whole run.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnealingSchedule {
	iterations: usize,
	/// Sweeps spent at each exponent, 0 for a constant schedule.
	iterations_per_step: usize,
	temperatures: Vec<f64>,
}

impl AnnealingSchedule {
	/// Annealed schedule over `iterations` sweeps in `increments` steps.
	///
	/// Runs shorter than `increments` get one step per sweep.
	///
	/// # Panics
	/// If `increments` is 0.
	pub fn annealed(iterations: usize, increments: usize) -> Self {
		assert!(increments > 0, "an annealed schedule needs at least one step");
		let increments = if iterations > 0 { increments.min(iterations) } else { increments };
		let temperatures = (1..=increments).map(|step| step as f64 / increments as f64).collect();
		Self {
			iterations,
			iterations_per_step: iterations / increments,
			temperatures,
		}
	}

	/// Samples at `temperature` for all `iterations`.
	pub fn constant(iterations: usize, temperature: f64) -> Self {
		Self {
			iterations,
			iterations_per_step: 0,
			temperatures: vec![temperature],
		}
	}

	/// Extends an annealed schedule to search for a global maximum.
	///
	/// The run becomes three times longer and the exponent keeps rising past
	/// 1, by a factor of 1.2 per step, for twice as many steps again. A
	/// constant schedule is returned unchanged.
	pub fn with_global_max(mut self) -> Self {
		if !self.is_annealed() {
			return self;
		}
		let increments = self.temperatures.len();
		self.iterations *= 3;
		let mut temperature = 1.0;
		for _ in 0..2 * increments {
			temperature *= 1.2;
			self.temperatures.push(temperature);
		}
		self
	}

	pub fn iterations(&self) -> usize {
		self.iterations
	}

	pub fn is_annealed(&self) -> bool {
		self.iterations_per_step > 0
	}

	pub fn temperatures(&self) -> &[f64] {
		&self.temperatures
	}

	/// Exponent used for sweep `iteration`.
	///
	/// Iterations left over by the integer division of the run into steps
	/// stay at the last exponent.
	pub fn temperature_at(&self, iteration: usize) -> f64 {
		if !self.is_annealed() {
			return self.temperatures[0];
		}
		let step = (iteration / self.iterations_per_step).min(self.temperatures.len() - 1);
		self.temperatures[step]
	}

	/// Whether sweep `iteration` starts a new step.
	pub fn changes_at(&self, iteration: usize) -> bool {
		self.is_annealed() && iteration % self.iterations_per_step == 0
	}
}

impl fmt::Display for AnnealingSchedule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_annealed() {
			write!(
				f,
				"{} iterations, raising temperature in {} steps: {:?}",
				self.iterations,
				self.temperatures.len(),
				self.temperatures
			)
		} else {
			write!(f, "{} iterations at constant temperature {}", self.iterations, self.temperatures[0])
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn annealing_rises_to_one() {
		let schedule = AnnealingSchedule::annealed(100, DEFAULT_INCREMENTS);
		assert_eq!(schedule.temperatures().len(), 10);
		assert!((schedule.temperature_at(0) - 0.1).abs() < 1e-12);
		assert!((schedule.temperature_at(9) - 0.1).abs() < 1e-12);
		assert!((schedule.temperature_at(10) - 0.2).abs() < 1e-12);
		assert!((schedule.temperature_at(99) - 1.0).abs() < 1e-12);
		assert!(schedule.changes_at(0) && schedule.changes_at(50) && !schedule.changes_at(51));
	}

	#[test]
	fn short_runs_use_one_step_per_sweep() {
		let schedule = AnnealingSchedule::annealed(4, 10);
		assert_eq!(schedule.temperatures(), [0.25, 0.5, 0.75, 1.0]);
		assert!((0..4).all(|i| schedule.changes_at(i)));

		let leftover = AnnealingSchedule::annealed(25, 10);
		assert_eq!(leftover.temperature_at(24), 1.0);
	}

	#[test]
	fn global_max_keeps_heating() {
		let schedule = AnnealingSchedule::annealed(100, 10).with_global_max();
		assert_eq!(schedule.iterations(), 300);
		assert_eq!(schedule.temperatures().len(), 30);
		assert!((schedule.temperature_at(299) - 1.2_f64.powi(20)).abs() < 1e-9);
		assert!((schedule.temperature_at(105) - 1.2).abs() < 1e-12);
	}

	#[test]
	fn constant_schedule() {
		let schedule = AnnealingSchedule::constant(7, 1.0).with_global_max();
		assert_eq!(schedule.iterations(), 7);
		assert!(!schedule.changes_at(0));
		assert_eq!(schedule.temperature_at(6), 1.0);
		assert_eq!(AnnealingSchedule::annealed(0, 10).iterations(), 0);
	}
}
