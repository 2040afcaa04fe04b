//! Bounded mutation operators for layer arguments.

use rand::prelude::*;

/// How a numeric argument is perturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOperator {
    /// Increment or decrement by one, clamped to bounds.
    Step,
    /// Apply the same step to every component of a tuple.
    SyncStep,
    /// Replace with a uniformly random value in bounds.
    Random,
}

/// Direction of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
}

impl StepDirection {
    /// Pick a direction with equal probability.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            StepDirection::Up
        } else {
            StepDirection::Down
        }
    }
}

/// Step a value by one in `direction`, clamped to `[min, max]`.
pub fn step(value: usize, bounds: (usize, usize), direction: StepDirection) -> usize {
    let (min, max) = bounds;
    let stepped = match direction {
        StepDirection::Up => value.saturating_add(1),
        StepDirection::Down => value.saturating_sub(1),
    };
    stepped.clamp(min, max)
}

/// Step both components of a tuple by the same delta.
pub fn sync_step(
    value: (usize, usize),
    bounds: (usize, usize),
    direction: StepDirection,
) -> (usize, usize) {
    (
        step(value.0, bounds, direction),
        step(value.1, bounds, direction),
    )
}

/// Mutate a scalar argument. `SyncStep` on a scalar is a plain step.
pub fn mutate_int<R: Rng + ?Sized>(
    value: usize,
    bounds: (usize, usize),
    operator: MutationOperator,
    rng: &mut R,
) -> usize {
    match operator {
        MutationOperator::Step | MutationOperator::SyncStep => {
            step(value, bounds, StepDirection::random(rng))
        }
        MutationOperator::Random => rng.gen_range(bounds.0..=bounds.1),
    }
}

/// Mutate a 2-tuple argument, preserving its arity.
pub fn mutate_tuple<R: Rng + ?Sized>(
    value: (usize, usize),
    bounds: (usize, usize),
    operator: MutationOperator,
    rng: &mut R,
) -> (usize, usize) {
    match operator {
        MutationOperator::Step => {
            let direction = StepDirection::random(rng);
            if rng.gen_bool(0.5) {
                (step(value.0, bounds, direction), value.1)
            } else {
                (value.0, step(value.1, bounds, direction))
            }
        }
        MutationOperator::SyncStep => sync_step(value, bounds, StepDirection::random(rng)),
        MutationOperator::Random => (
            rng.gen_range(bounds.0..=bounds.1),
            rng.gen_range(bounds.0..=bounds.1),
        ),
    }
}

/// Pick any enum member uniformly; re-picking the current value is allowed.
pub fn mutate_enum<T: Copy, R: Rng + ?Sized>(members: &[T], current: T, rng: &mut R) -> T {
    members.choose(rng).copied().unwrap_or(current)
}

/// Gaussian perturbation of a rate, kept inside `(0, max]`.
pub fn mutate_rate<R: Rng + ?Sized>(value: f64, max: f64, strength: f64, rng: &mut R) -> f64 {
    let noise: f64 = rng.sample(rand_distr::StandardNormal);
    let floor = max * 1e-3;
    (value + noise * strength * max).clamp(floor, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_step_clamps_at_max() {
        assert_eq!(sync_step((7, 7), (1, 7), StepDirection::Up), (7, 7));
        assert_eq!(sync_step((1, 1), (1, 7), StepDirection::Down), (1, 1));
        assert_eq!(sync_step((3, 5), (1, 7), StepDirection::Up), (4, 6));
    }

    #[test]
    fn test_step_bounds() {
        assert_eq!(step(0, (1, 7), StepDirection::Down), 1);
        assert_eq!(step(5, (1, 7), StepDirection::Up), 6);
        assert_eq!(step(128, (1, 128), StepDirection::Up), 128);
    }

    #[test]
    fn test_operators_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for operator in [
            MutationOperator::Step,
            MutationOperator::SyncStep,
            MutationOperator::Random,
        ] {
            let mut value = (1, 7);
            let mut scalar = 4;
            for _ in 0..200 {
                value = mutate_tuple(value, (1, 7), operator, &mut rng);
                scalar = mutate_int(scalar, (1, 7), operator, &mut rng);
                assert!((1..=7).contains(&value.0) && (1..=7).contains(&value.1));
                assert!((1..=7).contains(&scalar));
            }
        }
    }

    #[test]
    fn test_rate_stays_positive() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut rate = 0.1;
        for _ in 0..500 {
            rate = mutate_rate(rate, 0.2, 0.5, &mut rng);
            assert!(rate > 0.0 && rate <= 0.2);
        }
    }
}
