//! Spring physics for smooth lyric scrolling
//!
//! Time-based analytical solution rather than frame-by-frame integration,
//! so the result does not depend on the tick rate.
//!
//! ### Overdamped / critically damped
//! ```text
//! w = -sqrt(stiffness / mass)
//! leftover = -w * delta - velocity
//! position(t) = to - (delta + t * leftover) * e^(t * w)
//! ```
//!
//! ### Underdamped
//! ```text
//! damping_frequency = sqrt(4 * mass * stiffness - damping^2)
//! leftover = (damping * delta - 2 * mass * velocity) / damping_frequency
//! dfm = 0.5 * damping_frequency / mass
//! dm = -0.5 * damping / mass
//! position(t) = to - (cos(t * dfm) * delta + sin(t * dfm) * leftover) * e^(t * dm)
//! ```

pub type Num = f64;

/// Distance and speed below which the spring snaps to its target
const REST_EPSILON: Num = 0.01;

/// Spring parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub mass: Num,
    pub damping: Num,
    pub stiffness: Num,
}

impl SpringParams {
    /// Vertical position of the lyric carousel
    pub const POS_Y: Self = Self {
        mass: 0.9,
        damping: 15.0,
        stiffness: 90.0,
    };

    pub fn is_overdamped(&self) -> bool {
        1.0 <= self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }
}

impl Default for SpringParams {
    fn default() -> Self {
        Self::POS_Y
    }
}

/// Closed-form motion from `from` (with initial velocity) towards `to`
#[derive(Debug, Clone, Copy)]
enum Motion {
    Rest,
    Overdamped {
        to: Num,
        delta: Num,
        leftover: Num,
        w: Num,
    },
    Underdamped {
        to: Num,
        delta: Num,
        leftover: Num,
        dfm: Num,
        dm: Num,
    },
}

impl Motion {
    fn solve(from: Num, velocity: Num, to: Num, params: &SpringParams) -> Self {
        let SpringParams {
            mass,
            damping,
            stiffness,
        } = *params;
        let delta = to - from;

        if params.is_overdamped() {
            let w = -(stiffness / mass).sqrt();
            Self::Overdamped {
                to,
                delta,
                leftover: -w * delta - velocity,
                w,
            }
        } else {
            let damping_frequency = (4.0 * mass * stiffness - damping.powi(2)).sqrt();
            Self::Underdamped {
                to,
                delta,
                leftover: (damping * delta - 2.0 * mass * velocity) / damping_frequency,
                dfm: 0.5 * damping_frequency / mass,
                dm: -0.5 * damping / mass,
            }
        }
    }

    fn position(&self, t: Num, rest: Num) -> Num {
        match *self {
            Self::Rest => rest,
            Self::Overdamped {
                to,
                delta,
                leftover,
                w,
            } => to - (delta + t * leftover) * (t * w).exp(),
            Self::Underdamped {
                to,
                delta,
                leftover,
                dfm,
                dm,
            } => to - ((t * dfm).cos() * delta + (t * dfm).sin() * leftover) * (t * dm).exp(),
        }
    }

    fn velocity(&self, t: Num) -> Num {
        match *self {
            Self::Rest => 0.0,
            Self::Overdamped {
                delta, leftover, w, ..
            } => -(t * w).exp() * (leftover + w * (delta + t * leftover)),
            Self::Underdamped {
                delta,
                leftover,
                dfm,
                dm,
                ..
            } => {
                let (sin, cos) = (t * dfm).sin_cos();
                -(t * dm).exp()
                    * (dfm * (cos * leftover - sin * delta) + dm * (cos * delta + sin * leftover))
            }
        }
    }
}

/// Damped spring animating a single value
#[derive(Debug, Clone)]
pub struct Spring {
    position: Num,
    target: Num,
    elapsed: Num,
    params: SpringParams,
    motion: Motion,
}

impl Spring {
    pub fn new(position: Num) -> Self {
        Self::from_params(position, SpringParams::default())
    }

    pub fn from_params(position: Num, params: SpringParams) -> Self {
        Self {
            position,
            target: position,
            elapsed: 0.0,
            params,
            motion: Motion::Rest,
        }
    }

    /// Retarget, keeping the current velocity
    pub fn set_target(&mut self, target: Num) {
        if target == self.target && matches!(self.motion, Motion::Rest) {
            return;
        }
        let velocity = self.velocity();
        self.target = target;
        self.elapsed = 0.0;
        self.motion = Motion::solve(self.position, velocity, target, &self.params);
    }

    /// Jump to a value without animating
    pub fn set_position(&mut self, position: Num) {
        self.position = position;
        self.target = position;
        self.elapsed = 0.0;
        self.motion = Motion::Rest;
    }

    /// Advance by `delta` seconds
    pub fn update(&mut self, delta: Num) {
        if matches!(self.motion, Motion::Rest) {
            return;
        }
        self.elapsed += delta.max(0.0);
        self.position = self.motion.position(self.elapsed, self.target);

        if self.arrived() {
            self.set_position(self.target);
        }
    }

    pub fn arrived(&self) -> bool {
        (self.target - self.position).abs() < REST_EPSILON
            && self.velocity().abs() < REST_EPSILON
    }

    pub fn position(&self) -> Num {
        self.position
    }

    pub fn target(&self) -> Num {
        self.target
    }

    pub fn velocity(&self) -> Num {
        self.motion.velocity(self.elapsed)
    }

    pub fn params(&self) -> &SpringParams {
        &self.params
    }
}

impl Default for Spring {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spring_basic() {
        let mut spring = Spring::new(0.0);
        spring.set_target(100.0);

        for _ in 0..10 {
            spring.update(0.01);
        }

        let pos = spring.position();
        assert!(pos > 0.0, "Spring should move from 0");
        assert!(pos < 100.0, "Spring should not reach target yet");
    }

    #[test]
    fn test_spring_settles() {
        let mut spring = Spring::new(0.0);
        spring.set_target(-240.0);
        for _ in 0..600 {
            spring.update(1.0 / 60.0);
        }
        assert_eq!(spring.position(), -240.0);
        assert!(spring.arrived());
    }

    #[test]
    fn test_retarget_keeps_velocity() {
        let mut spring = Spring::new(0.0);
        spring.set_target(100.0);
        spring.update(0.05);
        let v = spring.velocity();
        assert!(v > 0.0);
        spring.set_target(200.0);
        assert!((spring.velocity() - v).abs() < 1e-9);
    }

    #[test]
    fn test_analytic_velocity_matches_numeric() {
        for params in [
            SpringParams::POS_Y,
            SpringParams {
                mass: 1.0,
                damping: 5.0,
                stiffness: 100.0,
            },
        ] {
            let motion = Motion::solve(0.0, 3.0, 50.0, &params);
            let h = 1e-5;
            for t in [0.0, 0.1, 0.4] {
                let numeric =
                    (motion.position(t + h, 50.0) - motion.position(t - h, 50.0)) / (2.0 * h);
                assert!((numeric - motion.velocity(t)).abs() < 1e-3);
            }
            assert!((motion.velocity(0.0) - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_overdamped() {
        let params = SpringParams {
            mass: 1.0,
            damping: 100.0,
            stiffness: 100.0,
        };
        assert!(params.is_overdamped());

        let params2 = SpringParams {
            mass: 1.0,
            damping: 5.0,
            stiffness: 100.0,
        };
        assert!(!params2.is_overdamped());
    }

    #[test]
    fn test_set_position_is_instant() {
        let mut spring = Spring::new(0.0);
        spring.set_target(50.0);
        spring.set_position(10.0);
        assert_eq!(spring.position(), 10.0);
        assert_eq!(spring.target(), 10.0);
        assert_eq!(spring.velocity(), 0.0);
    }
}
