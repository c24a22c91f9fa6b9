/// A damped harmonic oscillator stepped at a fixed time interval.
///
/// The closed-form solution for one step is folded into four coefficients
/// at construction, so [`Spring::update`] is two multiply-adds per value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pos_pos: f64,
    pos_vel: f64,
    vel_pos: f64,
    vel_vel: f64,
}

impl Spring {
    /// Step interval for `fps` frames per second; 0 is treated as 1.
    pub fn delta_time(fps: u32) -> f64 {
        1.0 / f64::from(fps.max(1))
    }

    pub fn new(delta_time: f64, angular_frequency: f64, damping_ratio: f64) -> Self {
        let omega = angular_frequency.max(0.0);
        let zeta = damping_ratio.max(0.0);
        let dt = delta_time;

        if omega < f64::EPSILON {
            return Self {
                pos_pos: 1.0,
                pos_vel: 0.0,
                vel_pos: 0.0,
                vel_vel: 1.0,
            };
        }

        if zeta > 1.0 + f64::EPSILON {
            // Over-damped.
            let za = -omega * zeta;
            let zb = omega * (zeta * zeta - 1.0).sqrt();
            let z1 = za - zb;
            let z2 = za + zb;
            let e1 = (z1 * dt).exp();
            let e2 = (z2 * dt).exp();
            let inv_two_zb = 1.0 / (2.0 * zb);
            let e1_over = e1 * inv_two_zb;
            let e2_over = e2 * inv_two_zb;
            let z1e1_over = z1 * e1_over;
            let z2e2_over = z2 * e2_over;
            Self {
                pos_pos: e1_over * z2 - z2e2_over + e2,
                pos_vel: -e1_over + e2_over,
                vel_pos: (z1e1_over - z2e2_over + e2) * z2,
                vel_vel: -z1e1_over + z2e2_over,
            }
        } else if zeta < 1.0 - f64::EPSILON {
            // Under-damped.
            let omega_zeta = omega * zeta;
            let alpha = omega * (1.0 - zeta * zeta).sqrt();
            let exp_term = (-omega_zeta * dt).exp();
            let cos_term = (alpha * dt).cos();
            let sin_term = (alpha * dt).sin();
            let inv_alpha = 1.0 / alpha;
            let exp_sin = exp_term * sin_term;
            let exp_cos = exp_term * cos_term;
            let exp_omega_zeta_sin_over_alpha = exp_term * omega_zeta * sin_term * inv_alpha;
            Self {
                pos_pos: exp_cos + exp_omega_zeta_sin_over_alpha,
                pos_vel: exp_sin * inv_alpha,
                vel_pos: -exp_sin * alpha - omega_zeta * exp_omega_zeta_sin_over_alpha,
                vel_vel: exp_cos - exp_omega_zeta_sin_over_alpha,
            }
        } else {
            // Critically damped.
            let exp_term = (-omega * dt).exp();
            let time_exp = dt * exp_term;
            let time_exp_freq = time_exp * omega;
            Self {
                pos_pos: time_exp_freq + exp_term,
                pos_vel: time_exp,
                vel_pos: -omega * time_exp_freq,
                vel_vel: -time_exp_freq + exp_term,
            }
        }
    }

    /// One step towards `target`, returning the new position and velocity.
    pub fn update(&self, pos: f64, vel: f64, target: f64) -> (f64, f64) {
        let offset = pos - target;
        let new_pos = offset * self.pos_pos + vel * self.pos_vel + target;
        let new_vel = offset * self.vel_pos + vel * self.vel_vel;
        (new_pos, new_vel)
    }
}
