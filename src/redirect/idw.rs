//! Inverse-distance-weighted redirection over all position pairs of a
//! target. Each pair contributes its real-to-virtual offset, weighted by
//! `1 / d^p` of the hand's distance to the pair's real position.

use crate::math::Vec3;
use crate::redirect::ApplyContext;

#[derive(Debug, Clone, Copy)]
pub struct IdwConfig {
    /// Weighting power. Higher values localize each pair's influence.
    pub power: f32,
}

impl Default for IdwConfig {
    fn default() -> Self {
        Self { power: 2.0 }
    }
}

pub(crate) fn apply(config: &IdwConfig, ctx: &ApplyContext) -> Vec3 {
    let x = ctx.real_hand.position;

    let mut offset_sum = Vec3::ZERO;
    let mut weight_sum = 0.0;

    for pair in ctx.pairs {
        let d = x.distance(pair.real.position);
        if d == 0.0 {
            // exactly on a control point: its offset applies verbatim
            return x + pair.virtual_pose.position - pair.real.position;
        }
        let w = (1.0 / d).powf(config.power);
        offset_sum = offset_sum + (pair.virtual_pose.position - pair.real.position) * w;
        weight_sum += w;
    }

    x + offset_sum / weight_sum
}
