//! Random walk in a rectangle, distance mode.
//!
//! Each walk picks a speed and a heading from the node's `"mobility"` stream
//! and lasts until the node has covered the configured distance. Walls
//! reflect the velocity component normal to them without ending the walk.

use super::{position_at, set_motion, velocity_of};
use crate::config::{GridLayout, RandomWalkConfig};
use crate::error::ScenarioError;
use netsim_simulation::Scheduler;
use netsim_types::{EntityId, SimDuration, SimTime, Vector};
use std::f64::consts::TAU;
use tracing::{trace, warn};

/// Random stream purpose for walk speeds and headings.
pub const MOBILITY_STREAM: &str = "mobility";

/// Distance within which a node counts as touching a wall.
const WALL_TOLERANCE: f64 = 1e-6;

/// Axis-aligned bounds of the movement area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rectangle {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Rectangle {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// `[0, cols * spacing + 1] x [0, rows * spacing + 1]`.
    pub fn for_layout(layout: &GridLayout) -> Self {
        Self::new(0.0, layout.width(), 0.0, layout.height())
    }

    pub fn contains(&self, p: Vector) -> bool {
        (self.x_min..=self.x_max).contains(&p.x) && (self.y_min..=self.y_max).contains(&p.y)
    }

    /// Nearest point inside the rectangle.
    pub fn clamp(&self, p: Vector) -> Vector {
        Vector::new(
            p.x.clamp(self.x_min, self.x_max),
            p.y.clamp(self.y_min, self.y_max),
            p.z,
        )
    }

    /// Seconds until a node at `p` moving with `v` reaches a wall.
    ///
    /// Infinite for a node at rest.
    pub fn time_to_wall(&self, p: Vector, v: Vector) -> f64 {
        let axis = |pos: f64, vel: f64, lo: f64, hi: f64| {
            if vel > 0.0 {
                (hi - pos) / vel
            } else if vel < 0.0 {
                (lo - pos) / vel
            } else {
                f64::INFINITY
            }
        };
        axis(p.x, v.x, self.x_min, self.x_max)
            .min(axis(p.y, v.y, self.y_min, self.y_max))
            .max(0.0)
    }

    /// Flip each velocity component that points out through a wall `p` touches.
    pub fn reflect(&self, p: Vector, v: Vector) -> Vector {
        let mut reflected = v;
        if (p.x <= self.x_min + WALL_TOLERANCE && v.x < 0.0)
            || (p.x >= self.x_max - WALL_TOLERANCE && v.x > 0.0)
        {
            reflected.x = -v.x;
        }
        if (p.y <= self.y_min + WALL_TOLERANCE && v.y < 0.0)
            || (p.y >= self.y_max - WALL_TOLERANCE && v.y > 0.0)
        {
            reflected.y = -v.y;
        }
        reflected
    }
}

/// Random-walk mobility model.
///
/// The model is `Copy` so each scheduled course change carries its own copy;
/// per-node state lives in the node's attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomWalk2d {
    bounds: Rectangle,
    config: RandomWalkConfig,
}

impl RandomWalk2d {
    pub fn new(bounds: Rectangle, config: RandomWalkConfig) -> Self {
        Self { bounds, config }
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    /// Start walking `node` from its current position.
    ///
    /// The node must already carry a position attribute.
    pub fn install(self, scheduler: &mut Scheduler, node: EntityId) -> Result<(), ScenarioError> {
        position_at(scheduler.entities(), node, scheduler.now())?;
        self.begin_walk(scheduler, node)
    }

    fn begin_walk(self, scheduler: &mut Scheduler, node: EntityId) -> Result<(), ScenarioError> {
        let now = scheduler.now();
        let position = self
            .bounds
            .clamp(position_at(scheduler.entities(), node, now)?);

        let random = scheduler.random_mut();
        let stream = random.stream_for(MOBILITY_STREAM, node);
        let speed = random.draw_uniform(stream, self.config.speed_min, self.config.speed_max)?;
        let heading = random.draw_uniform(stream, 0.0, TAU)?;
        let velocity = Vector::planar(speed * heading.cos(), speed * heading.sin());

        set_motion(scheduler.entities_mut(), node, position, velocity, now)?;

        let walk_end = now
            .checked_add(SimDuration::from_secs_f64(self.config.distance / speed))
            .unwrap_or(SimTime::MAX);
        trace!(%node, %position, speed, heading, %walk_end, "New walk");

        self.schedule_next(scheduler, node, position, velocity, walk_end)
    }

    fn rebound(
        self,
        scheduler: &mut Scheduler,
        node: EntityId,
        walk_end: SimTime,
    ) -> Result<(), ScenarioError> {
        let now = scheduler.now();
        let position = self
            .bounds
            .clamp(position_at(scheduler.entities(), node, now)?);
        let velocity = self
            .bounds
            .reflect(position, velocity_of(scheduler.entities(), node)?);

        set_motion(scheduler.entities_mut(), node, position, velocity, now)?;
        trace!(%node, %position, %velocity, "Rebound");

        self.schedule_next(scheduler, node, position, velocity, walk_end)
    }

    /// Schedule whichever comes first: the next wall or the end of the walk.
    fn schedule_next(
        self,
        scheduler: &mut Scheduler,
        node: EntityId,
        position: Vector,
        velocity: Vector,
        walk_end: SimTime,
    ) -> Result<(), ScenarioError> {
        let to_wall = self.bounds.time_to_wall(position, velocity);
        let wall_time = if to_wall.is_finite() {
            scheduler
                .now()
                .checked_add(SimDuration::from_secs_f64(to_wall))
        } else {
            None
        };

        match wall_time {
            Some(at) if at < walk_end => {
                scheduler.schedule_at(at, move |s| {
                    log_failure(node, self.rebound(s, node, walk_end));
                })?;
            }
            _ => {
                scheduler.schedule_at(walk_end, move |s| {
                    log_failure(node, self.begin_walk(s, node));
                })?;
            }
        }
        Ok(())
    }
}

fn log_failure(node: EntityId, result: Result<(), ScenarioError>) {
    if let Err(error) = result {
        warn!(%node, %error, "Mobility update failed, node stops moving");
    }
}
