use crate::config::PhysicsConfig;
use crate::geometry::{Rect, Vec2};
use crate::rng::Rng;

/// Kinematic state of an entity that can rest on the work surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    /// Top-left corner.
    pub position: Vec2,
    pub size: Vec2,
    /// Pixels per second.
    pub velocity: Vec2,
    /// Degrees.
    pub angle: f32,
    /// Degrees per second.
    pub spin: f32,
    /// Static bodies never move; they still block dynamic ones.
    pub is_static: bool,
}

impl Body {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            velocity: Vec2::ZERO,
            angle: 0.0,
            spin: 0.0,
            is_static: false,
        }
    }

    pub fn fixed(position: Vec2, size: Vec2) -> Self {
        Self {
            is_static: true,
            ..Self::new(position, size)
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }

    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }

    pub fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
        self.spin = 0.0;
    }
}

/// Velocity changes applied to one colliding pair in a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairImpulse {
    pub first: usize,
    pub second: usize,
    pub delta_first: Vec2,
    pub delta_second: Vec2,
    pub spin_first: f32,
    pub spin_second: f32,
}

/// Soft, heavily damped physics for entities lying free on the surface.
pub struct SurfacePhysics<'a> {
    config: &'a PhysicsConfig,
}

impl<'a> SurfacePhysics<'a> {
    pub fn new(config: &'a PhysicsConfig) -> Self {
        Self { config }
    }

    /// One tick over the free bodies: pairwise separation, integration,
    /// then containment in the surface rectangle.
    pub fn step(&self, bodies: &mut [&mut Body], dt: f32, rng: &mut Rng) -> Vec<PairImpulse> {
        let impulses = self.separate(bodies, rng);
        for body in bodies.iter_mut() {
            self.integrate(body, dt);
            self.contain(body);
        }
        impulses
    }

    pub fn integrate(&self, body: &mut Body, dt: f32) {
        if body.is_static {
            body.stop();
            return;
        }
        body.position += body.velocity * dt;
        body.angle = (body.angle + body.spin * dt) % 360.0;

        let decay = (-self.config.friction_rate * dt).exp();
        body.velocity = body.velocity * decay;
        body.spin *= decay;

        let eps = self.config.velocity_epsilon;
        if body.velocity.x.abs() < eps {
            body.velocity.x = 0.0;
        }
        if body.velocity.y.abs() < eps {
            body.velocity.y = 0.0;
        }
        if body.spin.abs() < eps {
            body.spin = 0.0;
        }
    }

    /// Clamps the body inside the surface; the velocity component pointing
    /// out of the wall is dropped, no bounce.
    pub fn contain(&self, body: &mut Body) {
        let surface = self.config.surface;
        let max_x = (surface.right() - body.size.x).max(surface.x);
        let max_y = (surface.bottom() - body.size.y).max(surface.y);

        if body.position.x < surface.x {
            body.position.x = surface.x;
            body.velocity.x = 0.0;
        } else if body.position.x > max_x {
            body.position.x = max_x;
            body.velocity.x = 0.0;
        }
        if body.position.y < surface.y {
            body.position.y = surface.y;
            body.velocity.y = 0.0;
        } else if body.position.y > max_y {
            body.position.y = max_y;
            body.velocity.y = 0.0;
        }
    }

    pub fn separate(&self, bodies: &mut [&mut Body], rng: &mut Rng) -> Vec<PairImpulse> {
        let mut impulses = Vec::new();
        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let (head, tail) = bodies.split_at_mut(j);
                let a = &mut *head[i];
                let b = &mut *tail[0];
                if let Some(mut impulse) = self.resolve_pair(a, b, rng) {
                    impulse.first = i;
                    impulse.second = j;
                    impulses.push(impulse);
                }
            }
        }
        impulses
    }

    /// Pushes two overlapping bodies apart along the line between their
    /// centers with equal and opposite velocity changes. A static body takes
    /// its share too; `integrate` zeroes it before it can move.
    pub fn resolve_pair(&self, a: &mut Body, b: &mut Body, rng: &mut Rng) -> Option<PairImpulse> {
        if a.is_static && b.is_static {
            return None;
        }
        let shrink = self.config.collision_shrink;
        if !a.rect().scaled(shrink).intersects(&b.rect().scaled(shrink)) {
            return None;
        }

        let between = a.center() - b.center();
        let length = between.length();
        let direction = if length <= f32::EPSILON {
            rng.unit_vector()
        } else {
            between * (1.0 / length)
        };
        let push = direction * self.config.push_impulse;
        let spin = rng.range(0.0, self.config.spin_impulse_max);

        let (delta_a, delta_b, spin_a, spin_b) = (push, -push, spin, -spin);

        a.velocity += delta_a;
        a.spin += spin_a;
        b.velocity += delta_b;
        b.spin += spin_b;

        Some(PairImpulse {
            first: 0,
            second: 0,
            delta_first: delta_a,
            delta_second: delta_b,
            spin_first: spin_a,
            spin_second: spin_b,
        })
    }
}
