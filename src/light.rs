use crate::math::Vec3;
use crate::scene_graph::{NodeKind, Scene};

#[derive(Clone, Debug)]
pub enum LightKind {
    /// Uniform contribution, independent of surface orientation.
    Ambient,
    /// Shines from the light's world position toward `target`.
    Directional { target: Vec3 },
}

#[derive(Clone, Debug)]
pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
}

impl Light {
    pub fn ambient(color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Ambient,
        }
    }

    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Directional { target: Vec3::ZERO },
        }
    }

    pub fn scaled_color(&self) -> Vec3 {
        self.color * self.intensity
    }
}

/// Scene-wide lighting terms for one frame.
pub struct LightTotals {
    pub ambient: Vec3,
    pub directional_color: Vec3,
    pub direction: Vec3,
}

/// Sums ambient and directional colors over every light reachable from the
/// root. Directional directions are not blended: the last directional light
/// in traversal order wins. Content with a single directional light relies
/// on this, so it stays even though it looks like a bug.
pub fn aggregate_lights(scene: &Scene) -> LightTotals {
    let mut totals = LightTotals {
        ambient: Vec3::ZERO,
        directional_color: Vec3::ZERO,
        direction: Vec3::Y,
    };

    scene.traverse(scene.root(), &mut |_, node| {
        let NodeKind::Light(light) = &node.kind else {
            return;
        };
        match &light.kind {
            LightKind::Ambient => totals.ambient += light.scaled_color(),
            LightKind::Directional { target } => {
                totals.directional_color += light.scaled_color();
                let direction = node.transform.world_position() - *target;
                if direction.length_squared() > 0.0 {
                    totals.direction = direction.normalize();
                }
            }
        }
    });

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::Node;

    #[test]
    fn colors_sum_but_last_direction_wins() {
        let mut scene = Scene::new();

        let ambient = scene.alloc(Node::new(
            "ambient",
            NodeKind::Light(Light::ambient(Vec3::ONE, 0.5)),
        ));
        let first = scene.alloc(Node::new(
            "sun",
            NodeKind::Light(Light::directional(Vec3::new(1.0, 0.0, 0.0), 1.0)),
        ));
        let second = scene.alloc(Node::new(
            "fill",
            NodeKind::Light(Light::directional(Vec3::new(0.0, 1.0, 0.0), 0.5)),
        ));
        scene.attach(scene.root(), ambient);
        scene.attach(scene.root(), first);
        scene.attach(scene.root(), second);

        scene
            .get_mut(first)
            .unwrap()
            .transform
            .set_position(Vec3::new(0.0, 10.0, 0.0));
        scene
            .get_mut(second)
            .unwrap()
            .transform
            .set_position(Vec3::new(5.0, 0.0, 0.0));
        scene.update_world_transforms();

        let totals = aggregate_lights(&scene);
        assert_eq!(totals.ambient, Vec3::splat(0.5));
        assert_eq!(totals.directional_color, Vec3::new(1.0, 0.5, 0.0));
        // Direction comes from the second light only.
        assert_eq!(totals.direction, Vec3::X);
    }
}
