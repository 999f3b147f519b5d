//! Matrices used by the renderer.

use glam::{Mat4, Vec2};

/// Model matrix of a unit quad placed at `position`, rotated by `rotation`
/// radians around `origin` (relative to `position`) and scaled to `size`.
///
/// Applied to a vertex the operations run right to left: scale, move the
/// pivot to the origin, rotate, move back, translate.
pub fn sprite_model(position: Vec2, size: Vec2, rotation: f32, origin: Vec2) -> Mat4 {
    Mat4::from_translation(position.extend(0.0))
        * Mat4::from_translation(origin.extend(0.0))
        * Mat4::from_rotation_z(rotation)
        * Mat4::from_translation((-origin).extend(0.0))
        * Mat4::from_scale(size.extend(1.0))
}

/// Orthographic projection for a `width` x `height` window with the origin
/// in the top-left corner and `y` growing downwards.
pub fn screen_projection(width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(0.0, width, height, 0.0, -1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn apply(m: Mat4, x: f32, y: f32) -> Vec2 {
        let v = m * Vec4::new(x, y, 0.0, 1.0);
        Vec2::new(v.x, v.y)
    }

    #[test]
    fn unrotated_sprite_scales_then_translates() {
        let m = sprite_model(Vec2::new(10.0, 20.0), Vec2::new(4.0, 2.0), 0.0, Vec2::ZERO);
        assert_eq!(apply(m, 0.0, 0.0), Vec2::new(10.0, 20.0));
        assert_eq!(apply(m, 1.0, 1.0), Vec2::new(14.0, 22.0));
    }

    #[test]
    fn rotation_pivots_around_origin() {
        let origin = Vec2::new(2.0, 2.0);
        let m = sprite_model(Vec2::ZERO, Vec2::new(4.0, 4.0), std::f32::consts::PI, origin);
        // Half a turn around the quad center maps each corner to the opposite one.
        let corner = apply(m, 0.0, 0.0);
        assert!((corner - Vec2::new(4.0, 4.0)).length() < 1e-5);
        let center = apply(m, 0.5, 0.5);
        assert!((center - origin).length() < 1e-5);
    }

    #[test]
    fn screen_projection_maps_corners_to_ndc() {
        let p = screen_projection(800.0, 600.0);
        assert!((apply(p, 0.0, 0.0) - Vec2::new(-1.0, 1.0)).length() < 1e-6);
        assert!((apply(p, 800.0, 600.0) - Vec2::new(1.0, -1.0)).length() < 1e-6);
    }
}
