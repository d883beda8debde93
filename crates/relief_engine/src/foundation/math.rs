//! Math utilities and types
//!
//! Provides the fundamental math types used by the camera, the scene records
//! and the uniform writer. All matrices follow the OpenGL conventions the
//! shaders expect: right-handed view space, clip-space depth in [-1, 1].

pub use nalgebra::{Matrix4, UnitQuaternion, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Build a model matrix from a position, per-axis Euler rotation in radians
/// and a scale.
///
/// The rotation is applied as `X * Y * Z`, so the Z rotation acts first on
/// the scaled geometry.
pub fn euler_transform(position: Vec3, rotation: Vec3, scale: Vec3) -> Mat4 {
    let rotation = Mat4::rotation_x(rotation.x)
        * Mat4::rotation_y(rotation.y)
        * Mat4::rotation_z(rotation.z);

    Mat4::new_translation(&position) * rotation * Mat4::new_nonuniform_scaling(&scale)
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a rotation matrix around the X axis
    fn rotation_x(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Z axis
    fn rotation_z(angle: f32) -> Mat4;

    /// Create a right-handed perspective projection with clip depth in [-1, 1]
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_x(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::x_axis(), angle)
    }

    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [f/a  0   0            0          ]
        //     [0    f   0            0          ]
        //     [0    0   (f+n)/(n-f)  2fn/(n-f)  ]
        //     [0    0   -1           0          ]
        let focal = 1.0 / (fov_y * 0.5).tan();
        let depth = near - far;

        let mut result = Mat4::zeros();
        result[(0, 0)] = focal / aspect;
        result[(1, 1)] = focal;
        result[(2, 2)] = (far + near) / depth;
        result[(2, 3)] = (2.0 * far * near) / depth;
        result[(3, 2)] = -1.0;

        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn look_at_maps_eye_to_origin() {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let view = Mat4::look_at(eye, Vec3::zeros(), Vec3::y());
        let mapped = view.transform_point(&Point3::from(eye));

        assert_relative_eq!(mapped.coords, Vec3::zeros(), epsilon = 1e-6);
    }

    #[test]
    fn look_at_target_lies_on_negative_z() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let mapped = view.transform_point(&Point3::origin());

        assert_relative_eq!(mapped.coords, Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-6);
    }

    #[test]
    fn perspective_maps_near_and_far_planes() {
        let projection = Mat4::perspective(utils::deg_to_rad(80.0), 1.5, 0.1, 100.0);

        let near = projection * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = projection * Vec4::new(0.0, 0.0, -100.0, 1.0);

        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-4);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn euler_transform_places_origin_at_position() {
        let matrix = euler_transform(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.3, -1.2, 0.7),
            Vec3::new(2.0, 2.0, 2.0),
        );
        let origin = matrix.transform_point(&Point3::origin());

        assert_relative_eq!(origin.coords, Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
    }
}
