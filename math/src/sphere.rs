use nalgebra::Vector3;
use panorama_types::intrinsics::Intrinsics;
use panorama_types::pose::Rotation3;

/// Dimensions of the shared equirectangular canvas that frames are warped
/// onto for overlap extraction (§4.2) and ring stitching (§4.10).
#[derive(Debug, Clone, Copy)]
pub struct EquirectCanvas {
    pub width: u32,
    pub height: u32,
}

/// Projects a camera-space ray (already rotated into world/sphere space)
/// onto continuous equirectangular pixel coordinates. `u` wraps modulo
/// `width`; callers that need the unwrapped (possibly negative or
/// beyond-width) coordinate should use [`ray_to_equirect_unwrapped`].
pub fn ray_to_equirect(ray: &Vector3<f64>, canvas: EquirectCanvas) -> (f64, f64) {
    let (u, v) = ray_to_equirect_unwrapped(ray, canvas);
    (u.rem_euclid(canvas.width as f64), v)
}

pub fn ray_to_equirect_unwrapped(ray: &Vector3<f64>, canvas: EquirectCanvas) -> (f64, f64) {
    let lon = ray.z.atan2(ray.x); // [-pi, pi]
    let lat = (ray.y / ray.norm()).clamp(-1.0, 1.0).asin(); // [-pi/2, pi/2]
    let u = (lon + std::f64::consts::PI) / (2.0 * std::f64::consts::PI) * canvas.width as f64;
    let v = (lat + std::f64::consts::FRAC_PI_2) / std::f64::consts::PI * canvas.height as f64;
    (u, v)
}

pub fn equirect_to_ray(u: f64, v: f64, canvas: EquirectCanvas) -> Vector3<f64> {
    let lon = (u / canvas.width as f64) * 2.0 * std::f64::consts::PI - std::f64::consts::PI;
    let lat = (v / canvas.height as f64) * std::f64::consts::PI - std::f64::consts::FRAC_PI_2;
    Vector3::new(lat.cos() * lon.sin(), lat.sin(), lat.cos() * lon.cos())
}

/// Pinhole back-projection: image pixel -> camera-space ray.
pub fn pixel_to_camera_ray(intrinsics: &Intrinsics, px: f64, py: f64) -> Vector3<f64> {
    let x = (px - intrinsics.cx) / intrinsics.fx;
    let y = (py - intrinsics.cy) / intrinsics.fy;
    Vector3::new(x, y, 1.0).normalize()
}

/// Pinhole projection: camera-space ray -> image pixel, `None` if the ray
/// points behind the camera.
pub fn camera_ray_to_pixel(intrinsics: &Intrinsics, ray: &Vector3<f64>) -> Option<(f64, f64)> {
    if ray.z <= 1e-6 {
        return None;
    }
    let x = ray.x / ray.z;
    let y = ray.y / ray.z;
    Some((x * intrinsics.fx + intrinsics.cx, y * intrinsics.fy + intrinsics.cy))
}

/// World-space ray for a given camera pixel under `rotation` (the
/// selection point's / frame's 3x3 extrinsics).
pub fn pixel_to_world_ray(intrinsics: &Intrinsics, rotation: &Rotation3, px: f64, py: f64) -> Vector3<f64> {
    rotation * pixel_to_camera_ray(intrinsics, px, py)
}

/// Inverse: project a world-space ray back into a camera pixel under
/// `rotation`.
pub fn world_ray_to_pixel(
    intrinsics: &Intrinsics,
    rotation: &Rotation3,
    ray: &Vector3<f64>,
) -> Option<(f64, f64)> {
    let camera_ray = rotation.transpose() * ray;
    camera_ray_to_pixel(intrinsics, &camera_ray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    #[test]
    fn ray_equirect_roundtrip() {
        let canvas = EquirectCanvas {
            width: 4096,
            height: 2048,
        };
        let ray = Vector3::new(0.3, 0.2, 0.9).normalize();
        let (u, v) = ray_to_equirect(&ray, canvas);
        let back = equirect_to_ray(u, v, canvas);
        assert!((ray - back).norm() < 1e-6);
    }

    #[test]
    fn pixel_camera_ray_roundtrip() {
        let intrinsics = Intrinsics::new(1000.0, 1000.0, 512.0, 384.0, 1024, 768);
        let ray = pixel_to_camera_ray(&intrinsics, 600.0, 300.0);
        let px = camera_ray_to_pixel(&intrinsics, &ray).unwrap();
        assert!((px.0 - 600.0).abs() < 1e-6);
        assert!((px.1 - 300.0).abs() < 1e-6);
    }

    #[test]
    fn world_ray_roundtrip_identity_rotation() {
        let intrinsics = Intrinsics::new(1000.0, 1000.0, 512.0, 384.0, 1024, 768);
        let rotation = Matrix3::identity();
        let ray = pixel_to_world_ray(&intrinsics, &rotation, 400.0, 500.0);
        let px = world_ray_to_pixel(&intrinsics, &rotation, &ray).unwrap();
        assert!((px.0 - 400.0).abs() < 1e-6);
        assert!((px.1 - 500.0).abs() < 1e-6);
    }
}
