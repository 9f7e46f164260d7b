//! Rotation/pose math kit (§4.1): rotation matrix construction and
//! decomposition, angular distance, slerp, intrinsics scaling, and the
//! pixel/ray/equirectangular projections shared by the correlator and
//! the ring stitcher.

pub mod intrinsics_scale;
pub mod rotation;
pub mod slerp;
pub mod sphere;

pub use intrinsics_scale::scale_to_size;
pub use rotation::{
    angle_between, extract_euler_xyz, rotation_of, rotation_vector, rotation_x, rotation_y,
    rotation_z, to_4x4, with_rotation, EulerAngles,
};
pub use slerp::{lerp, slerp as slerp_pose};
pub use sphere::{
    camera_ray_to_pixel, equirect_to_ray, pixel_to_camera_ray, pixel_to_world_ray, ray_to_equirect,
    ray_to_equirect_unwrapped, world_ray_to_pixel, EquirectCanvas,
};
