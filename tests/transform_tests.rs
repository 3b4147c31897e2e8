//! Transform tests
//!
//! Tests for:
//! - Transform TRS operations and dirty checking
//! - Euler angle round-trip conversions
//! - Pose conversion

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::{Affine3A, Quat, Vec3};

use kinesis::animation::Pose;
use kinesis::scene::Transform;

const EPSILON: f32 = 1e-5;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

#[test]
fn transform_default_is_identity() {
    let t = Transform::new();
    assert_eq!(t.position, Vec3::ZERO);
    assert_eq!(t.rotation, Quat::IDENTITY);
    assert_eq!(t.scale, Vec3::ONE);
}

#[test]
fn transform_update_local_matrix_dirty_check() {
    let mut t = Transform::new();

    // First call always rebuilds.
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.position = Vec3::new(1.0, 0.0, 0.0);
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.mark_dirty();
    assert!(t.update_local_matrix());
}

#[test]
fn transform_local_matrix_applies_scale_rotation_translation() {
    let mut t = Transform::new();
    t.position = Vec3::new(1.0, 2.0, 3.0);
    t.rotation = Quat::from_rotation_z(FRAC_PI_2);
    t.scale = Vec3::splat(2.0);
    t.update_local_matrix();

    let p = t.local_matrix().transform_point3(Vec3::X);
    assert!(vec3_approx(p, Vec3::new(1.0, 4.0, 3.0)), "got {p:?}");
}

#[test]
fn transform_euler_round_trip() {
    let mut t = Transform::new();
    let euler = Vec3::new(FRAC_PI_4, -0.3, 0.7);
    t.set_rotation_euler(euler);
    assert!(vec3_approx(t.rotation_euler(), euler));
}

#[test]
fn transform_pose_round_trip() {
    let pose = Pose::from_euler(Vec3::new(4.0, 5.0, 6.0), Vec3::new(0.0, FRAC_PI_2, 0.0), Vec3::splat(0.5));
    let mut t = Transform::from_pose(&pose);
    assert_eq!(t.pose(), pose);

    t.set_pose(&Pose::IDENTITY);
    assert_eq!(t.pose(), Pose::IDENTITY);
    assert!(t.update_local_matrix());
}

#[test]
fn transform_world_matrix_as_mat4() {
    let mut t = Transform::new();
    t.set_world_matrix(Affine3A::from_translation(Vec3::new(0.0, 7.0, 0.0)));

    let m = t.world_matrix_as_mat4();
    assert!(vec3_approx(m.transform_point3(Vec3::ZERO), Vec3::new(0.0, 7.0, 0.0)));
    assert_eq!(*t.world_matrix(), Affine3A::from_translation(Vec3::new(0.0, 7.0, 0.0)));
}
