//! Parallel per-frame scene compilation

use crate::camera::CameraPose;
use crate::compiler::{SceneCompiler, SceneFragment};
use crate::geometry::GeometryFragment;
use pcrender_core::Result;
use rayon::prelude::*;

/// A compiled frame with its index in the sequence
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFrame {
    pub index: usize,
    pub pose: CameraPose,
    pub scene: SceneFragment,
}

/// Compile one scene per pose on the rayon pool.
///
/// Frames are independent and may be compiled in any order; the result is
/// always in pose order. The first failing frame fails the whole call.
#[tracing::instrument(skip_all, fields(frames = poses.len()))]
pub fn compile_frames(
    compiler: &SceneCompiler,
    geometry: &GeometryFragment,
    poses: &[CameraPose],
) -> Result<Vec<CompiledFrame>> {
    poses
        .par_iter()
        .enumerate()
        .map(|(index, pose)| {
            let scene = compiler.compile(geometry, &pose.to_scene_fragment())?;
            Ok(CompiledFrame {
                index,
                pose: *pose,
                scene,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SceneGeometryBuilder;
    use crate::turntable::{generate, OrbitSpec};
    use pcrender_core::{Color, Point3d};

    #[test]
    fn test_frames_in_pose_order() {
        let points = vec![Point3d::origin(), Point3d::new(0.2, 0.1, 0.0)];
        let geometry = SceneGeometryBuilder::new()
            .build(&points, &[Color::WHITE, Color::BLACK])
            .unwrap();
        let base = CameraPose::parse("2,0,0.5").unwrap();
        let poses = generate(&base, &OrbitSpec::default(), 16).unwrap();

        let compiler = SceneCompiler::default();
        let frames = compile_frames(&compiler, &geometry, &poses).unwrap();

        assert_eq!(frames.len(), 16);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index, i);
            assert_eq!(frame.pose, poses[i]);
            let sequential = compiler.compile(&geometry, &poses[i].to_scene_fragment()).unwrap();
            assert_eq!(frame.scene, sequential);
        }
        assert_ne!(frames[0].scene, frames[1].scene);
    }
}
