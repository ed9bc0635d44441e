//! Job configuration for the render orchestrator

use crate::animation::DEFAULT_FRAME_DURATION;
use crate::develop::OutputFormat;
use crate::invoke::{CancelToken, DEFAULT_VARIANT};
use pcrender_core::Preprocess;
use pcrender_scene::{
    ColorPolicy, GroundSpec, LightingSpec, PointShape, SceneSettings, DEFAULT_POINT_RADIUS,
};
use std::path::PathBuf;
use std::time::Duration;

/// What goes into a scene: point preparation, colors, ground and lights
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRecipe {
    pub preprocess: Preprocess,
    pub color: ColorPolicy,
    pub ground: GroundSpec,
    pub lighting: LightingSpec,
    pub point_radius: f64,
    pub point_shape: PointShape,
}

impl Default for SceneRecipe {
    fn default() -> Self {
        Self {
            preprocess: Preprocess::default().with_standardize(true),
            color: ColorPolicy::default(),
            ground: GroundSpec::default(),
            lighting: LightingSpec::default(),
            point_radius: DEFAULT_POINT_RADIUS,
            point_shape: PointShape::default(),
        }
    }
}

impl SceneRecipe {
    pub fn with_preprocess(mut self, preprocess: Preprocess) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn with_color(mut self, color: ColorPolicy) -> Self {
        self.color = color;
        self
    }

    pub fn with_ground(mut self, ground: GroundSpec) -> Self {
        self.ground = ground;
        self
    }

    pub fn with_lighting(mut self, lighting: LightingSpec) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_point_radius(mut self, radius: f64) -> Self {
        self.point_radius = radius;
        self
    }

    pub fn with_point_shape(mut self, shape: PointShape) -> Self {
        self.point_shape = shape;
        self
    }
}

/// How frames are rendered and developed
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub scene: SceneSettings,
    /// Renderer variant passed with `-m`
    pub variant: String,
    /// Format of still images. Animation frames are always PNG.
    pub format: OutputFormat,
    /// Mirror developed images left to right
    pub flip_horizontal: bool,
    /// Renderer processes allowed to run at once
    pub parallelism: usize,
    /// Per-frame time limit
    pub timeout: Option<Duration>,
    /// Leave scene files and raw images next to the output
    pub keep_intermediates: bool,
    pub cancel: CancelToken,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            scene: SceneSettings::default(),
            variant: DEFAULT_VARIANT.to_string(),
            format: OutputFormat::default(),
            flip_horizontal: true,
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            timeout: None,
            keep_intermediates: false,
            cancel: CancelToken::new(),
        }
    }
}

impl RenderSettings {
    pub fn with_scene(mut self, scene: SceneSettings) -> Self {
        self.scene = scene;
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_flip_horizontal(mut self, flip: bool) -> Self {
        self.flip_horizontal = flip;
        self
    }

    /// At least one renderer process always runs
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_keep_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Output of a turntable animation
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSettings {
    pub output: PathBuf,
    pub frame_duration: Duration,
    /// Keep developed frames here; a temporary directory is used otherwise
    pub frames_dir: Option<PathBuf>,
}

impl AnimationSettings {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            frame_duration: DEFAULT_FRAME_DURATION,
            frames_dir: None,
        }
    }

    pub fn with_frame_duration(mut self, duration: Duration) -> Self {
        self.frame_duration = duration;
        self
    }

    pub fn with_frames_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.frames_dir = dir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RenderSettings::default();
        assert_eq!(settings.variant, "scalar_rgb");
        assert!(settings.flip_horizontal);
        assert!(settings.parallelism >= 1);
        assert!(!settings.keep_intermediates);

        let recipe = SceneRecipe::default();
        assert!(recipe.preprocess.standardize);
        assert_eq!(recipe.ground, GroundSpec::Standard);

        let animation = AnimationSettings::new("spin.gif");
        assert_eq!(animation.frame_duration, Duration::from_millis(100));
    }

    #[test]
    fn test_parallelism_at_least_one() {
        assert_eq!(RenderSettings::default().with_parallelism(0).parallelism, 1);
    }
}
