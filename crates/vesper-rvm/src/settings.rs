// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Settings of the render virtual machine.

use serde::Deserialize;
use thiserror::Error;
use vesper_core::renderer::{CompareFunction, PolygonMode, TriangleFace, MAX_TEXTURE_SAMPLERS};

/// The device state every frame starts from.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BaselineState {
    /// The culled face.
    pub cull_face: TriangleFace,
    /// The rasterization mode.
    pub polygon_mode: PolygonMode,
    /// Whether depth is written.
    pub depth_write: bool,
    /// The depth compare function.
    pub depth_function: CompareFunction,
    /// The alpha compare function, `Disabled` turns the test off.
    pub alpha_function: CompareFunction,
}

impl Default for BaselineState {
    fn default() -> Self {
        Self {
            cull_face: TriangleFace::Back,
            polygon_mode: PolygonMode::Fill,
            depth_write: true,
            depth_function: CompareFunction::LessEqual,
            alpha_function: CompareFunction::Disabled,
        }
    }
}

/// A collection of settings that affect command replay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RvmSettings {
    /// The maximum nesting of executed command buffers.
    pub max_stack_frames: usize,
    /// How many texture samplers are unbound by a reset.
    pub reset_texture_slots: u8,
    /// Whether `display` asserts it runs on the thread that created the RVM (debug builds only).
    pub assert_device_thread: bool,
    /// Whether the statistics of every frame are logged at debug level.
    pub log_frame_stats: bool,
    /// The device state restored after every frame.
    pub baseline: BaselineState,
}

impl Default for RvmSettings {
    fn default() -> Self {
        Self {
            max_stack_frames: 8,
            reset_texture_slots: MAX_TEXTURE_SAMPLERS,
            assert_device_thread: true,
            log_frame_stats: true,
            baseline: BaselineState::default(),
        }
    }
}

/// An error raised while loading [`RvmSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The document is not valid RON for the settings.
    #[error("failed to parse RVM settings: {0}")]
    Parse(String),
    /// A field holds a value outside its range.
    #[error("invalid RVM setting `{field}`: {reason}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// Why the value is rejected.
        reason: String,
    },
}

impl RvmSettings {
    /// Parses settings from a RON document. Missing fields keep their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, SettingsError> {
        let settings: Self =
            ron::de::from_str(source).map_err(|e| SettingsError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks every field is in range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_stack_frames == 0 {
            return Err(SettingsError::InvalidValue {
                field: "max_stack_frames",
                reason: "at least one stack frame is required".to_owned(),
            });
        }
        if self.reset_texture_slots > MAX_TEXTURE_SAMPLERS {
            return Err(SettingsError::InvalidValue {
                field: "reset_texture_slots",
                reason: format!("at most {MAX_TEXTURE_SAMPLERS} samplers exist"),
            });
        }
        Ok(())
    }
}
