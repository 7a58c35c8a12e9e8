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

//! Per-frame execution statistics.

use std::fmt;

/// Counters collected while one frame is displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Executed command buffers, the entry point included.
    pub command_buffers: u32,
    /// Issued draw calls.
    pub draw_calls: u32,
    /// Issued clears.
    pub clears: u32,
    /// Executed uploads.
    pub uploads: u32,
    /// Render targets pushed.
    pub render_targets: u32,
    /// State values turned into device calls.
    pub state_changes: u32,
    /// State values already bound on the device.
    pub redundant_states: u32,
    /// Whole blocks skipped because nearer blocks covered them.
    pub skipped_blocks: u32,
    /// Changes of the active shader permutation.
    pub permutation_switches: u32,
    /// Permutations compiled this frame.
    pub permutations_compiled: u32,
    /// Transient targets still held when their stack frame was popped.
    pub leaked_transients: u32,
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buffers, {} draws, {} clears, {} uploads, {} targets, {} state changes ({} redundant, {} blocks skipped), {} permutation switches ({} compiled), {} leaked transients",
            self.command_buffers,
            self.draw_calls,
            self.clears,
            self.uploads,
            self.render_targets,
            self.state_changes,
            self.redundant_states,
            self.skipped_blocks,
            self.permutation_switches,
            self.permutations_compiled,
            self.leaked_transients
        )
    }
}
