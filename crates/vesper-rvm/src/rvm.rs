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

//! The render virtual machine.

use crate::permutation::PermutationCache;
use crate::registry::ResourceRegistry;
use crate::settings::RvmSettings;
use crate::stats::FrameStats;
use crate::target_stack::IntermediateTargetStack;
use smallvec::SmallVec;
use std::thread::{self, ThreadId};
use vesper_core::math::{Rect, Viewport};
use vesper_core::renderer::{
    BlendFactor, BufferId, CommandBufferId, CompareFunction, ConstantBufferHandle,
    FeatureRegistry, IndexBufferHandle, InputLayoutHandle, InputLayoutId, OpCode,
    PipelineFeatures, PolygonMode, ProgramId, RenderDevice, RenderError, RenderFrame,
    RenderTargetHandle, RenderTargetId, ShaderHandle, State, StateChain, StateMask, TextureId,
    TextureSource, TransientTexture, TriangleFace, VertexBufferHandle, MAX_CONSTANT_BUFFERS,
    MAX_TEXTURE_SAMPLERS,
};

/// The shader selection of the draw calls issued so far.
#[derive(Debug, Clone, Copy, Default)]
struct ActiveShader {
    shader: ShaderHandle,
    features: PipelineFeatures,
    program: Option<ProgramId>,
}

/// What the device currently has bound, per state slot.
#[derive(Debug, Clone, Copy)]
struct BoundState {
    program: Option<ProgramId>,
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    input_layout: Option<InputLayoutId>,
    constant_buffers: [Option<BufferId>; MAX_CONSTANT_BUFFERS as usize],
    textures: [Option<TextureId>; MAX_TEXTURE_SAMPLERS as usize],
    alpha_test: (CompareFunction, u8),
    depth_state: (bool, CompareFunction),
    blending: (BlendFactor, BlendFactor),
    cull_face: TriangleFace,
    polygon_offset: (i16, i16),
    polygon_mode: PolygonMode,
}

impl Default for BoundState {
    fn default() -> Self {
        Self {
            program: None,
            vertex_buffer: None,
            index_buffer: None,
            input_layout: None,
            constant_buffers: [None; MAX_CONSTANT_BUFFERS as usize],
            textures: [None; MAX_TEXTURE_SAMPLERS as usize],
            alpha_test: (CompareFunction::Disabled, 0),
            depth_state: (true, CompareFunction::LessEqual),
            blending: (BlendFactor::One, BlendFactor::Zero),
            cull_face: TriangleFace::Back,
            polygon_offset: (0, 0),
            polygon_mode: PolygonMode::Fill,
        }
    }
}

/// A bound render target and its viewport.
#[derive(Debug, Clone, Copy)]
struct Pass {
    target: Option<RenderTargetId>,
    rect: Rect,
}

/// Stores `value` into a bound-state slot. Returns `true` if the device
/// needs to be told.
fn update<T: PartialEq>(slot: &mut T, value: T, stats: &mut FrameStats) -> bool {
    if *slot == value {
        stats.redundant_states += 1;
        false
    } else {
        *slot = value;
        stats.state_changes += 1;
        true
    }
}

/// Replays recorded frames against a device.
///
/// The RVM is single-threaded and must be driven from the thread that owns
/// the device; debug builds assert this in [`display`](Self::display).
#[derive(Debug)]
pub struct Rvm<D: RenderDevice> {
    device: D,
    registry: ResourceRegistry,
    features: FeatureRegistry,
    permutations: PermutationCache,
    targets: IntermediateTargetStack,
    settings: RvmSettings,
    passes: Vec<Pass>,
    active: ActiveShader,
    bound: BoundState,
    stats: FrameStats,
    leaked: Vec<RenderTargetHandle>,
    owner: ThreadId,
}

impl<D: RenderDevice> Rvm<D> {
    /// Creates an RVM driving `device` and brings the device to the baseline
    /// state.
    ///
    /// # Panics
    ///
    /// Panics if `settings` fails [`RvmSettings::validate`].
    pub fn new(device: D, features: FeatureRegistry, settings: RvmSettings) -> Self {
        if let Err(err) = settings.validate() {
            panic!("{err}");
        }
        let targets = IntermediateTargetStack::new(settings.max_stack_frames);
        let mut rvm = Self {
            device,
            registry: ResourceRegistry::new(),
            features,
            permutations: PermutationCache::new(),
            targets,
            settings,
            passes: Vec::new(),
            active: ActiveShader::default(),
            bound: BoundState::default(),
            stats: FrameStats::default(),
            leaked: Vec::new(),
            owner: thread::current().id(),
        };
        rvm.seed_device();
        log::info!(
            "RVM initialized ({} user features, {} stack frames)",
            rvm.features.len(),
            rvm.settings.max_stack_frames
        );
        rvm
    }

    /// Returns the device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns the device mutably.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Returns the resource registry.
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Returns the resource registry for creating resources.
    pub fn registry_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.registry
    }

    /// Returns the feature registry.
    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    /// Returns the permutation cache.
    pub fn permutations(&self) -> &PermutationCache {
        &self.permutations
    }

    /// Returns the settings.
    pub fn settings(&self) -> &RvmSettings {
        &self.settings
    }

    /// Replays `frame`, resets the device to the baseline state and clears
    /// the frame.
    ///
    /// Pending resources are constructed first. Transient targets leaked by
    /// the frame are returned to the registry once it has been replayed. On a
    /// backend failure the frame is abandoned, but the device is still reset
    /// and the frame still cleared.
    pub fn display(&mut self, frame: &mut RenderFrame) -> Result<FrameStats, RenderError> {
        if self.settings.assert_device_thread {
            debug_assert_eq!(
                thread::current().id(),
                self.owner,
                "RVM display called from a thread that does not own the device"
            );
        }
        self.stats = FrameStats::default();

        let result = self.replay(frame);
        if result.is_err() {
            let unwound = self.targets.unwind();
            self.leaked.extend(unwound);
            self.passes.clear();
        }

        self.reset();
        for handle in self.leaked.drain(..) {
            self.registry.release_render_target(handle);
        }
        frame.clear();
        result?;

        if self.settings.log_frame_stats {
            log::debug!("Frame displayed: {}", self.stats);
        }
        Ok(self.stats)
    }

    fn replay(&mut self, frame: &RenderFrame) -> Result<(), RenderError> {
        self.registry.construct_pending(&mut self.device)?;

        let size = self.device.backbuffer_size();
        self.passes.clear();
        self.passes.push(Pass {
            target: None,
            rect: Viewport::FULL.scaled(size),
        });
        self.execute(frame, frame.entry_point())?;
        self.passes.pop();
        debug_assert!(self.passes.is_empty(), "unbalanced render target stack");
        Ok(())
    }

    fn execute(&mut self, frame: &RenderFrame, id: CommandBufferId) -> Result<(), RenderError> {
        self.stats.command_buffers += 1;
        self.targets.push_frame();

        let buffer = frame.command_buffer(id);
        for command in buffer.commands() {
            match command.op {
                OpCode::Clear {
                    mask,
                    color,
                    depth,
                    stencil,
                } => {
                    self.device.clear(mask, color, depth, stencil);
                    self.stats.clears += 1;
                }
                OpCode::DrawIndexed {
                    primitive,
                    first,
                    count,
                    states,
                } => {
                    self.apply_states(frame, &states)?;
                    self.device.draw_indexed(primitive, first, count);
                    self.stats.draw_calls += 1;
                }
                OpCode::DrawPrimitives {
                    primitive,
                    first,
                    count,
                    states,
                } => {
                    self.apply_states(frame, &states)?;
                    self.device.draw_primitives(primitive, first, count);
                    self.stats.draw_calls += 1;
                }
                OpCode::UploadConstantBuffer { handle, bytes } => {
                    let slot = self.registry.resolve_constant_buffer(handle);
                    let data = buffer.bytes(bytes);
                    assert!(
                        data.len() as u64 <= slot.size,
                        "upload of {} bytes exceeds constant buffer {} of {} bytes",
                        data.len(),
                        handle.raw(),
                        slot.size
                    );
                    self.device.write_buffer(slot.id, 0, data)?;
                    self.stats.uploads += 1;
                }
                OpCode::UploadVertexBuffer { handle, bytes } => {
                    let slot = self.registry.resolve_vertex_buffer(handle);
                    let data = buffer.bytes(bytes);
                    assert!(
                        data.len() as u64 <= slot.size,
                        "upload of {} bytes exceeds vertex buffer {} of {} bytes",
                        data.len(),
                        handle.raw(),
                        slot.size
                    );
                    self.device.write_buffer(slot.id, 0, data)?;
                    self.stats.uploads += 1;
                }
                OpCode::PushRenderTarget {
                    target,
                    viewport,
                    commands,
                } => {
                    self.render_to_target(frame, target, viewport, commands)?;
                }
                OpCode::AcquireTransientTexture {
                    slot,
                    width,
                    height,
                    format,
                } => {
                    self.targets.acquire(
                        &mut self.registry,
                        &mut self.device,
                        slot,
                        width,
                        height,
                        format,
                    )?;
                }
                OpCode::ReleaseTransientTexture { slot } => {
                    self.targets.release(&mut self.registry, slot);
                }
                OpCode::Execute { commands } => {
                    self.execute(frame, commands)?;
                }
            }
        }

        let leaked = self.targets.pop_frame();
        self.stats.leaked_transients += leaked.len() as u32;
        self.leaked.extend(leaked);
        Ok(())
    }

    fn render_to_target(
        &mut self,
        frame: &RenderFrame,
        target: Option<TransientTexture>,
        viewport: Viewport,
        commands: CommandBufferId,
    ) -> Result<(), RenderError> {
        let (target, size) = match target {
            Some(slot) => {
                let handle = self.targets.get(slot);
                let resolved = self.registry.resolve_render_target(handle);
                (Some(resolved.id), resolved.size)
            }
            None => (None, self.device.backbuffer_size()),
        };
        let rect = viewport.scaled(size);

        self.device.bind_render_target(target);
        self.device.set_viewport(rect);
        self.passes.push(Pass { target, rect });
        self.stats.render_targets += 1;

        let result = self.execute(frame, commands);

        self.passes.pop();
        let parent = *self
            .passes
            .last()
            .unwrap_or_else(|| panic!("render target stack lost its base"));
        self.device.bind_render_target(parent.target);
        self.device.set_viewport(parent.rect);
        result
    }

    /// Applies a state chain before a draw call.
    ///
    /// Blocks are walked nearest first and the first block to write a slot
    /// wins. The permutation is selected from the winning states and bound
    /// before them. Slots already bound to the same value are skipped.
    fn apply_states(&mut self, frame: &RenderFrame, chain: &StateChain) -> Result<(), RenderError> {
        let mut active = StateMask::EMPTY;
        let mut user_features = 0u64;
        let mut user_mask = u64::MAX;
        let mut winners: SmallVec<[State; 16]> = SmallVec::new();

        for id in chain.iter() {
            let block = frame.state_block(id);
            user_features |= block.features();
            user_mask &= block.feature_mask();

            // Subset test: a block is skipped when every slot it writes is already won.
            if (block.mask() & !active).is_empty() {
                self.stats.skipped_blocks += 1;
                continue;
            }
            for state in block.states() {
                let bit = state.mask();
                if active.intersects(bit) {
                    continue;
                }
                active.insert(bit);
                winners.push(*state);
            }
        }

        let mut shader = self.active.shader;
        let mut vertex_features = PipelineFeatures::EMPTY;
        let mut resource_features = PipelineFeatures::EMPTY;
        for state in &winners {
            match *state {
                State::Shader(handle) => shader = handle,
                State::InputLayout(handle) if handle.is_valid() => {
                    vertex_features = self.registry.resolve_input_layout(handle).features;
                }
                State::ConstantBuffer { handle, slot } if handle.is_valid() => {
                    resource_features |= PipelineFeatures::constant_buffer(slot);
                }
                State::Texture { id, sampler } if id != 0 => {
                    resource_features |= PipelineFeatures::sampler(sampler & 0xF);
                }
                _ => {}
            }
        }

        self.select_permutation(
            shader,
            vertex_features | resource_features | PipelineFeatures::user(user_features & user_mask),
        )?;

        for state in winners {
            self.apply_state(state);
        }
        Ok(())
    }

    fn select_permutation(
        &mut self,
        shader: ShaderHandle,
        requested: PipelineFeatures,
    ) -> Result<(), RenderError> {
        assert!(
            shader.is_valid(),
            "draw call issued without a valid shader"
        );
        let ubershader = self.registry.shader(shader).clone();
        let features = requested & ubershader.supported_features();

        if self.active.program.is_none()
            || self.active.shader != shader
            || self.active.features != features
        {
            let lookup = self.permutations.get_or_compile(
                &mut self.device,
                shader,
                &ubershader,
                features,
                &self.features,
            )?;
            self.stats.permutation_switches += 1;
            if lookup.compiled {
                self.stats.permutations_compiled += 1;
            }
            self.active = ActiveShader {
                shader,
                features: lookup.features,
                program: Some(lookup.program),
            };
        }

        let program = self.active.program;
        if update(&mut self.bound.program, program, &mut self.stats) {
            self.device.bind_program(program);
        }
        Ok(())
    }

    fn apply_state(&mut self, state: State) {
        let bound = &mut self.bound;
        let stats = &mut self.stats;
        match state {
            State::Shader(_) => {}
            State::AlphaTest {
                function,
                reference,
            } => {
                if update(&mut bound.alpha_test, (function, reference), stats) {
                    self.device
                        .set_alpha_test(function, reference as f32 / 255.0);
                }
            }
            State::DepthState { write, function } => {
                if update(&mut bound.depth_state, (write, function), stats) {
                    self.device.set_depth_state(write, function);
                }
            }
            State::Blending { src, dst } => {
                if update(&mut bound.blending, (src, dst), stats) {
                    self.device.set_blend_factors(src, dst);
                }
            }
            State::ConstantBuffer { handle, slot } => {
                let buffer = resolve_constant_buffer(&self.registry, handle);
                if update(&mut bound.constant_buffers[slot as usize], buffer, stats) {
                    self.device.bind_constant_buffer(slot, buffer);
                }
            }
            State::VertexBuffer(handle) => {
                let buffer = resolve_vertex_buffer(&self.registry, handle);
                if update(&mut bound.vertex_buffer, buffer, stats) {
                    self.device.bind_vertex_buffer(buffer);
                }
            }
            State::IndexBuffer(handle) => {
                let buffer = resolve_index_buffer(&self.registry, handle);
                if update(&mut bound.index_buffer, buffer, stats) {
                    self.device.bind_index_buffer(buffer);
                }
            }
            State::InputLayout(handle) => {
                let layout = resolve_input_layout(&self.registry, handle);
                if update(&mut bound.input_layout, layout, stats) {
                    self.device.bind_input_layout(layout);
                }
            }
            State::Texture { id, sampler } => {
                let (source, index) = State::decode_texture(id, sampler);
                let texture = match source {
                    TextureSource::Persistent(handle) => handle
                        .is_valid()
                        .then(|| self.registry.resolve_texture(handle)),
                    TextureSource::Transient { slot, attachment } => {
                        let target = self
                            .registry
                            .resolve_render_target(self.targets.get(slot));
                        let texture = target.attachment(attachment as usize).unwrap_or_else(|| {
                            panic!(
                                "transient slot {} has no attachment {attachment}",
                                slot.slot()
                            )
                        });
                        Some(texture)
                    }
                };
                if update(&mut bound.textures[index as usize], texture, stats) {
                    self.device.bind_texture(index, texture);
                }
            }
            State::CullFace(face) => {
                if update(&mut bound.cull_face, face, stats) {
                    self.device.set_cull_face(face);
                }
            }
            State::PolygonOffset { factor, units } => {
                if update(&mut bound.polygon_offset, (factor, units), stats) {
                    self.device
                        .set_polygon_offset(factor as f32 / 128.0, units as f32 / 128.0);
                }
            }
            State::PolygonMode(mode) => {
                if update(&mut bound.polygon_mode, mode, stats) {
                    self.device.set_polygon_mode(mode);
                }
            }
        }
    }

    /// Brings the device to the baseline state, including the slots a frame
    /// reset leaves alone.
    fn seed_device(&mut self) {
        let defaults = BoundState::default();
        self.device
            .set_blend_factors(defaults.blending.0, defaults.blending.1);
        self.device.set_polygon_offset(0.0, 0.0);
        self.device.bind_index_buffer(None);
        self.device.bind_input_layout(None);
        for slot in 0..MAX_CONSTANT_BUFFERS {
            self.device.bind_constant_buffer(slot, None);
        }
        for sampler in self.settings.reset_texture_slots..MAX_TEXTURE_SAMPLERS {
            self.device.bind_texture(sampler, None);
        }
        self.bound = defaults;
        self.reset();
    }

    /// Restores the baseline device state: culling, polygon mode, no program,
    /// no vertex buffer, unbound samplers, depth state and alpha test.
    fn reset(&mut self) {
        let baseline = self.settings.baseline;

        self.device.set_cull_face(baseline.cull_face);
        self.device.set_polygon_mode(baseline.polygon_mode);
        self.device.bind_program(None);
        self.device.bind_vertex_buffer(None);
        for sampler in 0..self.settings.reset_texture_slots {
            self.device.bind_texture(sampler, None);
        }
        self.device
            .set_depth_state(baseline.depth_write, baseline.depth_function);
        self.device.set_alpha_test(baseline.alpha_function, 0.0);

        self.bound.cull_face = baseline.cull_face;
        self.bound.polygon_mode = baseline.polygon_mode;
        self.bound.program = None;
        self.bound.vertex_buffer = None;
        for texture in &mut self.bound.textures[..self.settings.reset_texture_slots as usize] {
            *texture = None;
        }
        self.bound.depth_state = (baseline.depth_write, baseline.depth_function);
        self.bound.alpha_test = (baseline.alpha_function, 0);
        self.active = ActiveShader::default();
    }
}

fn resolve_vertex_buffer(registry: &ResourceRegistry, handle: VertexBufferHandle) -> Option<BufferId> {
    handle
        .is_valid()
        .then(|| registry.resolve_vertex_buffer(handle).id)
}

fn resolve_index_buffer(registry: &ResourceRegistry, handle: IndexBufferHandle) -> Option<BufferId> {
    handle
        .is_valid()
        .then(|| registry.resolve_index_buffer(handle).id)
}

fn resolve_constant_buffer(
    registry: &ResourceRegistry,
    handle: ConstantBufferHandle,
) -> Option<BufferId> {
    handle
        .is_valid()
        .then(|| registry.resolve_constant_buffer(handle).id)
}

fn resolve_input_layout(
    registry: &ResourceRegistry,
    handle: InputLayoutHandle,
) -> Option<InputLayoutId> {
    handle
        .is_valid()
        .then(|| registry.resolve_input_layout(handle).id)
}
