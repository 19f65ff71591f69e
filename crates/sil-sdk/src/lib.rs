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

//! The public-facing entry point of SIL.
//!
//! [`Engine`] owns one instance of every subsystem service: the virtual
//! filesystem and its packages, the asynchronous loader, the shader program
//! cache, the deferred-deletion queue, the device database and the renderer.
//! Resource managers and joysticks are created from it.

mod engine;

pub use engine::Engine;

/// The types most programs built on SIL need.
pub mod prelude {
    pub use crate::Engine;
    pub use sil_core::config::{
        DecompressionSettings, DeferredDeleteSettings, EngineSettings, IoSettings, PathSettings,
        ResourcePoolSettings, ShaderCacheSettings,
    };
    pub use sil_core::renderer::{
        BufferId, FramebufferId, PipelineId, ProgramId, RenderbufferId, ShaderId, TextureId,
        VertexArrayId,
    };
    pub use sil_core::{
        AllocFlags, FileRegion, FontHandle, GpuObject, GpuObjectKind, PackageModule, Renderer,
        ResourceCodec, ResourceError, ResourceId, ResourceKind, ResourceState, SoundHandle,
        TextureHandle,
    };
    pub use sil_graphics::{
        BuiltinUniform, Lookup, RecordingRenderer, ShaderCacheError, INVALID_SHADER_KEY,
    };
    pub use sil_input::{
        DeviceId, EventSink, HidDescriptor, HidJoystick, JoystickEvent, LogicalButton, ValueAxis,
    };
    pub use sil_io::{MemoryPackage, PackBuilder, PackFile, PackageToken};
    pub use sil_resource::{Epoch, ResourceManager};
}
