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

//! The abstract GPU driver interface and strongly-typed GPU object handles.
//!
//! GPU objects are owned values: none of the handle types implement `Clone`,
//! so giving one to the deferred-deletion queue moves it out of the caller and
//! it can be released at most once.

use std::fmt::Debug;
use std::num::NonZeroU32;

/// The classes of GPU object that can be queued for deferred deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuObjectKind {
    /// A vertex, index or uniform buffer.
    Buffer,
    /// A framebuffer object.
    Framebuffer,
    /// A linked shader program.
    Program,
    /// A program pipeline object.
    Pipeline,
    /// A renderbuffer.
    Renderbuffer,
    /// A single compiled shader stage.
    Shader,
    /// A texture.
    Texture,
    /// A vertex array object.
    VertexArray,
}

/// The driver operations the graphics subsystem depends on.
///
/// All calls happen on the GPU thread.
pub trait Renderer: Debug {
    /// Releases a GPU object immediately.
    fn release_object(&mut self, kind: GpuObjectKind, raw: NonZeroU32);

    /// Unbinds `texture` from every texture unit it is currently bound to.
    fn unbind_texture(&mut self, texture: NonZeroU32);

    /// Blocks until the GPU has finished every previously submitted command.
    fn finish(&mut self);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn release_object(&mut self, kind: GpuObjectKind, raw: NonZeroU32) {
        (**self).release_object(kind, raw);
    }

    fn unbind_texture(&mut self, texture: NonZeroU32) {
        (**self).unbind_texture(texture);
    }

    fn finish(&mut self) {
        (**self).finish();
    }
}

/// A typed, owned GPU object handle.
pub trait GpuObject: Debug {
    /// The class of object this handle refers to.
    const KIND: GpuObjectKind;

    /// Consumes the handle and returns the raw driver name.
    fn into_raw(self) -> NonZeroU32;

    /// Returns the raw driver name without giving up ownership.
    fn raw(&self) -> NonZeroU32;
}

macro_rules! gpu_object {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Takes ownership of a raw driver name.
            pub fn from_raw(raw: NonZeroU32) -> Self {
                Self(raw)
            }
        }

        impl GpuObject for $name {
            const KIND: GpuObjectKind = GpuObjectKind::$kind;

            fn into_raw(self) -> NonZeroU32 {
                self.0
            }

            fn raw(&self) -> NonZeroU32 {
                self.0
            }
        }
    };
}

gpu_object!(
    /// An owned GPU buffer.
    BufferId => Buffer
);
gpu_object!(
    /// An owned framebuffer.
    FramebufferId => Framebuffer
);
gpu_object!(
    /// An owned shader program.
    ProgramId => Program
);
gpu_object!(
    /// An owned program pipeline.
    PipelineId => Pipeline
);
gpu_object!(
    /// An owned renderbuffer.
    RenderbufferId => Renderbuffer
);
gpu_object!(
    /// An owned shader stage.
    ShaderId => Shader
);
gpu_object!(
    /// An owned texture.
    TextureId => Texture
);
gpu_object!(
    /// An owned vertex array object.
    VertexArrayId => VertexArray
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_report_their_kind() {
        let raw = NonZeroU32::new(9).unwrap();
        let program = ProgramId::from_raw(raw);
        assert_eq!(ProgramId::KIND, GpuObjectKind::Program);
        assert_eq!(TextureId::KIND, GpuObjectKind::Texture);
        assert_eq!(program.raw(), raw);
        assert_eq!(program.into_raw().get(), 9);
    }
}
