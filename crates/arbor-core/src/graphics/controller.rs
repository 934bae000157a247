// Copyright 2025 the Arbor Authors
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

//! The graphics controller capability trait and the recording null backend.

use super::error::{RenderError, ResourceError};
use super::resource::{
    DrawSubmission, GeometryDescriptor, GeometryId, ShaderDescriptor, ShaderId, TextureDescriptor,
    TextureId,
};
use super::sync::{ManualSyncObject, SyncObject};
use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

/// Capability surface implemented by the graphics backend.
///
/// All methods are called from the render thread only. Engine-side ids are
/// allocated by the caller; the backend maps them to its own objects. The
/// core requires exactly one ordering guarantee: operations submitted in a
/// given order for a frame execute in that order.
pub trait GraphicsController: Send + Sync + fmt::Debug + 'static {
    /// Registers a geometry resource under the given id.
    fn create_geometry(
        &self,
        id: GeometryId,
        descriptor: &GeometryDescriptor,
    ) -> Result<(), ResourceError>;

    /// Releases the geometry registered under the id.
    fn destroy_geometry(&self, id: GeometryId) -> Result<(), ResourceError>;

    /// Registers a texture resource under the given id.
    fn create_texture(
        &self,
        id: TextureId,
        descriptor: &TextureDescriptor,
    ) -> Result<(), ResourceError>;

    /// Releases the texture registered under the id.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Compiles and registers a shader program under the given id.
    fn create_shader(&self, id: ShaderId, descriptor: &ShaderDescriptor)
        -> Result<(), ResourceError>;

    /// Releases the shader registered under the id.
    fn destroy_shader(&self, id: ShaderId) -> Result<(), ResourceError>;

    /// Executes a frozen draw list in list order.
    fn submit_draw_list(&self, submission: &DrawSubmission) -> Result<(), RenderError>;

    /// Arms a fence at the current point of the command stream.
    fn create_sync_object(&self) -> Box<dyn SyncObject>;
}

/// One operation observed by the [`NullGraphicsController`], in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// `create_geometry` was called.
    CreateGeometry(GeometryId),
    /// `destroy_geometry` was called.
    DestroyGeometry(GeometryId),
    /// `create_texture` was called.
    CreateTexture(TextureId),
    /// `destroy_texture` was called.
    DestroyTexture(TextureId),
    /// `create_shader` was called.
    CreateShader(ShaderId),
    /// `destroy_shader` was called.
    DestroyShader(ShaderId),
    /// `submit_draw_list` was called with this many draw calls.
    Submit {
        /// Frame number of the submission.
        frame: u64,
        /// Number of draw calls in the submission.
        calls: usize,
    },
}

#[derive(Debug, Default)]
struct NullState {
    geometries: HashSet<GeometryId>,
    textures: HashSet<TextureId>,
    shaders: HashSet<ShaderId>,
    calls: Vec<RecordedCall>,
}

/// A backend that validates ids, records every call in order, and draws
/// nothing. Fences it arms are signaled immediately.
///
/// Used by the integration tests and as the reference for the ordering
/// contract a real backend must honor.
#[derive(Debug, Default)]
pub struct NullGraphicsController {
    state: Mutex<NullState>,
}

impl NullGraphicsController {
    /// Creates an empty controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call observed so far, in call order.
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.state.lock().expect("null backend state poisoned").calls.clone()
    }

    /// Number of draw-list submissions observed.
    pub fn submission_count(&self) -> usize {
        self.state
            .lock()
            .expect("null backend state poisoned")
            .calls
            .iter()
            .filter(|call| matches!(call, RecordedCall::Submit { .. }))
            .count()
    }

    /// Whether a texture id is currently registered.
    pub fn has_texture(&self, id: TextureId) -> bool {
        self.state
            .lock()
            .expect("null backend state poisoned")
            .textures
            .contains(&id)
    }

    /// Whether a geometry id is currently registered.
    pub fn has_geometry(&self, id: GeometryId) -> bool {
        self.state
            .lock()
            .expect("null backend state poisoned")
            .geometries
            .contains(&id)
    }
}

impl GraphicsController for NullGraphicsController {
    fn create_geometry(
        &self,
        id: GeometryId,
        descriptor: &GeometryDescriptor,
    ) -> Result<(), ResourceError> {
        if descriptor.vertex_stride == 0 {
            return Err(ResourceError::InvalidData {
                details: "geometry vertex stride must be non-zero".to_string(),
            });
        }
        let mut state = self.state.lock().expect("null backend state poisoned");
        if !state.geometries.insert(id) {
            return Err(ResourceError::AlreadyRegistered {
                resource: format!("geometry {}", id.0),
            });
        }
        state.calls.push(RecordedCall::CreateGeometry(id));
        Ok(())
    }

    fn destroy_geometry(&self, id: GeometryId) -> Result<(), ResourceError> {
        let mut state = self.state.lock().expect("null backend state poisoned");
        if !state.geometries.remove(&id) {
            return Err(ResourceError::NotFound {
                resource: format!("geometry {}", id.0),
            });
        }
        state.calls.push(RecordedCall::DestroyGeometry(id));
        Ok(())
    }

    fn create_texture(
        &self,
        id: TextureId,
        descriptor: &TextureDescriptor,
    ) -> Result<(), ResourceError> {
        if !descriptor.payload_matches() {
            return Err(ResourceError::InvalidData {
                details: format!(
                    "texture payload is {} bytes, descriptor needs {}",
                    descriptor.pixels.len(),
                    descriptor.width as usize
                        * descriptor.height as usize
                        * descriptor.format.bytes_per_pixel()
                ),
            });
        }
        let mut state = self.state.lock().expect("null backend state poisoned");
        if !state.textures.insert(id) {
            return Err(ResourceError::AlreadyRegistered {
                resource: format!("texture {}", id.0),
            });
        }
        state.calls.push(RecordedCall::CreateTexture(id));
        Ok(())
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let mut state = self.state.lock().expect("null backend state poisoned");
        if !state.textures.remove(&id) {
            return Err(ResourceError::NotFound {
                resource: format!("texture {}", id.0),
            });
        }
        state.calls.push(RecordedCall::DestroyTexture(id));
        Ok(())
    }

    fn create_shader(
        &self,
        id: ShaderId,
        _descriptor: &ShaderDescriptor,
    ) -> Result<(), ResourceError> {
        let mut state = self.state.lock().expect("null backend state poisoned");
        if !state.shaders.insert(id) {
            return Err(ResourceError::AlreadyRegistered {
                resource: format!("shader {}", id.0),
            });
        }
        state.calls.push(RecordedCall::CreateShader(id));
        Ok(())
    }

    fn destroy_shader(&self, id: ShaderId) -> Result<(), ResourceError> {
        let mut state = self.state.lock().expect("null backend state poisoned");
        if !state.shaders.remove(&id) {
            return Err(ResourceError::NotFound {
                resource: format!("shader {}", id.0),
            });
        }
        state.calls.push(RecordedCall::DestroyShader(id));
        Ok(())
    }

    fn submit_draw_list(&self, submission: &DrawSubmission) -> Result<(), RenderError> {
        let mut state = self.state.lock().expect("null backend state poisoned");
        for call in &submission.calls {
            if !state.geometries.contains(&call.geometry) {
                return Err(RenderError::Resource(ResourceError::NotFound {
                    resource: format!("geometry {}", call.geometry.0),
                }));
            }
            if let Some(texture) = call.texture {
                if !state.textures.contains(&texture) {
                    return Err(RenderError::Resource(ResourceError::NotFound {
                        resource: format!("texture {}", texture.0),
                    }));
                }
            }
        }
        state.calls.push(RecordedCall::Submit {
            frame: submission.frame,
            calls: submission.calls.len(),
        });
        Ok(())
    }

    fn create_sync_object(&self) -> Box<dyn SyncObject> {
        // The null backend executes nothing, so its fences pass instantly.
        Box::new(ManualSyncObject::signaled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::resource::TextureFormat;

    fn texture_descriptor() -> TextureDescriptor {
        TextureDescriptor {
            label: None,
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
            pixels: vec![255; 4],
        }
    }

    #[test]
    fn records_calls_in_order() {
        let backend = NullGraphicsController::new();
        backend
            .create_texture(TextureId(0), &texture_descriptor())
            .unwrap();
        backend
            .create_texture(TextureId(1), &texture_descriptor())
            .unwrap();
        backend.destroy_texture(TextureId(0)).unwrap();

        assert_eq!(
            backend.recorded_calls(),
            vec![
                RecordedCall::CreateTexture(TextureId(0)),
                RecordedCall::CreateTexture(TextureId(1)),
                RecordedCall::DestroyTexture(TextureId(0)),
            ]
        );
        assert!(!backend.has_texture(TextureId(0)));
        assert!(backend.has_texture(TextureId(1)));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let backend = NullGraphicsController::new();
        backend
            .create_texture(TextureId(3), &texture_descriptor())
            .unwrap();
        let err = backend
            .create_texture(TextureId(3), &texture_descriptor())
            .unwrap_err();
        assert!(matches!(err, ResourceError::AlreadyRegistered { .. }));
    }

    #[test]
    fn mismatched_texture_payload_is_rejected() {
        let backend = NullGraphicsController::new();
        let mut descriptor = texture_descriptor();
        descriptor.pixels.pop();
        let err = backend.create_texture(TextureId(0), &descriptor).unwrap_err();
        assert!(matches!(err, ResourceError::InvalidData { .. }));
    }

    #[test]
    fn submissions_validate_references() {
        let backend = NullGraphicsController::new();
        let submission = DrawSubmission {
            frame: 1,
            view: glam::Mat4::IDENTITY,
            calls: vec![crate::graphics::resource::DrawCall {
                geometry: GeometryId(9),
                texture: None,
                shader: None,
                uniforms: crate::graphics::resource::DrawUniforms::new(
                    glam::Mat4::IDENTITY,
                    crate::color::Color::WHITE,
                ),
            }],
        };
        let err = backend.submit_draw_list(&submission).unwrap_err();
        assert!(matches!(err, RenderError::Resource(_)));
    }

    #[test]
    fn null_fences_are_signaled() {
        let backend = NullGraphicsController::new();
        assert!(backend.create_sync_object().is_signaled());
    }
}
