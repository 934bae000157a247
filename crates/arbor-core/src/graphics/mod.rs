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

//! The abstract graphics boundary.
//!
//! The engine core never talks to a concrete API; the render consumer drives
//! a [`GraphicsController`] implemented by the backend. The only contract
//! the core relies on is that operations submitted in a given order for a
//! frame execute in that order.

pub mod controller;
pub mod error;
pub mod resource;
pub mod sync;

pub use controller::{GraphicsController, NullGraphicsController, RecordedCall};
pub use error::{RenderError, ResourceError};
pub use resource::{
    DrawCall, DrawSubmission, DrawUniforms, GeometryDescriptor, GeometryId, ShaderDescriptor,
    ShaderId, TextureDescriptor, TextureFormat, TextureId,
};
pub use sync::{ManualSyncObject, SyncObject};
