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

//! The platform-facing scheduling callback.

/// Implemented by the platform adaptor; consumed by the core.
///
/// Both methods are fire-and-forget and may only be called from the logic
/// thread. The implementation decides how a request maps onto the platform's
/// frame scheduling (vsync callback, timer, immediate wake).
pub trait RenderController: Send + Sync + 'static {
    /// New content exists; an update/render frame should be scheduled.
    fn request_update(&self);

    /// Deferred event processing (notification delivery) should run when the
    /// logic thread is next idle.
    fn request_process_events_on_idle(&self);
}
