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

//! # Arbor Runtime
//!
//! The three-thread harness. [`Engine::new`] spawns the update and render
//! threads around an [`arbor_update::UpdateManager`] and an
//! [`arbor_render::RenderConsumer`]; the calling (logic) thread drives the
//! scene through the returned [`Stage`]. Exactly three cooperating threads,
//! no pool: the update thread sleeps when idle and is woken by update
//! requests, the render thread blocks on the frame channel, and the logic
//! thread blocks only in [`Stage::flush`] when it runs too far ahead.

pub mod engine;
pub mod gate;
pub mod stage;

pub use engine::Engine;
pub use gate::FrameGate;
pub use stage::Stage;
