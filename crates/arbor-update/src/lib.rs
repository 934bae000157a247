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

//! # Arbor Update
//!
//! The per-frame machinery of the engine: the logic-to-update scene message
//! queue, the animation and constraint engines that write into the update
//! side of double-buffered properties, resetter and discard bookkeeping,
//! and the [`UpdateManager`] orchestrating one frame from message drain to
//! buffer swap.

pub mod animation;
pub mod constraint;
pub mod discard;
pub mod manager;
pub mod messages;
pub mod resetter;

pub use animation::{
    Animation, AnimationDefinition, AnimatorDefinition, EndAction, TimePeriod, LOOP_FOREVER,
};
pub use constraint::{ApplyRate, ConstraintDefinition, ConstraintFunction, RemovalAction};
pub use discard::{DiscardQueue, DISCARD_FRAME_COUNT};
pub use manager::{FrameOutput, UpdateManager, UpdateStatus};
pub use messages::{MessageQueue, SceneMessage};
pub use resetter::ResetterManager;
