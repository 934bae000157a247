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

//! Error types for the graphics boundary.
//!
//! These are resource failures in the sense of the engine's error taxonomy:
//! they are reported asynchronously to the logic thread as notifications,
//! never thrown across the thread boundary.

use std::fmt;

/// An error creating, updating, or destroying a GPU resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The engine-side id was registered twice with the backend.
    AlreadyRegistered {
        /// Human-readable resource description ("texture 3", ...).
        resource: String,
    },
    /// The referenced resource does not exist on the backend.
    NotFound {
        /// Human-readable resource description.
        resource: String,
    },
    /// The provided data does not match the descriptor (size, stride).
    InvalidData {
        /// What was wrong with the payload.
        details: String,
    },
    /// An error originating from the concrete backend implementation.
    Backend(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::AlreadyRegistered { resource } => {
                write!(f, "Resource already registered: {resource}")
            }
            ResourceError::NotFound { resource } => {
                write!(f, "Resource not found: {resource}")
            }
            ResourceError::InvalidData { details } => {
                write!(f, "Resource data rejected: {details}")
            }
            ResourceError::Backend(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A failure while replaying a frame's draw submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A resource referenced by a draw call failed to resolve.
    Resource(ResourceError),
    /// The backend rejected the submission.
    SubmissionFailed(String),
    /// The graphics device was lost; requires backend reinitialization.
    DeviceLost,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Resource(err) => write!(f, "Draw submission resource error: {err}"),
            RenderError::SubmissionFailed(msg) => write!(f, "Draw submission failed: {msg}"),
            RenderError::DeviceLost => {
                write!(f, "The graphics device was lost and needs to be reinitialized.")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Resource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::Resource(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn resource_error_display() {
        let err = ResourceError::NotFound {
            resource: "texture 42".to_string(),
        };
        assert_eq!(format!("{err}"), "Resource not found: texture 42");
    }

    #[test]
    fn render_error_wraps_resource_error() {
        let err: RenderError = ResourceError::Backend("out of memory".to_string()).into();
        assert_eq!(
            format!("{err}"),
            "Draw submission resource error: Backend-specific resource error: out of memory"
        );
        assert!(err.source().is_some());
    }
}
