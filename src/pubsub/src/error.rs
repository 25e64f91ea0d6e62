// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Errors returned by the bug-bash clients.
//!
//! All the operations in this crate return [Error]. The only condition the
//! exercises recover from is a `NOT_FOUND` status, see
//! [is_not_found][Error::is_not_found]. Everything else is returned to the
//! caller unchanged.

mod core_error;
mod from_status;
pub use core_error::*;

/// Status codes and messages reported by the service.
///
/// # Examples
///
/// ```
/// use pubsub_bugbash::Error;
/// use pubsub_bugbash::error::rpc::Code;
/// fn handle_error(e: Error) {
///     if let Some(status) = e.status() {
///         println!("the service reported {status:?}");
///     }
///     if e.status().is_some_and(|s| s.code == Code::PermissionDenied) {
///         println!("check the IAM bindings");
///     }
/// }
/// ```
pub mod rpc;
