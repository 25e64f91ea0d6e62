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

//! Messages and gRPC stubs for the subset of `google.pubsub.v1` used by the
//! bug-bash exercises.
//!
//! The code under `src/generated` is checked in. Regenerate it with:
//!
//! ```sh
//! cargo build -p pubsub-bugbash-proto --features _generate-protos
//! ```
//!
//! Both the client library and the in-memory fake server use these types, so
//! they always agree on the wire format.

#[allow(clippy::large_enum_variant)]
pub mod google {
    pub mod pubsub {
        pub mod v1 {
            include!("generated/protos/google.pubsub.v1.rs");
        }
    }
}
