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

use super::Error;
use super::rpc::Status;
use std::error::Error as _;

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        if as_inner::<tonic::TimeoutExpired>(&status).is_some() {
            return Error::timeout(status);
        }
        if as_inner::<tonic::ConnectError>(&status).is_some()
            || as_inner::<tonic::transport::Error>(&status).is_some()
        {
            return Error::transport(status);
        }
        let content_type = status
            .metadata()
            .get("content-type")
            .map(|v| v.as_bytes().to_vec());
        if content_type.is_some_and(|v| !v.starts_with(b"application/grpc")) {
            return Error::transport(GrpcError::BadContentType(status));
        }
        let payload = Status::default()
            .set_code(status.code())
            .set_message(status.message());
        Error::service_with_source(payload, status)
    }
}

fn as_inner<T>(status: &tonic::Status) -> Option<&T>
where
    T: std::error::Error + 'static,
{
    let mut e = status.source()?;
    // Cycles in `source()` are unlikely, but bound the walk anyway.
    for _ in 0..32 {
        if let Some(value) = e.downcast_ref::<T>() {
            return Some(value);
        }
        e = e.source()?;
    }
    None
}

#[derive(Debug, thiserror::Error)]
enum GrpcError {
    #[error(
        "unexpected value in content-type header, should start with application/grpc. This is a common problem when using an endpoint that does not support the Pub/Sub gRPC services."
    )]
    BadContentType(#[source] tonic::Status),
}
