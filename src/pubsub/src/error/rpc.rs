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

/// The status reported by the service when it rejects a request.
///
/// Each [Status] contains an error code and a developer-facing message. More
/// information about this error model can be found in the
/// [API Design Guide](https://cloud.google.com/apis/design/errors).
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct Status {
    /// The status code.
    pub code: Code,

    /// A developer-facing error message, in English.
    pub message: String,
}

impl Status {
    /// Sets the value for [code][Status::code].
    pub fn set_code<T: Into<Code>>(mut self, v: T) -> Self {
        self.code = v.into();
        self
    }

    /// Sets the value for [message][Status::message].
    pub fn set_message<T: Into<String>>(mut self, v: T) -> Self {
        self.message = v.into();
        self
    }
}

/// The canonical error codes for gRPC APIs.
///
/// Sometimes multiple error codes may apply. Services return the most
/// specific error code that applies. For example, `NOT_FOUND` or
/// `ALREADY_EXISTS` are preferred over `FAILED_PRECONDITION`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Code {
    /// Not an error; returned on success.
    Ok = 0,

    /// The operation was cancelled, typically by the caller.
    Cancelled = 1,

    /// Unknown error.
    #[default]
    Unknown = 2,

    /// The client specified an invalid argument, such as a malformed resource
    /// name.
    InvalidArgument = 3,

    /// The deadline expired before the operation could complete.
    DeadlineExceeded = 4,

    /// Some requested entity (e.g., topic or subscription) was not found.
    NotFound = 5,

    /// The entity that a client attempted to create already exists.
    AlreadyExists = 6,

    /// The caller does not have permission to execute the specified operation.
    PermissionDenied = 7,

    /// Some resource has been exhausted, perhaps a per-user quota.
    ResourceExhausted = 8,

    /// The system is not in a state required for the operation's execution.
    FailedPrecondition = 9,

    /// The operation was aborted, typically due to a concurrency issue.
    Aborted = 10,

    /// The operation was attempted past the valid range.
    OutOfRange = 11,

    /// The operation is not implemented or is not supported by this service.
    Unimplemented = 12,

    /// Internal errors.
    Internal = 13,

    /// The service is currently unavailable.
    Unavailable = 14,

    /// Unrecoverable data loss or corruption.
    DataLoss = 15,

    /// The request does not have valid authentication credentials.
    Unauthenticated = 16,
}

impl Code {
    /// The name of the code, as used in the gRPC protocol and service logs.
    pub fn name(&self) -> &str {
        match self {
            Code::Ok => "OK",
            Code::Cancelled => "CANCELLED",
            Code::Unknown => "UNKNOWN",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::AlreadyExists => "ALREADY_EXISTS",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Aborted => "ABORTED",
            Code::OutOfRange => "OUT_OF_RANGE",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
            Code::Unavailable => "UNAVAILABLE",
            Code::DataLoss => "DATA_LOSS",
            Code::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl std::convert::From<i32> for Code {
    fn from(value: i32) -> Self {
        match value {
            0 => Code::Ok,
            1 => Code::Cancelled,
            2 => Code::Unknown,
            3 => Code::InvalidArgument,
            4 => Code::DeadlineExceeded,
            5 => Code::NotFound,
            6 => Code::AlreadyExists,
            7 => Code::PermissionDenied,
            8 => Code::ResourceExhausted,
            9 => Code::FailedPrecondition,
            10 => Code::Aborted,
            11 => Code::OutOfRange,
            12 => Code::Unimplemented,
            13 => Code::Internal,
            14 => Code::Unavailable,
            15 => Code::DataLoss,
            16 => Code::Unauthenticated,
            _ => Code::default(),
        }
    }
}

impl std::convert::From<tonic::Code> for Code {
    fn from(value: tonic::Code) -> Self {
        Code::from(value as i32)
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::convert::TryFrom<&str> for Code {
    type Error = String;
    fn try_from(value: &str) -> std::result::Result<Code, Self::Error> {
        match value {
            "OK" => Ok(Code::Ok),
            "CANCELLED" => Ok(Code::Cancelled),
            "UNKNOWN" => Ok(Code::Unknown),
            "INVALID_ARGUMENT" => Ok(Code::InvalidArgument),
            "DEADLINE_EXCEEDED" => Ok(Code::DeadlineExceeded),
            "NOT_FOUND" => Ok(Code::NotFound),
            "ALREADY_EXISTS" => Ok(Code::AlreadyExists),
            "PERMISSION_DENIED" => Ok(Code::PermissionDenied),
            "RESOURCE_EXHAUSTED" => Ok(Code::ResourceExhausted),
            "FAILED_PRECONDITION" => Ok(Code::FailedPrecondition),
            "ABORTED" => Ok(Code::Aborted),
            "OUT_OF_RANGE" => Ok(Code::OutOfRange),
            "UNIMPLEMENTED" => Ok(Code::Unimplemented),
            "INTERNAL" => Ok(Code::Internal),
            "UNAVAILABLE" => Ok(Code::Unavailable),
            "DATA_LOSS" => Ok(Code::DataLoss),
            "UNAUTHENTICATED" => Ok(Code::Unauthenticated),
            _ => Err(format!("unknown status code value {value}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn status_setters() {
        let status = Status::default()
            .set_code(Code::Unavailable)
            .set_message("try-again");
        assert_eq!(status.code, Code::Unavailable);
        assert_eq!(status.message, "try-again");

        let status = Status::default().set_code(5);
        assert_eq!(status.code, Code::NotFound);
    }

    #[test]
    fn code_default() {
        assert_eq!(Code::default(), Code::Unknown);
        assert_eq!(Code::from(42), Code::Unknown);
        assert_eq!(Code::from(-1), Code::Unknown);
    }

    #[test_case(0, Code::Ok, "OK")]
    #[test_case(1, Code::Cancelled, "CANCELLED")]
    #[test_case(2, Code::Unknown, "UNKNOWN")]
    #[test_case(3, Code::InvalidArgument, "INVALID_ARGUMENT")]
    #[test_case(4, Code::DeadlineExceeded, "DEADLINE_EXCEEDED")]
    #[test_case(5, Code::NotFound, "NOT_FOUND")]
    #[test_case(6, Code::AlreadyExists, "ALREADY_EXISTS")]
    #[test_case(7, Code::PermissionDenied, "PERMISSION_DENIED")]
    #[test_case(8, Code::ResourceExhausted, "RESOURCE_EXHAUSTED")]
    #[test_case(9, Code::FailedPrecondition, "FAILED_PRECONDITION")]
    #[test_case(10, Code::Aborted, "ABORTED")]
    #[test_case(11, Code::OutOfRange, "OUT_OF_RANGE")]
    #[test_case(12, Code::Unimplemented, "UNIMPLEMENTED")]
    #[test_case(13, Code::Internal, "INTERNAL")]
    #[test_case(14, Code::Unavailable, "UNAVAILABLE")]
    #[test_case(15, Code::DataLoss, "DATA_LOSS")]
    #[test_case(16, Code::Unauthenticated, "UNAUTHENTICATED")]
    fn code(value: i32, want: Code, name: &str) -> Result<(), String> {
        assert_eq!(Code::from(value), want);
        assert_eq!(want as i32, value);
        assert_eq!(want.name(), name);
        assert_eq!(want.to_string(), name);
        assert_eq!(Code::try_from(name)?, want);
        Ok(())
    }

    #[test]
    fn code_try_from_unknown() {
        let got = Code::try_from("NOT-A-CODE");
        assert!(got.is_err(), "{got:?}");
    }
}
