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

//! Optimistic resource creation.
//!
//! The producer and the consumer assume their resource (a topic or a
//! subscription) exists. If the service reports `NOT_FOUND` they create the
//! resource and try exactly once more. [with_create] implements this small
//! state machine for both.

use crate::Result;
use std::future::Future;

/// The states of an optimistic operation.
///
/// ```text
/// Try --(ok)--------------------------------------> done
/// Try --(not found)--> Created --(ok)--> Retried -> done
/// Try --(other error)-----------------------------> Failed
/// Try --(not found)--> create fails --------------> Failed
/// Created --(error)-------------------------------> Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// The first attempt, assuming the resource exists.
    Try,
    /// The resource was missing and has just been created.
    Created,
    /// The attempt after creating the resource succeeded.
    Retried,
    /// The operation failed, the error is returned to the caller.
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Try => "try",
            Self::Created => "created",
            Self::Retried => "retried",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The result of a successful optimistic operation.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome<T> {
    /// The value returned by the successful attempt.
    pub value: T,
    /// Either [Stage::Try] or [Stage::Retried].
    pub stage: Stage,
}

impl<T> Outcome<T> {
    /// Returns true if the resource was created along the way.
    pub fn created(&self) -> bool {
        self.stage == Stage::Retried
    }
}

/// Runs `operate`, creating the resource on `NOT_FOUND` and retrying once.
///
/// `operate` receives [Stage::Try] on the first attempt and [Stage::Created]
/// on the attempt after `create()` succeeds. Errors other than `NOT_FOUND`
/// are returned unchanged, without calling `create`. An error from `create`,
/// or from the second attempt, is returned unchanged too.
///
/// # Example
/// ```
/// # use pubsub_bugbash::optimistic::{with_create, Stage};
/// # use pubsub_bugbash::Error;
/// # use pubsub_bugbash::error::rpc::{Code, Status};
/// # async fn sample() -> pubsub_bugbash::Result<()> {
/// let outcome = with_create(
///     "projects/p/topics/t",
///     |stage| async move {
///         match stage {
///             Stage::Try => Err(Error::service(Status::default().set_code(Code::NotFound))),
///             _ => Ok(42),
///         }
///     },
///     || async { Ok::<_, Error>(()) },
/// )
/// .await?;
/// assert_eq!(outcome.value, 42);
/// assert!(outcome.created());
/// # Ok(()) }
/// ```
pub async fn with_create<T, C, Op, OpFut, Cr, CrFut>(
    resource: &str,
    mut operate: Op,
    create: Cr,
) -> Result<Outcome<T>>
where
    Op: FnMut(Stage) -> OpFut,
    OpFut: Future<Output = Result<T>>,
    Cr: FnOnce() -> CrFut,
    CrFut: Future<Output = Result<C>>,
{
    let err = match operate(Stage::Try).await {
        Ok(value) => {
            return Ok(Outcome {
                value,
                stage: Stage::Try,
            });
        }
        Err(e) if e.is_not_found() => e,
        Err(e) => {
            tracing::debug!(resource, from = %Stage::Try, to = %Stage::Failed, "{e}");
            return Err(e);
        }
    };

    tracing::debug!(resource, from = %Stage::Try, to = %Stage::Created, "{err}");
    if let Err(e) = create().await {
        tracing::debug!(resource, from = %Stage::Try, to = %Stage::Failed, "create failed: {e}");
        return Err(e);
    }
    tracing::info!(resource, "created missing resource");

    match operate(Stage::Created).await {
        Ok(value) => {
            tracing::debug!(resource, from = %Stage::Created, to = %Stage::Retried);
            Ok(Outcome {
                value,
                stage: Stage::Retried,
            })
        }
        Err(e) => {
            tracing::debug!(resource, from = %Stage::Created, to = %Stage::Failed, "{e}");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::error::rpc::{Code, Status};
    use std::sync::Mutex;
    use test_case::test_case;

    const RESOURCE: &str = "projects/p/topics/t";

    async fn never_create() -> Result<()> {
        panic!("create should not be called")
    }

    fn service_error(code: Code) -> Error {
        Error::service(Status::default().set_code(code).set_message("test-only"))
    }

    #[tokio::test]
    async fn first_attempt_succeeds() -> anyhow::Result<()> {
        let stages = Mutex::new(Vec::new());
        let outcome = with_create(
            RESOURCE,
            |stage| {
                stages.lock().unwrap().push(stage);
                async { Ok::<_, Error>("value") }
            },
            never_create,
        )
        .await?;
        assert_eq!(outcome.value, "value");
        assert_eq!(outcome.stage, Stage::Try);
        assert!(!outcome.created());
        assert_eq!(*stages.lock().unwrap(), vec![Stage::Try]);
        Ok(())
    }

    #[tokio::test]
    async fn not_found_creates_and_retries() -> anyhow::Result<()> {
        let stages = Mutex::new(Vec::new());
        let creates = Mutex::new(0);
        let outcome = with_create(
            RESOURCE,
            |stage| {
                stages.lock().unwrap().push(stage);
                async move {
                    match stage {
                        Stage::Try => Err(service_error(Code::NotFound)),
                        _ => Ok("retried"),
                    }
                }
            },
            || async {
                *creates.lock().unwrap() += 1;
                Ok::<_, Error>(())
            },
        )
        .await?;
        assert_eq!(outcome.value, "retried");
        assert_eq!(outcome.stage, Stage::Retried);
        assert!(outcome.created());
        assert_eq!(*stages.lock().unwrap(), vec![Stage::Try, Stage::Created]);
        assert_eq!(*creates.lock().unwrap(), 1);
        Ok(())
    }

    #[test_case(Code::PermissionDenied)]
    #[test_case(Code::AlreadyExists)]
    #[test_case(Code::Unavailable)]
    #[test_case(Code::InvalidArgument)]
    #[tokio::test]
    async fn other_errors_never_create(code: Code) {
        let attempts = Mutex::new(0);
        let err = with_create(
            RESOURCE,
            |_| {
                *attempts.lock().unwrap() += 1;
                async move { Err::<(), _>(service_error(code)) }
            },
            never_create,
        )
        .await
        .expect_err("the error is returned");
        assert_eq!(err.status().map(|s| s.code), Some(code));
        assert_eq!(*attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn create_fails() {
        let attempts = Mutex::new(0);
        let err = with_create(
            RESOURCE,
            |_| {
                *attempts.lock().unwrap() += 1;
                async { Err::<(), _>(service_error(Code::NotFound)) }
            },
            || async { Err::<(), _>(service_error(Code::PermissionDenied)) },
        )
        .await
        .expect_err("the create error is returned");
        assert_eq!(err.status().map(|s| s.code), Some(Code::PermissionDenied));
        assert_eq!(*attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn retry_fails_once() {
        let attempts = Mutex::new(0);
        let err = with_create(
            RESOURCE,
            |_| {
                *attempts.lock().unwrap() += 1;
                async { Err::<(), _>(service_error(Code::NotFound)) }
            },
            || async { Ok::<_, Error>(()) },
        )
        .await
        .expect_err("the second error is returned");
        assert!(err.is_not_found(), "{err:?}");
        assert_eq!(*attempts.lock().unwrap(), 2);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Try.to_string(), "try");
        assert_eq!(Stage::Created.to_string(), "created");
        assert_eq!(Stage::Retried.to_string(), "retried");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
