//   Copyright 2024 The Flux Project
//   SPDX-License-Identifier: BSD-3-Clause

/// Implemented by error types that have a "not found" case, allowing callers
/// to convert that case to an `Option` with [`Optional::optional`].
pub trait IsNotFoundError {
    fn is_not_found_error(&self) -> bool;
}

pub trait Optional<T> {
    type Error;

    fn optional(self) -> Result<Option<T>, Self::Error>;
}

impl<T, E: IsNotFoundError> Optional<T> for Result<T, E> {
    type Error = E;

    fn optional(self) -> Result<Option<T>, Self::Error> {
        match self {
            Ok(t) => Ok(Some(t)),
            Err(e) if e.is_not_found_error() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
