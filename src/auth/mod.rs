// SPDX-License-Identifier: MIT

//! Authentication primitives: password hashing and session tokens.

pub mod password;
pub mod token;

pub use token::{TokenError, TokenIssuer};
