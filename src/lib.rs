#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod error;
pub mod stream;
pub mod transport;
pub mod types;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;
