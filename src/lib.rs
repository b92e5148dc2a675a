#[macro_use]
extern crate derive_more;

#[macro_use]
extern crate diesel;


pub mod api;
pub mod cameras;
pub mod config;
pub mod db;
mod error;
pub mod filters;
pub mod json;
pub mod logging;
pub mod recover;
pub mod validator;


pub use error::*;
