#![allow(dead_code)]

pub mod mapping;
pub mod utils;
