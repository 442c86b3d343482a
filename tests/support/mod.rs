#![allow(dead_code)]

pub mod signal;
pub mod wav;
