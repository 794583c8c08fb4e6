#![allow(dead_code)]

pub mod remote;
pub mod wire;
