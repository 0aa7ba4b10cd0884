#![allow(dead_code)]

pub mod sheets;
