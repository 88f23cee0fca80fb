#![allow(dead_code)]

pub mod provider;
pub mod relay_app;
