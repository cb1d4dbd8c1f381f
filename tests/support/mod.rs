#![allow(dead_code)]

pub mod memowatch_env;
pub mod recordings;
