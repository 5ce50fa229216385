//! Data structures shared by the processing stages.

pub mod code;
pub mod cycle;
pub mod packet;
pub mod tape;
pub mod wave;
