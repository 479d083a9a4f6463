//! Default implementations of [crate::transport::Transport]

pub mod hickory;
