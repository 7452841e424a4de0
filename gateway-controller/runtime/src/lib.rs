#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use gateway_controller_core as core;
pub use gateway_controller_k8s_api as k8s;
pub use gateway_controller_k8s_index as index;

mod args;
mod client;

pub use self::{args::Args, client::KubertClient};
