#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod client;
pub mod runner;

pub(crate) mod atomics;
pub(crate) mod pool;
pub(crate) mod virtual_user;

pub use runner::{LoadRunner, RunHandle};

/// The shared data types, re-exported.
pub use stampede_core as model;

pub mod prelude {
    pub use crate::client::{HttpClient, HttpResponse, RequestError};
    pub use crate::runner::{LoadRunner, RunHandle};

    #[cfg(feature = "reqwest")]
    pub use crate::client::ReqwestClient;

    pub use stampede_core::{
        Check, CheckResult, Condition, ConfigError, LoadProfile, Method, RampPolicy,
        RequestSpec, RunOptions, RunSummary, Stage,
    };
}
