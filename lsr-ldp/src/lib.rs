//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod config;
pub mod debug;
pub mod discovery;
pub mod error;
pub mod events;
pub mod instance;
pub mod network;
pub mod packet;
pub mod registry;
pub mod session;
pub mod tasks;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use instance::{Instance, InstanceHandle, PeerEvent};
pub use registry::{PeerInfo, Role};
