//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;
use std::time::Duration;

use lsr_utils::ip::Ipv4AddrExt;
use lsr_utils::mpls::{Label, LabelRange};
use serde::{Deserialize, Serialize};

use crate::network;

// LDP instance configuration.
//
// The instance treats it as an immutable snapshot taken at startup.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub router_id: Option<Ipv4Addr>,
    pub enabled_interfaces: Vec<Ipv4Addr>,
    pub transport_address: Option<Ipv4Addr>,
    pub hello_interval: u16,
    pub hold_time: u16,
    pub keepalive_time: u16,
    pub ldp_port: u16,
    pub tcp_connect_timeout: u16,
    pub label_range: LabelRange,
}

// Configuration errors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    MissingField(&'static str),
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
    },
    InvalidAddress(&'static str, Ipv4Addr),
    InvalidLabelRange(LabelRange),
    ParseError(String),
}

// ===== impl Config =====

impl Config {
    pub const DFLT_HELLO_INTERVAL: u16 = 5;
    pub const DFLT_HOLD_TIME: u16 = 15;
    pub const DFLT_KEEPALIVE_TIME: u16 = 60;
    pub const DFLT_TCP_CONNECT_TIMEOUT: u16 = 30;
    pub const DFLT_LABEL_RANGE: LabelRange = LabelRange {
        lower_bound: 100,
        upper_bound: 100000,
    };

    const MIN_HOLD_TIME: u16 = 10;
    const MIN_KEEPALIVE_TIME: u16 = 10;
    const MIN_TCP_CONNECT_TIMEOUT: u16 = 10;
    const MIN_LABEL: u32 = 17;

    // Checks the configuration, returning the first error found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let router_id =
            self.router_id.ok_or(ConfigError::MissingField("router_id"))?;
        if !router_id.is_usable() {
            return Err(ConfigError::InvalidAddress("router_id", router_id));
        }

        if self.enabled_interfaces.is_empty() {
            return Err(ConfigError::MissingField("enabled_interfaces"));
        }
        for addr in &self.enabled_interfaces {
            if !addr.is_usable() {
                return Err(ConfigError::InvalidAddress(
                    "enabled_interfaces",
                    *addr,
                ));
            }
        }

        if let Some(addr) = self.transport_address
            && !addr.is_usable()
        {
            return Err(ConfigError::InvalidAddress(
                "transport_address",
                addr,
            ));
        }

        check_min("hello_interval", self.hello_interval, 1)?;
        check_min("hold_time", self.hold_time, Self::MIN_HOLD_TIME)?;
        check_min(
            "keepalive_time",
            self.keepalive_time,
            Self::MIN_KEEPALIVE_TIME,
        )?;
        check_min("ldp_port", self.ldp_port, 1)?;
        check_min(
            "tcp_connect_timeout",
            self.tcp_connect_timeout,
            Self::MIN_TCP_CONNECT_TIMEOUT,
        )?;

        let range = self.label_range;
        if range.lower_bound < Self::MIN_LABEL
            || range.lower_bound >= range.upper_bound
            || range.upper_bound > *Label::UNRESERVED_RANGE.end()
        {
            return Err(ConfigError::InvalidLabelRange(range));
        }

        Ok(())
    }

    // Returns the router ID, or the unspecified address when unset.
    //
    // Only meaningful on a validated configuration.
    pub fn router_id(&self) -> Ipv4Addr {
        self.router_id.unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    // Returns the address used for session connections.
    pub fn transport_address(&self) -> Ipv4Addr {
        self.transport_address.unwrap_or_else(|| self.router_id())
    }

    pub fn tcp_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.tcp_connect_timeout.into())
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            router_id: None,
            enabled_interfaces: Vec::new(),
            transport_address: None,
            hello_interval: Self::DFLT_HELLO_INTERVAL,
            hold_time: Self::DFLT_HOLD_TIME,
            keepalive_time: Self::DFLT_KEEPALIVE_TIME,
            ldp_port: network::LDP_PORT,
            tcp_connect_timeout: Self::DFLT_TCP_CONNECT_TIMEOUT,
            label_range: Self::DFLT_LABEL_RANGE,
        }
    }
}

// ===== impl ConfigError =====

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingField(field) => {
                write!(f, "missing required setting: {field}")
            }
            ConfigError::OutOfRange { field, value, min } => {
                write!(f, "{field} out of range: {value} (minimum {min})")
            }
            ConfigError::InvalidAddress(field, addr) => {
                write!(f, "invalid address for {field}: {addr}")
            }
            ConfigError::InvalidLabelRange(range) => {
                write!(f, "invalid label range: {range}")
            }
            ConfigError::ParseError(error) => {
                write!(f, "failed to parse configuration: {error}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ===== helper functions =====

fn check_min(
    field: &'static str,
    value: u16,
    min: u16,
) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.into(),
            min: min.into(),
        });
    }

    Ok(())
}

// ===== unit tests =====
