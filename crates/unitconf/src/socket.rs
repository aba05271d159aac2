// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListenAddress {
    Stream(String),
    Datagram(String),
    FifoPath(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SocketSettings {
    pub listen: Vec<ListenAddress>,
    pub accept: bool,
    pub socket_mode: Option<u32>,
    /// Unit this socket activates; defaults to the same-named `.service`.
    pub paired_service: Option<String>,
}
