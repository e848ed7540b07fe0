//! Controller identity, device table and subscription binding — the shared
//! record every engine reads and mutates.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod state;

pub use state::{ControllerState, ControllerStatus, Credentials, Shared, SharedState};
