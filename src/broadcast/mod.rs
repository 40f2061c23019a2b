// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The platform-independent parts of server setup and ad broadcasting.

pub mod bracket;
pub mod confirmation;
pub mod error;
pub mod job;
pub mod moderation;
pub mod platform;
pub mod queue;
pub mod replies;
pub mod resolver;
pub mod setup;
pub mod targets;

#[cfg(test)]
mod mock;
