// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::cooldowns::CommandCooldowns;
use super::platform::DiscordPlatform;
use crate::broadcast::moderation::ContentModerator;
use crate::broadcast::queue::BroadcastQueue;
use crate::broadcast::replies::ReplyWaiters;
use crate::broadcast::setup::SetupStore;
use crate::config::SpreeConfig;
use std::sync::Arc;
use twilight_http::client::Client;
use twilight_model::id::Id;
use twilight_model::id::marker::ApplicationMarker;

/// Everything command handlers share. Each part is owned by the component named by its type; handlers only go
/// through that component's operations.
pub struct BotContext {
	pub http_client: Arc<Client>,
	pub application_id: Id<ApplicationMarker>,
	pub platform: Arc<DiscordPlatform>,
	pub setup_store: Arc<dyn SetupStore>,
	pub broadcast_queue: Arc<BroadcastQueue>,
	pub reply_waiters: ReplyWaiters,
	pub moderator: ContentModerator,
	pub cooldowns: CommandCooldowns,
	pub settings: SpreeConfig,
}
