// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Errors raised by the setup and broadcast workflows.
//!
//! The display text of every error is written to be shown to users as-is.

use super::moderation::ModerationViolation;
use miette::Diagnostic;
use thiserror::Error;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Diagnostic, Error)]
pub enum SpreeError {
	#[error(transparent)]
	#[diagnostic(code(spree::configuration))]
	Configuration(#[from] ConfigurationError),
	#[error(transparent)]
	#[diagnostic(code(spree::validation))]
	Validation(#[from] ValidationError),
	#[error(transparent)]
	#[diagnostic(code(spree::confirmation))]
	Confirmation(#[from] ConfirmationError),
	#[error(transparent)]
	#[diagnostic(code(spree::execution))]
	Execution(#[from] ExecutionError),
	#[error("An internal error occurred while {context}.")]
	#[diagnostic(code(spree::infrastructure))]
	Infrastructure {
		context: &'static str,
		#[source]
		source: BoxedError,
	},
}

impl SpreeError {
	pub fn infrastructure(context: &'static str, source: impl Into<BoxedError>) -> Self {
		Self::Infrastructure {
			context,
			source: source.into(),
		}
	}
}

/// The server's configuration (or the command's references to it) doesn't point at anything usable.
#[derive(Debug, Error)]
pub enum ConfigurationError {
	#[error("Could not find the specified category.")]
	CategoryNotFound,
	#[error("No valid roles found.")]
	NoValidRoles,
	#[error("This server does not have a valid setup. Use `/setup` first.")]
	RequesterNotSetUp,
	#[error("Server with ID {0} not found.")]
	ServerNotFound(Id<GuildMarker>),
	#[error("The following servers do not have a valid setup:\n{}", .0.join("\n"))]
	TargetsNotSetUp(Vec<String>),
	#[error("The following roles are missing in server {guild_name}:\n{}", format_missing_roles(.roles))]
	MissingRoles {
		guild_name: String,
		roles: Vec<Id<RoleMarker>>,
	},
	#[error("Category ID {category_id} not found or invalid in server {guild_name}")]
	InvalidCategory {
		guild_name: String,
		category_id: Id<ChannelMarker>,
	},
}

fn format_missing_roles(roles: &[Id<RoleMarker>]) -> String {
	let lines: Vec<String> = roles.iter().map(|role| format!("Role ID {} not found", role)).collect();
	lines.join("\n")
}

/// The user's input was rejected before anything was queued.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("The interaction server cannot be included in the server list.")]
	IncludesRequester,
	#[error("Duplicate server IDs are not allowed.")]
	DuplicateServers,
	#[error("`{0}` is not a valid server ID.")]
	InvalidServerId(String),
	#[error("No servers were given.")]
	NoServers,
	#[error("`{0}` is not a valid channel name.")]
	InvalidChannelName(String),
	#[error("{0} Ad posting canceled.")]
	Moderation(ModerationViolation),
	#[error("You did not provide an ad message in time.")]
	AdNotProvided,
	#[error("Ad posting canceled.")]
	RequesterDeclined,
}

/// An owner's approval couldn't be obtained.
#[derive(Debug, Error)]
pub enum ConfirmationError {
	#[error("Server with ID {0} not found.")]
	ServerNotFound(Id<GuildMarker>),
	#[error("Owner of server with ID {0} not found.")]
	OwnerNotFound(Id<GuildMarker>),
	#[error("Ad was not approved by the owner of the server(s) {}", .servers.join(", "))]
	Rejected {
		owner_id: Id<UserMarker>,
		servers: Vec<String>,
	},
	#[error("The owner of the server(s) {} did not respond in time.", .servers.join(", "))]
	TimedOut {
		owner_id: Id<UserMarker>,
		servers: Vec<String>,
	},
	#[error("Could not reach the owner of the server(s) {}.", .servers.join(", "))]
	DeliveryFailed {
		owner_id: Id<UserMarker>,
		servers: Vec<String>,
		#[source]
		source: BoxedError,
	},
}

/// Posting into one target server failed. These never stop the rest of a job.
#[derive(Debug, Error)]
pub enum ExecutionError {
	#[error("Server with ID {0} is no longer available.")]
	GuildUnavailable(Id<GuildMarker>),
	#[error("The configured category in {guild_name} is no longer available.")]
	CategoryUnavailable { guild_name: String },
	#[error("Missing permission to manage channels in {guild_name}.")]
	MissingPermission { guild_name: String },
	#[error("{guild_name} has no role set up for servers of this size.")]
	NoRoleForBracket { guild_name: String },
	#[error("Failed to create the channel in {guild_name}.")]
	ChannelCreation {
		guild_name: String,
		#[source]
		source: BoxedError,
	},
	#[error("Failed to post the ad in {guild_name}.")]
	MessagePost {
		guild_name: String,
		#[source]
		source: BoxedError,
	},
}
