// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::responses::COMMAND_FAILED;
use crate::broadcast::error::SpreeError;
use miette::IntoDiagnostic;
use twilight_http::client::InteractionClient;
use twilight_model::channel::message::{AllowedMentions, MessageFlags};

/// Text shown to the user for an error. Internal errors are logged and replaced with a generic message.
pub fn user_facing_message(error: &SpreeError) -> String {
	match error {
		SpreeError::Infrastructure { .. } => {
			tracing::error!(source = ?error, "An internal error occurred handling a command");
			String::from(COMMAND_FAILED)
		}
		_ => error.to_string(),
	}
}

/// Explains an error to the user in a follow-up to an already-deferred interaction.
pub async fn follow_up_with_error(
	interaction_client: &InteractionClient<'_>,
	interaction_token: &str,
	error: &SpreeError,
) -> miette::Result<()> {
	let message = user_facing_message(error);
	interaction_client
		.create_followup(interaction_token)
		.content(&message)
		.allowed_mentions(Some(&AllowedMentions::default()))
		.flags(MessageFlags::EPHEMERAL)
		.await
		.into_diagnostic()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::broadcast::error::ValidationError;

	#[test]
	fn internal_details_stay_internal() {
		let error = SpreeError::infrastructure("loading server setups", "password authentication failed");
		assert_eq!(user_facing_message(&error), COMMAND_FAILED);

		let error = SpreeError::from(ValidationError::DuplicateServers);
		assert_eq!(user_facing_message(&error), "Duplicate server IDs are not allowed.");
	}
}
