// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::broadcast::error::SpreeError;
use std::collections::HashMap;
use twilight_http::client::Client;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker};

// The most members Discord returns per request
const MEMBER_PAGE_SIZE: u16 = 1000;

/// Counts the members holding each role in the guild by paging through the whole member list.
pub async fn role_member_counts(
	http_client: &Client,
	guild_id: Id<GuildMarker>,
) -> Result<HashMap<Id<RoleMarker>, u64>, SpreeError> {
	let mut counts: HashMap<Id<RoleMarker>, u64> = HashMap::new();
	let mut after = None;

	loop {
		let mut request = http_client.guild_members(guild_id).limit(MEMBER_PAGE_SIZE);
		if let Some(after) = after {
			request = request.after(after);
		}
		let members = request
			.await
			.map_err(|error| SpreeError::infrastructure("listing server members", error))?
			.models()
			.await
			.map_err(|error| SpreeError::infrastructure("listing server members", error))?;

		for member in members.iter() {
			for role_id in member.roles.iter() {
				*counts.entry(*role_id).or_default() += 1;
			}
		}

		if members.len() < usize::from(MEMBER_PAGE_SIZE) {
			break;
		}
		after = members.last().map(|member| member.user.id);
	}

	Ok(counts)
}
