// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::error::{ConfigurationError, SpreeError, ValidationError};
use super::platform::{BroadcastPlatform, CategoryAccess};
use super::setup::{ServerSetup, SetupStore};
use std::collections::HashSet;
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

/// Parses a `/`-separated list of server IDs, rejecting the requesting server and duplicates.
pub fn parse_server_ids(
	input: &str,
	requester_guild_id: Id<GuildMarker>,
) -> Result<Vec<Id<GuildMarker>>, ValidationError> {
	let mut guild_ids = Vec::new();
	for raw_id in input.split('/').map(str::trim) {
		let guild_id = raw_id
			.parse::<u64>()
			.ok()
			.and_then(Id::new_checked)
			.ok_or_else(|| ValidationError::InvalidServerId(raw_id.to_string()))?;
		guild_ids.push(guild_id);
	}

	if guild_ids.is_empty() {
		return Err(ValidationError::NoServers);
	}
	if guild_ids.contains(&requester_guild_id) {
		return Err(ValidationError::IncludesRequester);
	}
	let unique: HashSet<Id<GuildMarker>> = guild_ids.iter().copied().collect();
	if unique.len() != guild_ids.len() {
		return Err(ValidationError::DuplicateServers);
	}

	Ok(guild_ids)
}

/// The checked targets of a broadcast.
#[derive(Debug)]
pub struct PreparedTargets {
	/// Setups of the targets, in the order the targets were given.
	pub setups: Vec<ServerSetup>,
	/// Members of the requesting server plus members of every target.
	pub total_member_count: u64,
	pub requester_member_count: u64,
}

/// Checks that the requesting server and every target are set up and that the targets' configured roles and
/// categories still exist.
pub async fn prepare_targets(
	platform: &dyn BroadcastPlatform,
	store: &dyn SetupStore,
	requester_guild_id: Id<GuildMarker>,
	target_guild_ids: &[Id<GuildMarker>],
) -> Result<PreparedTargets, SpreeError> {
	if store.find_one(requester_guild_id).await?.is_none() {
		return Err(ConfigurationError::RequesterNotSetUp.into());
	}
	let Some(requester_guild) = platform.guild_summary(requester_guild_id).await? else {
		return Err(ConfigurationError::ServerNotFound(requester_guild_id).into());
	};

	let all_setups = store.find_all().await?;
	let mut setups = Vec::with_capacity(target_guild_ids.len());
	let mut not_set_up = Vec::new();
	let mut total_member_count = requester_guild.member_count;

	for guild_id in target_guild_ids.iter().copied() {
		let Some(guild) = platform.guild_summary(guild_id).await? else {
			return Err(ConfigurationError::ServerNotFound(guild_id).into());
		};
		let Some(setup) = all_setups.iter().find(|setup| setup.guild_id == guild_id) else {
			not_set_up.push(format!("{} ({})", guild.name, guild_id));
			continue;
		};

		let role_ids: Vec<_> = setup.role_ids().collect();
		let missing_roles = platform.missing_roles(guild_id, &role_ids).await?;
		if !missing_roles.is_empty() {
			return Err(ConfigurationError::MissingRoles {
				guild_name: guild.name,
				roles: missing_roles,
			}
			.into());
		}

		if platform.category_access(guild_id, setup.category_id).await? == CategoryAccess::Missing {
			return Err(ConfigurationError::InvalidCategory {
				guild_name: guild.name,
				category_id: setup.category_id,
			}
			.into());
		}

		total_member_count += guild.member_count;
		setups.push(setup.clone());
	}

	if !not_set_up.is_empty() {
		return Err(ConfigurationError::TargetsNotSetUp(not_set_up).into());
	}

	Ok(PreparedTargets {
		setups,
		total_member_count,
		requester_member_count: requester_guild.member_count,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::broadcast::bracket::Bracket;
	use crate::broadcast::mock::MockPlatform;
	use crate::broadcast::setup::RoleRange;
	use crate::broadcast::setup::tests::MemorySetupStore;

	const HOME: Id<GuildMarker> = Id::new(9);

	#[test]
	fn server_ids_parse() {
		let ids = parse_server_ids(" 1 / 2/3 ", HOME).unwrap();
		assert_eq!(ids, vec![Id::new(1), Id::new(2), Id::new(3)]);
	}

	#[test]
	fn server_id_problems_are_reported() {
		assert!(matches!(parse_server_ids("1/9", HOME), Err(ValidationError::IncludesRequester)));
		assert!(matches!(parse_server_ids("1/2/1", HOME), Err(ValidationError::DuplicateServers)));
		assert!(matches!(
			parse_server_ids("1/abc", HOME),
			Err(ValidationError::InvalidServerId(id)) if id == "abc"
		));
		assert!(matches!(parse_server_ids("0", HOME), Err(ValidationError::InvalidServerId(_))));
		assert!(matches!(parse_server_ids("", HOME), Err(ValidationError::InvalidServerId(_))));
	}

	fn setup(guild_id: u64, role_id: u64) -> ServerSetup {
		ServerSetup {
			guild_id: Id::new(guild_id),
			category_id: Id::new(guild_id * 10),
			role_ranges: [(
				Bracket::UpTo100,
				RoleRange {
					role_id: Id::new(role_id),
					member_count: 10,
				},
			)]
			.into_iter()
			.collect(),
		}
	}

	async fn fixture() -> (MockPlatform, MemorySetupStore) {
		let platform = MockPlatform::default();
		platform.add_guild(9, "Home", 40, Some(900));
		platform.add_guild(1, "Alpha", 100, Some(100));
		platform.add_guild(2, "Beta", 200, Some(200));
		platform.add_guild(3, "Gamma", 300, Some(300));
		let store = MemorySetupStore::default();
		store.upsert(&setup(9, 90)).await.unwrap();
		store.upsert(&setup(1, 11)).await.unwrap();
		store.upsert(&setup(2, 21)).await.unwrap();
		(platform, store)
	}

	#[tokio::test]
	async fn valid_targets_are_prepared_in_order() {
		let (platform, store) = fixture().await;
		let prepared = prepare_targets(&platform, &store, HOME, &[Id::new(2), Id::new(1)])
			.await
			.unwrap();
		let guilds: Vec<_> = prepared.setups.iter().map(|setup| setup.guild_id.get()).collect();
		assert_eq!(guilds, vec![2, 1]);
		assert_eq!(prepared.total_member_count, 340);
		assert_eq!(prepared.requester_member_count, 40);
	}

	#[tokio::test]
	async fn requester_must_be_set_up() {
		let (platform, _) = fixture().await;
		let store = MemorySetupStore::default();
		let result = prepare_targets(&platform, &store, HOME, &[Id::new(1)]).await;
		assert!(matches!(
			result,
			Err(SpreeError::Configuration(ConfigurationError::RequesterNotSetUp))
		));
	}

	#[tokio::test]
	async fn servers_without_setup_are_listed_together() {
		let (platform, store) = fixture().await;
		platform.add_guild(4, "Delta", 10, Some(400));
		let result = prepare_targets(&platform, &store, HOME, &[Id::new(3), Id::new(1), Id::new(4)]).await;
		let Err(SpreeError::Configuration(ConfigurationError::TargetsNotSetUp(servers))) = result else {
			panic!("expected servers without setup to be rejected");
		};
		assert_eq!(servers, vec!["Gamma (3)", "Delta (4)"]);
	}

	#[tokio::test]
	async fn unknown_servers_are_rejected() {
		let (platform, store) = fixture().await;
		let result = prepare_targets(&platform, &store, HOME, &[Id::new(404)]).await;
		assert!(matches!(
			result,
			Err(SpreeError::Configuration(ConfigurationError::ServerNotFound(guild))) if guild == Id::new(404)
		));
	}

	#[tokio::test]
	async fn deleted_roles_and_categories_are_rejected() {
		let (platform, store) = fixture().await;
		platform.delete_role(21);
		let result = prepare_targets(&platform, &store, HOME, &[Id::new(1), Id::new(2)]).await;
		assert!(matches!(
			result,
			Err(SpreeError::Configuration(ConfigurationError::MissingRoles { ref guild_name, .. })) if guild_name == "Beta"
		));

		platform.set_category_access(1, CategoryAccess::Missing);
		let result = prepare_targets(&platform, &store, HOME, &[Id::new(1)]).await;
		assert!(matches!(
			result,
			Err(SpreeError::Configuration(ConfigurationError::InvalidCategory { .. }))
		));
	}
}
