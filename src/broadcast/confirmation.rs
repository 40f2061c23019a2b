// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::error::{ConfirmationError, SpreeError};
use super::platform::{BroadcastPlatform, ConfirmationRequest, GuildSummary, OwnerReply};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

/// Collects approval for a broadcast from the owner of every target server.
#[derive(Clone)]
pub struct ConfirmationCoordinator {
	platform: Arc<dyn BroadcastPlatform>,
}

impl ConfirmationCoordinator {
	pub fn new(platform: Arc<dyn BroadcastPlatform>) -> Self {
		Self { platform }
	}

	/// Asks each distinct owner of the target servers (other than the requesting server) once, all at the same time.
	///
	/// Succeeds only when every owner says yes. The first owner to say no, not answer within `limit`, or be
	/// unreachable ends the collection with that error; requests still waiting at that point are abandoned.
	pub async fn collect(
		&self,
		target_guild_ids: &[Id<GuildMarker>],
		requester_guild_id: Id<GuildMarker>,
		ad_message: &str,
		total_member_count: u64,
		limit: Duration,
	) -> Result<(), SpreeError> {
		let owners = self.group_by_owner(target_guild_ids, requester_guild_id).await?;

		let mut pending = JoinSet::new();
		for (owner_id, servers) in owners {
			let request = ConfirmationRequest {
				owner_id,
				servers,
				ad_message: ad_message.to_string(),
				total_member_count,
			};
			let platform = Arc::clone(&self.platform);
			pending.spawn(async move {
				let reply = platform.request_confirmation(&request, limit).await;
				owner_decision(request, reply)
			});
		}

		while let Some(joined) = pending.join_next().await {
			let decision = match joined {
				Ok(decision) => decision,
				Err(error) => {
					pending.shutdown().await;
					return Err(SpreeError::infrastructure("waiting for owner confirmation", error));
				}
			};
			if let Err(error) = decision {
				tracing::info!(%error, "Broadcast was not confirmed");
				// Aborting the other requests drops their reply waits, which frees the slots before we return.
				pending.shutdown().await;
				return Err(error.into());
			}
		}

		Ok(())
	}

	/// Resolves each target server and groups them by owner, keeping owners in the order their first server appears.
	async fn group_by_owner(
		&self,
		target_guild_ids: &[Id<GuildMarker>],
		requester_guild_id: Id<GuildMarker>,
	) -> Result<Vec<(Id<UserMarker>, Vec<GuildSummary>)>, SpreeError> {
		let mut owners: Vec<(Id<UserMarker>, Vec<GuildSummary>)> = Vec::new();
		let mut owner_positions: HashMap<Id<UserMarker>, usize> = HashMap::new();

		for guild_id in target_guild_ids.iter().copied() {
			if guild_id == requester_guild_id {
				continue;
			}
			let Some(summary) = self.platform.guild_summary(guild_id).await? else {
				return Err(ConfirmationError::ServerNotFound(guild_id).into());
			};
			let Some(owner_id) = summary.owner_id else {
				return Err(ConfirmationError::OwnerNotFound(guild_id).into());
			};
			match owner_positions.get(&owner_id) {
				Some(position) => owners[*position].1.push(summary),
				None => {
					owner_positions.insert(owner_id, owners.len());
					owners.push((owner_id, vec![summary]));
				}
			}
		}

		Ok(owners)
	}
}

fn owner_decision(
	request: ConfirmationRequest,
	reply: Result<OwnerReply, SpreeError>,
) -> Result<(), ConfirmationError> {
	let owner_id = request.owner_id;
	let servers = request.server_names();
	match reply {
		Ok(OwnerReply::Approved) => Ok(()),
		Ok(OwnerReply::Declined) => Err(ConfirmationError::Rejected { owner_id, servers }),
		Ok(OwnerReply::NoReply) => Err(ConfirmationError::TimedOut { owner_id, servers }),
		Err(error) => {
			tracing::error!(source = ?error, owner = %owner_id, "Failed to ask a server owner for confirmation");
			Err(ConfirmationError::DeliveryFailed {
				owner_id,
				servers,
				source: Box::new(error),
			})
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::broadcast::mock::MockPlatform;

	const LIMIT: Duration = Duration::from_secs(60);

	fn coordinator(platform: &Arc<MockPlatform>) -> ConfirmationCoordinator {
		let platform: Arc<dyn BroadcastPlatform> = platform.clone();
		ConfirmationCoordinator::new(platform)
	}

	fn two_owner_platform() -> Arc<MockPlatform> {
		let platform = MockPlatform::default();
		platform.add_guild(1, "Alpha", 150, Some(100));
		platform.add_guild(2, "Beta", 250, Some(100));
		platform.add_guild(3, "Gamma", 50, Some(200));
		platform.add_guild(9, "Requester", 75, Some(900));
		Arc::new(platform)
	}

	#[tokio::test]
	async fn one_request_per_distinct_owner() {
		let platform = two_owner_platform();
		let result = coordinator(&platform)
			.collect(&[Id::new(1), Id::new(2), Id::new(3)], Id::new(9), "ad", 525, LIMIT)
			.await;
		assert!(result.is_ok());

		let mut requests = platform.confirmation_requests();
		requests.sort_by_key(|request| request.owner_id);
		assert_eq!(requests.len(), 2);
		assert_eq!(requests[0].owner_id, Id::new(100));
		assert_eq!(requests[0].server_names(), vec!["Alpha", "Beta"]);
		assert_eq!(requests[0].total_member_count, 525);
		assert_eq!(requests[1].owner_id, Id::new(200));
		assert_eq!(requests[1].server_names(), vec!["Gamma"]);
	}

	#[tokio::test]
	async fn every_owner_must_approve() {
		let platform = two_owner_platform();
		platform.set_owner_reply(200, OwnerReply::Declined);
		let result = coordinator(&platform)
			.collect(&[Id::new(1), Id::new(2), Id::new(3)], Id::new(9), "ad", 525, LIMIT)
			.await;
		assert!(matches!(
			result,
			Err(SpreeError::Confirmation(ConfirmationError::Rejected { owner_id, .. })) if owner_id == Id::new(200)
		));
	}

	#[tokio::test]
	async fn silence_counts_as_rejection() {
		let platform = two_owner_platform();
		platform.set_owner_reply(100, OwnerReply::NoReply);
		let result = coordinator(&platform)
			.collect(&[Id::new(1), Id::new(3)], Id::new(9), "ad", 275, LIMIT)
			.await;
		assert!(matches!(
			result,
			Err(SpreeError::Confirmation(ConfirmationError::TimedOut { .. }))
		));
	}

	#[tokio::test]
	async fn undeliverable_requests_count_as_rejection() {
		let platform = two_owner_platform();
		platform.fail_delivery_to(200);
		let result = coordinator(&platform)
			.collect(&[Id::new(3)], Id::new(9), "ad", 125, LIMIT)
			.await;
		assert!(matches!(
			result,
			Err(SpreeError::Confirmation(ConfirmationError::DeliveryFailed { .. }))
		));
	}

	#[tokio::test(start_paused = true)]
	async fn first_rejection_ends_collection_without_waiting_for_others() {
		let platform = two_owner_platform();
		platform.set_silent_owner(100);
		platform.set_owner_reply(200, OwnerReply::Declined);

		let started = tokio::time::Instant::now();
		let result = coordinator(&platform)
			.collect(&[Id::new(1), Id::new(3)], Id::new(9), "ad", 275, LIMIT)
			.await;
		assert!(matches!(
			result,
			Err(SpreeError::Confirmation(ConfirmationError::Rejected { owner_id, .. })) if owner_id == Id::new(200)
		));
		assert!(started.elapsed() < LIMIT);
		assert_eq!(platform.pending_replies(100), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn silent_owner_times_out_once() {
		let platform = two_owner_platform();
		platform.set_silent_owner(200);

		let started = tokio::time::Instant::now();
		let result = coordinator(&platform)
			.collect(&[Id::new(3)], Id::new(9), "ad", 125, LIMIT)
			.await;
		assert!(matches!(
			result,
			Err(SpreeError::Confirmation(ConfirmationError::TimedOut { owner_id, .. })) if owner_id == Id::new(200)
		));
		assert!(started.elapsed() >= LIMIT);
		assert_eq!(platform.confirmation_requests().len(), 1);
		assert_eq!(platform.pending_replies(200), 0);
	}

	#[tokio::test]
	async fn requesting_server_is_never_asked() {
		let platform = two_owner_platform();
		let result = coordinator(&platform)
			.collect(&[Id::new(9), Id::new(3)], Id::new(9), "ad", 125, LIMIT)
			.await;
		assert!(result.is_ok());
		let requests = platform.confirmation_requests();
		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].owner_id, Id::new(200));
	}

	#[tokio::test]
	async fn unknown_servers_fail_before_asking_anyone() {
		let platform = two_owner_platform();
		let result = coordinator(&platform)
			.collect(&[Id::new(1), Id::new(404)], Id::new(9), "ad", 125, LIMIT)
			.await;
		assert!(matches!(
			result,
			Err(SpreeError::Confirmation(ConfirmationError::ServerNotFound(guild))) if guild == Id::new(404)
		));
		assert!(platform.confirmation_requests().is_empty());
	}

	#[tokio::test]
	async fn servers_without_owner_fail() {
		let platform = two_owner_platform();
		platform.add_guild(4, "Orphan", 10, None);
		let result = coordinator(&platform)
			.collect(&[Id::new(4)], Id::new(9), "ad", 85, LIMIT)
			.await;
		assert!(matches!(
			result,
			Err(SpreeError::Confirmation(ConfirmationError::OwnerNotFound(guild))) if guild == Id::new(4)
		));
	}
}
