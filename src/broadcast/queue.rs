// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::confirmation::ConfirmationCoordinator;
use super::error::{ExecutionError, SpreeError};
use super::job::{BroadcastJob, Requester};
use super::platform::{BroadcastPlatform, CategoryAccess, Report};
use super::setup::ServerSetup;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

const CONFIRMATION_CANCELED_MESSAGE: &str = "Ad posting canceled due to lack of confirmations.";
const JOB_FAILED_DIRECT_MESSAGE: &str = "An error occurred while posting the channel.";
const JOB_FAILED_MESSAGE: &str = "There was an error executing the command.";

/// How a job ended.
#[derive(Debug, Eq, PartialEq)]
pub enum JobOutcome {
	/// The owners didn't all approve, so nothing was posted.
	Canceled,
	Completed { posted_count: usize, failed_count: usize },
}

/// Runs broadcast jobs one at a time per requester.
///
/// Each requester's jobs run in the order they were queued, each finishing completely before the next starts. Jobs
/// of different requesters run independently. A requester has an entry in the registry exactly while a drain task is
/// running for them, so checking for and creating the entry under one lock decides who starts the drain.
pub struct BroadcastQueue {
	queues: Mutex<HashMap<Id<UserMarker>, VecDeque<BroadcastJob>>>,
	platform: Arc<dyn BroadcastPlatform>,
	coordinator: ConfirmationCoordinator,
	owner_confirmation_timeout: Duration,
}

impl BroadcastQueue {
	pub fn new(platform: Arc<dyn BroadcastPlatform>, owner_confirmation_timeout: Duration) -> Self {
		Self {
			queues: Mutex::new(HashMap::new()),
			coordinator: ConfirmationCoordinator::new(Arc::clone(&platform)),
			platform,
			owner_confirmation_timeout,
		}
	}

	/// Queues the job behind the requester's other jobs. If no drain is running for the requester yet, one is started
	/// and its handle returned.
	pub fn enqueue(self: &Arc<Self>, job: BroadcastJob) -> Option<JoinHandle<()>> {
		let requester = job.requester.user_id;
		let start_drain = match self.lock().entry(requester) {
			Entry::Occupied(mut queue) => {
				queue.get_mut().push_back(job);
				false
			}
			Entry::Vacant(entry) => {
				entry.insert(VecDeque::from([job]));
				true
			}
		};

		if !start_drain {
			tracing::debug!(requester = %requester, "Queued broadcast behind a running job");
			return None;
		}
		let queue = Arc::clone(self);
		Some(tokio::spawn(queue.drain(requester)))
	}

	/// Number of jobs waiting (not counting one that's running) for the requester.
	#[cfg(test)]
	fn pending_jobs(&self, requester: Id<UserMarker>) -> usize {
		self.lock().get(&requester).map(VecDeque::len).unwrap_or(0)
	}

	#[cfg(test)]
	fn is_draining(&self, requester: Id<UserMarker>) -> bool {
		self.lock().contains_key(&requester)
	}

	async fn drain(self: Arc<Self>, requester: Id<UserMarker>) {
		while let Some(job) = self.next_job(requester) {
			let job_id = job.id.clone();
			let job_requester = job.requester.clone();
			// A job runs in its own task so that a panic ends only that job, not the drain.
			let queue = Arc::clone(&self);
			let result = match tokio::spawn(async move { queue.run_job(&job).await }).await {
				Ok(result) => result,
				Err(error) => Err(SpreeError::infrastructure("running a broadcast job", error)),
			};
			match result {
				Ok(outcome) => tracing::info!(job = %job_id, ?outcome, "Finished broadcast job"),
				Err(error) => {
					tracing::error!(source = ?error, job = %job_id, "Broadcast job failed");
					self.notify(&job_requester, &Report::Notice(JOB_FAILED_DIRECT_MESSAGE.to_string()))
						.await;
					self.report(&job_requester, &Report::Notice(JOB_FAILED_MESSAGE.to_string()))
						.await;
				}
			}
		}
	}

	/// Takes the requester's next job, removing their entry once nothing is left so a later enqueue starts a new drain.
	fn next_job(&self, requester: Id<UserMarker>) -> Option<BroadcastJob> {
		let mut queues = self.lock();
		let queue = queues.get_mut(&requester)?;
		let job = queue.pop_front();
		if job.is_none() {
			queues.remove(&requester);
		}
		job
	}

	/// Confirms a job with the target owners and posts it everywhere it can be posted.
	pub async fn run_job(&self, job: &BroadcastJob) -> Result<JobOutcome, SpreeError> {
		tracing::info!(job = %job.id, requester = %job.requester.user_id, targets = job.setups.len(), "Starting broadcast job");

		let confirmation = self
			.coordinator
			.collect(
				&job.target_guild_ids,
				job.requester.guild_id,
				&job.ad_message,
				job.total_member_count,
				self.owner_confirmation_timeout,
			)
			.await;
		match confirmation {
			Ok(()) => (),
			Err(SpreeError::Confirmation(error)) => {
				self.report(&job.requester, &Report::Notice(error.to_string())).await;
				self.report(&job.requester, &Report::Notice(CONFIRMATION_CANCELED_MESSAGE.to_string()))
					.await;
				return Ok(JobOutcome::Canceled);
			}
			Err(error) => return Err(error),
		}

		let mut posted_count = 0;
		let mut failed_count = 0;
		for setup in job.setups.iter() {
			match self.post_to_target(job, setup).await {
				Ok(()) => posted_count += 1,
				Err(error) => {
					failed_count += 1;
					tracing::warn!(source = ?error, job = %job.id, guild = %setup.guild_id, "Failed to post broadcast to a server");
					self.report(&job.requester, &Report::Notice(error.to_string())).await;
				}
			}
		}

		let results = Report::Results {
			channel_name: job.channel_name.clone(),
			posted_count,
		};
		self.report(&job.requester, &results).await;
		self.notify(&job.requester, &results).await;

		Ok(JobOutcome::Completed {
			posted_count,
			failed_count,
		})
	}

	async fn post_to_target(&self, job: &BroadcastJob, setup: &ServerSetup) -> Result<(), SpreeError> {
		let Some(guild) = self.platform.guild_summary(setup.guild_id).await? else {
			return Err(ExecutionError::GuildUnavailable(setup.guild_id).into());
		};
		match self.platform.category_access(setup.guild_id, setup.category_id).await? {
			CategoryAccess::Ready => (),
			CategoryAccess::Missing => {
				return Err(ExecutionError::CategoryUnavailable { guild_name: guild.name }.into());
			}
			CategoryAccess::MissingPermission => {
				return Err(ExecutionError::MissingPermission { guild_name: guild.name }.into());
			}
		}

		// The role is picked by the size of the requesting server, from the ranges the target server configured.
		let Some(role_id) = setup.role_for_member_count(job.requester.member_count) else {
			return Err(ExecutionError::NoRoleForBracket { guild_name: guild.name }.into());
		};

		let channel_id = self
			.platform
			.create_text_channel(setup.guild_id, setup.category_id, &job.channel_name)
			.await
			.map_err(|source| ExecutionError::ChannelCreation {
				guild_name: guild.name.clone(),
				source,
			})?;
		self.platform
			.post_ad(channel_id, role_id, &job.ad_message)
			.await
			.map_err(|source| ExecutionError::MessagePost {
				guild_name: guild.name.clone(),
				source,
			})?;

		Ok(())
	}

	async fn report(&self, requester: &Requester, report: &Report) {
		if let Err(error) = self.platform.report(requester, report).await {
			tracing::warn!(source = ?error, requester = %requester.user_id, "Failed to report to broadcast requester");
		}
	}

	async fn notify(&self, requester: &Requester, report: &Report) {
		if let Err(error) = self.platform.notify_directly(requester, report).await {
			tracing::warn!(source = ?error, requester = %requester.user_id, "Failed to message broadcast requester directly");
		}
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<Id<UserMarker>, VecDeque<BroadcastJob>>> {
		self.queues.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::broadcast::bracket::Bracket;
	use crate::broadcast::mock::{MockPlatform, Recorded};
	use crate::broadcast::platform::OwnerReply;
	use crate::broadcast::setup::RoleRange;
	use std::collections::BTreeMap;
	use twilight_model::id::marker::GuildMarker;

	const REQUESTER_GUILD: u64 = 9;

	fn platform() -> Arc<MockPlatform> {
		let platform = MockPlatform::default();
		platform.add_guild(REQUESTER_GUILD, "Home", 150, Some(900));
		platform.add_guild(1, "Alpha", 400, Some(100));
		platform.add_guild(2, "Beta", 600, Some(200));
		platform.add_guild(3, "Gamma", 50, Some(300));
		Arc::new(platform)
	}

	fn queue(platform: &Arc<MockPlatform>) -> Arc<BroadcastQueue> {
		let platform: Arc<dyn BroadcastPlatform> = platform.clone();
		Arc::new(BroadcastQueue::new(platform, Duration::from_secs(60)))
	}

	fn setup(guild_id: u64, ranges: &[(Bracket, u64)]) -> ServerSetup {
		ServerSetup {
			guild_id: Id::new(guild_id),
			category_id: Id::new(guild_id * 10),
			role_ranges: ranges
				.iter()
				.map(|(bracket, role_id)| {
					(
						*bracket,
						RoleRange {
							role_id: Id::new(*role_id),
							member_count: 0,
						},
					)
				})
				.collect::<BTreeMap<_, _>>(),
		}
	}

	fn job(channel_name: &str, setups: Vec<ServerSetup>) -> BroadcastJob {
		let requester = Requester {
			user_id: Id::new(42),
			guild_id: Id::new(REQUESTER_GUILD),
			channel_id: Id::new(77),
			member_count: 150,
			interaction_token: String::from("token"),
		};
		let targets: Vec<Id<GuildMarker>> = setups.iter().map(|setup| setup.guild_id).collect();
		BroadcastJob::new(
			requester,
			channel_name.to_string(),
			format!("ad for {}", channel_name),
			targets,
			1000,
			setups,
		)
	}

	fn created_channels(platform: &MockPlatform) -> Vec<String> {
		platform
			.recorded()
			.into_iter()
			.filter_map(|event| match event {
				Recorded::ChannelCreated { name, .. } => Some(name),
				_ => None,
			})
			.collect()
	}

	#[tokio::test]
	async fn posts_to_every_ready_target() {
		let platform = platform();
		let queue = queue(&platform);
		let setups = vec![
			setup(1, &[(Bracket::UpTo300, 11)]),
			setup(2, &[(Bracket::UpTo300, 21), (Bracket::UpTo100, 22)]),
		];
		let outcome = queue.run_job(&job("promo", setups)).await.unwrap();
		assert_eq!(
			outcome,
			JobOutcome::Completed {
				posted_count: 2,
				failed_count: 0
			}
		);

		let recorded = platform.recorded();
		assert!(recorded.contains(&Recorded::ChannelCreated {
			guild_id: Id::new(2),
			category_id: Id::new(20),
			name: String::from("promo"),
		}));
		let posted_roles: Vec<u64> = recorded
			.iter()
			.filter_map(|event| match event {
				Recorded::AdPosted { role_id, .. } => Some(role_id.get()),
				_ => None,
			})
			.collect();
		assert_eq!(posted_roles, vec![11, 21]);

		let results = Report::Results {
			channel_name: String::from("promo"),
			posted_count: 2,
		};
		assert!(recorded.contains(&Recorded::Reported(results.clone())));
		assert!(recorded.contains(&Recorded::Notified(results)));
	}

	#[tokio::test]
	async fn one_failing_target_does_not_stop_the_job() {
		let platform = platform();
		platform.fail_channel_creation_in(1);
		platform.set_category_access(3, CategoryAccess::MissingPermission);
		let queue = queue(&platform);
		let setups = vec![
			setup(1, &[(Bracket::UpTo300, 11)]),
			setup(2, &[(Bracket::UpTo300, 21)]),
			setup(3, &[(Bracket::UpTo300, 31)]),
		];
		let outcome = queue.run_job(&job("promo", setups)).await.unwrap();
		assert_eq!(
			outcome,
			JobOutcome::Completed {
				posted_count: 1,
				failed_count: 2
			}
		);
		let recorded = platform.recorded();
		assert!(recorded.contains(&Recorded::Reported(Report::Notice(String::from(
			"Failed to create the channel in Alpha."
		)))));
		assert!(recorded.contains(&Recorded::Reported(Report::Notice(String::from(
			"Missing permission to manage channels in Gamma."
		)))));
		assert_eq!(created_channels(&platform), vec!["promo"]);
	}

	#[tokio::test]
	async fn targets_without_a_matching_role_are_skipped() {
		let platform = platform();
		let queue = queue(&platform);
		let setups = vec![setup(1, &[(Bracket::Over1500, 11)]), setup(2, &[(Bracket::UpTo300, 21)])];
		let outcome = queue.run_job(&job("promo", setups)).await.unwrap();
		assert_eq!(
			outcome,
			JobOutcome::Completed {
				posted_count: 1,
				failed_count: 1
			}
		);
		assert!(platform.recorded().contains(&Recorded::Reported(Report::Notice(String::from(
			"Alpha has no role set up for servers of this size."
		)))));
	}

	#[tokio::test]
	async fn rejected_job_posts_nothing() {
		let platform = platform();
		platform.set_owner_reply(200, OwnerReply::Declined);
		let queue = queue(&platform);
		let setups = vec![setup(1, &[(Bracket::UpTo300, 11)]), setup(2, &[(Bracket::UpTo300, 21)])];
		let outcome = queue.run_job(&job("promo", setups)).await.unwrap();
		assert_eq!(outcome, JobOutcome::Canceled);
		assert!(created_channels(&platform).is_empty());
		assert!(platform.recorded().contains(&Recorded::Reported(Report::Notice(String::from(
			CONFIRMATION_CANCELED_MESSAGE
		)))));
	}

	#[tokio::test]
	async fn jobs_run_in_order_and_survive_a_canceled_job() {
		let platform = platform();
		platform.set_owner_reply(300, OwnerReply::Declined);
		let queue = queue(&platform);

		let first = queue.enqueue(job("first", vec![setup(1, &[(Bracket::UpTo300, 11)])]));
		let second = queue.enqueue(job("second", vec![setup(3, &[(Bracket::UpTo300, 31)])]));
		let third = queue.enqueue(job("third", vec![setup(2, &[(Bracket::UpTo300, 21)])]));
		assert!(second.is_none());
		assert!(third.is_none());
		assert_eq!(queue.pending_jobs(Id::new(42)), 3);

		first.expect("first enqueue starts the drain").await.unwrap();

		assert_eq!(created_channels(&platform), vec!["first", "third"]);
		let reports: Vec<Report> = platform
			.recorded()
			.into_iter()
			.filter_map(|event| match event {
				Recorded::Reported(report) => Some(report),
				_ => None,
			})
			.collect();
		let canceled_position = reports
			.iter()
			.position(|report| *report == Report::Notice(String::from(CONFIRMATION_CANCELED_MESSAGE)))
			.unwrap();
		let first_results = reports
			.iter()
			.position(|report| matches!(report, Report::Results { channel_name, .. } if channel_name == "first"))
			.unwrap();
		let third_results = reports
			.iter()
			.position(|report| matches!(report, Report::Results { channel_name, .. } if channel_name == "third"))
			.unwrap();
		assert!(first_results < canceled_position);
		assert!(canceled_position < third_results);
		assert!(!queue.is_draining(Id::new(42)));
	}

	#[tokio::test]
	async fn drained_queue_restarts_on_next_job() {
		let platform = platform();
		let queue = queue(&platform);
		let handle = queue.enqueue(job("first", vec![setup(1, &[(Bracket::UpTo300, 11)])]));
		handle.unwrap().await.unwrap();
		assert!(!queue.is_draining(Id::new(42)));

		let handle = queue.enqueue(job("again", vec![setup(2, &[(Bracket::UpTo300, 21)])]));
		handle.expect("an empty queue starts a new drain").await.unwrap();
		assert_eq!(created_channels(&platform), vec!["first", "again"]);
	}

	#[tokio::test]
	async fn panicking_job_does_not_stall_the_requester() {
		let platform = platform();
		platform.set_panicking_guild(1);
		let queue = queue(&platform);

		let handle = queue.enqueue(job("broken", vec![setup(1, &[(Bracket::UpTo300, 11)])]));
		assert!(queue.enqueue(job("after", vec![setup(2, &[(Bracket::UpTo300, 21)])])).is_none());
		handle.expect("first enqueue starts the drain").await.unwrap();

		assert_eq!(created_channels(&platform), vec!["after"]);
		assert!(platform.recorded().contains(&Recorded::Notified(Report::Notice(String::from(
			JOB_FAILED_DIRECT_MESSAGE
		)))));
		assert!(!queue.is_draining(Id::new(42)));

		let handle = queue.enqueue(job("later", vec![setup(2, &[(Bracket::UpTo300, 21)])]));
		handle.expect("the requester can queue again").await.unwrap();
		assert_eq!(created_channels(&platform), vec!["after", "later"]);
	}
}
