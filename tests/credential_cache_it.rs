// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	thread,
	time::{Duration, Instant},
};
// crates.io
use tokio::time;
// self
use token_broker::{
	auth::{AppCredentials, AuthenticationError, IssuedToken},
	cache::{CredentialCache, RefreshPolicy},
	error::{Error, TransportError},
};

const TWO_HOURS: Duration = Duration::from_secs(2 * 60 * 60);

fn credentials() -> AppCredentials {
	AppCredentials::new("wx-cache-it", "cache-secret").expect("Credential fixture should be valid.")
}

fn network_error() -> AuthenticationError {
	TransportError::network(std::io::Error::other("ErrNetwork")).into()
}

/// Succeeds with `tok1` on the first call and fails with a network error afterwards.
fn first_call_only(
	calls: Arc<AtomicUsize>,
) -> impl Fn(AppCredentials) -> std::future::Ready<Result<IssuedToken, AuthenticationError>>
+ Send
+ Sync
+ 'static {
	move |_| {
		let n = calls.fetch_add(1, Ordering::SeqCst) + 1;

		std::future::ready(if n == 1 {
			Ok(IssuedToken::new("tok1", TWO_HOURS))
		} else {
			Err(network_error())
		})
	}
}

/// Hands out `tok<n>` on the `n`-th call.
fn counting(
	calls: Arc<AtomicUsize>,
	valid_for: Duration,
) -> impl Fn(AppCredentials) -> std::future::Ready<Result<IssuedToken, AuthenticationError>>
+ Send
+ Sync
+ 'static {
	move |_| {
		let n = calls.fetch_add(1, Ordering::SeqCst) + 1;

		std::future::ready(Ok(IssuedToken::new(format!("tok{n}"), valid_for)))
	}
}

/// Lets the background task run whatever became due.
async fn settle() {
	time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn construction_returns_the_first_token() {
	let calls = Arc::new(AtomicUsize::new(0));
	let cache =
		CredentialCache::new(credentials(), first_call_only(calls.clone()), RefreshPolicy::default())
			.await
			.expect("Cache construction should succeed.");
	let state = cache.current_value();

	assert_eq!(state.token().map(|token| token.expose()), Some("tok1"));
	assert!(state.last_error().is_none());
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_stale_token_and_surfaces_error() {
	let calls = Arc::new(AtomicUsize::new(0));
	let cache =
		CredentialCache::new(credentials(), first_call_only(calls.clone()), RefreshPolicy::default())
			.await
			.expect("Cache construction should succeed.");

	// Two hours minus the five minute margin.
	time::sleep(Duration::from_secs(6900) + Duration::from_millis(10)).await;

	let state = cache.current_value();

	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert_eq!(state.attempt(), 2);
	assert_eq!(state.token().map(|token| token.expose()), Some("tok1"));
	assert!(matches!(
		state.last_error().map(|err| &**err),
		Some(AuthenticationError::Transport(TransportError::Network { .. }))
	));
	assert!(matches!(cache.access_token(), Err(Error::Authentication(_))));

	// Failures retry on the fallback cadence.
	time::sleep(Duration::from_secs(60)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 3);
	assert_eq!(cache.metrics().failures(), 2);
}

#[tokio::test(start_paused = true)]
async fn force_refresh_fetches_immediately_and_reschedules() {
	let calls = Arc::new(AtomicUsize::new(0));
	let cache = CredentialCache::new(
		credentials(),
		counting(calls.clone(), TWO_HOURS),
		RefreshPolicy::default(),
	)
	.await
	.expect("Cache construction should succeed.");

	cache.force_refresh(Duration::from_secs(5 * 60)).await.expect("Loop should accept the command.");
	settle().await;

	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert_eq!(cache.access_token().expect("Token should be cached.").expose(), "tok2");

	time::sleep(Duration::from_secs(5 * 60)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 3);

	// The override persists across scheduled refreshes.
	time::sleep(Duration::from_secs(5 * 60)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn last_force_refresh_governs_the_schedule() {
	let calls = Arc::new(AtomicUsize::new(0));
	let cache = CredentialCache::new(
		credentials(),
		counting(calls.clone(), TWO_HOURS),
		RefreshPolicy::default(),
	)
	.await
	.expect("Cache construction should succeed.");

	cache.force_refresh(Duration::from_secs(5 * 60)).await.expect("Loop should accept the command.");
	cache.force_refresh(Duration::from_secs(10 * 60)).await.expect("Loop should accept the command.");
	settle().await;

	assert_eq!(calls.load(Ordering::SeqCst), 3);

	time::sleep(Duration::from_secs(5 * 60) + Duration::from_millis(10)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 3, "The first interval must not survive.");

	time::sleep(Duration::from_secs(5 * 60)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn refresh_now_restores_the_expiry_schedule() {
	let calls = Arc::new(AtomicUsize::new(0));
	let cache = CredentialCache::new(
		credentials(),
		counting(calls.clone(), TWO_HOURS),
		RefreshPolicy::default(),
	)
	.await
	.expect("Cache construction should succeed.");

	cache.force_refresh(Duration::from_secs(60)).await.expect("Loop should accept the command.");
	cache.refresh_now().await.expect("Loop should accept the command.");
	settle().await;

	assert_eq!(calls.load(Ordering::SeqCst), 3);

	time::sleep(Duration::from_secs(30 * 60)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 3);

	time::sleep(Duration::from_secs(6900)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 4);
	assert_eq!(cache.current_value().attempt(), 4);
}

#[tokio::test(start_paused = true)]
async fn force_refresh_during_a_fetch_waits_for_it() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let cache = Arc::new(
		CredentialCache::new(
			credentials(),
			move |_: AppCredentials| {
				let n = counter.fetch_add(1, Ordering::SeqCst) + 1;

				async move {
					if n == 2 {
						time::sleep(Duration::from_secs(10)).await;
					}

					Ok::<_, AuthenticationError>(IssuedToken::new(format!("tok{n}"), TWO_HOURS))
				}
			},
			RefreshPolicy::default(),
		)
		.await
		.expect("Cache construction should succeed."),
	);

	cache.refresh_now().await.expect("Loop should accept the command.");

	let forced = {
		let cache = cache.clone();

		tokio::spawn(async move { cache.force_refresh(Duration::from_secs(5 * 60)).await })
	};

	time::sleep(Duration::from_secs(5)).await;

	assert!(!forced.is_finished(), "The hand-off must wait for the in-flight fetch.");
	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert_eq!(cache.access_token().expect("Stale token should be served.").expose(), "tok1");

	time::sleep(Duration::from_secs(5) + Duration::from_millis(10)).await;
	forced
		.await
		.expect("Forcing task should not panic.")
		.expect("Loop should accept the command.");

	assert_eq!(calls.load(Ordering::SeqCst), 3);
	assert_eq!(cache.access_token().expect("Token should be cached.").expose(), "tok3");

	time::sleep(Duration::from_secs(5 * 60)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn absurd_token_lifetime_keeps_the_loop_alive() {
	let calls = Arc::new(AtomicUsize::new(0));
	let cache = CredentialCache::new(
		credentials(),
		counting(calls.clone(), Duration::from_secs(i64::MAX as u64)),
		RefreshPolicy::default(),
	)
	.await
	.expect("Cache construction should succeed.");

	assert_eq!(cache.current_value().expires_at(), None);

	cache.force_refresh(Duration::from_secs(60)).await.expect("Loop should accept the command.");
	settle().await;

	assert_eq!(calls.load(Ordering::SeqCst), 2);

	time::sleep(Duration::from_secs(60)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 3);

	cache.refresh_now().await.expect("Loop should still be running.");
	settle().await;

	assert_eq!(calls.load(Ordering::SeqCst), 4);
	assert_eq!(cache.access_token().expect("Token should be cached.").expose(), "tok4");
}

#[tokio::test(start_paused = true)]
async fn hung_authenticator_times_out() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let cache = CredentialCache::new(
		credentials(),
		move |_: AppCredentials| {
			let n = counter.fetch_add(1, Ordering::SeqCst) + 1;

			async move {
				if n > 1 {
					time::sleep(Duration::from_secs(60 * 60)).await;
				}

				Ok::<_, AuthenticationError>(IssuedToken::new(format!("tok{n}"), TWO_HOURS))
			}
		},
		RefreshPolicy::default().with_fetch_timeout(Duration::from_secs(5)),
	)
	.await
	.expect("Cache construction should succeed.");

	cache.refresh_now().await.expect("Loop should accept the command.");
	time::sleep(Duration::from_secs(5) + Duration::from_millis(10)).await;

	let state = cache.current_value();

	assert_eq!(state.token().map(|token| token.expose()), Some("tok1"));
	assert!(matches!(
		state.last_error().map(|err| &**err),
		Some(AuthenticationError::Timeout { after }) if *after == Duration::from_secs(5)
	));
}

#[tokio::test(start_paused = true)]
async fn dropped_cache_stops_fetching() {
	let calls = Arc::new(AtomicUsize::new(0));
	let cache = CredentialCache::new(
		credentials(),
		counting(calls.clone(), Duration::from_secs(10)),
		RefreshPolicy::default(),
	)
	.await
	.expect("Cache construction should succeed.");

	time::sleep(Duration::from_secs(11)).await;

	let seen = calls.load(Ordering::SeqCst);

	assert!(seen >= 3);

	drop(cache);
	time::sleep(Duration::from_secs(60)).await;

	assert_eq!(calls.load(Ordering::SeqCst), seen);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn readers_never_observe_torn_state() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	// Every third attempt fails, so snapshots alternate between fresh and stale-with-error.
	let authenticator = move |_: AppCredentials| {
		let n = counter.fetch_add(1, Ordering::SeqCst) + 1;

		std::future::ready(if n % 3 == 0 {
			Err(network_error())
		} else {
			Ok(IssuedToken::new(format!("tok{n}"), Duration::from_millis(10)))
		})
	};
	let policy = RefreshPolicy::default()
		.with_min_interval(Duration::from_millis(1))
		.with_fallback_interval(Duration::from_millis(1));
	let cache = Arc::new(
		CredentialCache::new(credentials(), authenticator, policy)
			.await
			.expect("Cache construction should succeed."),
	);
	let deadline = Instant::now() + Duration::from_millis(300);
	let readers = (0..4)
		.map(|_| {
			let cache = cache.clone();

			thread::spawn(move || {
				let mut last_attempt = 0;

				while Instant::now() < deadline {
					let state = cache.current_value();
					let attempt = state.attempt();
					let token = state.token().map(|token| token.expose().to_owned());

					assert!(attempt >= last_attempt, "Attempts must be published in order.");

					if attempt % 3 == 0 {
						assert!(state.last_error().is_some());
						assert_eq!(token, Some(format!("tok{}", attempt - 1)));
					} else {
						assert!(state.last_error().is_none());
						assert_eq!(token, Some(format!("tok{attempt}")));
					}

					last_attempt = attempt;
				}

				last_attempt
			})
		})
		.collect::<Vec<_>>();

	for reader in readers {
		reader.join().expect("Reader thread should not panic.");
	}

	assert!(cache.current_value().attempt() > 3, "Background task should keep refreshing.");
}
