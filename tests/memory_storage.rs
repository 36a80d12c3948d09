// std
use std::sync::Arc;
// self
use token_authenticator::{
	auth::AccessToken,
	store::{AccessTokenStorage, MemoryTokenStorage},
};

fn token(value: String) -> AccessToken {
	AccessToken::builder().token(value).build().expect("Token fixture should build.")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_leave_exactly_one_complete_token() {
	let storage: Arc<dyn AccessTokenStorage> = Arc::new(MemoryTokenStorage::new());
	let mut tasks = Vec::new();

	for writer in 0..8 {
		let storage = storage.clone();

		tasks.push(tokio::spawn(async move {
			for round in 0..50 {
				storage.set_access_token(token(format!("w{writer}-r{round}")));

				let seen = storage.access_token().expect("A token should always be visible.");

				assert!(seen.token().expose().starts_with('w'));
			}
		}));
	}
	for task in tasks {
		task.await.expect("Writer task should not panic.");
	}

	let last = storage.access_token().expect("Storage should hold the last write.");

	assert!(last.token().expose().ends_with("-r49"));
}
