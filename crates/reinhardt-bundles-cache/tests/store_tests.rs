//! Cache store resolution tests


use fixtures::{ProviderRoot, app_provider};
use reinhardt_bundles_cache::{
	BundleError, CacheConfig, CacheEntryFactory, CacheStore, PendingFile, Resolution,
	StaticRootPolicy, store::NEGATIVE_SWEEP_INTERVAL,
};
use rstest::rstest;
use std::fs;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

fn whole_seconds_after(time: SystemTime, secs: u64) -> SystemTime {
	let since_epoch = time.duration_since(SystemTime::UNIX_EPOCH).unwrap();
	SystemTime::UNIX_EPOCH + Duration::from_secs(since_epoch.as_secs() + secs)
}

#[rstest]
fn test_resolves_file_with_metadata(app_provider: ProviderRoot) {
	// Arrange
	let store = CacheStore::default();

	// Act
	let resolution = store
		.resolve_from_provider(&app_provider.provider, "/app1/css/site.css")
		.unwrap();

	// Assert
	let entry = resolution.entry().unwrap();
	assert_eq!(entry.mime_type(), Some("text/css"));
	assert_eq!(entry.etag().unwrap().len(), 32);
	assert!(entry.content_hash().unwrap().ends_with("=="));
	assert_eq!(
		entry.file().unwrap().size,
		"body { color: red; }".repeat(100).len() as u64
	);
	assert!(Arc::ptr_eq(
		entry.owning_provider().unwrap(),
		&app_provider.provider
	));
}

#[rstest]
fn test_etag_is_stable_across_stores(app_provider: ProviderRoot) {
	let first = CacheStore::default()
		.resolve_from_provider(&app_provider.provider, "app1/js/app.js")
		.unwrap();
	let second = CacheStore::default()
		.resolve_from_provider(&app_provider.provider, "app1/js/app.js")
		.unwrap();

	assert_eq!(first.entry().unwrap().etag(), second.entry().unwrap().etag());
}

#[rstest]
fn test_unknown_extension_has_no_mime_type(app_provider: ProviderRoot) {
	let store = CacheStore::default();

	let resolution = store
		.resolve_from_provider(&app_provider.provider, "app1/LICENSE")
		.unwrap();

	assert_eq!(resolution.entry().unwrap().mime_type(), None);
}

#[rstest]
fn test_directory_without_separator_redirects(app_provider: ProviderRoot) {
	let store = CacheStore::default();

	let resolution = store
		.resolve_from_provider(&app_provider.provider, "app1")
		.unwrap();

	match resolution {
		Resolution::Redirect(signal) => assert_eq!(signal.path(), "app1/"),
		other => panic!("expected redirect, got {other:?}"),
	}
}

#[rstest]
fn test_directory_with_separator_serves_index(app_provider: ProviderRoot) {
	let store = CacheStore::default();

	let resolution = store
		.resolve_from_provider(&app_provider.provider, "app1/docs/")
		.unwrap();

	let entry = resolution.entry().unwrap();
	assert!(entry.source_file().unwrap().ends_with("docs/index.html"));
	assert_eq!(entry.mime_type(), Some("text/html"));
}

#[rstest]
fn test_missing_file_is_negatively_cached(app_provider: ProviderRoot) {
	// Arrange
	let store = CacheStore::default();
	let first = store
		.resolve_from_provider(&app_provider.provider, "app1/late.js")
		.unwrap();
	assert!(first.is_not_found());

	// Act
	app_provider.write("static/app1/late.js", "late();");
	let second = store
		.resolve_from_provider(&app_provider.provider, "app1/late.js")
		.unwrap();

	// Assert
	assert!(second.is_not_found());
	match (first, second) {
		(Resolution::NotFound(a), Resolution::NotFound(b)) => assert!(Arc::ptr_eq(&a, &b)),
		_ => unreachable!(),
	}
}

#[rstest]
fn test_configured_expiration_applies_to_placeholders(app_provider: ProviderRoot) {
	let config = CacheConfig {
		not_found_expiration_secs: 5,
		..CacheConfig::default()
	};
	let store = CacheStore::from_config(&config);

	let resolution = store
		.resolve_from_provider(&app_provider.provider, "app1/nope.css")
		.unwrap();

	match resolution {
		Resolution::NotFound(entry) => {
			assert_eq!(entry.expires_after(), Duration::from_secs(5));
		}
		other => panic!("expected not found, got {other:?}"),
	}
}

#[rstest]
fn test_store_shrinks_once_placeholders_expire(app_provider: ProviderRoot) {
	// Arrange
	let config = CacheConfig {
		not_found_expiration_secs: 1,
		..CacheConfig::default()
	};
	let store = CacheStore::from_config(&config);
	for i in 0..NEGATIVE_SWEEP_INTERVAL {
		store
			.resolve_from_provider(&app_provider.provider, &format!("app1/gone-{i}.js"))
			.unwrap();
	}
	assert_eq!(store.len(), NEGATIVE_SWEEP_INTERVAL);

	// Act
	thread::sleep(Duration::from_millis(1100));
	for i in 0..NEGATIVE_SWEEP_INTERVAL {
		store
			.resolve_from_provider(&app_provider.provider, &format!("app1/other-{i}.js"))
			.unwrap();
	}

	// Assert
	assert_eq!(store.len(), NEGATIVE_SWEEP_INTERVAL);
	assert!(store.peek("app1", "app1/gone-0.js").is_none());
	assert!(store.peek("app1", "app1/other-0.js").is_some());
}

#[rstest]
fn test_redeployed_provider_time_wins(app_provider: ProviderRoot) {
	// Arrange
	let store = CacheStore::default();
	let path = app_provider.path().join("static/app1/index.html");
	let file_modified = fs::metadata(&path).unwrap().modified().unwrap();
	let deployed = whole_seconds_after(file_modified, 600);
	let redeployed = app_provider.redeployed(deployed);
	let before = store
		.resolve_from_provider(&app_provider.provider, "app1/index.html")
		.unwrap();

	// Act
	let after = store
		.resolve_from_provider(&redeployed, "app1/index.html")
		.unwrap();

	// Assert
	assert_eq!(before.entry().unwrap().content_timestamp(), Some(file_modified));
	assert_eq!(after.entry().unwrap().content_timestamp(), Some(deployed));
	assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), deployed);

	let again = store
		.resolve_from_provider(&redeployed, "app1/index.html")
		.unwrap();
	assert!(Arc::ptr_eq(after.entry().unwrap(), again.entry().unwrap()));
}

#[rstest]
fn test_debug_store_resolves_under_debug_root(app_provider: ProviderRoot) {
	app_provider.write("static/debug/app1/index.html", "<html>debug</html>");
	let store = CacheStore::new(CacheEntryFactory::default(), StaticRootPolicy::new(true));

	let resolution = store
		.resolve_from_provider(&app_provider.provider, "app1/index.html")
		.unwrap();

	assert!(resolution
		.entry()
		.unwrap()
		.source_file()
		.unwrap()
		.ends_with("static/debug/app1/index.html"));
	assert!(store
		.resolve_from_provider(&app_provider.provider, "app1/css/site.css")
		.unwrap()
		.is_not_found());
}

#[rstest]
#[case("app1/../../secret.txt")]
#[case("../app1/index.html")]
#[case("app1\\index.html")]
#[case("")]
fn test_escaping_paths_are_not_found(app_provider: ProviderRoot, #[case] path: &str) {
	app_provider.write("secret.txt", "secret");
	let store = CacheStore::default();

	let resolution = store
		.resolve_from_provider(&app_provider.provider, path)
		.unwrap();

	assert!(resolution.is_not_found());
	assert!(store.is_empty());
}

#[rstest]
fn test_concurrent_resolution_builds_once(app_provider: ProviderRoot) {
	let store = Arc::new(CacheStore::default());

	let handles: Vec<_> = (0..8)
		.map(|_| {
			let store = Arc::clone(&store);
			let provider = Arc::clone(&app_provider.provider);
			thread::spawn(move || {
				store
					.resolve_from_provider(&provider, "app1/css/site.css")
					.unwrap()
					.entry()
					.cloned()
					.unwrap()
			})
		})
		.collect();
	let entries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

	for entry in &entries[1..] {
		assert!(Arc::ptr_eq(&entries[0], entry));
	}
	assert_eq!(store.len(), 1);
}

#[rstest]
fn test_resolve_from_file_uses_absolute_path(app_provider: ProviderRoot) {
	let store = CacheStore::default();
	let path = app_provider.path().join("static/app1/js/app.js");

	let entry = store.resolve_from_file(&path, None).unwrap();

	assert_eq!(entry.mime_type(), Some("application/javascript"));
	assert!(entry.owning_provider().is_none());
	assert!(store.is_empty());
}

#[rstest]
fn test_resolve_pending_waits_for_producer(app_provider: ProviderRoot) {
	// Arrange
	let store = CacheStore::default();
	let (completer, pending) = PendingFile::channel();
	let target = app_provider.path().join("generated.css");
	let produced = target.clone();

	// Act
	let producer = thread::spawn(move || {
		thread::sleep(Duration::from_millis(20));
		fs::write(&produced, "a {}").unwrap();
		completer.complete(produced);
	});
	let entry = store.resolve_pending(pending, None).unwrap();
	producer.join().unwrap();

	// Assert
	assert_eq!(entry.source_file(), Some(target.as_path()));
	assert_eq!(entry.mime_type(), Some("text/css"));
}

#[rstest]
fn test_resolve_pending_reports_failures() {
	let store = CacheStore::default();

	let (completer, pending) = PendingFile::channel();
	completer.fail(io::Error::other("bundler crashed"));
	let failed = store.resolve_pending(pending, None);

	let (completer, pending) = PendingFile::channel();
	drop(completer);
	let abandoned = store.resolve_pending(pending, None);

	assert!(matches!(failed, Err(BundleError::PendingFailed(_))));
	assert!(matches!(abandoned, Err(BundleError::PendingAbandoned)));
}

#[rstest]
fn test_generated_asset_lives_until_dropped() {
	// Arrange
	let store = CacheStore::default();

	// Act
	let asset = store
		.generate_asset("app1-", ".js", b"export default 1;")
		.unwrap();
	let path = asset.path().to_path_buf();

	// Assert
	assert!(path.exists());
	assert_eq!(asset.entry().mime_type(), Some("application/javascript"));
	assert_eq!(asset.entry().file().unwrap().size, 17);
	drop(asset);
	assert!(!path.exists());
}

#[rstest]
fn test_evict_provider_forces_rebuild(app_provider: ProviderRoot) {
	let store = CacheStore::default();
	let first = store
		.resolve_from_provider(&app_provider.provider, "app1/index.html")
		.unwrap();

	assert_eq!(store.evict_provider("app1"), 1);
	assert!(store.peek("app1", "app1/index.html").is_none());
	let second = store
		.resolve_from_provider(&app_provider.provider, "app1/index.html")
		.unwrap();

	assert!(!Arc::ptr_eq(first.entry().unwrap(), second.entry().unwrap()));
	store.clear();
	assert!(store.is_empty());
}
