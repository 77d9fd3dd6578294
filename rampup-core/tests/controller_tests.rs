use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rampup_core::{
    article_id, default_companies, AppController, Article, Company, Navigation, NewsSource,
    RefreshError, StateStore, Topic,
};

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "rampup_ctrl_{tag}_{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    dir
}

fn sample_article(url: &str) -> Article {
    Article {
        id: article_id(url),
        title: format!("Post at {url}"),
        url: url.to_owned(),
        source: "Example".to_owned(),
        published_date: None,
        summary: vec!["takeaway".to_owned()],
        topic: Topic::Security,
        is_read: false,
        is_saved: false,
    }
}

/// Returns the same candidate list for every topic and every company.
struct StaticSource {
    articles: Vec<Article>,
}

#[async_trait]
impl NewsSource for StaticSource {
    async fn global_news(&self, _topic: Topic) -> Vec<Article> {
        self.articles.clone()
    }

    async fn company_blogs(&self, _company: &Company, _topic: Topic) -> Vec<Article> {
        self.articles.clone()
    }
}

struct EmptySource;

#[async_trait]
impl NewsSource for EmptySource {
    async fn global_news(&self, _topic: Topic) -> Vec<Article> {
        Vec::new()
    }

    async fn company_blogs(&self, _company: &Company, _topic: Topic) -> Vec<Article> {
        Vec::new()
    }
}

/// Stalls long enough for a second refresh to arrive while the first is
/// still in flight.
struct SlowSource;

#[async_trait]
impl NewsSource for SlowSource {
    async fn global_news(&self, _topic: Topic) -> Vec<Article> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Vec::new()
    }

    async fn company_blogs(&self, _company: &Company, _topic: Topic) -> Vec<Article> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Vec::new()
    }
}

async fn controller(dir: &std::path::Path, source: impl NewsSource + 'static) -> AppController {
    AppController::load(StateStore::new(dir), Arc::new(source)).await
}

#[tokio::test]
async fn toggle_read_twice_is_a_noop() {
    let dir = temp_dir("toggle_read");
    let api = controller(&dir, EmptySource).await;

    let before = api.snapshot().await;
    api.toggle_read("some-id").await.unwrap();
    assert_eq!(
        api.snapshot().await.read_articles,
        vec!["some-id".to_owned()]
    );

    api.toggle_read("some-id").await.unwrap();
    assert_eq!(api.snapshot().await.read_articles, before.read_articles);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn toggle_save_twice_restores_prior_content() {
    let dir = temp_dir("toggle_save");
    let api = controller(&dir, EmptySource).await;

    let first = sample_article("https://example.com/first");
    let second = sample_article("https://example.com/second");

    api.toggle_save(&first).await.unwrap();
    api.toggle_save(&second).await.unwrap();

    // Newly saved articles appear first.
    let saved = api.snapshot().await.saved_articles;
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].id, second.id);
    assert_eq!(saved[1].id, first.id);
    assert!(saved.iter().all(|snapshot| snapshot.is_saved));

    api.toggle_save(&second).await.unwrap();
    let saved = api.snapshot().await.saved_articles;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, first.id);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn saved_snapshot_is_independent_of_live_flags() {
    let dir = temp_dir("snapshot");
    let api = controller(&dir, EmptySource).await;

    let article = sample_article("https://example.com/keep");
    api.toggle_save(&article).await.unwrap();
    api.toggle_read(&article.id).await.unwrap();

    // The stored snapshot keeps the flags it was captured with; the
    // read status only appears through projection.
    let raw = api.snapshot().await.saved_articles;
    assert!(!raw[0].is_read);
    let projected = api.saved_articles().await;
    assert!(projected[0].is_read);
    assert!(projected[0].is_saved);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn remove_company_evicts_its_cache_entry() {
    let dir = temp_dir("evict");
    let api = controller(
        &dir,
        StaticSource {
            articles: vec![sample_article("https://acme.test/post")],
        },
    )
    .await;

    let nav = api.add_company("Acme", "https://acme.test/blog").await.unwrap();
    let Navigation::Company(id) = nav else {
        panic!("expected a company navigation intent");
    };
    api.refresh_company_news(&id).await.unwrap();
    assert!(api.snapshot().await.company_news.contains_key(&id));

    let nav = api.remove_company(&id).await.unwrap();
    assert_eq!(nav, Navigation::Home);
    let state = api.snapshot().await;
    assert!(!state.companies.iter().any(|company| company.id == id));
    assert!(!state.company_news.contains_key(&id));

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn refresh_with_all_empty_topics_still_advances_timestamp() {
    let dir = temp_dir("freshness");
    let api = controller(&dir, EmptySource).await;

    assert_eq!(api.snapshot().await.global_news.last_updated, 0);
    let count = api.refresh_global_news().await.unwrap();
    assert_eq!(count, 0);

    let cache = api.snapshot().await.global_news;
    assert!(cache.articles.is_empty());
    assert!(cache.last_updated > 0);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn refresh_concatenates_one_fetch_per_topic() {
    let dir = temp_dir("concat");
    let api = controller(
        &dir,
        StaticSource {
            articles: vec![
                sample_article("https://example.com/a"),
                sample_article("https://example.com/b"),
            ],
        },
    )
    .await;

    let count = api.refresh_global_news().await.unwrap();
    assert_eq!(count, 2 * Topic::ALL.len());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn global_view_projects_read_and_saved_status() {
    let dir = temp_dir("projection");
    let read_url = "https://example.com/read-me";
    let saved_url = "https://example.com/save-me";
    let api = controller(
        &dir,
        StaticSource {
            articles: vec![sample_article(read_url), sample_article(saved_url)],
        },
    )
    .await;

    api.refresh_global_news().await.unwrap();
    api.toggle_read(&article_id(read_url)).await.unwrap();
    api.toggle_save(&sample_article(saved_url)).await.unwrap();

    let articles = api.global_articles().await;
    for article in &articles {
        assert_eq!(article.is_read, article.id == article_id(read_url));
        assert_eq!(article.is_saved, article.id == article_id(saved_url));
    }
    // Raw cache entries never carry the per-session flags.
    let raw = api.snapshot().await.global_news.articles;
    assert!(raw.iter().all(|article| !article.is_read && !article.is_saved));

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn second_concurrent_refresh_is_rejected() {
    let dir = temp_dir("inflight");
    let api = Arc::new(controller(&dir, SlowSource).await);

    let (first, second) = tokio::join!(api.refresh_global_news(), api.refresh_global_news());
    assert!(matches!(
        (&first, &second),
        (Ok(_), Err(RefreshError::AlreadyRunning)) | (Err(RefreshError::AlreadyRunning), Ok(_))
    ));

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn auto_refresh_fires_once_on_empty_partition() {
    let dir = temp_dir("auto");
    let api = controller(&dir, EmptySource).await;

    assert!(api.refresh_global_if_empty().await.unwrap());
    // The attempt stamped the cache, so a remount does not re-fetch.
    assert!(!api.refresh_global_if_empty().await.unwrap());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn company_auto_refresh_fires_once_on_empty_partition() {
    let dir = temp_dir("auto_company");
    let api = controller(&dir, EmptySource).await;

    let Navigation::Company(id) = api.add_company("Acme", "https://acme.test").await.unwrap()
    else {
        panic!("expected a company navigation intent");
    };
    assert!(api.refresh_company_if_empty(&id).await.unwrap());
    assert!(!api.refresh_company_if_empty(&id).await.unwrap());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn add_company_issues_fresh_monotonic_ids() {
    let dir = temp_dir("ids");
    let api = controller(&dir, EmptySource).await;

    let Navigation::Company(first) = api.add_company("One", "https://one.test").await.unwrap()
    else {
        panic!("expected a company navigation intent");
    };
    let Navigation::Company(second) = api.add_company("Two", "https://two.test").await.unwrap()
    else {
        panic!("expected a company navigation intent");
    };

    let first_id: i64 = first.parse().unwrap();
    let second_id: i64 = second.parse().unwrap();
    assert!(second_id > first_id);

    let companies = api.companies().await;
    assert_eq!(companies.len(), default_companies().len() + 2);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn reset_restores_defaults_and_clears_company_caches_only() {
    let dir = temp_dir("reset");
    let api = controller(
        &dir,
        StaticSource {
            articles: vec![sample_article("https://example.com/post")],
        },
    )
    .await;

    let Navigation::Company(id) = api.add_company("Acme", "https://acme.test").await.unwrap()
    else {
        panic!("expected a company navigation intent");
    };
    api.refresh_company_news(&id).await.unwrap();
    api.refresh_global_news().await.unwrap();
    api.toggle_read("kept-id").await.unwrap();

    let nav = api.reset_to_defaults().await.unwrap();
    assert_eq!(nav, Navigation::Home);

    let state = api.snapshot().await;
    assert_eq!(state.companies, default_companies());
    assert!(state.company_news.is_empty());
    // Global news and read/saved state survive a reset.
    assert!(state.global_news.last_updated > 0);
    assert_eq!(state.read_articles, vec!["kept-id".to_owned()]);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn mutations_persist_across_reload() {
    let dir = temp_dir("reload");
    {
        let api = controller(&dir, EmptySource).await;
        api.toggle_read("persisted-id").await.unwrap();
        api.add_company("Acme", "https://acme.test").await.unwrap();
    }

    let api = controller(&dir, EmptySource).await;
    assert_eq!(api.load_source(), rampup_core::LoadSource::Split);
    let state = api.snapshot().await;
    assert_eq!(state.read_articles, vec!["persisted-id".to_owned()]);
    assert!(state.companies.iter().any(|company| company.name == "Acme"));

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn settings_write_failure_surfaces_through_mutations() {
    let dir = temp_dir("quota");
    tokio::fs::create_dir_all(dir.join("settings.json"))
        .await
        .unwrap();

    let api = controller(&dir, EmptySource).await;
    assert!(api.toggle_read("any-id").await.is_err());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn refreshing_an_unknown_company_errors() {
    let dir = temp_dir("unknown");
    let api = controller(&dir, EmptySource).await;

    let result = api.refresh_company_news("no-such-company").await;
    assert!(matches!(result, Err(RefreshError::UnknownCompany(_))));

    let _ = tokio::fs::remove_dir_all(&dir).await;
}
