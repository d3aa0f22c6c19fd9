//! Repository behaviour against a real Postgres schema.

use std::sync::Arc;

use futures::future::join_all;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use content_hub::application::pagination::PageRequest;
use content_hub::application::repos::{
    ARTICLE_SLUG_CONSTRAINT, ArticleOrdering, ArticleQueryFilter, ArticlesRepo, ArticlesWriteRepo,
    CommentQueryFilter, CommentsRepo, CommentsWriteRepo, CreateArticleParams, CreateCommentParams,
    CreateUserParams, StorageHealth, UsersRepo, UsersWriteRepo,
};
use content_hub::domain::entities::{ArticleRecord, SoftDeleteState, UserRecord};
use content_hub::domain::visibility::{ArticleScope, Visibility};
use content_hub::infra::db::PostgresRepositories;

async fn user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            token_prefix: format!("ch_{username}"),
            token_hash: vec![0; 32],
            date_joined: OffsetDateTime::now_utc(),
        })
        .await
        .expect("create user")
}

async fn article(
    repos: &PostgresRepositories,
    author: &UserRecord,
    slug: &str,
    is_published: bool,
) -> ArticleRecord {
    repos
        .create_article(CreateArticleParams {
            id: Uuid::new_v4(),
            title: format!("Title for {slug}"),
            slug: slug.to_string(),
            content: "Stored content that passes the length check.".to_string(),
            excerpt: String::new(),
            author_id: author.id,
            is_published,
            tags: String::new(),
            created_at: OffsetDateTime::now_utc(),
        })
        .await
        .expect("create article")
}

async fn slugs_in(repos: &PostgresRepositories, scope: ArticleScope) -> Vec<String> {
    let mut slugs: Vec<String> = repos
        .list_articles(
            scope,
            &ArticleQueryFilter::default(),
            ArticleOrdering::default(),
            PageRequest::default(),
        )
        .await
        .expect("list")
        .items
        .into_iter()
        .map(|summary| summary.article.slug)
        .collect();
    slugs.sort();
    slugs
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_view_increments_are_not_lost(pool: PgPool) {
    let repos = Arc::new(PostgresRepositories::new(pool));
    let ada = user(&repos, "ada").await;
    let record = article(&repos, &ada, "popular", true).await;

    let tasks = (0..20).map(|_| {
        let repos = repos.clone();
        async move { repos.increment_views(record.id).await }
    });
    let results = join_all(tasks).await;
    assert!(results.iter().all(Result::is_ok));

    let stored = repos
        .find_by_id(ArticleScope::View(Visibility::All), record.id)
        .await
        .expect("find")
        .expect("article exists");
    assert_eq!(stored.views_count, 20);
}

#[sqlx::test(migrations = "./migrations")]
async fn slug_lookup_includes_deleted_rows_and_ignores_lookalikes(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let ada = user(&repos, "ada").await;
    article(&repos, &ada, "hello", true).await;
    let deleted = article(&repos, &ada, "hello-1", true).await;
    article(&repos, &ada, "hello-world", true).await;
    repos
        .set_article_deletion(
            deleted.id,
            SoftDeleteState::deleted(OffsetDateTime::now_utc()),
            OffsetDateTime::now_utc(),
        )
        .await
        .expect("soft delete");

    let slugs = repos.slugs_with_base("hello").await.expect("slugs");

    assert!(slugs.contains("hello"));
    assert!(slugs.contains("hello-1"));
    assert!(!slugs.contains("hello-world"));
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_slug_maps_to_constraint_error(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let ada = user(&repos, "ada").await;
    article(&repos, &ada, "taken", true).await;

    let err = repos
        .create_article(CreateArticleParams {
            id: Uuid::new_v4(),
            title: "Another Title".to_string(),
            slug: "taken".to_string(),
            content: "Different content, same slug.".to_string(),
            excerpt: String::new(),
            author_id: ada.id,
            is_published: true,
            tags: String::new(),
            created_at: OffsetDateTime::now_utc(),
        })
        .await
        .expect_err("slug clash");

    assert!(err.is_duplicate_of(ARTICLE_SLUG_CONSTRAINT));
}

#[sqlx::test(migrations = "./migrations")]
async fn scopes_follow_deletion_and_publication(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let ada = user(&repos, "ada").await;
    let bob = user(&repos, "bob").await;
    let published = article(&repos, &ada, "published", true).await;
    let draft = article(&repos, &ada, "draft", false).await;
    let gone = article(&repos, &bob, "gone", true).await;
    let now = OffsetDateTime::now_utc();
    repos
        .set_article_deletion(gone.id, SoftDeleteState::deleted(now), now)
        .await
        .expect("soft delete");

    assert_eq!(slugs_in(&repos, ArticleScope::View(Visibility::All)).await.len(), 3);
    assert_eq!(
        slugs_in(&repos, ArticleScope::View(Visibility::Active)).await,
        vec!["draft", "published"]
    );
    assert_eq!(
        slugs_in(&repos, ArticleScope::View(Visibility::Published)).await,
        vec!["published"]
    );
    assert_eq!(
        slugs_in(&repos, ArticleScope::PublishedOrOwn { viewer: ada.id }).await,
        vec!["draft", "published"]
    );
    assert_eq!(
        slugs_in(&repos, ArticleScope::PublishedOrOwn { viewer: bob.id }).await,
        vec!["published"]
    );

    let restored = repos
        .set_article_deletion(gone.id, SoftDeleteState::active(), now)
        .await
        .expect("restore");
    assert!(!restored.deletion.is_deleted);
    assert!(restored.deletion.deleted_at.is_none());
    assert_eq!(published.slug, "published");
    assert!(!draft.is_published);
}

#[sqlx::test(migrations = "./migrations")]
async fn replies_are_capped_per_parent_and_newest_first(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let ada = user(&repos, "ada").await;
    let record = article(&repos, &ada, "threaded", true).await;
    let base = OffsetDateTime::now_utc();

    let comment = |parent_id: Option<Uuid>, minutes: i64| CreateCommentParams {
        id: Uuid::new_v4(),
        article_id: record.id,
        author_id: ada.id,
        parent_id,
        content: format!("comment at {minutes}"),
        created_at: base + time::Duration::minutes(minutes),
    };

    let root = repos
        .create_comment(comment(None, 0))
        .await
        .expect("root");
    let mut reply_ids = Vec::new();
    for minute in 1..=7 {
        let reply = repos
            .create_comment(comment(Some(root.id), minute))
            .await
            .expect("reply");
        reply_ids.push(reply.id);
    }

    let replies = repos.replies_for(&[root.id], 5).await.expect("replies");
    let got: Vec<Uuid> = replies.iter().map(|r| r.comment.id).collect();
    let expected: Vec<Uuid> = reply_ids.iter().rev().take(5).copied().collect();
    assert_eq!(got, expected);

    assert_eq!(
        repos
            .count_active_for_article(record.id)
            .await
            .expect("count"),
        8
    );
    let top = repos
        .top_level_comments(record.id, PageRequest::default())
        .await
        .expect("top level");
    assert_eq!(top.total, 1);

    let only_replies = repos
        .list_comments(
            Visibility::Active,
            &CommentQueryFilter {
                is_reply: Some(true),
                ..CommentQueryFilter::default()
            },
            PageRequest::default(),
        )
        .await
        .expect("list");
    assert_eq!(only_replies.total, 7);
}

#[sqlx::test(migrations = "./migrations")]
async fn activity_counts_only_visible_work(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let ada = user(&repos, "ada").await;
    article(&repos, &ada, "visible", true).await;
    article(&repos, &ada, "hidden-draft", false).await;

    let activity = repos.activity(ada.id).await.expect("activity");
    assert_eq!(activity.articles_count, 1);
    assert_eq!(activity.comments_count, 0);
    assert_eq!(
        repos
            .count_published_by_author(ada.id)
            .await
            .expect("count"),
        1
    );

    let found = repos
        .find_by_token_prefix("ch_ada")
        .await
        .expect("lookup")
        .expect("user exists");
    assert_eq!(found.username, "ada");
    repos.ping().await.expect("ping");
}
