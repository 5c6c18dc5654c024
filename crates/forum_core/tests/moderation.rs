use forum_core::db::open_db_in_memory;
use forum_core::{
    AccountService, ContentService, CoreConfig, DomainError, EntityRegistry, MembershipService,
    ModerationService, NewUser, SqliteForumRepository, SqlitePostRepository, SqliteUserRepository,
    UserId,
};
use rusqlite::Connection;

struct Services<'c> {
    accounts: AccountService<SqliteUserRepository<'c>>,
    content: ContentService<SqlitePostRepository<'c>>,
    moderation: ModerationService<
        SqliteUserRepository<'c>,
        SqliteForumRepository<'c>,
        SqlitePostRepository<'c>,
    >,
}

fn setup<'c>(conn: &'c Connection, registry: &mut EntityRegistry) -> Services<'c> {
    let accounts = AccountService::new(SqliteUserRepository::new(conn), CoreConfig::default());
    let sentinel = accounts.ensure_deleted_sentinel(registry).unwrap();
    let membership = MembershipService::new(
        SqliteForumRepository::new(conn),
        SqlitePostRepository::new(conn),
        sentinel,
    );
    Services {
        accounts,
        content: ContentService::new(SqlitePostRepository::new(conn), CoreConfig::default()),
        moderation: ModerationService::new(
            SqliteUserRepository::new(conn),
            SqlitePostRepository::new(conn),
            membership,
        ),
    }
}

fn member(services: &Services<'_>, registry: &mut EntityRegistry, name: &str) -> UserId {
    services
        .accounts
        .create_user(
            registry,
            &NewUser::member(name, &format!("{name}@scu.edu"), "CSEN", 2),
        )
        .unwrap()
}

fn admin(services: &Services<'_>, registry: &mut EntityRegistry) -> UserId {
    services
        .accounts
        .create_user(registry, &NewUser::admin("prof", "prof@scu.edu", "CSEN", 4))
        .unwrap()
}

#[test]
fn moderation_requires_the_admin_capability() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let services = setup(&conn, &mut registry);

    let regular = member(&services, &mut registry, "james");
    let target = member(&services, &mut registry, "lena");

    let err = services
        .moderation
        .delete_user(&mut registry, regular, target)
        .unwrap_err();
    assert!(matches!(err, DomainError::StateConflict(_)));
    assert!(!registry.user(target).unwrap().is_deleted);
}

#[test]
fn admin_remove_post_suppresses_attached_posts_only() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let services = setup(&conn, &mut registry);

    let admin = admin(&services, &mut registry);
    let author = member(&services, &mut registry, "james");
    let forum = services
        .moderation
        .membership()
        .create_forum(&mut registry, "CSEN174")
        .unwrap();
    services
        .moderation
        .membership()
        .add_member(&mut registry, forum, author)
        .unwrap();

    let attached = services
        .content
        .create_post(&mut registry, author, "Week 1", "Anyone started?")
        .unwrap();
    services
        .moderation
        .membership()
        .add_post(&mut registry, forum, attached)
        .unwrap();
    let detached = services
        .content
        .create_post(&mut registry, author, "Draft", "Not attached")
        .unwrap();

    services
        .moderation
        .remove_post(&mut registry, admin, forum, attached)
        .unwrap();
    assert!(registry.post(attached).unwrap().is_deleted);

    // A post outside the forum is left alone.
    services
        .moderation
        .remove_post(&mut registry, admin, forum, detached)
        .unwrap();
    assert!(!registry.post(detached).unwrap().is_deleted);

    let stored: i64 = conn
        .query_row(
            "SELECT is_deleted FROM posts WHERE uuid = ?1;",
            [attached.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, 1);
}

#[test]
fn delete_user_cascades_over_authored_posts() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let services = setup(&conn, &mut registry);

    let admin = admin(&services, &mut registry);
    let target = member(&services, &mut registry, "james");
    let post = services
        .content
        .create_post(&mut registry, target, "Week 1", "Anyone started?")
        .unwrap();
    let comment = services
        .content
        .create_comment(&mut registry, target, "Re", "Bump", post)
        .unwrap();

    services
        .moderation
        .delete_user(&mut registry, admin, target)
        .unwrap();
    assert!(registry.user(target).unwrap().is_deleted);
    assert!(registry.post(post).unwrap().is_deleted);
    assert!(registry.post(comment).unwrap().is_deleted);

    // Tree structure is untouched; only flags move.
    assert_eq!(registry.post(post).unwrap().comments, vec![comment]);
    assert_eq!(registry.post(post).unwrap().message, "Anyone started?");

    let err = services
        .moderation
        .delete_user(&mut registry, admin, target)
        .unwrap_err();
    assert!(matches!(err, DomainError::StateConflict(_)));
}

#[test]
fn undelete_never_revives_posts() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let services = setup(&conn, &mut registry);

    let admin = admin(&services, &mut registry);
    let target = member(&services, &mut registry, "james");

    // Undeleting an active account is a conflict.
    let err = services
        .moderation
        .undelete_user(&mut registry, admin, target)
        .unwrap_err();
    assert!(matches!(err, DomainError::StateConflict(_)));

    let post = services
        .content
        .create_post(&mut registry, target, "Week 1", "Anyone started?")
        .unwrap();
    services
        .moderation
        .delete_user(&mut registry, admin, target)
        .unwrap();
    services
        .moderation
        .undelete_user(&mut registry, admin, target)
        .unwrap();

    assert!(!registry.user(target).unwrap().is_deleted);
    assert!(registry.post(post).unwrap().is_deleted, "ratchet holds");
    let stored: i64 = conn
        .query_row(
            "SELECT is_deleted FROM posts WHERE uuid = ?1;",
            [post.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, 1);
}

#[test]
fn deleted_users_cannot_be_moderation_targets() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let services = setup(&conn, &mut registry);

    let admin = admin(&services, &mut registry);
    let target = member(&services, &mut registry, "james");
    let forum = services
        .moderation
        .membership()
        .create_forum(&mut registry, "CSEN174")
        .unwrap();
    services
        .moderation
        .membership()
        .add_member(&mut registry, forum, target)
        .unwrap();
    services
        .moderation
        .delete_user(&mut registry, admin, target)
        .unwrap();

    let err = services
        .moderation
        .restrict_user(&mut registry, admin, forum, target)
        .unwrap_err();
    assert!(matches!(err, DomainError::StateConflict(_)));
    let err = services
        .moderation
        .authorize_user(&mut registry, admin, forum, target)
        .unwrap_err();
    assert!(matches!(err, DomainError::StateConflict(_)));
    assert!(registry.forum(forum).unwrap().sets_consistent());
}

#[test]
fn deleted_author_content_is_born_suppressed() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let services = setup(&conn, &mut registry);

    let admin = admin(&services, &mut registry);
    let target = member(&services, &mut registry, "james");
    services
        .moderation
        .delete_user(&mut registry, admin, target)
        .unwrap();

    let post = services
        .content
        .create_post(&mut registry, target, "Ghost", "still here")
        .unwrap();
    let entry = registry.post(post).unwrap();
    assert!(entry.is_deleted);
    assert_eq!(entry.message, "still here", "flag set, content intact");
}

#[test]
fn admin_membership_moderation_delegates_to_transitions() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let services = setup(&conn, &mut registry);

    let admin = admin(&services, &mut registry);
    let target = member(&services, &mut registry, "james");
    let forum = services
        .moderation
        .membership()
        .create_forum(&mut registry, "CSEN174")
        .unwrap();
    services
        .moderation
        .membership()
        .add_member(&mut registry, forum, target)
        .unwrap();

    services
        .moderation
        .restrict_user(&mut registry, admin, forum, target)
        .unwrap();
    assert!(registry.forum(forum).unwrap().is_restricted(target));

    services
        .moderation
        .authorize_user(&mut registry, admin, forum, target)
        .unwrap();
    let entry = registry.forum(forum).unwrap();
    assert!(entry.is_authorized(target));
    assert!(!entry.is_restricted(target));

    services
        .moderation
        .deauthorize_user(&mut registry, admin, forum, target)
        .unwrap();
    assert!(!registry.forum(forum).unwrap().is_authorized(target));

    services
        .moderation
        .unrestrict_user(&mut registry, admin, forum, target)
        .unwrap();
    assert!(registry.forum(forum).unwrap().sets_consistent());
}
