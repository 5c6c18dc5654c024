use forum_core::db::open_db_in_memory;
use forum_core::{
    AccountService, ContentService, CoreConfig, DomainError, EntityKind, EntityRegistry, NewUser,
    ReactionKind, SqlitePostRepository, SqliteUserRepository, UserId,
};
use rusqlite::Connection;

fn content(conn: &Connection) -> ContentService<SqlitePostRepository<'_>> {
    ContentService::new(SqlitePostRepository::new(conn), CoreConfig::default())
}

fn member(conn: &Connection, registry: &mut EntityRegistry, name: &str) -> UserId {
    AccountService::new(SqliteUserRepository::new(conn), CoreConfig::default())
        .create_user(
            registry,
            &NewUser::member(name, &format!("{name}@scu.edu"), "CSEN", 2),
        )
        .unwrap()
}

#[test]
fn duplicate_reaction_is_a_conflict_not_a_toggle() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let content = content(&conn);
    let user = member(&conn, &mut registry, "james");

    let post = content
        .create_post(&mut registry, user, "Week 1", "Anyone started?")
        .unwrap();
    let first = content
        .add_reaction(&mut registry, user, post, ReactionKind::Like)
        .unwrap();

    let err = content
        .add_reaction(&mut registry, user, post, ReactionKind::Like)
        .unwrap_err();
    assert!(matches!(err, DomainError::StateConflict(_)));

    // The original reaction is still there, untouched.
    assert_eq!(registry.post(post).unwrap().reactions, vec![first]);
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM reactions;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn uniqueness_is_scoped_to_kind_and_user() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let content = content(&conn);
    let james = member(&conn, &mut registry, "james");
    let lena = member(&conn, &mut registry, "lena");

    let post = content
        .create_post(&mut registry, james, "Week 1", "Anyone started?")
        .unwrap();

    content
        .add_reaction(&mut registry, james, post, ReactionKind::Like)
        .unwrap();
    content
        .add_reaction(&mut registry, james, post, ReactionKind::Heart)
        .unwrap();
    content
        .add_reaction(&mut registry, lena, post, ReactionKind::Like)
        .unwrap();

    assert_eq!(registry.post(post).unwrap().reactions.len(), 3);
}

#[test]
fn remove_reaction_matches_by_kind_and_user() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let content = content(&conn);
    let user = member(&conn, &mut registry, "james");

    let post = content
        .create_post(&mut registry, user, "Week 1", "Anyone started?")
        .unwrap();
    let id = content
        .add_reaction(&mut registry, user, post, ReactionKind::Like)
        .unwrap();

    // Removing a reaction that was never added is a no-op.
    content
        .remove_reaction(&mut registry, user, post, ReactionKind::Flag)
        .unwrap();
    assert_eq!(registry.post(post).unwrap().reactions, vec![id]);

    content
        .remove_reaction(&mut registry, user, post, ReactionKind::Like)
        .unwrap();
    assert!(registry.post(post).unwrap().reactions.is_empty());
    assert!(registry.user(user).unwrap().reactions.is_empty());
    assert!(!registry.contains(EntityKind::Reaction, id));

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM reactions;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);

    // Re-adding the same kind is allowed after removal.
    content
        .add_reaction(&mut registry, user, post, ReactionKind::Like)
        .unwrap();
}

#[test]
fn reacted_posts_lists_distinct_parents() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let content = content(&conn);
    let user = member(&conn, &mut registry, "james");

    let first = content
        .create_post(&mut registry, user, "Week 1", "Anyone started?")
        .unwrap();
    let second = content
        .create_post(&mut registry, user, "Week 2", "Milestone due")
        .unwrap();

    content
        .add_reaction(&mut registry, user, first, ReactionKind::Like)
        .unwrap();
    content
        .add_reaction(&mut registry, user, first, ReactionKind::Heart)
        .unwrap();
    content
        .add_reaction(&mut registry, user, second, ReactionKind::Like)
        .unwrap();

    let reacted = content.reacted_posts(&mut registry, user).unwrap();
    assert_eq!(reacted.len(), 2);
    assert!(reacted.contains(&first));
    assert!(reacted.contains(&second));
}

#[test]
fn reactions_survive_a_fresh_registry() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = EntityRegistry::new();
    let content = content(&conn);
    let user = member(&conn, &mut registry, "james");

    let post = content
        .create_post(&mut registry, user, "Week 1", "Anyone started?")
        .unwrap();
    content
        .add_reaction(&mut registry, user, post, ReactionKind::Like)
        .unwrap();

    let mut fresh = EntityRegistry::new();
    content.load_post(&mut fresh, post).unwrap().unwrap();
    let reactions = &fresh.post(post).unwrap().reactions;
    assert_eq!(reactions.len(), 1);
    let reaction = fresh.reaction(reactions[0]).unwrap();
    assert_eq!(reaction.kind, ReactionKind::Like);
    assert_eq!(reaction.user, user);
    assert_eq!(reaction.parent, Some(post));
}
