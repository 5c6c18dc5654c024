use forum_core::db::open_db_in_memory;
use forum_core::{
    AccountService, CoreConfig, DomainError, EntityKind, EntityRegistry, NewUser,
    SqliteUserRepository,
};
use rusqlite::Connection;

fn accounts(conn: &Connection) -> AccountService<SqliteUserRepository<'_>> {
    AccountService::new(SqliteUserRepository::new(conn), CoreConfig::default())
}

#[test]
fn create_user_is_idempotent_by_email() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let mut registry = EntityRegistry::new();

    let request = NewUser::member("james", "jhunter@scu.edu", "CSEN", 2);
    let first = accounts.create_user(&mut registry, &request).unwrap();

    let again = NewUser::member("different-name", "jhunter@scu.edu", "MATH", 4);
    let second = accounts.create_user(&mut registry, &again).unwrap();

    assert_eq!(first, second);
    assert_eq!(registry.user(first).unwrap().username, "james");

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn every_lookup_path_resolves_the_same_instance() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let mut registry = EntityRegistry::new();

    let request = NewUser::member("james", "jhunter@scu.edu", "CSEN", 2);
    let id = accounts.create_user(&mut registry, &request).unwrap();

    registry.user_mut(id).unwrap().major = "MATH".to_string();

    let by_id = accounts.load_user(&mut registry, id).unwrap().unwrap();
    let by_email = accounts
        .load_user_by_email(&mut registry, "jhunter@scu.edu")
        .unwrap()
        .unwrap();
    assert_eq!(by_id, id);
    assert_eq!(by_email, id);
    assert_eq!(registry.user(id).unwrap().major, "MATH");
}

#[test]
fn registry_instance_wins_over_stale_store_row() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let mut registry = EntityRegistry::new();

    let request = NewUser::member("james", "jhunter@scu.edu", "CSEN", 2);
    let id = accounts.create_user(&mut registry, &request).unwrap();

    // Simulate an out-of-band row edit; the live instance must not be swapped.
    conn.execute(
        "UPDATE users SET username = 'impostor' WHERE uuid = ?1;",
        [id.to_string()],
    )
    .unwrap();

    let reloaded = accounts.load_user(&mut registry, id).unwrap().unwrap();
    assert_eq!(reloaded, id);
    assert_eq!(registry.user(id).unwrap().username, "james");
}

#[test]
fn fresh_registry_rehydrates_from_the_store() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);

    let id = {
        let mut registry = EntityRegistry::new();
        let request = NewUser::member("james", "jhunter@scu.edu", "CSEN", 2);
        accounts.create_user(&mut registry, &request).unwrap()
    };

    let mut registry = EntityRegistry::new();
    let loaded = accounts.load_user(&mut registry, id).unwrap().unwrap();
    assert_eq!(loaded, id);
    assert_eq!(registry.user(id).unwrap().email, "jhunter@scu.edu");
    assert!(registry.contains(EntityKind::User, id));
}

#[test]
fn invalid_request_leaves_registry_and_store_untouched() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let mut registry = EntityRegistry::new();

    let request = NewUser::member("james", "james@gmail.com", "CSEN", 2);
    let err = accounts.create_user(&mut registry, &request).unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert!(registry.is_empty());

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn user_serializes_with_owned_collections() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let mut registry = EntityRegistry::new();

    let request = NewUser::member("james", "jhunter@scu.edu", "CSEN", 2);
    let id = accounts.create_user(&mut registry, &request).unwrap();

    let value = serde_json::to_value(registry.user(id).unwrap()).unwrap();
    assert_eq!(value["username"], "james");
    assert_eq!(value["is_deleted"], false);
    assert!(value["posts"].as_array().unwrap().is_empty());
    assert!(value["forums"].as_array().unwrap().is_empty());
    assert_eq!(value["id"], id.to_string());
}
