use contacts_core::{
    props, Contacts, ContactsError, EngineConfig, JobPriority, LibraryConfig, NameParts,
    ResourceKind, Role,
};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_merge_and_split_through_owner() {
    init_logging();
    let contacts = Contacts::in_memory(LibraryConfig::default()).unwrap();

    let ann = contacts.find_or_create_contact("ann@example.org", "Ann Lee").unwrap();
    let work = contacts.find_or_create_contact("a.lee@corp.example", "Lee, Ann").unwrap();
    let ann_acc = contacts.find_or_create_account("ann@example.org", true).unwrap();
    let work_acc = contacts.find_or_create_account("A.Lee@corp.example", true).unwrap();

    let date = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let hello = contacts.add_correspondence("Hello", Some(date)).unwrap();
    contacts
        .link_correspondence(hello, Role::From, ann, Some(ann_acc), "Annie")
        .unwrap();
    let report = contacts.add_correspondence("Q2 report", None).unwrap();
    contacts
        .link_correspondence(report, Role::To, work, Some(work_acc), "")
        .unwrap();
    contacts.take_reindex_requests();

    let merged = contacts
        .merge(NameParts::new("Ann", "Lee"), vec![ann, work])
        .unwrap();
    assert!(contacts.get(ann).unwrap().is_none());
    assert_eq!(contacts.snapshots(merged).unwrap().len(), 2);
    let stale = contacts.take_reindex_requests();
    assert!(stale.contains(&merged));

    let merged_contact = contacts.get(merged).unwrap().unwrap();
    assert_eq!(merged_contact.date(props::LAST_CORRESPONDENCE), Some(date));

    let restored = contacts.split_all(merged).unwrap();
    assert_eq!(restored.len(), 2);
    assert!(contacts.get(merged).unwrap().is_none());
    for id in &restored {
        assert_eq!(contacts.get(*id).unwrap().unwrap().kind, ResourceKind::Contact);
    }

    contacts.close();
}

#[test]
fn test_errors_cross_the_owner_boundary() {
    let contacts = Contacts::in_memory(LibraryConfig::default()).unwrap();
    let ann = contacts.find_or_create_contact("ann@example.org", "Ann Lee").unwrap();

    let err = contacts
        .merge(NameParts::new("Ann", "Lee"), vec![ann])
        .unwrap_err();
    assert!(err.is_precondition());

    let err = contacts.split_all(ann).unwrap_err();
    assert!(matches!(err, ContactsError::Precondition(_)));

    // The owner is still alive
    assert!(contacts.get(ann).unwrap().is_some());
    assert_eq!(contacts.myself().unwrap(), None);
}

#[test]
fn test_persisted_merge_survives_reopen() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("contacts.redb");

    let merged = {
        let contacts = Contacts::open(&path, LibraryConfig::default()).unwrap();
        let a = contacts.find_or_create_contact("ann@example.org", "Ann Lee").unwrap();
        let b = contacts.find_or_create_contact("bob@example.org", "Bob Lee").unwrap();
        contacts.set_myself(b).unwrap();
        let merged = contacts.merge(NameParts::new("Ann", "Lee"), vec![a, b]).unwrap();
        contacts.close();
        merged
    };

    let contacts = Contacts::open(&path, LibraryConfig::default()).unwrap();
    assert_eq!(contacts.myself().unwrap(), Some(merged));
    let restored = contacts.split_all(merged).unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(contacts.myself().unwrap(), Some(restored[1]));
}

#[test]
fn test_maintenance_on_idle_priority() {
    let contacts = Contacts::in_memory(LibraryConfig::default()).unwrap();
    let hung = contacts
        .run(JobPriority::Normal, |m| Ok(m.graph().create(ResourceKind::Contact)?.id))
        .unwrap();

    contacts.schedule_maintenance().unwrap();
    // Jobs run in priority order, so this waits for the idle pass queued before it
    let report = contacts.maintain().unwrap();
    assert_eq!(report.hung_contacts_removed, 0);
    assert!(contacts.get(hung).unwrap().is_none());
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = LibraryConfig {
        engine: EngineConfig::new().with_field_separator(" | "),
        ..Default::default()
    };
    assert!(matches!(
        Contacts::in_memory(config),
        Err(ContactsError::Validation(_))
    ));
}
