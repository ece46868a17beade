use crate::config::EngineConfig;
use crate::contact::*;
use crate::graph::ResourceGraph;
use crate::schema::{props, ContactSchema, LinkSpec, Role};
use crate::services::{ProgressSink, QueuedIndexer};
use crate::storage::{MemoryStorage, RedbStorage, ResourceFilter, Storage};
use crate::types::*;
use crate::ContactsError;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct Fixture<S: Storage> {
    manager: ContactManager<S>,
    indexer: Arc<QueuedIndexer>,
}

fn fixture() -> Fixture<MemoryStorage> {
    fixture_with(MemoryStorage::new(), ContactSchema::new())
}

fn fixture_with<S: Storage>(storage: S, schema: ContactSchema) -> Fixture<S> {
    let indexer = Arc::new(QueuedIndexer::new());
    let graph = Arc::new(ResourceGraph::new(
        Arc::new(storage),
        Arc::new(schema),
        indexer.clone(),
    ));
    let manager = ContactManager::new(graph, EngineConfig::default()).unwrap();
    Fixture { manager, indexer }
}

impl<S: Storage> Fixture<S> {
    fn graph(&self) -> &ResourceGraph<S> {
        self.manager.graph()
    }

    /// Contact with one account.
    fn person(&self, first: &str, last: &str, email: &str) -> (ResourceId, ResourceId) {
        let contact = self
            .manager
            .find_or_create_contact(email, &format!("{} {}", first, last))
            .unwrap();
        let account = find_account(self.graph(), email).unwrap().unwrap();
        (contact, account)
    }

    fn mail(&self, role: Role, contact: ResourceId, account: Option<ResourceId>) -> ResourceId {
        let item = self.graph().create(ResourceKind::Correspondence).unwrap().id;
        self.manager
            .link_correspondence(item, role, contact, account, "")
            .unwrap();
        item
    }

    fn major_count(&self, contact: ResourceId) -> usize {
        Role::ALL
            .iter()
            .map(|r| {
                self.graph()
                    .link_count(contact, self.graph().schema().major(*r), LinkDirection::Incoming)
                    .unwrap()
            })
            .sum()
    }

    fn holders(&self, item: ResourceId, role: Role) -> Vec<ResourceId> {
        self.graph()
            .outgoing(item, self.graph().schema().major(role))
            .unwrap()
    }

    fn count(&self, kind: ResourceKind) -> u64 {
        self.graph()
            .storage()
            .count_resources(ResourceFilter::new().of_kind(kind))
            .unwrap()
    }

    fn keeper_named(&self, contact: ResourceId, name: &str) -> ResourceId {
        self.manager
            .snapshots(contact)
            .unwrap()
            .into_iter()
            .find(|k| self.graph().text(*k, props::NAME).unwrap() == name)
            .unwrap()
    }
}

#[derive(Default)]
struct RecordingProgress {
    reports: Mutex<Vec<(u8, String)>>,
}

impl ProgressSink for RecordingProgress {
    fn report(&self, percent: u8, _title: &str, detail: &str) {
        self.reports.lock().unwrap().push((percent, detail.to_string()));
    }
}

#[test]
fn test_merge_then_split_round_trip() {
    let f = fixture();
    let (a, acc_a) = f.person("John", "Smith", "john@example.org");
    let (b, acc_b) = f.person("Jane", "Doe", "jane@example.org");
    let m1 = f.mail(Role::From, a, Some(acc_a));
    let m2 = f.mail(Role::To, a, Some(acc_a));
    let m3 = f.mail(Role::From, b, Some(acc_b));
    let m4 = f.mail(Role::Cc, b, Some(acc_b));
    let before = f.major_count(a) + f.major_count(b);

    let merged = f.manager.merge(&NameParts::new("J.", "Smith-Doe"), &[a, b]).unwrap();
    assert!(!f.graph().exists(a).unwrap());
    assert!(!f.graph().exists(b).unwrap());
    assert_eq!(f.major_count(merged), before);
    assert_eq!(f.manager.snapshots(merged).unwrap().len(), 2);

    let restored = f.manager.split_all(merged).unwrap();
    assert_eq!(restored.len(), 2);
    assert!(!f.graph().exists(merged).unwrap());
    assert_eq!(restored.iter().map(|r| f.major_count(*r)).sum::<usize>(), before);

    let (john, jane) = (restored[0], restored[1]);
    assert_eq!(display_name(f.graph(), john).unwrap(), "John Smith");
    assert_eq!(display_name(f.graph(), jane).unwrap(), "Jane Doe");
    assert_eq!(f.holders(m1, Role::From), vec![john]);
    assert_eq!(f.holders(m2, Role::To), vec![john]);
    assert_eq!(f.holders(m3, Role::From), vec![jane]);
    assert_eq!(f.holders(m4, Role::Cc), vec![jane]);
    assert_eq!(f.graph().outgoing(john, &f.graph().schema().account).unwrap(), vec![acc_a]);
    assert_eq!(f.graph().outgoing(jane, &f.graph().schema().account).unwrap(), vec![acc_b]);

    // Names synthesized during the merge repeat the owners' own names
    assert_eq!(f.count(ResourceKind::ContactName), 0);
    assert_eq!(f.count(ResourceKind::SnapshotKeeper), 0);
}

#[test]
fn test_full_split_assigns_new_mail() {
    let f = fixture();
    let (a, acc_a) = f.person("John", "Smith", "john@example.org");
    let (b, acc_b) = f.person("Jane", "Doe", "jane@example.org");
    f.mail(Role::From, a, Some(acc_a));
    f.mail(Role::To, a, Some(acc_a));
    f.mail(Role::From, b, Some(acc_b));

    let merged = f.manager.merge(&NameParts::new("J.", "Smith-Doe"), &[a, b]).unwrap();
    let via_jane = f.mail(Role::From, merged, Some(acc_b));
    let unknown = f.mail(Role::To, merged, None);
    let category = f.graph().create(ResourceKind::Category).unwrap().id;
    f.graph().add_link(merged, category, &f.graph().schema().category).unwrap();

    let restored = f.manager.split_all(merged).unwrap();
    let (john, jane) = (restored[0], restored[1]);
    assert_eq!(f.holders(via_jane, Role::From), vec![jane]);
    // John has 2, Jane has 2 after reconciliation; ties go to the first
    assert_eq!(f.holders(unknown, Role::To), vec![john]);
    assert_eq!(
        f.graph().incoming(category, &f.graph().schema().category).unwrap(),
        vec![john]
    );
    assert_eq!(f.major_count(john) + f.major_count(jane), 5);
}

#[test]
fn test_partial_split_keeps_merged_contact() {
    let f = fixture();
    let (a, acc_a) = f.person("John", "Smith", "john@example.org");
    let (b, acc_b) = f.person("Jane", "Doe", "jane@example.org");
    let (d, acc_d) = f.person("Dan", "Roe", "dan@example.org");
    f.mail(Role::From, a, Some(acc_a));
    f.mail(Role::To, a, Some(acc_a));
    let m3 = f.mail(Role::From, b, Some(acc_b));
    f.mail(Role::Cc, d, Some(acc_d));

    let merged = f
        .manager
        .merge(&NameParts::new("All", "Of-Them"), &[a, b, d])
        .unwrap();
    let before = f.major_count(merged);
    let keeper = f.keeper_named(merged, "John Smith");

    let result = f.manager.split(merged, &[keeper]).unwrap();
    assert_eq!(result.len(), 2);
    let (john, rest) = (result[0], result[1]);
    assert_eq!(rest, merged);
    assert_eq!(f.major_count(john) + f.major_count(merged), before);
    assert_eq!(f.major_count(john), 2);
    assert_eq!(f.holders(m3, Role::From), vec![merged]);
    assert_eq!(f.manager.snapshots(merged).unwrap().len(), 2);

    // John's account left with him; the others stay
    let accounts = f.graph().outgoing(merged, &f.graph().schema().account).unwrap();
    assert!(!accounts.contains(&acc_a));
    assert!(accounts.contains(&acc_b));
    assert!(accounts.contains(&acc_d));

    // Names for John's mail went with the mail; Jane's and Dan's stay
    for name in names::names_of(f.graph(), merged).unwrap() {
        assert_ne!(f.graph().text(name, props::NAME).unwrap(), "John Smith");
    }
    assert!(names::names_of(f.graph(), john).unwrap().is_empty());

    let restored = f.manager.split_all(merged).unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(f.holders(m3, Role::From), vec![restored[0]]);
}

#[test]
fn test_merge_of_merged_contact_carries_snapshots() {
    let f = fixture();
    let (a, _) = f.person("John", "Smith", "john@example.org");
    let (b, _) = f.person("Jane", "Doe", "jane@example.org");
    let (d, acc_d) = f.person("Dan", "Roe", "dan@example.org");
    let m = f.mail(Role::To, d, Some(acc_d));

    let first = f.manager.merge(&NameParts::new("J.", "Smith-Doe"), &[a, b]).unwrap();
    let second = f.manager.merge(&NameParts::new("Everyone", "Else"), &[first, d]).unwrap();
    assert_eq!(f.manager.snapshots(second).unwrap().len(), 3);

    let restored = f.manager.split_all(second).unwrap();
    assert_eq!(restored.len(), 3);
    assert_eq!(f.holders(m, Role::To), vec![restored[2]]);
}

#[test]
fn test_merged_address_examples() {
    let f = fixture();
    let cases = [
        ("Mask1", "Premier", "Mask1; Premier"),
        ("Premier", "Premier", "Premier"),
        ("Premier", "", "Premier"),
        ("", "", ""),
    ];
    for (left, right, expected) in cases {
        let a = f.graph().create(ResourceKind::Contact).unwrap().id;
        let b = f.graph().create(ResourceKind::Contact).unwrap().id;
        f.graph().set_prop(a, props::ADDRESS, left).unwrap();
        f.graph().set_prop(b, props::ADDRESS, right).unwrap();
        let merged = f.manager.merge(&NameParts::new("X", "Y"), &[a, b]).unwrap();
        assert_eq!(f.graph().text(merged, props::ADDRESS).unwrap(), expected);
    }
}

#[test]
fn test_merged_phones() {
    let f = fixture();
    let graph = f.graph();
    let a = graph.create(ResourceKind::Contact).unwrap().id;
    let b = graph.create(ResourceKind::Contact).unwrap().id;
    for (contact, number) in [(a, "111"), (b, "222")] {
        let phone = graph.create(ResourceKind::Phone).unwrap().id;
        graph.set_prop(phone, props::PHONE_NAME, "Home").unwrap();
        graph.set_prop(phone, props::PHONE_NUMBER, number).unwrap();
        graph.add_link(contact, phone, &graph.schema().phone).unwrap();
    }

    let merged = f.manager.merge(&NameParts::new("X", "Y"), &[a, b]).unwrap();
    let mut phones: Vec<(String, String)> = graph
        .outgoing(merged, &graph.schema().phone)
        .unwrap()
        .into_iter()
        .map(|p| {
            (
                graph.text(p, props::PHONE_NAME).unwrap(),
                graph.text(p, props::PHONE_NUMBER).unwrap(),
            )
        })
        .collect();
    phones.sort();
    assert_eq!(
        phones,
        vec![
            ("Home".to_string(), "111".to_string()),
            ("Home(2)".to_string(), "222".to_string()),
        ]
    );
    // The merged-away contacts' own phones went with them
    assert_eq!(f.count(ResourceKind::Phone), 2);

    let restored = f.manager.split_all(merged).unwrap();
    assert_eq!(f.count(ResourceKind::Phone), 2);
    for (contact, number) in restored.iter().zip(["111", "222"]) {
        let phones = graph.outgoing(*contact, &graph.schema().phone).unwrap();
        assert_eq!(phones.len(), 1);
        assert_eq!(graph.text(phones[0], props::PHONE_NUMBER).unwrap(), number);
    }
}

#[test]
fn test_merge_leaves_no_self_loops() {
    let mut schema = ContactSchema::new();
    let mentor = schema.register_link("mentor", LinkSpec::directed()).unwrap();
    let f = fixture_with(MemoryStorage::new(), schema);
    let graph = f.graph();
    let (a, _) = f.person("Ann", "Lee", "ann@example.org");
    let (b, _) = f.person("Bob", "Lee", "bob@example.org");
    let (c, _) = f.person("Cat", "Lee", "cat@example.org");
    graph.add_link(a, b, &graph.schema().related).unwrap();
    graph.add_link(a, b, &mentor).unwrap();
    graph.add_link(b, a, &mentor).unwrap();
    graph.add_link(c, a, &mentor).unwrap();

    let merged = f.manager.merge(&NameParts::new("Ann", "Lee"), &[a, b]).unwrap();
    let storage = graph.storage();
    assert!(storage.links_from(merged).unwrap().iter().all(|l| l.to != merged));
    assert!(storage.links_to(merged).unwrap().iter().all(|l| l.from != merged));
    assert!(graph.outgoing(merged, &graph.schema().related).unwrap().is_empty());
    assert!(graph.outgoing(merged, &mentor).unwrap().is_empty());
    assert_eq!(graph.incoming(merged, &mentor).unwrap(), vec![c]);
}

#[test]
fn test_sender_stays_exclusive() {
    let f = fixture();
    let (a, acc_a) = f.person("Ann", "Lee", "ann@example.org");
    let (b, acc_b) = f.person("Bob", "Lee", "bob@example.org");
    let m1 = f.mail(Role::From, a, Some(acc_a));
    let m2 = f.mail(Role::From, b, Some(acc_b));
    // One mail from Ann, addressed to Bob as well
    f.graph().add_link(m1, b, f.graph().schema().major(Role::To)).unwrap();

    let merged = f.manager.merge(&NameParts::new("A", "B"), &[a, b]).unwrap();
    assert_eq!(f.holders(m1, Role::From), vec![merged]);
    assert_eq!(f.holders(m2, Role::From), vec![merged]);
    assert_eq!(f.holders(m1, Role::To), vec![merged]);
}

#[test]
fn test_equal_names_collapse_on_merge() {
    let f = fixture();
    let graph = f.graph();
    let schema = graph.schema().clone();
    let (a, _) = f.person("Robert", "Lee", "robert@example.org");
    let (b, _) = f.person("Bob", "Lee", "bob@example.org");
    let shared = f.manager.find_or_create_account("bobby@example.org", false).unwrap();

    let mail = graph.create(ResourceKind::Correspondence).unwrap().id;
    f.manager
        .link_correspondence(mail, Role::To, a, Some(shared), "Bobby")
        .unwrap();
    f.manager
        .link_correspondence(mail, Role::To, b, Some(shared), "Bobby")
        .unwrap();
    assert_eq!(graph.outgoing(mail, schema.name_link(Role::To)).unwrap().len(), 2);

    let merged = f.manager.merge(&NameParts::new("Bob", "Lee"), &[a, b]).unwrap();
    let names_on_mail = graph.outgoing(mail, schema.name_link(Role::To)).unwrap();
    assert_eq!(names_on_mail.len(), 1);
    assert_eq!(names::base_contact(graph, names_on_mail[0]).unwrap(), merged);
    assert_eq!(f.holders(mail, Role::To), vec![merged]);
}

/// Two contacts addressed by the same name and account on one mail.
fn shared_nickname(f: &Fixture<MemoryStorage>) -> (ResourceId, ResourceId, ResourceId) {
    let (a, _) = f.person("Robert", "Lee", "robert@example.org");
    let (b, _) = f.person("Bob", "Lee", "bob@example.org");
    let shared = f.manager.find_or_create_account("bobby@example.org", false).unwrap();
    let mail = f.graph().create(ResourceKind::Correspondence).unwrap().id;
    for contact in [a, b] {
        f.manager
            .link_correspondence(mail, Role::To, contact, Some(shared), "Bobby")
            .unwrap();
    }
    (a, b, mail)
}

/// The name record `contact` goes by on `mail`.
fn name_on(f: &Fixture<MemoryStorage>, mail: ResourceId, contact: ResourceId) -> Vec<ResourceId> {
    let graph = f.graph();
    graph
        .outgoing(mail, graph.schema().name_link(Role::To))
        .unwrap()
        .into_iter()
        .filter(|n| names::base_contact(graph, *n).unwrap() == contact)
        .collect()
}

#[test]
fn test_split_gives_every_name_back() {
    let f = fixture();
    let (a, b, mail) = shared_nickname(&f);
    let (name_a, name_b) = (name_on(&f, mail, a)[0], name_on(&f, mail, b)[0]);

    let merged = f.manager.merge(&NameParts::new("Bob", "Lee"), &[a, b]).unwrap();
    let restored = f.manager.split_all(merged).unwrap();
    let (robert, bob) = (restored[0], restored[1]);

    assert_eq!(names::names_of(f.graph(), robert).unwrap(), vec![name_a]);
    assert_eq!(names::names_of(f.graph(), bob).unwrap(), vec![name_b]);
    assert_eq!(name_on(&f, mail, robert), vec![name_a]);
    assert_eq!(name_on(&f, mail, bob), vec![name_b]);
    assert!(!names::is_folded(f.graph(), name_b).unwrap());
    assert_eq!(f.count(ResourceKind::ContactName), 2);
}

#[test]
fn test_retired_name_waits_for_its_keeper() {
    let f = fixture();
    let (a, b, mail) = shared_nickname(&f);
    let name_b = name_on(&f, mail, b)[0];

    let merged = f.manager.merge(&NameParts::new("Bob", "Lee"), &[a, b]).unwrap();
    let keeper = f.keeper_named(merged, "Robert Lee");
    let result = f.manager.split(merged, &[keeper]).unwrap();
    assert_eq!(result[1], merged);

    // Neither the partial split nor maintenance may drop it
    f.manager.run_maintenance().unwrap();
    assert!(names::is_folded(f.graph(), name_b).unwrap());
    assert_eq!(names::base_contact(f.graph(), name_b).unwrap(), merged);

    let restored = f.manager.split_all(merged).unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(name_on(&f, mail, restored[0]), vec![name_b]);
    assert_eq!(name_on(&f, mail, result[0]).len(), 1);
}

#[test]
fn test_partial_split_does_not_link_back_to_merged() {
    let f = fixture();
    let graph = f.graph();
    let related = graph.schema().related.clone();
    let (a, _) = f.person("Ann", "Lee", "ann@example.org");
    let (b, _) = f.person("Bob", "Lee", "bob@example.org");
    graph.add_link(a, b, &related).unwrap();

    let merged = f.manager.merge(&NameParts::new("Ann", "Lee"), &[a, b]).unwrap();
    let keeper = f.keeper_named(merged, "Bob Lee");
    let bob = f.manager.split(merged, &[keeper]).unwrap()[0];
    assert!(graph.outgoing(bob, &related).unwrap().is_empty());
    assert!(graph.outgoing(merged, &related).unwrap().is_empty());
}

#[test]
fn test_merge_preconditions_do_not_mutate() {
    let f = fixture();
    let (a, _) = f.person("Ann", "Lee", "ann@example.org");
    let (b, _) = f.person("Bob", "Lee", "bob@example.org");
    let account = find_account(f.graph(), "ann@example.org").unwrap().unwrap();
    let stats = f.graph().storage().stats().unwrap();

    let bad = [
        f.manager.merge(&NameParts::new("A", "B"), &[]),
        f.manager.merge(&NameParts::new("A", "B"), &[a]),
        f.manager.merge(&NameParts::new(" ", ""), &[a, b]),
        f.manager.merge(&NameParts::new("A", "B"), &[a, a]),
        f.manager.merge(&NameParts::new("A", "B"), &[a, account]),
    ];
    for result in bad {
        assert!(result.unwrap_err().is_precondition());
    }

    let after = f.graph().storage().stats().unwrap();
    assert_eq!(after.resource_count, stats.resource_count);
    assert_eq!(after.link_count, stats.link_count);
}

#[test]
fn test_split_preconditions() {
    let f = fixture();
    let (a, _) = f.person("Ann", "Lee", "ann@example.org");
    let (b, _) = f.person("Bob", "Lee", "bob@example.org");
    let (c, _) = f.person("Cat", "Lee", "cat@example.org");
    let (d, _) = f.person("Dan", "Lee", "dan@example.org");

    assert!(f.manager.split_all(a).unwrap_err().is_precondition());

    let first = f.manager.merge(&NameParts::new("A", "B"), &[a, b]).unwrap();
    let second = f.manager.merge(&NameParts::new("C", "D"), &[c, d]).unwrap();
    let foreign = f.manager.snapshots(second).unwrap()[0];

    assert!(f.manager.split(first, &[]).unwrap_err().is_precondition());
    assert!(f.manager.split(first, &[foreign]).unwrap_err().is_precondition());
    assert!(f.manager.split(first, &[first]).unwrap_err().is_precondition());
    assert_eq!(f.manager.snapshots(first).unwrap().len(), 2);
}

#[test]
fn test_myself_follows_merge_and_split() {
    let f = fixture();
    let (a, _) = f.person("Ann", "Lee", "ann@example.org");
    let (b, _) = f.person("Bob", "Lee", "bob@example.org");
    f.manager.set_myself(a).unwrap();
    assert_eq!(f.manager.myself().unwrap(), Some(a));

    let merged = f.manager.merge(&NameParts::new("Ann", "Lee"), &[a, b]).unwrap();
    assert_eq!(f.manager.myself().unwrap(), Some(merged));

    let restored = f.manager.split_all(merged).unwrap();
    assert_eq!(f.manager.myself().unwrap(), Some(restored[0]));
    assert!(!f.graph().require(restored[1]).unwrap().flag(props::MYSELF));
}

#[test]
fn test_reindex_and_progress() {
    let f = fixture();
    let progress = Arc::new(RecordingProgress::default());
    let (a, _) = f.person("Ann", "Lee", "ann@example.org");
    let (b, _) = f.person("Bob", "Lee", "bob@example.org");
    f.indexer.drain();

    let graph = Arc::new(ResourceGraph::new(
        f.graph().storage().clone(),
        Arc::new(ContactSchema::new()),
        f.indexer.clone(),
    ));
    let manager = ContactManager::new(graph, EngineConfig::default())
        .unwrap()
        .with_progress(progress.clone());

    let merged = manager.merge(&NameParts::new("Ann", "Lee"), &[a, b]).unwrap();
    assert!(f.indexer.is_pending(merged));
    assert_eq!(
        *progress.reports.lock().unwrap(),
        vec![(50, "Ann Lee".to_string()), (100, "Bob Lee".to_string())]
    );

    f.indexer.drain();
    let restored = manager.split_all(merged).unwrap();
    for id in &restored {
        assert!(f.indexer.is_pending(*id));
    }
}

#[test]
fn test_partial_split_without_deleting() {
    let indexer = Arc::new(QueuedIndexer::new());
    let graph = Arc::new(ResourceGraph::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(ContactSchema::new()),
        indexer,
    ));
    let config = EngineConfig::new().with_delete_emptied_contact(false);
    let manager = ContactManager::new(graph, config).unwrap();
    let a = manager.find_or_create_contact("ann@example.org", "Ann Lee").unwrap();
    let b = manager.find_or_create_contact("bob@example.org", "Bob Lee").unwrap();

    let merged = manager.merge(&NameParts::new("Ann", "Lee"), &[a, b]).unwrap();
    let result = manager.split_all(merged).unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result[2], merged);
    assert!(manager.snapshots(merged).unwrap().is_empty());
}

#[test]
fn test_round_trip_on_redb() {
    let temp_dir = TempDir::new().unwrap();
    let storage = RedbStorage::open(temp_dir.path().join("contacts.redb")).unwrap();
    let f = fixture_with(storage, ContactSchema::new());
    let (a, acc_a) = f.person("John", "Smith", "john@example.org");
    let (b, acc_b) = f.person("Jane", "Doe", "jane@example.org");
    let m1 = f.mail(Role::From, a, Some(acc_a));
    let m2 = f.mail(Role::To, b, Some(acc_b));

    let merged = f.manager.merge(&NameParts::new("J.", "Smith-Doe"), &[a, b]).unwrap();
    let restored = f.manager.split_all(merged).unwrap();
    assert_eq!(f.holders(m1, Role::From), vec![restored[0]]);
    assert_eq!(f.holders(m2, Role::To), vec![restored[1]]);
}

#[test]
fn test_consistency_error_on_corrupt_keeper() {
    let f = fixture();
    let (a, _) = f.person("Ann", "Lee", "ann@example.org");
    let (b, _) = f.person("Bob", "Lee", "bob@example.org");
    let merged = f.manager.merge(&NameParts::new("Ann", "Lee"), &[a, b]).unwrap();
    let keeper = f.manager.snapshots(merged).unwrap()[0];
    f.graph().delete_prop(keeper, props::SNAPSHOT).unwrap();

    assert!(matches!(
        f.manager.split(merged, &[keeper]),
        Err(ContactsError::Consistency(_))
    ));
}
