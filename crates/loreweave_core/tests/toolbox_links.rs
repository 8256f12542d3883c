use loreweave_core::db::open_db_in_memory;
use loreweave_core::{
    Actor, CreateNodeRequest, ErrorCode, LinkRepository, LinksMap, Node, NodeId, NodeKind, NodePatch,
    PlaygroundService, PlaygroundServiceError, SqliteLinkRepository, SqliteNodeRepository,
    ToolboxCategory,
};
use rusqlite::Connection;
use serde_json::json;

type Service<'conn> = PlaygroundService<SqliteNodeRepository<'conn>, SqliteLinkRepository<'conn>>;

fn service(conn: &Connection) -> Service<'_> {
    PlaygroundService::new(
        SqliteNodeRepository::try_new(conn).unwrap(),
        SqliteLinkRepository::try_new(conn).unwrap(),
    )
}

fn create(service: &Service<'_>, parent_id: Option<NodeId>, kind: NodeKind, name: &str) -> Node {
    service
        .create_node(
            &Actor::user("alice"),
            &CreateNodeRequest {
                parent_id,
                kind,
                name: name.to_string(),
            },
        )
        .unwrap()
}

#[test]
fn set_links_round_trips_and_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::user("alice");
    let cosmos = create(&service, None, NodeKind::Cosmos, "Aeth");
    let world = create(&service, Some(cosmos.id), NodeKind::World, "Velm");
    let setting = create(&service, Some(world.id), NodeKind::Setting, "Capital");

    let links = LinksMap::from_json(&json!({
        "race": ["elf", "dwarf", "elf"],
        "calendar": ["harvest"],
    }));
    let first = service.set_toolbox_links(&alice, setting.id, &links).unwrap();
    let second = service.set_toolbox_links(&alice, setting.id, &first).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.get(ToolboxCategory::Race), ["elf", "dwarf"]);
    assert_eq!(first.get(ToolboxCategory::Calendar), ["harvest"]);
    assert!(first.get(ToolboxCategory::Npc).is_empty());

    let effective = service
        .get_toolbox_links(&alice, setting.id)
        .unwrap()
        .expect("setting resolves to itself");
    assert!(!effective.inherited);
    assert_eq!(effective.links, first);

    let repo = SqliteLinkRepository::try_new(&conn).unwrap();
    let stored_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM toolbox_links;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored_rows, 3);
    assert_eq!(repo.get_links(setting.id).unwrap(), first);
}

#[test]
fn replacing_links_clears_omitted_categories() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::user("alice");
    let cosmos = create(&service, None, NodeKind::Cosmos, "Aeth");
    let world = create(&service, Some(cosmos.id), NodeKind::World, "Velm");
    let setting = create(&service, Some(world.id), NodeKind::Setting, "Capital");

    service
        .set_toolbox_links(
            &alice,
            setting.id,
            &LinksMap::from_pairs([(ToolboxCategory::Npc, vec!["mayor", "smith"])]),
        )
        .unwrap();
    let replaced = service
        .set_toolbox_links(
            &alice,
            setting.id,
            &LinksMap::from_pairs([(ToolboxCategory::Creature, vec!["gull"])]),
        )
        .unwrap();

    assert!(replaced.get(ToolboxCategory::Npc).is_empty());
    assert_eq!(replaced.get(ToolboxCategory::Creature), ["gull"]);
}

#[test]
fn descendants_inherit_nearest_setting_links() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::user("alice");
    let cosmos = create(&service, None, NodeKind::Cosmos, "Aeth");
    let world = create(&service, Some(cosmos.id), NodeKind::World, "Velm");
    let era = create(&service, Some(world.id), NodeKind::Era, "Age of Salt");
    let setting = create(&service, Some(era.id), NodeKind::Setting, "Capital");
    let folder = create(&service, Some(setting.id), NodeKind::Folder, "Districts");
    let page = create(&service, Some(folder.id), NodeKind::Page, "Harbor");
    let subpage = create(&service, Some(page.id), NodeKind::Page, "Pier 4");

    service
        .set_toolbox_links(
            &alice,
            setting.id,
            &LinksMap::from_pairs([(ToolboxCategory::Race, vec!["elf"])]),
        )
        .unwrap();

    for node_id in [folder.id, page.id, subpage.id] {
        let effective = service
            .get_toolbox_links(&alice, node_id)
            .unwrap()
            .expect("descendant inherits");
        assert_eq!(effective.setting_id, setting.id);
        assert!(effective.inherited);
        assert_eq!(effective.links.get(ToolboxCategory::Race), ["elf"]);
    }

    for node_id in [cosmos.id, world.id, era.id] {
        assert!(service.get_toolbox_links(&alice, node_id).unwrap().is_none());
    }
}

#[test]
fn writing_links_to_non_setting_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::user("alice");
    let cosmos = create(&service, None, NodeKind::Cosmos, "Aeth");
    let world = create(&service, Some(cosmos.id), NodeKind::World, "Velm");
    let setting = create(&service, Some(world.id), NodeKind::Setting, "Capital");
    let page = create(&service, Some(setting.id), NodeKind::Page, "Harbor");

    let links = LinksMap::from_pairs([(ToolboxCategory::Race, vec!["elf"])]);
    for node_id in [world.id, page.id] {
        let err = service.set_toolbox_links(&alice, node_id, &links).unwrap_err();
        assert!(matches!(err, PlaygroundServiceError::NotASetting { .. }));
        assert_eq!(err.code(), ErrorCode::Validation);
    }

    let foreign = service
        .set_toolbox_links(&Actor::user("bob"), setting.id, &links)
        .unwrap_err();
    assert_eq!(foreign.code(), ErrorCode::Forbidden);

    let untouched = service.get_toolbox_links(&alice, setting.id).unwrap().unwrap();
    assert!(untouched.links.is_empty());
}

#[test]
fn list_tree_reports_links_for_every_setting() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::user("alice");
    let cosmos = create(&service, None, NodeKind::Cosmos, "Aeth");
    let world = create(&service, Some(cosmos.id), NodeKind::World, "Velm");
    let linked = create(&service, Some(world.id), NodeKind::Setting, "Capital");
    let bare = create(&service, Some(world.id), NodeKind::Setting, "Wastes");

    service
        .set_toolbox_links(
            &alice,
            linked.id,
            &LinksMap::from_pairs([(ToolboxCategory::Calendar, vec!["harvest"])]),
        )
        .unwrap();

    let listed = service.list_tree(&alice, "alice").unwrap();
    assert_eq!(listed.links_by_node.len(), 2);
    assert_eq!(
        listed.links_by_node[&linked.id].get(ToolboxCategory::Calendar),
        ["harvest"]
    );
    assert_eq!(listed.links_by_node[&bare.id], LinksMap::empty());
}

#[test]
fn stranger_does_not_inherit_links_of_unpublished_setting() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let alice = Actor::user("alice");
    let bob = Actor::user("bob");
    let cosmos = create(&service, None, NodeKind::Cosmos, "Aeth");
    let world = create(&service, Some(cosmos.id), NodeKind::World, "Velm");
    let setting = create(&service, Some(world.id), NodeKind::Setting, "Secret Capital");
    let page = create(&service, Some(setting.id), NodeKind::Page, "Public Notice");

    service
        .set_toolbox_links(
            &alice,
            setting.id,
            &LinksMap::from_pairs([(ToolboxCategory::Npc, vec!["spy"])]),
        )
        .unwrap();
    let publish = NodePatch {
        is_published: Some(true),
        ..NodePatch::default()
    };
    service.update_node(&alice, page.id, publish.clone()).unwrap();

    assert_eq!(
        service.get_node(&bob, setting.id).unwrap_err().code(),
        ErrorCode::Forbidden
    );
    assert!(service.get_toolbox_links(&bob, page.id).unwrap().is_none());
    assert!(service.list_tree(&bob, "alice").unwrap().links_by_node.is_empty());

    let owner_view = service.get_toolbox_links(&alice, page.id).unwrap().unwrap();
    assert_eq!(owner_view.links.get(ToolboxCategory::Npc), ["spy"]);

    service.update_node(&alice, setting.id, publish).unwrap();
    let published = service
        .get_toolbox_links(&bob, page.id)
        .unwrap()
        .expect("published setting shares its links");
    assert_eq!(published.setting_id, setting.id);
    assert!(published.inherited);
}
