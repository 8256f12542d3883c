use loreweave_api::api::{
    create_node, delete_node, get_node, get_toolbox_links, list_races, list_toolbox, list_tree,
    move_node, search_tree, set_toolbox_links, update_node,
};
use loreweave_api::ApiContext;
use loreweave_core::{Actor, ErrorCode, Node};
use rusqlite::params;
use serde_json::json;

fn create(ctx: &ApiContext, actor: &Actor, parent: Option<&Node>, kind: &str, name: &str) -> Node {
    let payload = json!({
        "parent_id": parent.map(|node| node.id.to_string()),
        "type": kind,
        "name": name,
    });
    let response = create_node(ctx, actor, &payload);
    assert!(response.ok, "create failed: {:?}", response.error);
    response.data.expect("created node")
}

#[test]
fn create_and_list_round_trip_through_json() {
    let ctx = ApiContext::in_memory().unwrap();
    let alice = Actor::user("alice");
    let cosmos = create(&ctx, &alice, None, "cosmos", "Aeth");
    let world = create(&ctx, &alice, Some(&cosmos), "world", "Velm");
    let setting = create(&ctx, &alice, Some(&world), "setting", "Capital");

    let listed = list_tree(&ctx, &alice, "alice");
    assert!(listed.ok);
    let json = serde_json::to_value(&listed).unwrap();
    let root = &json["data"]["tree"][0];
    assert_eq!(root["name"], "Aeth");
    assert_eq!(root["type"], "cosmos");
    assert_eq!(root["children"][0]["children"][0]["name"], "Capital");
    assert_eq!(
        json["data"]["links_by_node"][setting.id.to_string()]["race"],
        json!([])
    );
}

#[test]
fn malformed_input_maps_to_validation() {
    let ctx = ApiContext::in_memory().unwrap();
    let alice = Actor::user("alice");

    let bad_kind = create_node(&ctx, &alice, &json!({ "type": "galaxy", "name": "X" }));
    assert_eq!(bad_kind.error_code(), Some(ErrorCode::Validation));

    let blank_name = create_node(&ctx, &alice, &json!({ "type": "cosmos", "name": "   " }));
    assert_eq!(blank_name.error_code(), Some(ErrorCode::Validation));

    let bad_id = get_node(&ctx, &alice, "nope");
    assert_eq!(bad_id.error_code(), Some(ErrorCode::Validation));

    let cosmos = create(&ctx, &alice, None, "cosmos", "Aeth");
    let unknown_field = update_node(
        &ctx,
        &alice,
        &cosmos.id.to_string(),
        &json!({ "colour": "red" }),
    );
    assert_eq!(unknown_field.error_code(), Some(ErrorCode::Validation));

    let blank_owner = list_tree(&ctx, &alice, "  ");
    assert_eq!(blank_owner.error_code(), Some(ErrorCode::Validation));
}

#[test]
fn missing_and_foreign_nodes_map_to_not_found_and_forbidden() {
    let ctx = ApiContext::in_memory().unwrap();
    let alice = Actor::user("alice");
    let bob = Actor::user("bob");
    let cosmos = create(&ctx, &alice, None, "cosmos", "Aeth");

    let missing = get_node(&ctx, &alice, &uuid::Uuid::new_v4().to_string());
    assert_eq!(missing.error_code(), Some(ErrorCode::NotFound));

    let foreign = update_node(&ctx, &bob, &cosmos.id.to_string(), &json!({ "name": "Mine" }));
    assert_eq!(foreign.error_code(), Some(ErrorCode::Forbidden));
    let foreign_delete = delete_node(&ctx, &bob, &cosmos.id.to_string());
    assert_eq!(foreign_delete.error_code(), Some(ErrorCode::Forbidden));
}

#[test]
fn links_flow_from_setting_to_descendant_page() {
    let ctx = ApiContext::in_memory().unwrap();
    let alice = Actor::user("alice");
    let cosmos = create(&ctx, &alice, None, "cosmos", "Aeth");
    let world = create(&ctx, &alice, Some(&cosmos), "world", "Velm");
    let setting = create(&ctx, &alice, Some(&world), "setting", "Capital");
    let page = create(&ctx, &alice, Some(&setting), "page", "Harbor");

    let saved = set_toolbox_links(
        &ctx,
        &alice,
        &setting.id.to_string(),
        &json!({ "races": [" elf ", "elf", "dwarf"], "weather": ["rain"], "npc": [7] }),
    );
    assert!(saved.ok, "{:?}", saved.error);
    let saved = serde_json::to_value(saved.data.unwrap()).unwrap();
    assert_eq!(saved["race"], json!(["elf", "dwarf"]));
    assert_eq!(saved["npc"], json!([]));

    let inherited = get_toolbox_links(&ctx, &alice, &page.id.to_string());
    let effective = inherited.data.flatten().expect("page sees setting links");
    assert!(effective.inherited);
    assert_eq!(effective.setting_id, setting.id);

    let on_world = set_toolbox_links(&ctx, &alice, &world.id.to_string(), &json!({}));
    assert_eq!(on_world.error_code(), Some(ErrorCode::Validation));

    let not_object = set_toolbox_links(&ctx, &alice, &setting.id.to_string(), &json!(["elf"]));
    assert_eq!(not_object.error_code(), Some(ErrorCode::Validation));

    let above_setting = get_toolbox_links(&ctx, &alice, &world.id.to_string());
    assert!(above_setting.ok);
    assert!(above_setting.data.flatten().is_none());
}

#[test]
fn delete_reports_removed_count_and_search_prunes() {
    let ctx = ApiContext::in_memory().unwrap();
    let alice = Actor::user("alice");
    let cosmos = create(&ctx, &alice, None, "cosmos", "Aeth");
    let world = create(&ctx, &alice, Some(&cosmos), "world", "Velm");
    create(&ctx, &alice, Some(&world), "setting", "Capital");
    create(&ctx, &alice, Some(&cosmos), "page", "Notes");

    let found = search_tree(&ctx, &alice, "alice", "CAPITAL");
    let forest = found.data.unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].children.len(), 1);
    assert_eq!(forest[0].children[0].node.name, "Velm");

    let deleted = delete_node(&ctx, &alice, &world.id.to_string());
    assert_eq!(deleted.data.unwrap().removed, 2);
    let listed = list_tree(&ctx, &alice, "alice").data.unwrap();
    assert_eq!(listed.nodes.len(), 2);
}

#[test]
fn move_node_returns_reparented_node() {
    let ctx = ApiContext::in_memory().unwrap();
    let alice = Actor::user("alice");
    let cosmos = create(&ctx, &alice, None, "cosmos", "Aeth");
    let folder = create(&ctx, &alice, Some(&cosmos), "folder", "Drafts");
    let page = create(&ctx, &alice, Some(&cosmos), "page", "Loose page");

    let moved = move_node(
        &ctx,
        &alice,
        &page.id.to_string(),
        Some(&folder.id.to_string()),
        None,
    );
    assert!(moved.ok, "{:?}", moved.error);
    assert_eq!(moved.data.unwrap().parent_id, Some(folder.id));

    let into_self = move_node(
        &ctx,
        &alice,
        &folder.id.to_string(),
        Some(&folder.id.to_string()),
        None,
    );
    assert_eq!(into_self.error_code(), Some(ErrorCode::Validation));
}

#[test]
fn toolbox_listing_respects_ownership_and_category_names() {
    let ctx = ApiContext::in_memory().unwrap();
    let conn = ctx.connection();
    for (id, category, owner, name, is_free) in [
        ("r1", "race", "alice", "Elf", 0),
        ("r2", "race", "bob", "Orc", 0),
        ("r3", "race", "bob", "Human", 1),
        ("c1", "calendar", "alice", "Harvest Reckoning", 0),
    ] {
        conn.execute(
            "INSERT INTO toolbox_entities (entity_id, category, owner_id, name, detail, is_free)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5);",
            params![id, category, owner, name, is_free],
        )
        .unwrap();
    }

    let alice = Actor::user("alice");
    let races = list_races(&ctx, &alice).data.unwrap();
    let names: Vec<&str> = races.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, vec!["Elf", "Human"]);

    let admin_races = list_toolbox(&ctx, &Actor::admin("root"), "races").data.unwrap();
    assert_eq!(admin_races.len(), 3);

    let calendars = list_toolbox(&ctx, &alice, "calendar").data.unwrap();
    assert_eq!(calendars[0].id, "c1");

    let unknown = list_toolbox(&ctx, &alice, "spells");
    assert_eq!(unknown.error_code(), Some(ErrorCode::Validation));
}
