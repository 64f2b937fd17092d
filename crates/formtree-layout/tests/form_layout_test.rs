//! End-to-end expansion of JSON layouts against JSON form data.

use formtree_layout::{
    parse_layout, ConfigError, FormDataRowSource, JsonFormData, LayoutPage, LayoutPages,
};
use formtree_testing::{init_logging, nested_layout, FixedRows};
use pretty_assertions::assert_eq;
use serde_json::json;

const HOUSEHOLD: &str = r#"{
  "data": {
    "layout": [
      { "id": "title", "type": "Header" },
      {
        "id": "members",
        "type": "RepeatingGroup",
        "dataModelBindings": { "group": "Household.Members" },
        "children": ["0:name", "1:income"],
        "edit": { "multiPage": true }
      },
      {
        "id": "name",
        "type": "Input",
        "dataModelBindings": { "simpleBinding": "Household.Members.Name" }
      },
      {
        "id": "income",
        "type": "Input",
        "dataModelBindings": {
          "simpleBinding": { "field": "Household.Members.Income", "dataType": "decimal" }
        }
      }
    ]
  }
}"#;

fn household_data() -> JsonFormData {
    JsonFormData::new(json!({
        "Household": {
            "Members": [
                { "altinnRowId": "a1", "Name": "Ada" },
                { "altinnRowId": "b2", "Name": "Bo" },
                { "Name": "Cy" }
            ]
        }
    }))
}

#[test]
fn json_layout_expands_against_form_data() {
    init_logging();
    let layout = parse_layout(HOUSEHOLD).unwrap();
    let data = household_data();
    let page = LayoutPage::build("household", &layout, &FormDataRowSource::new(&data));

    let ids: Vec<String> = page.iter().map(|node| node.id().to_string()).collect();
    assert_eq!(
        ids,
        vec!["title", "members", "name-0", "income-0", "name-1", "income-1", "name-2", "income-2"]
    );

    let members = page.node("members").unwrap().as_group().unwrap();
    let uuids: Vec<&str> = members.rows().iter().map(|row| row.uuid.as_str()).collect();
    assert_eq!(uuids, vec!["a1", "b2", "Household.Members[2]"]);

    let income = page.node("income-1").unwrap();
    let binding = income.binding("simpleBinding").unwrap();
    assert_eq!(binding.field, "Household.Members[1].Income");
    assert_eq!(binding.data_type.as_deref(), Some("decimal"));
    assert_eq!(income.multi_page_index(), Some(1));

    let name = page.node("name-0").unwrap();
    let value = data.get(&name.binding("simpleBinding").unwrap().field);
    assert_eq!(value, Some(&json!("Ada")));
}

#[test]
fn four_by_four_nested_rows() {
    init_logging();
    let rows = FixedRows::uniform(4);
    let page = LayoutPage::build("page", &nested_layout(), &rows);

    assert_eq!(page.find_all_by_id("Age").len(), 16);
    assert_eq!(rows.queries().len(), 5);
    assert_eq!(rows.queries()[0], "Group2");

    let age = page.node("Age-3-2").unwrap();
    assert_eq!(
        age.binding("simpleBinding").unwrap().field,
        "Group2[3].Nested[2].Age"
    );
    let scopes: Vec<(String, usize)> = age
        .row_scopes()
        .iter()
        .map(|scope| (scope.group.clone(), scope.index))
        .collect();
    assert_eq!(scopes, vec![("Group2".to_owned(), 3), ("Nested".to_owned(), 2)]);
}

#[test]
fn row_count_follows_the_source() {
    let rows = FixedRows::uniform(0).with("Group2", 2).with("Nested", 3);
    let page = LayoutPage::build("page", &nested_layout(), &rows);
    let group = page.node("Group2").unwrap().as_group().unwrap();
    assert_eq!(group.rows().len(), 2);
    for row in group.rows() {
        assert_eq!(row.items.len(), 2);
    }
    assert_eq!(page.find_all_by_id("Age").len(), 6);
}

#[test]
fn pages_resolve_collisions_and_keep_config_errors() {
    init_logging();
    let first = vec![
        formtree_testing::input("shared", "A"),
        formtree_testing::group("box", &["ghost"]),
    ];
    let second = vec![formtree_testing::input("shared", "B")];
    let mut pages = LayoutPages::build(
        [("first", first.as_slice()), ("second", second.as_slice())],
        &FixedRows::default(),
    );

    let found = pages.find_component_by_id("shared").unwrap();
    assert_eq!(found.binding("simpleBinding").unwrap().field, "A");
    pages.set_current_page("second").unwrap();
    let found = pages.find_component_by_id("shared").unwrap();
    assert_eq!(found.binding("simpleBinding").unwrap().field, "B");

    let broken = pages.find_component_by_id("box").unwrap();
    assert_eq!(
        broken.errors(),
        &[ConfigError::MissingChild {
            child: "ghost".into()
        }]
    );
    assert_eq!(pages.all_nodes().count(), 3);
}
