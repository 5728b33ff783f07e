//! `each` reconciliation: keyed moves, insertions and removals

mod common;

use std::collections::HashMap;

use common::{object, Harness};
use morphling::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn person(key: &str, name: &str, class: &str) -> Value {
    object(vec![("key", key), ("name", name), ("class", class)]).into()
}

fn context(list: Vec<Value>) -> Value {
    ObjectRef::new().with_field("list", list).into()
}

/// `<ul>{{#each list key="key" as |item|}}<li class="{{item.class}}">{{item.name}}</li>{{/each}}</ul>`
fn keyed_list_template() -> Template {
    let item = TemplateBuilder::new()
        .block_params(["item"])
        .element("li", |li| {
            li.dynamic_attr("class", Expr::path("item.class"))
                .append(Expr::path("item.name"))
        })
        .build();
    TemplateBuilder::new()
        .element("ul", |ul| {
            ul.block(
                BlockBuilder::new("each")
                    .param(Expr::path("list"))
                    .hash("key", Expr::literal("key"))
                    .template(item),
            )
        })
        .build()
}

fn item_node(h: &Harness, class: &str) -> NodeId {
    let ul = h.descend(1).unwrap();
    h.children(ul)
        .into_iter()
        .find(|node| h.attribute(*node, "class").as_deref() == Some(class))
        .unwrap_or_else(|| panic!("no item with class {class}"))
}

fn name_node(h: &Harness, class: &str) -> NodeId {
    h.first_child(item_node(h, class)).unwrap()
}

fn items_html(items: &[(&str, &str)]) -> String {
    let lis: String = items
        .iter()
        .map(|(class, name)| format!(r#"<li class="{class}">{name}</li>"#))
        .collect();
    format!("<ul>{lis}<!----></ul>")
}

// ═══════════════════════════════════════════════════════════════════════
// Keyed Each
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_keyed_each_with_block_params() {
    let h = Harness::new();
    let template = keyed_list_template();
    let tom = person("1", "Tom Dale", "tomdale");
    let yehuda = person("2", "Yehuda Katz", "wycats");

    let mut result = h.render(&template, context(vec![tom.clone(), yehuda.clone()]));
    let mut item = item_node(&h, "tomdale");
    let mut name = name_node(&h, "tomdale");
    let assert_stable = |h: &Harness, class: &str, item: NodeId, name: NodeId, when: &str| {
        assert_eq!(item_node(h, class), item, "item node changed {when}");
        assert_eq!(name_node(h, class), name, "name node changed {when}");
    };

    assert_eq!(
        h.html(),
        items_html(&[("tomdale", "Tom Dale"), ("wycats", "Yehuda Katz")])
    );

    result.rerender(None).unwrap();
    assert_stable(&h, "tomdale", item, name, "after a no-op rerender");
    assert_eq!(
        h.html(),
        items_html(&[("tomdale", "Tom Dale"), ("wycats", "Yehuda Katz")])
    );

    result
        .rerender(Some(context(vec![yehuda.clone(), tom.clone()])))
        .unwrap();
    assert_stable(&h, "tomdale", item, name, "after reordering");
    assert_eq!(
        h.html(),
        items_html(&[("wycats", "Yehuda Katz"), ("tomdale", "Tom Dale")])
    );

    result
        .rerender(Some(context(vec![
            person("1", "Martin Muñoz", "mmun"),
            person("2", "Kris Selden", "krisselden"),
        ])))
        .unwrap();
    assert_stable(&h, "mmun", item, name, "after replacing entries with stable keys");
    assert_eq!(
        h.html(),
        items_html(&[("mmun", "Martin Muñoz"), ("krisselden", "Kris Selden")])
    );

    result
        .rerender(Some(context(vec![
            person("1", "Martin Muñoz", "mmun"),
            person("2", "Kristoph Selden", "krisselden"),
            person("3", "Matthew Beale", "mixonic"),
        ])))
        .unwrap();
    assert_stable(&h, "mmun", item, name, "after appending an entry");
    assert_eq!(
        h.html(),
        items_html(&[
            ("mmun", "Martin Muñoz"),
            ("krisselden", "Kristoph Selden"),
            ("mixonic", "Matthew Beale"),
        ])
    );

    result
        .rerender(Some(context(vec![
            person("1", "Martin Muñoz", "mmun"),
            person("3", "Matthew Beale", "mixonic"),
        ])))
        .unwrap();
    assert_stable(&h, "mmun", item, name, "after removing the middle entry");
    assert_eq!(
        h.html(),
        items_html(&[("mmun", "Martin Muñoz"), ("mixonic", "Matthew Beale")])
    );

    result
        .rerender(Some(context(vec![
            person("1", "Martin Muñoz", "mmun"),
            person("4", "Stefan Penner", "stefanpenner"),
            person("5", "Robert Jackson", "rwjblue"),
        ])))
        .unwrap();
    assert_stable(&h, "mmun", item, name, "after adding two entries");
    assert_eq!(
        h.html(),
        items_html(&[
            ("mmun", "Martin Muñoz"),
            ("stefanpenner", "Stefan Penner"),
            ("rwjblue", "Robert Jackson"),
        ])
    );

    item = item_node(&h, "rwjblue");
    name = name_node(&h, "rwjblue");

    result
        .rerender(Some(context(vec![person("5", "Robert Jackson", "rwjblue")])))
        .unwrap();
    assert_stable(&h, "rwjblue", item, name, "after removing two entries");
    assert_eq!(h.html(), items_html(&[("rwjblue", "Robert Jackson")]));

    result
        .rerender(Some(context(vec![
            person("1", "Martin Muñoz", "mmun"),
            person("4", "Stefan Penner", "stefanpenner"),
            person("5", "Robert Jackson", "rwjblue"),
        ])))
        .unwrap();
    assert_stable(&h, "rwjblue", item, name, "after adding entries back");
    assert_eq!(
        h.html(),
        items_html(&[
            ("mmun", "Martin Muñoz"),
            ("stefanpenner", "Stefan Penner"),
            ("rwjblue", "Robert Jackson"),
        ])
    );

    item = item_node(&h, "mmun");
    name = name_node(&h, "mmun");

    result
        .rerender(Some(context(vec![person("1", "Martin Muñoz", "mmun")])))
        .unwrap();
    assert_stable(&h, "mmun", item, name, "after removing from the back");
    assert_eq!(h.html(), items_html(&[("mmun", "Martin Muñoz")]));

    result.rerender(Some(context(Vec::new()))).unwrap();
    let ul = h.descend(1).unwrap();
    let only = h.first_child(ul).unwrap();
    assert_eq!(h.kind(only), Some(NodeKind::Comment), "no items are left");
    assert_eq!(h.html(), "<ul><!----></ul>");
}

#[test]
fn test_top_level_bounds_when_swapping_order() {
    let h = Harness::new();
    let item = TemplateBuilder::new()
        .block_params(["item"])
        .append(Expr::path("item.name"))
        .build();
    let template = TemplateBuilder::new()
        .block(
            BlockBuilder::new("each")
                .param(Expr::path("list"))
                .hash("key", Expr::literal("key"))
                .template(item),
        )
        .build();

    let tom = person("1", "Tom Dale", "tomdale");
    let yehuda = person("2", "Yehuda Katz", "wycats");

    let mut result = h.render(&template, context(vec![tom.clone(), yehuda.clone()]));

    result.rerender(None).unwrap();
    h.assert_bounds(&result);

    result
        .rerender(Some(context(vec![yehuda.clone(), tom.clone()])))
        .unwrap();
    h.assert_bounds(&result);
    assert_eq!(h.html(), "Yehuda KatzTom Dale<!---->");

    result.rerender(Some(context(vec![tom]))).unwrap();
    h.assert_bounds(&result);

    result.rerender(Some(context(Vec::new()))).unwrap();
    h.assert_bounds(&result);
    assert_eq!(h.html(), "<!---->");
}

#[test]
fn test_keyed_items_are_moved_not_rebuilt() {
    let h = Harness::new();
    let template = keyed_list_template();
    let people: Vec<Value> = ["a", "b", "c", "d"]
        .iter()
        .map(|k| person(k, k, k))
        .collect();

    let mut result = h.render(&template, context(people.clone()));
    let nodes: Vec<NodeId> = ["a", "b", "c", "d"].iter().map(|k| item_node(&h, k)).collect();
    let created = h.dom.borrow().node_count();

    let reversed: Vec<Value> = people.into_iter().rev().collect();
    result.rerender(Some(context(reversed))).unwrap();

    assert_eq!(h.dom.borrow().node_count(), created, "no node was created");
    let ul = h.descend(1).unwrap();
    let mut now = h.children(ul);
    now.pop();
    let mut expected = nodes;
    expected.reverse();
    assert_eq!(now, expected);
}

#[test]
fn test_duplicate_keys_still_render_every_item() {
    let h = Harness::new();
    let template = keyed_list_template();
    let list = vec![person("1", "A", "a"), person("1", "B", "b"), person("2", "C", "c")];

    let mut result = h.render(&template, context(list));
    assert_eq!(h.html(), items_html(&[("a", "A"), ("b", "B"), ("c", "C")]));

    let list = vec![person("2", "C", "c"), person("1", "A", "a")];
    result.rerender(Some(context(list))).unwrap();
    assert_eq!(h.html(), items_html(&[("c", "C"), ("a", "A")]));
}

#[test]
fn test_identity_keys_follow_objects() {
    let h = Harness::new();
    let item = TemplateBuilder::new()
        .block_params(["item"])
        .element("li", |li| li.append(Expr::path("item.name")))
        .build();
    let template = TemplateBuilder::new()
        .block(
            BlockBuilder::new("each")
                .param(Expr::path("list"))
                .hash("key", Expr::literal("@identity"))
                .template(item),
        )
        .build();

    let a = object(vec![("name", "a")]);
    let b = object(vec![("name", "b")]);
    let list = ListRef::from_vec(vec![a.clone().into(), b.clone().into()]);
    let mut result = h.render(&template, ObjectRef::new().with_field("list", list.clone()));
    let first = h.first_child(h.root).unwrap();

    list.reverse();
    result.rerender(None).unwrap();
    assert_eq!(h.html(), "<li>b</li><li>a</li><!---->");
    assert_eq!(h.children(h.root)[1], first);
    h.assert_bounds(&result);
}

#[test]
fn test_keyed_each_keeps_its_marker_through_the_inverse() {
    let h = Harness::new();
    let item = TemplateBuilder::new()
        .block_params(["item"])
        .append(Expr::path("item.name"))
        .build();
    let template = TemplateBuilder::new()
        .element("ul", |ul| {
            ul.block(
                BlockBuilder::new("each")
                    .param(Expr::path("list"))
                    .hash("key", Expr::literal("key"))
                    .template(item)
                    .inverse(common::text("none")),
            )
        })
        .build();
    let a = person("a", "a", "first");
    let b = person("b", "b", "second");
    let marker = |h: &Harness| h.last_child(h.descend(1).unwrap());

    let mut result = h.render(&template, context(vec![a.clone(), b]));
    assert_eq!(h.html(), "<ul>ab<!----></ul>");
    let placeholder = marker(&h);

    result.rerender(Some(context(Vec::new()))).unwrap();
    assert_eq!(h.html(), "<ul>none<!----></ul>");
    assert_eq!(marker(&h), placeholder);

    result.rerender(Some(context(vec![a]))).unwrap();
    assert_eq!(h.html(), "<ul>a<!----></ul>");
    assert_eq!(marker(&h), placeholder);
}

#[test]
fn test_fresh_data_does_not_grow_the_registry() {
    let h = Harness::new();
    let template = keyed_list_template();
    let fresh = || {
        context(vec![
            person("1", "Tom Dale", "tomdale"),
            person("2", "Yehuda Katz", "wycats"),
        ])
    };

    let mut result = h.render(&template, fresh());
    result.rerender(Some(fresh())).unwrap();
    // The context and the two items
    assert_eq!(h.env.registry().len(), 3);

    for _ in 0..200 {
        result.rerender(Some(fresh())).unwrap();
    }
    assert_eq!(h.env.registry().len(), 3);
    assert_eq!(
        h.html(),
        items_html(&[("tomdale", "Tom Dale"), ("wycats", "Yehuda Katz")])
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Unkeyed Each
// ═══════════════════════════════════════════════════════════════════════

fn word_list_template(inverse: Option<Template>) -> Template {
    let item = TemplateBuilder::new()
        .block_params(["item", "index"])
        .element("p", |p| {
            p.append(Expr::path("index"))
                .text(":")
                .append(Expr::path("item"))
        })
        .build();
    let mut block = BlockBuilder::new("each")
        .param(Expr::path("list"))
        .template(item);
    if let Some(inverse) = inverse {
        block = block.inverse(inverse);
    }
    TemplateBuilder::new()
        .element("div", |div| div.block(block))
        .build()
}

#[test]
fn test_unkeyed_each_matches_by_position() {
    let h = Harness::new();
    let list = ListRef::from_vec(vec![Value::from("x"), Value::from("y")]);
    let mut result = h.render(
        &word_list_template(None),
        ObjectRef::new().with_field("list", list.clone()),
    );
    assert_eq!(h.html(), "<div><p>0:x</p><p>1:y</p></div>");
    let first = h.descend(2);

    list.insert(0, "w");
    result.rerender(None).unwrap();
    assert_eq!(h.html(), "<div><p>0:w</p><p>1:x</p><p>2:y</p></div>");
    assert_eq!(h.descend(2), first, "the first item was updated in place");

    list.replace(Vec::new());
    result.rerender(None).unwrap();
    assert_eq!(h.html(), "<div><!----></div>");

    list.push("z");
    result.rerender(None).unwrap();
    assert_eq!(h.html(), "<div><p>0:z</p></div>");
}

#[test]
fn test_each_inverse_renders_for_empty_lists() {
    let h = Harness::new();
    let list = ListRef::new();
    let mut result = h.render(
        &word_list_template(Some(common::text("nothing here"))),
        ObjectRef::new().with_field("list", list.clone()),
    );
    assert_eq!(h.html(), "<div>nothing here</div>");

    list.push("a");
    result.rerender(None).unwrap();
    assert_eq!(h.html(), "<div><p>0:a</p></div>");
}

// ═══════════════════════════════════════════════════════════════════════
// Properties
// ═══════════════════════════════════════════════════════════════════════

fn keyed_context(keys: &[u8]) -> Value {
    let list: Vec<Value> = keys
        .iter()
        .map(|k| {
            let key = k.to_string();
            Value::from(object(vec![("key", key.clone()), ("name", format!("item {key}"))]))
        })
        .collect();
    context(list)
}

fn expected_html(keys: &[u8]) -> String {
    let lis: String = keys
        .iter()
        .map(|k| format!(r#"<li data-key="{k}">item {k}</li>"#))
        .collect();
    format!("<ul>{lis}<!----></ul>")
}

fn lists() -> impl Strategy<Value = Vec<Vec<u8>>> {
    let keys: Vec<u8> = (0..8).collect();
    prop::collection::vec(
        prop::sample::subsequence(keys, 0..=8).prop_shuffle(),
        1..6,
    )
}

proptest! {
    #[test]
    fn prop_keyed_items_keep_their_nodes(steps in lists()) {
        let h = Harness::new();
        let item = TemplateBuilder::new()
            .block_params(["item"])
            .element("li", |li| {
                li.dynamic_attr("data-key", Expr::path("item.key"))
                    .append(Expr::path("item.name"))
            })
            .build();
        let template = TemplateBuilder::new()
            .element("ul", |ul| {
                ul.block(
                    BlockBuilder::new("each")
                        .param(Expr::path("list"))
                        .hash("key", Expr::literal("key"))
                        .template(item),
                )
            })
            .build();

        let mut result = h.render(&template, keyed_context(&[]));
        let mut known: HashMap<String, NodeId> = HashMap::new();

        for keys in steps {
            result.rerender(Some(keyed_context(&keys))).unwrap();
            prop_assert_eq!(h.html(), expected_html(&keys));

            let ul = h.descend(1).unwrap();
            let mut current = HashMap::new();
            for node in h.children(ul) {
                if let Some(key) = h.attribute(node, "data-key") {
                    if let Some(previous) = known.get(&key) {
                        prop_assert_eq!(*previous, node, "item {} was rebuilt", key);
                    }
                    current.insert(key, node);
                }
            }
            known = current;
            h.assert_bounds(&result);
        }
    }
}
