use indexmap::IndexMap;
use proptest::prelude::*;
use serde_json::{json, Value};
use stateroute::escape::unescape;
use stateroute::extract::{extract_paths, Binding, Placeholders};
use stateroute::store::assign;
use stateroute::url::{parse_query, resolve_url};
use stateroute::{state_path, Captures, Cast, Constraint, Key, QueryParam, Solver};

macro_rules! url_tests {
    ($($name:ident {
        solver = $solver:expr,
        $($route:literal :: $url:literal => $matches:expr),* $(,)?
    }),* $(,)?) => { $(
        #[test]
        fn $name() {
            let solver: Solver = $solver;

            $(
                assert_eq!(
                    solver.matches($route, $url),
                    $matches,
                    "unexpected result for route '{}' and url '{}'",
                    $route,
                    $url
                );
            )*
        }
    )* };
}

url_tests! {
    static_segments {
        solver = Solver::default(),
        "/a/b/c" :: "/a/b/c" => true,
        "/a/b" :: "/a/b/c" => true,
        "/a/b/c" :: "/a/c/b" => false,
        "/a/b/c/d" :: "/a/c/b" => false,
        "/a/b/c" :: "/a/b" => false,
        "/" :: "/anything" => true,
        "/a" :: "/a?b=c" => true,
        "/a" :: "/ab" => false,
    },
    dynamic_segments {
        solver = Solver::default(),
        "/a/:b/c" :: "/a/123/c" => true,
        "/a/:b" :: "/a/123/c" => true,
        "/a/:b" :: "/a/" => false,
        "/a/:b/c" :: "/a//c" => false,
        "/a/:b/c" :: "/a/123/d" => false,
        "/a/:b/c" :: "/a/123" => false,
        "/a/:b" :: "/a/:b" => true,
        "/a/b:c" :: "/a/bx" => false,
    },
    custom_solver {
        solver = Solver::new(r"\{([^/\}]*)\}").unwrap(),
        "/a/{b}" :: "/a/b/c" => true,
        "/a/:b" :: "/a/b/c" => false,
        "/a/{b}/c" :: "/a//c" => false,
        "/a/:b" :: "/a/:b" => true,
    },
}

fn captures<const N: usize>(values: [(&str, Value); N]) -> Captures {
    values.into_iter().collect()
}

// constraint, state, captured values
fn state_tests() -> Vec<(Value, Value, Option<Captures>)> {
    vec![
        (json!(123), json!(123), Some(captures([]))),
        (json!(123), json!("123"), None),
        (json!({ "a": "abc", "b": null }), json!({ "a": "abc" }), Some(captures([]))),
        (json!({ "a": "abc" }), json!({ "a": "abc", "b": 123 }), Some(captures([]))),
        (json!({ "a": "abc" }), json!({ "a": "def" }), None),
        (json!({ "a": "abc" }), json!({}), None),
        (
            json!({ "a": { "b": ":d1" } }),
            json!({ "a": { "b": "abc" } }),
            Some(captures([(":d1", json!("abc"))])),
        ),
        (json!({ "a": { "b": ":d1" } }), json!({ "a": { "b": null } }), None),
        (json!({ "a": { "b": ":d1" } }), json!({ "a": { "b": "" } }), None),
        (json!({ "a": { "b": ":d1" } }), json!({ "a": 3 }), None),
        (
            json!({ "a": [1, ":d1"] }),
            json!({ "a": [1, 42] }),
            Some(captures([(":d1", json!(42))])),
        ),
        (json!({ "a": [1, ":d1"] }), json!({ "a": [1, 42, 3] }), None),
        // not a placeholder of this route
        (json!({ "a": ":other" }), json!({ "a": "x" }), None),
        (json!({ "a": ":other" }), json!({ "a": ":other" }), Some(captures([]))),
    ]
}

#[test]
fn state_matching() {
    let placeholders = Placeholders::path([":d1"]);

    for (tree, state, expected) in state_tests() {
        let constraint = Constraint::compile(&tree, &placeholders);
        assert_eq!(
            constraint.captures(&state),
            expected,
            "constraint {} against state {}",
            tree,
            state
        );
    }
}

#[test]
fn query_placeholders_capture_anything() {
    let placeholders = Placeholders {
        path: vec![":pid".into()],
        query: vec![":q".into(), ":tags".into()],
    };
    let constraint = Constraint::compile(
        &json!({ "pid": ":pid", "search": { "q": ":q", "tags": ":tags" } }),
        &placeholders,
    );

    let got = constraint
        .captures(&json!({ "pid": 1, "search": { "tags": ["a", "b"] } }))
        .unwrap();
    assert_eq!(got.get(":pid"), Some(&json!(1)));
    assert_eq!(got.get(":q"), Some(&Value::Null));
    assert_eq!(got.get(":tags"), Some(&json!(["a", "b"])));
    assert_eq!(got.text(":pid").as_deref(), Some("1"));
    assert_eq!(got.text(":q"), None);

    // the path placeholder still has to be set
    assert!(constraint.captures(&json!({ "search": {} })).is_none());
}

// template, captured values, result
fn resolve_tests() -> Vec<(&'static str, Captures, &'static str)> {
    vec![
        (
            "a/:b/c/:d",
            captures([(":b", json!("B")), (":d", json!("D"))]),
            "a/B/c/D",
        ),
        ("a/:b/:b", captures([(":b", json!("B"))]), "a/B/B"),
        (
            "a/:b/:c",
            captures([(":c", json!("C")), (":d", json!("D"))]),
            "a/:b/C",
        ),
        ("/p/:pid", captures([(":pid", json!(12))]), "/p/12"),
        ("/p/:pid", captures([(":pid", json!(true))]), "/p/true"),
        ("/p/:pid", captures([(":pid", Value::Null)]), "/p/:pid"),
        ("/p/:pid", captures([(":pid", json!("a b/c?"))]), "/p/a%20b%2Fc%3F"),
        ("/p/:pid", captures([(":pid", json!("x-y_z.1"))]), "/p/x-y_z.1"),
    ]
}

#[test]
fn resolve() {
    for (template, values, expected) in resolve_tests() {
        let got = resolve_url(template, &values, &IndexMap::new());
        assert_eq!(got, expected, "{} with {:?}", template, values);
    }
}

#[test]
fn resolve_query() {
    let query = IndexMap::from([
        ("q".to_owned(), json!("x y&z")),
        ("missing".to_owned(), Value::Null),
        ("page".to_owned(), json!(2)),
    ]);

    let url = resolve_url("/search", &captures([]), &query);
    assert_eq!(url, "/search?q=x%20y%26z&page=2");

    let empty = IndexMap::from([("missing".to_owned(), Value::Null)]);
    assert_eq!(resolve_url("/search", &captures([]), &empty), "/search");
}

#[test]
fn query_parsing() {
    let bindings = IndexMap::from([
        ("q".to_owned(), QueryParam { name: ":q".into(), cast: Cast::String }),
        ("page".to_owned(), QueryParam { name: ":page".into(), cast: Cast::Number }),
        ("flag".to_owned(), QueryParam { name: ":flag".into(), cast: Cast::Boolean }),
    ]);

    let values = parse_query("/s?q=a%20b&page=2&flag&unknown=1", &bindings);
    assert_eq!(values.len(), 3);
    assert_eq!(values.get(":q"), Some(&json!("a b")));
    assert_eq!(values.get(":page"), Some(&json!(2)));
    assert_eq!(values.get(":flag"), Some(&json!(false)));
    assert_eq!(values.get("unknown"), None);

    let values = parse_query("/s?flag=true&q", &bindings);
    assert_eq!(values.get(":flag"), Some(&json!(true)));
    assert_eq!(values.get(":q"), Some(&Value::Null));
    assert_eq!(values.get(":page"), None);

    assert!(parse_query("/s", &bindings).is_empty());
}

fn describe(tree: &Value, placeholders: &Placeholders) -> Vec<(Vec<Key>, Value, bool)> {
    extract_paths(tree, placeholders)
        .into_iter()
        .map(|update| match update.binding {
            Binding::Literal(value) => (update.path, value, false),
            Binding::Placeholder { name, .. } => (update.path, Value::String(name), true),
        })
        .collect()
}

#[test]
fn extract() {
    let placeholders = Placeholders::path([":d1"]);

    assert_eq!(
        describe(&json!({ "a": "abc", "b": { "c": ":d1", "d": null } }), &placeholders),
        [
            (state_path(["a"]), json!("abc"), false),
            (state_path(["b", "c"]), json!(":d1"), true),
            (state_path(["b", "d"]), Value::Null, false),
        ]
    );

    assert_eq!(
        describe(&json!({ "list": [1, { "e": ":d2" }], "empty": {}, "none": [] }), &placeholders),
        [
            (vec![Key::from("list"), Key::Index(0)], json!(1), false),
            (vec![Key::from("list"), Key::Index(1), Key::from("e")], json!(":d2"), false),
            (state_path(["empty"]), json!({}), false),
            (state_path(["none"]), json!([]), false),
        ]
    );

    assert!(describe(&json!({}), &placeholders).is_empty());
    assert!(describe(&json!("scalar"), &placeholders).is_empty());
}

const ROUTE: &str = "/project/:pid/item/:iid";

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 /%?&#=.é]{1,8}"
}

proptest! {
    // state -> url -> state
    #[test]
    fn round_trip(pid in text(), iid in text(), q in text(), n in 1..1000i64) {
        let solver = Solver::default();
        let placeholders = Placeholders {
            path: solver.dynamics(ROUTE),
            query: vec![":q".into()],
        };
        let tree = json!({ "view": "item", "ids": { "pid": ":pid", "iid": ":iid" }, "n": n, "q": ":q" });
        let constraint = Constraint::compile(&tree, &placeholders);

        let values = captures([(":pid", json!(pid)), (":iid", json!(iid)), (":q", json!(q))]);
        let mut state = json!({});
        for update in extract_paths(&tree, &placeholders) {
            let value = match update.binding {
                Binding::Literal(value) => value,
                Binding::Placeholder { name, .. } => values.get(&name).cloned().unwrap(),
            };
            assert_ne!(value, Value::Null);
            assign(&mut state, &update.path, value);
        }

        let captured = constraint.captures(&state).unwrap();
        prop_assert_eq!(&captured, &values);

        let query = IndexMap::from([("q".to_owned(), captured.get(":q").cloned().unwrap())]);
        let url = resolve_url(ROUTE, &captured, &query);
        prop_assert!(solver.matches(ROUTE, &url), "{}", url);

        let path: Vec<&str> = url.split('?').next().unwrap().split('/').collect();
        prop_assert_eq!(path.len(), 5);
        prop_assert_eq!(unescape(path[2]), pid.as_str());
        prop_assert_eq!(unescape(path[4]), iid.as_str());

        let bindings = IndexMap::from([(
            "q".to_owned(),
            QueryParam { name: ":q".into(), cast: Cast::String },
        )]);
        let parsed = parse_query(&url, &bindings);
        prop_assert_eq!(parsed.get(":q").cloned(), Some(json!(q)));
    }
}
