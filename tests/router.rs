use hyper::Method;
use velomux::mux::{Lookup, RouteError, Router};

fn matched<H: Copy>(lookup: Lookup<'_, '_, H>) -> Option<(H, Vec<(String, String)>)> {
    match lookup {
        Lookup::Found { handler, params } => Some((
            *handler,
            params
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        )),
        _ => None,
    }
}

#[test]
fn literal_patterns_match_themselves() {
    let patterns = [
        "/",
        "/contact",
        "/contacts",
        "/con",
        "/api/v1/status",
        "/api/v2/status",
        "/api",
        "/a/b/c/d/e",
    ];
    let mut router = Router::new();
    for (i, p) in patterns.iter().enumerate() {
        router.insert(&format!("r{}", i), Method::GET, p, i).unwrap();
    }
    for (i, p) in patterns.iter().enumerate() {
        let (h, params) = matched(router.lookup(&Method::GET, p)).unwrap();
        assert_eq!(h, i, "pattern {}", p);
        assert!(params.is_empty());
    }
}

#[test]
fn params_are_captured_in_order() {
    let mut router = Router::new();
    router.insert("xy", Method::GET, "/a/:x/b/:y", ()).unwrap();

    let (_, params) = matched(router.lookup(&Method::GET, "/a/1/b/2")).unwrap();
    assert_eq!(
        params,
        vec![
            ("x".to_string(), "1".to_string()),
            ("y".to_string(), "2".to_string())
        ]
    );
}

#[test]
fn static_beats_param_in_any_registration_order() {
    for order in [["/users/:id", "/users/new"], ["/users/new", "/users/:id"]] {
        let mut router = Router::new();
        for p in order {
            router.insert(p, Method::GET, p, p).unwrap();
        }
        assert_eq!(
            matched(router.lookup(&Method::GET, "/users/new")).unwrap().0,
            "/users/new"
        );
        let (h, params) = matched(router.lookup(&Method::GET, "/users/7")).unwrap();
        assert_eq!(h, "/users/:id");
        assert_eq!(params, vec![("id".to_string(), "7".to_string())]);
    }
}

#[test]
fn compressed_prefixes_stay_independent() {
    let orders = [
        ["/abc", "/abcd", "/ab"],
        ["/ab", "/abc", "/abcd"],
        ["/abcd", "/ab", "/abc"],
    ];
    for order in orders {
        let mut router = Router::new();
        for p in order {
            router.insert(p, Method::GET, p, p).unwrap();
        }
        for p in order {
            assert_eq!(matched(router.lookup(&Method::GET, p)).unwrap().0, p);
        }
        assert!(matches!(router.lookup(&Method::GET, "/a"), Lookup::NotFound));
        assert!(matches!(router.lookup(&Method::GET, "/abcde"), Lookup::NotFound));
    }
}

#[test]
fn duplicate_names_are_rejected() {
    let mut router = Router::new();
    router.insert("dup", Method::GET, "/one", 1).unwrap();
    assert_eq!(
        router.insert("dup", Method::POST, "/two", 2),
        Err(RouteError::DuplicateName("dup".to_string()))
    );
    assert_eq!(router.insert("", Method::GET, "/three", 3), Err(RouteError::EmptyName));
}

#[test]
fn methods_are_dispatched_independently() {
    let mut router = Router::new();
    router.insert("get", Method::GET, "/thing/:id", "get").unwrap();
    router.insert("post", Method::POST, "/thing/:id", "post").unwrap();

    assert_eq!(matched(router.lookup(&Method::GET, "/thing/1")).unwrap().0, "get");
    assert_eq!(matched(router.lookup(&Method::POST, "/thing/1")).unwrap().0, "post");
    match router.lookup(&Method::DELETE, "/thing/1") {
        Lookup::MethodNotAllowed { allowed } => assert_eq!(allowed, &[Method::GET, Method::POST]),
        other => panic!("expected MethodNotAllowed, got {:?}", other),
    }
}

#[test]
fn unmatched_paths_are_not_found() {
    let mut router = Router::new();
    router.insert("u", Method::GET, "/users/:id/posts", ()).unwrap();

    for path in ["/users", "/users/1", "/users//posts", "/users/1/posts/", "/other"] {
        assert!(
            matches!(router.lookup(&Method::GET, path), Lookup::NotFound),
            "{} should not match",
            path
        );
    }
}

#[test]
fn dead_end_static_branch_falls_back_to_param() {
    let mut router = Router::new();
    router.insert("lit-d", Method::GET, "/abc/abc/d", "literal").unwrap();
    router.insert("lit-f", Method::GET, "/abc/abc/f", "literal").unwrap();
    router.insert("param", Method::GET, "/abc/:a/e", "param").unwrap();

    let (h, params) = matched(router.lookup(&Method::GET, "/abc/abc/e")).unwrap();
    assert_eq!(h, "param");
    assert_eq!(params, vec![("a".to_string(), "abc".to_string())]);
}

#[test]
fn example_scenario() {
    let mut router = Router::new();
    router.insert("param", Method::GET, "/abc/:a/d", "param").unwrap();
    let (h, params) = matched(router.lookup(&Method::GET, "/abc/123/d")).unwrap();
    assert_eq!(h, "param");
    assert_eq!(params, vec![("a".to_string(), "123".to_string())]);

    router.insert("literal", Method::GET, "/abc/abc/d", "literal").unwrap();
    let (h, params) = matched(router.lookup(&Method::GET, "/abc/abc/d")).unwrap();
    assert_eq!(h, "literal");
    assert!(params.is_empty());
}

#[test]
fn reverse_routing() {
    let mut router = Router::new();
    router.insert("post", Method::GET, "/blog/:year/:slug", ()).unwrap();

    assert_eq!(router.reverse("post", &[&2024, &"hello-world"]), "/blog/2024/hello-world");
    assert!(matches!(
        router.try_reverse("post", &[&2024]),
        Err(RouteError::ParamCount { expected: 2, got: 1, .. })
    ));
    assert!(matches!(
        router.try_reverse("nope", &[]),
        Err(RouteError::UnknownRoute(_))
    ));
}

#[test]
fn routes_are_listed_by_name() {
    let mut router = Router::new();
    router.insert("b", Method::POST, "/b", ()).unwrap();
    router.insert("a", Method::GET, "/a/:id", ()).unwrap();

    let listed: Vec<_> = router
        .routes()
        .map(|(name, route)| (name.to_string(), route.method.clone(), route.pattern.clone()))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("a".to_string(), Method::GET, "/a/:id".to_string()),
            ("b".to_string(), Method::POST, "/b".to_string()),
        ]
    );
}
