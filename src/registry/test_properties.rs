//! Property-based tests for tags-view registry invariants.
//!
//! Arbitrary sequences of register/close/refresh operations over a small
//! route pool must keep paths unique, preserve first-registration order, and
//! never drop an affixed view.

use std::collections::HashSet;

use proptest::prelude::*;

use super::{ViewRegistry, VisitedView};
use crate::core::config::RoutingConfig;
use crate::route::{Route, RouteMeta, RouteRecord};

const POOL: [(&str, &str); 6] = [
    ("/kb/list", "KBList"),
    ("/kb/edit", "KBEdit"),
    ("/files", "Files"),
    ("/chat", "Chat"),
    ("/users", "Users"),
    ("/settings", "Settings"),
];

#[derive(Debug, Clone)]
enum Op {
    Register(usize),
    CloseOne { target: usize, active: usize },
    CloseOthers { keep: usize, active: usize },
    CloseAll { active: usize },
    CloseLeft { pivot: usize, active: usize },
    CloseRight { pivot: usize, active: usize },
    Refresh(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    let idx = || 0..POOL.len();
    prop_oneof![
        4 => idx().prop_map(Op::Register),
        2 => (idx(), idx()).prop_map(|(target, active)| Op::CloseOne { target, active }),
        1 => (idx(), idx()).prop_map(|(keep, active)| Op::CloseOthers { keep, active }),
        1 => idx().prop_map(|active| Op::CloseAll { active }),
        1 => (idx(), idx()).prop_map(|(pivot, active)| Op::CloseLeft { pivot, active }),
        1 => (idx(), idx()).prop_map(|(pivot, active)| Op::CloseRight { pivot, active }),
        1 => idx().prop_map(Op::Refresh),
    ]
}

fn pool_route(i: usize) -> Route {
    let (path, name) = POOL[i];
    Route::new(path, name, RouteMeta::titled(name))
}

fn pool_view(i: usize) -> VisitedView {
    VisitedView::from_route(&pool_route(i)).unwrap()
}

fn seeded() -> ViewRegistry {
    let tree = vec![
        RouteRecord::new("/dashboard")
            .named("Dashboard")
            .meta(RouteMeta {
                affix: true,
                ..RouteMeta::titled("Dashboard")
            }),
    ];
    let mut registry = ViewRegistry::new(RoutingConfig::default());
    registry.init_affixed(&tree).unwrap();
    registry
}

fn apply(registry: &mut ViewRegistry, op: &Op) {
    match *op {
        Op::Register(i) => {
            registry.register(&pool_route(i));
        }
        Op::CloseOne { target, active } => {
            registry.close_one(&pool_view(target), &pool_route(active));
        }
        Op::CloseOthers { keep, active } => {
            registry.close_others(&pool_view(keep), &pool_route(active));
        }
        Op::CloseAll { active } => {
            registry.close_all(&pool_route(active));
        }
        Op::CloseLeft { pivot, active } => {
            registry.close_left(&pool_view(pivot), &pool_route(active));
        }
        Op::CloseRight { pivot, active } => {
            registry.close_right(&pool_view(pivot), &pool_route(active));
        }
        Op::Refresh(i) => {
            registry.refresh(&pool_view(i));
        }
    }
}

fn affixed_paths(registry: &ViewRegistry) -> Vec<String> {
    registry
        .visited()
        .iter()
        .filter(|v| v.affixed)
        .map(|v| v.path.clone())
        .collect()
}

proptest! {
    #[test]
    fn paths_stay_unique(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut registry = seeded();
        for op in &ops {
            apply(&mut registry, op);
            let mut seen = HashSet::new();
            for view in registry.visited() {
                prop_assert!(seen.insert(view.path.clone()), "duplicate path {}", view.path);
            }
            let cached: HashSet<&String> = registry.cached().iter().collect();
            prop_assert_eq!(cached.len(), registry.cached().len());
        }
    }

    #[test]
    fn registering_twice_leaves_one_view(i in 0..POOL.len(), repeats in 1usize..5) {
        let mut registry = seeded();
        for _ in 0..repeats {
            registry.register(&pool_route(i));
        }
        let count = registry.visited().iter().filter(|v| v.path == POOL[i].0).count();
        prop_assert_eq!(count, 1);
    }

    #[test]
    fn first_registration_order_is_kept(indices in prop::collection::vec(0..POOL.len(), 0..30)) {
        let mut registry = seeded();
        let mut expected = vec!["/dashboard".to_string()];
        for &i in &indices {
            registry.register(&pool_route(i));
            let path = POOL[i].0.to_string();
            if !expected.contains(&path) {
                expected.push(path);
            }
        }
        let actual: Vec<String> = registry.visited().iter().map(|v| v.path.clone()).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn affixed_views_survive_everything(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut registry = seeded();
        for op in &ops {
            apply(&mut registry, op);
        }
        let view = registry.get("/dashboard").cloned();
        prop_assert!(view.is_some());
        let view = view.unwrap();
        prop_assert!(view.affixed);
        registry.close_one(&view, &pool_route(0));
        prop_assert!(registry.get("/dashboard").is_some());
    }

    #[test]
    fn close_others_leaves_keep_and_affixed(
        indices in prop::collection::vec(0..POOL.len(), 1..20),
        keep in 0..POOL.len(),
        active in 0..POOL.len(),
    ) {
        let mut registry = seeded();
        for &i in &indices {
            registry.register(&pool_route(i));
        }
        registry.register(&pool_route(keep));
        let affixed = affixed_paths(&registry);

        registry.close_others(&pool_view(keep), &pool_route(active));

        let survivors: HashSet<String> =
            registry.visited().iter().map(|v| v.path.clone()).collect();
        let mut expected: HashSet<String> = affixed.into_iter().collect();
        expected.insert(POOL[keep].0.to_string());
        prop_assert_eq!(survivors, expected);
    }

    #[test]
    fn close_all_leaves_exactly_affixed(
        indices in prop::collection::vec(0..POOL.len(), 0..20),
        active in 0..POOL.len(),
    ) {
        let mut registry = seeded();
        for &i in &indices {
            registry.register(&pool_route(i));
        }
        let affixed = affixed_paths(&registry);
        let nav = registry.close_all(&pool_route(active));

        let survivors: Vec<String> = registry.visited().iter().map(|v| v.path.clone()).collect();
        prop_assert_eq!(survivors, affixed);
        prop_assert!(registry.cached().is_empty());
        // The active pool page was closed, so a redirect is always issued.
        prop_assert!(nav.is_some());
    }

    #[test]
    fn closing_inactive_views_never_navigates(
        indices in prop::collection::vec(0..POOL.len(), 1..20),
        target in 0..POOL.len(),
        active in 0..POOL.len(),
    ) {
        prop_assume!(target != active);
        let mut registry = seeded();
        for &i in &indices {
            registry.register(&pool_route(i));
        }
        prop_assert!(registry.close_one(&pool_view(target), &pool_route(active)).is_none());
    }
}
