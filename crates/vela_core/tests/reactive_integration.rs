//! Integration tests for the reactive graph under widget-like workloads
//!
//! These tests verify that:
//! - Signals, derived values, and watchers compose into update pipelines
//! - Batched writes keep multi-property updates glitch-free
//! - Graph slots are reclaimed when widgets tear down
//! - A shared graph can be driven from multiple threads

use std::sync::{Arc, Mutex};
use std::thread;

use vela_core::ReactiveGraph;

// Widget interaction states
const IDLE: u32 = 0;
const HOVERED: u32 = 1;
const PRESSED: u32 = 2;

/// Test a counter widget: signal -> derived label -> render watcher
#[test]
fn test_counter_widget_pipeline() {
    let mut graph = ReactiveGraph::new();

    let count = graph.create_signal(0i32);
    let label = graph.create_derived(move |g| format!("Count: {}", g.get(count).unwrap_or(0)));

    // Watcher standing in for the render pass
    let rendered = Arc::new(Mutex::new(Vec::new()));
    let rendered_clone = rendered.clone();
    let _watcher = graph.watch(move |g| {
        if let Some(text) = g.get_derived(label) {
            rendered_clone.lock().unwrap().push(text);
        }
    });

    graph.set(count, 1);
    graph.set(count, 2);

    assert_eq!(
        *rendered.lock().unwrap(),
        vec![
            "Count: 0".to_string(),
            "Count: 1".to_string(),
            "Count: 2".to_string(),
        ]
    );
}

/// Test interaction state driving multiple derived style properties
#[test]
fn test_interaction_state_drives_style_properties() {
    let mut graph = ReactiveGraph::new();

    let state = graph.create_signal(IDLE);

    let scale = graph.create_derived(move |g| match g.get(state).unwrap_or(IDLE) {
        HOVERED => 1.08f32,
        PRESSED => 0.95,
        _ => 1.0,
    });
    let brightness = graph.create_derived(move |g| match g.get(state).unwrap_or(IDLE) {
        HOVERED => 1.1f32,
        PRESSED => 0.9,
        _ => 1.0,
    });

    // Snapshot both properties on every style pass
    let styles = Arc::new(Mutex::new(Vec::new()));
    let styles_clone = styles.clone();
    let _watcher = graph.watch(move |g| {
        let s = g.get_derived(scale).unwrap_or(1.0);
        let b = g.get_derived(brightness).unwrap_or(1.0);
        styles_clone.lock().unwrap().push((s, b));
    });

    // hover -> press -> release back to idle
    graph.set(state, HOVERED);
    graph.set(state, PRESSED);
    graph.set(state, IDLE);

    let styles = styles.lock().unwrap();
    assert_eq!(styles.len(), 4);
    assert_eq!(styles[0], (1.0, 1.0));
    assert_eq!(styles[1], (1.08, 1.1));
    assert_eq!(styles[2], (0.95, 0.9));
    assert_eq!(styles[3], (1.0, 1.0));
}

/// Test that every style pass observes a consistent property pair, never a
/// mix of old and new values
#[test]
fn test_style_passes_never_observe_mixed_values() {
    let mut graph = ReactiveGraph::new();

    let progress = graph.create_signal(0.0f32);
    // Both derive from the same base; a glitch would pair new scale with
    // old shadow or vice versa
    let scale = graph.create_derived(move |g| 1.0 + g.get(progress).unwrap_or(0.0) * 0.2);
    let shadow = graph.create_derived(move |g| 4.0 + g.get(progress).unwrap_or(0.0) * 8.0);

    let observed = Arc::new(Mutex::new(Vec::new()));
    let observed_clone = observed.clone();
    let _watcher = graph.watch(move |g| {
        let s = g.get_derived(scale).unwrap_or(0.0);
        let d = g.get_derived(shadow).unwrap_or(0.0);
        observed_clone.lock().unwrap().push((s, d));
    });

    graph.set(progress, 0.5);
    graph.set(progress, 1.0);

    for (s, d) in observed.lock().unwrap().iter() {
        // shadow = 4 + 40 * (scale - 1) whenever both came from one write
        let expected_shadow = 4.0 + (s - 1.0) * 40.0;
        assert!(
            (d - expected_shadow).abs() < 1e-4,
            "inconsistent pair: scale={s}, shadow={d}"
        );
    }
    assert_eq!(observed.lock().unwrap().len(), 3);
}

/// Test form validation: two inputs feed one derived validity flag
#[test]
fn test_form_validation_pipeline() {
    let mut graph = ReactiveGraph::new();

    let username = graph.create_signal(String::new());
    let password = graph.create_signal(String::new());

    let is_valid = graph.create_derived(move |g| {
        let user = g.get(username).unwrap_or_default();
        let pass = g.get(password).unwrap_or_default();
        !user.is_empty() && pass.len() >= 8
    });

    let submit_enabled = Arc::new(Mutex::new(Vec::new()));
    let submit_clone = submit_enabled.clone();
    graph.connect(is_valid.signal(), move |valid| {
        submit_clone.lock().unwrap().push(valid);
    });

    // Filling in one field at a time only flips the flag once
    graph.set(username, "ada".to_string());
    graph.set(password, "hunter2".to_string()); // too short
    graph.set(password, "correct horse".to_string());

    assert_eq!(*submit_enabled.lock().unwrap(), vec![false, true]);
}

/// Test batched pointer updates trigger a single layout pass
#[test]
fn test_batched_pointer_updates_single_pass() {
    let mut graph = ReactiveGraph::new();

    let x = graph.create_signal(0.0f32);
    let y = graph.create_signal(0.0f32);
    let pressure = graph.create_signal(0.0f32);

    let passes = Arc::new(Mutex::new(0));
    let passes_clone = passes.clone();
    let _watcher = graph.watch(move |g| {
        let _ = g.get(x);
        let _ = g.get(y);
        let _ = g.get(pressure);
        *passes_clone.lock().unwrap() += 1;
    });

    *passes.lock().unwrap() = 0;
    graph.batch(|g| {
        g.set(x, 12.0);
        g.set(y, 34.0);
        g.set(pressure, 0.7);
    });
    assert_eq!(*passes.lock().unwrap(), 1);

    // Values all landed despite the single pass
    assert_eq!(graph.get(x), Some(12.0));
    assert_eq!(graph.get(y), Some(34.0));
    assert_eq!(graph.get(pressure), Some(0.7));
}

/// Test widget teardown reclaims every graph slot it allocated
#[test]
fn test_widget_teardown_releases_graph_slots() {
    let mut graph = ReactiveGraph::new();

    let value = graph.create_signal(0i32);
    let doubled = graph.create_derived(move |g| g.get(value).unwrap_or(0) * 2);
    let watcher = graph.watch(move |g| {
        let _ = g.get_derived(doubled);
    });

    assert_eq!(graph.signal_count(), 2);
    assert_eq!(graph.watcher_count(), 2);

    // Teardown in reverse creation order
    graph.dispose_watcher(watcher);
    graph.dispose_derived(doubled);
    graph.remove_signal(value);

    assert_eq!(graph.signal_count(), 0);
    assert_eq!(graph.watcher_count(), 0);

    // Stale handles stay inert
    graph.set(value, 5);
    assert_eq!(graph.get(value), None);
}

/// Test a shared graph driven from a worker thread
#[test]
fn test_shared_graph_across_threads() {
    let graph = Arc::new(Mutex::new(ReactiveGraph::new()));

    let (progress, seen) = {
        let mut g = graph.lock().unwrap();
        let progress = g.create_signal(0u32);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        g.connect(progress, move |v| seen_clone.lock().unwrap().push(v));
        (progress, seen)
    };

    let worker_graph = graph.clone();
    let worker = thread::spawn(move || {
        for step in 1..=3u32 {
            worker_graph.lock().unwrap().set(progress, step * 25);
        }
    });
    worker.join().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![0, 25, 50, 75]);
}
