//! Purpose: Shared route and fork JSON serializers for CLI and HTTP serving paths.
//! Exports: `route_info_json`, `routes_json`, `fork_json`.
//! Role: Keep the diagnostic envelope shape consistent across entry points.
//! Invariants: Stable key names; hook slots a route leaves empty are omitted.

use forkgate::api::{ForkSchedule, HookRegistry, RouteHooks};
use serde_json::{Map, Value, json};

pub(crate) fn route_info_json(hooks: &RouteHooks) -> Value {
    let mut map = Map::new();
    map.insert("route".to_string(), json!(hooks.route()));
    map.insert(
        "payload".to_string(),
        json!(hooks.endpoint.post_request.name()),
    );
    map.insert("response".to_string(), json!(hooks.endpoint.response.name()));
    if let Some(hook) = &hooks.pre_parse {
        map.insert("pre_parse".to_string(), json!(hook.name()));
    }
    if let Some(hook) = &hooks.pre_forward {
        map.insert("pre_forward".to_string(), json!(hook.name()));
    }
    if let Some(hook) = &hooks.post_process {
        map.insert("post_process".to_string(), json!(hook.name()));
    }
    Value::Object(map)
}

pub(crate) fn routes_json(registry: &HookRegistry) -> Value {
    let routes = registry
        .routes()
        .iter()
        .map(route_info_json)
        .collect::<Vec<_>>();
    json!({ "routes": routes })
}

pub(crate) fn fork_json(schedule: &ForkSchedule, slot: u64) -> Value {
    json!({
        "slot": slot,
        "epoch": schedule.epoch_at_slot(slot),
        "version": schedule.fork_at_slot(slot).name(),
    })
}
