mod common;

use common::{Ctx, supervisor};
use pretty_assertions::assert_eq;
use weft::plugin::resolve::Registry;
use weft::{Pipeline, PluginRef, PluginSpec, Scope};

fn hello(scope: &mut Scope<'_, Ctx>) {
    scope.ctx().push("hello".to_owned());
}

fn registry() -> Registry<Ctx> {
    let mut registry = Registry::new();
    registry.insert("pack", "some_plugin", PluginRef::new(hello));
    registry
}

#[test]
fn named_specs_resolve_through_the_registry() {
    let mut pipeline = Pipeline::new(Ctx::new()).with_resolver(registry());
    pipeline.run(vec!["pack.some_plugin".into()]).unwrap();
    assert_eq!(*pipeline.ctx(), ["hello"]);
}

#[test]
fn missing_symbols_name_the_identifier() {
    let mut pipeline = Pipeline::new(Ctx::new()).with_resolver(registry());
    let err = pipeline.run(vec!["pack.does_not_exist".into()]).unwrap_err();
    assert!(err.is_load());
    assert!(err.to_string().contains("pack.does_not_exist"));
}

#[test]
fn whitelisted_names_run() {
    let mut pipeline = Pipeline::new(Ctx::new())
        .with_resolver(registry())
        .with_whitelist(["pack.some_plugin"]);
    pipeline.run(vec!["pack.some_plugin".into()]).unwrap();
    assert_eq!(*pipeline.ctx(), ["hello"]);
}

#[test]
fn names_outside_the_whitelist_are_rejected() {
    let mut pipeline = Pipeline::new(Ctx::new())
        .with_resolver(registry())
        .with_whitelist(["other"]);
    let err = pipeline.run(vec!["pack.some_plugin".into()]).unwrap_err();
    assert!(err.is_load());
    assert!(err.to_string().contains("pack.some_plugin"));
    assert!(pipeline.ctx().is_empty());
}

#[test]
fn inline_plugins_bypass_the_whitelist() {
    let mut pipeline = Pipeline::new(Ctx::new()).with_whitelist(["something.else"]);
    pipeline.run(vec![PluginSpec::from_fn(hello)]).unwrap();
    assert_eq!(*pipeline.ctx(), ["hello"]);
}

#[test]
fn a_name_resolving_to_an_enlisted_plugin_is_a_noop() {
    let plugin = PluginRef::new(hello);
    let mut registry = Registry::new();
    registry.insert("pack", "hello", plugin.clone());

    let mut pipeline = Pipeline::new(Ctx::new()).with_resolver(registry);
    pipeline.run(vec![plugin.into()]).unwrap();
    pipeline.run(vec!["pack.hello".into()]).unwrap();
    assert_eq!(*pipeline.ctx(), ["hello"]);
    assert_eq!(pipeline.enlisted_count(), 1);
}

#[test]
fn default_exports_resolve_from_the_bare_module_path() {
    let mut registry = registry();
    registry.insert_default("pack.vanity", PluginRef::new(hello));

    let mut pipeline = Pipeline::new(Ctx::new()).with_resolver(registry);
    pipeline.run(vec!["pack.vanity".into()]).unwrap();
    assert_eq!(*pipeline.ctx(), ["hello"]);
}

#[test]
fn load_failures_are_recoverable_like_any_other() {
    // No resolver is configured, so the named spec fails to load; the
    // suspended supervisor absorbs the failure and records its cause.
    let mut pipeline = Pipeline::new(Ctx::new());
    pipeline
        .run(vec![supervisor("sup"), "missing.plugin".into()])
        .unwrap();
    assert_eq!(*pipeline.ctx(), ["sup", "unknown module 'missing'"]);
}
