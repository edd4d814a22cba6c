use kispec::{
    Configuration,
    filter::{FilterManager, Matcher},
    metadata::Value,
    outcome::Status,
    reporter::NoReporter,
    tags,
};
use pretty_assertions::assert_eq;

use crate::lib::{Trace, world};

#[test]
fn focus_runs_only_the_matching_subgroup() {
    let trace = Trace::default();
    let config = Configuration::new().with_filter(FilterManager::new().with_include("focus", true));
    let (world, _) = world(config);

    world
        .describe("widget", (), |g| {
            g.describe("focused", tags!(focus), |g| {
                g.before("all", trace.hook("focused before all"))?;
                g.after("all", trace.hook("focused after all"))?;
                g.it("one", (), trace.hook("focused one"))?;
                g.it("two", (), trace.hook("focused two"))?;
                Ok(())
            })?;
            g.describe("unfocused", (), |g| {
                g.before("all", trace.hook("unfocused before all"))?;
                g.after("all", trace.hook("unfocused after all"))?;
                g.it("three", (), trace.hook("unfocused three"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(
        trace.take(),
        [
            "focused before all",
            "focused one",
            "focused two",
            "focused after all"
        ]
    );
}

#[test]
fn true_rules_match_loosely() {
    let trace = Trace::default();
    let config = Configuration::new().with_filter(FilterManager::new().with_include("fast", true));
    let (world, _) = world(config);

    world
        .describe("values", (), |g| {
            g.it("bool", tags!(fast = true), trace.hook("bool"))?;
            g.it("string", tags!(fast = "true"), trace.hook("string"))?;
            g.it("symbol", tags!(fast = Value::sym("true")), trace.hook("symbol"))?;
            g.it("false string", tags!(fast = "false"), trace.hook("false string"))?;
            g.it("untagged", (), trace.hook("untagged"))?;
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(trace.take(), ["bool", "string", "symbol"]);
}

#[test]
fn exclusions_win_over_inclusions() {
    let trace = Trace::default();
    let filter = FilterManager::new()
        .with_include("kind", Value::sym("unit"))
        .with_exclude("slow", true);
    let (world, _) = world(Configuration::new().with_filter(filter));

    world
        .describe("suite", tags!(kind = Value::sym("unit")), |g| {
            g.it("quick", (), trace.hook("quick"))?;
            g.it("slow", tags!(slow), trace.hook("slow"))?;
            g.it("integration", tags!(kind = "integration"), trace.hook("integration"))?;
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(trace.take(), ["quick"]);
}

#[test]
fn reserved_keys_can_be_filtered_on() {
    let trace = Trace::default();
    let (world, _) = world(Configuration::new());
    let mut target = None;

    world
        .describe("lines", (), |g| {
            g.it("elsewhere", (), trace.hook("elsewhere"))?;
            target = Some((g.it("targeted", (), trace.hook("targeted"))?, line!()));
            Ok(())
        })
        .unwrap();

    let (id, line) = target.unwrap();
    let tree = world.tree();
    let metadata = tree.metadata(id).unwrap();
    assert_eq!(
        metadata.get("line_number").as_deref(),
        Some(&Value::Int(i64::from(line)))
    );
    assert!(metadata.location().starts_with("tests/scenarios/filtering.rs:"));

    let by_line = FilterManager::new().with_include("line_number", line);
    assert!(by_line.selects(metadata));
    let by_description =
        FilterManager::new().with_include("full_description", Matcher::pattern("^lines t").unwrap());
    assert!(by_description.selects(metadata));
}

#[test]
fn everything_filtered_runs_everything_when_asked() {
    let trace = Trace::default();
    let filter = FilterManager::new()
        .with_include("focus", true)
        .with_run_all_when_everything_filtered(true);
    let (world, diagnostics) = world(Configuration::new().with_filter(filter));

    world
        .describe("group", (), |g| {
            g.it("a", (), trace.hook("a"))?;
            g.it("b", (), trace.hook("b"))?;
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(trace.take(), ["a", "b"]);
    assert_eq!(
        diagnostics.take(),
        ["All examples were filtered out; ignoring {focus: true}"]
    );
}

#[test]
fn merged_filters_let_the_later_source_win() {
    let mut base = FilterManager::new();
    base.exclude("slow", true).include("kind", "unit");
    let mut later = FilterManager::new();
    later.include("slow", true);

    base.merge(&later);
    assert!(base.exclusions().is_empty());
    assert_eq!(base.inclusions().to_string(), "{kind: \"unit\", slow: true}");

    let trace = Trace::default();
    let (world, _) = world(Configuration::new().with_filter(base));
    let mut ids = Vec::new();
    world
        .describe("group", tags!(kind = "unit"), |g| {
            ids.push(g.it("slow", tags!(slow), trace.hook("slow"))?);
            ids.push(g.it("fast", (), trace.hook("fast"))?);
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(trace.take(), ["slow"]);
    assert_eq!(world.result(ids[1]).unwrap().status, Status::NotRun);
}

#[test]
fn run_all_applies_when_exclusions_empty_the_selection() {
    let trace = Trace::default();
    let filter = FilterManager::new()
        .with_include("focus", true)
        .with_exclude("broken", true)
        .with_run_all_when_everything_filtered(true);
    let (world, diagnostics) = world(Configuration::new().with_filter(filter));

    world
        .describe("group", (), |g| {
            g.it("focused but broken", tags!(focus, broken), trace.hook("focused"))?;
            g.it("plain", (), trace.hook("plain"))?;
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(trace.take(), ["plain"]);
    assert_eq!(
        diagnostics.take(),
        ["All examples were filtered out; ignoring {focus: true}"]
    );
}
