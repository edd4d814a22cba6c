use kispec::{
    Configuration,
    metadata::Value,
    ordering::{OrderItem, OrderingRegistry},
    reporter::NoReporter,
    tags,
};
use pretty_assertions::assert_eq;

use crate::lib::{Trace, world};

fn define_letters(world: &kispec::World, trace: &Trace) {
    for group in ["first", "second"] {
        world
            .describe(group, (), |g| {
                for case in ["a", "b", "c", "d", "e"] {
                    g.it(case, (), trace.hook(case))?;
                }
                Ok(())
            })
            .unwrap();
    }
}

#[test]
fn defined_order_follows_definitions() {
    let trace = Trace::default();
    let (world, _) = world(Configuration::new());
    define_letters(&world, &trace);

    assert!(world.run(NoReporter));
    assert_eq!(
        trace.take(),
        ["a", "b", "c", "d", "e", "a", "b", "c", "d", "e"]
    );
}

#[test]
fn random_order_repeats_with_the_same_seed() {
    let run = |seed: u64| {
        let trace = Trace::default();
        let ordering = OrderingRegistry::new().with_global("random");
        let (world, _) = world(Configuration::new().with_ordering(ordering).with_seed(seed));
        define_letters(&world, &trace);
        assert!(world.run(NoReporter));
        trace.take()
    };

    let first = run(1234);
    let second = run(1234);
    assert_eq!(first, second);

    let mut letters = first.clone();
    letters.sort();
    assert_eq!(
        letters,
        ["a", "a", "b", "b", "c", "c", "d", "d", "e", "e"]
    );
}

#[test]
fn a_custom_global_strategy_orders_every_level() {
    let trace = Trace::default();
    let ordering = OrderingRegistry::new().with_strategy("global", |items: &mut [OrderItem<'_>]| {
        items.sort_by(|a, b| b.metadata.description().cmp(a.metadata.description()))
    });
    let (world, _) = world(Configuration::new().with_ordering(ordering));
    define_letters(&world, &trace);

    assert!(world.run(NoReporter));
    assert_eq!(
        trace.take(),
        ["e", "d", "c", "b", "a", "e", "d", "c", "b", "a"]
    );
}

#[test]
fn order_tags_switch_a_subtree() {
    let trace = Trace::default();
    let ordering = OrderingRegistry::new().with_strategy("reverse", |items: &mut [OrderItem<'_>]| {
        items.reverse()
    });
    let (world, diagnostics) = world(Configuration::new().with_ordering(ordering));

    world
        .describe("plain", (), |g| {
            g.it("1", (), trace.hook("plain 1"))?;
            g.it("2", (), trace.hook("plain 2"))?;
            g.describe("reversed", tags!(order = Value::sym("reverse")), |g| {
                g.it("1", (), trace.hook("reversed 1"))?;
                g.it("2", (), trace.hook("reversed 2"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(
        trace.take(),
        ["plain 1", "plain 2", "reversed 2", "reversed 1"]
    );
    assert!(diagnostics.take().is_empty());
}

#[test]
fn unknown_orderings_warn_with_the_group_location() {
    let trace = Trace::default();
    let (world, diagnostics) = world(Configuration::new());

    world
        .describe("group", tags!(order = Value::sym("alphabetical")), |g| {
            g.it("b", (), trace.hook("b"))?;
            g.it("a", (), trace.hook("a"))?;
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(trace.take(), ["b", "a"]);

    let messages = diagnostics.take();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Ignoring unrecognized ordering :alphabetical"));
    assert!(messages[0].contains("tests/scenarios/ordering.rs:"));
}
