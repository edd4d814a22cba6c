use std::rc::Rc;

use kispec::{
    Configuration, Context, World,
    error::DefinitionError,
    outcome::{Failure, Status},
    reporter::NoReporter,
};
use pretty_assertions::assert_eq;

use crate::lib::{Trace, world};

#[test]
fn group_hooks_nest_around_subgroups() {
    let trace = Trace::default();
    let mut config = Configuration::new();
    config.before("all", trace.hook("config before all")).unwrap();
    let (world, _) = world(config);

    world
        .describe("outer", (), |g| {
            g.before("all", trace.hook("outer before all"))?;
            g.after("all", trace.hook("outer after all"))?;
            g.before("each", trace.hook("outer before each"))?;
            for (name, before, after, case) in [
                ("left", "left before all", "left after all", "left case"),
                ("right", "right before all", "right after all", "right case"),
            ] {
                g.describe(name, (), |g| {
                    g.before("all", trace.hook(before))?;
                    g.after("all", trace.hook(after))?;
                    g.it("runs", (), trace.hook(case))?;
                    Ok(())
                })?;
            }
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(
        trace.take(),
        [
            "config before all",
            "outer before all",
            "left before all",
            "outer before each",
            "left case",
            "left after all",
            "right before all",
            "outer before each",
            "right case",
            "right after all",
            "outer after all",
        ]
    );
}

#[test]
fn raising_before_all_fails_both_siblings() {
    let trace = Trace::default();
    let (world, _) = world(Configuration::new());
    let mut cases = Vec::new();
    world
        .describe("database", (), |g| {
            g.before("all", |_: &mut Context<'_>| -> Result<(), String> {
                panic!("connection refused")
            })?;
            g.after("all", trace.hook("disconnect"))?;
            cases.push(g.it("reads", (), trace.hook("reads"))?);
            cases.push(g.it("writes", (), trace.hook("writes"))?);
            Ok(())
        })
        .unwrap();

    assert!(!world.run(NoReporter));
    assert_eq!(trace.take(), ["disconnect"]);
    for case in cases {
        let result = world.result(case).unwrap();
        assert_eq!(result.status, Status::Failed);
        assert_eq!(
            result.failure,
            Some(Failure::Panicked("connection refused".into()))
        );
    }
}

#[test]
fn raising_after_all_hooks_leave_the_case_passing() {
    let (world, diagnostics) = world(Configuration::new());
    let mut case = None;
    world
        .describe("cleanup", (), |g| {
            g.after("context", |_: &mut Context<'_>| Err::<(), _>("first teardown"))?;
            g.after("context", |_: &mut Context<'_>| Err::<(), _>("second teardown"))?;
            case = Some(g.it("works", (), |_| {})?);
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(world.result(case.unwrap()).unwrap().status, Status::Passed);

    let messages = diagnostics.take();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("second teardown"));
    assert!(messages[1].contains("first teardown"));
    assert!(messages.iter().all(|message| message.contains("tests/scenarios/hooks.rs:")));
}

#[test]
fn case_after_hooks_all_run_even_if_one_fails() {
    let trace = Trace::default();
    let (world, diagnostics) = world(Configuration::new());
    let mut case = None;
    world
        .describe("group", (), |g| {
            g.after("each", trace.hook("registered first"))?;
            g.after("each", |_: &mut Context<'_>| Err::<(), _>("teardown broke"))?;
            g.after("each", trace.hook("registered last"))?;
            case = Some(g.it("passes", (), trace.hook("body"))?);
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(trace.take(), ["body", "registered last", "registered first"]);
    assert!(world.result(case.unwrap()).unwrap().passed());
    assert_eq!(diagnostics.take().len(), 1);
}

#[test]
fn definitions_are_rejected_while_running() {
    let world = Rc::new(World::default());
    let attempt = Rc::new(std::cell::RefCell::new(None));

    let inner = Rc::downgrade(&world);
    let seen = Rc::clone(&attempt);
    world
        .describe("group", (), move |g| {
            g.it("defines more", (), move |_: &mut Context<'_>| {
                if let Some(world) = inner.upgrade() {
                    *seen.borrow_mut() = Some(world.describe("late", (), |_| Ok(())));
                }
            })?;
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(
        attempt.borrow_mut().take(),
        Some(Err(DefinitionError::DefinedWhileRunning))
    );
}
