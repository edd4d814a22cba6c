use std::{cell::Cell, rc::Rc};

use kispec::{
    Configuration, Context, GroupBuilder, SharedArgs,
    error::DefinitionError,
    metadata::Value,
    reporter::NoReporter,
};
use pretty_assertions::assert_eq;

use crate::lib::{Trace, world};

fn include_twice(g: &mut GroupBuilder<'_>) -> Result<Vec<kispec::tree::NodeId>, DefinitionError> {
    let mut included = Vec::new();
    for _ in 0..2 {
        included.push(g.it_behaves_like("a stack", vec![Value::from(2)])?);
    }
    Ok(included)
}

#[test]
fn inclusion_at_one_site_evaluates_once() {
    let evaluations = Rc::new(Cell::new(0));
    let trace = Trace::default();
    let (world, _) = world(Configuration::new());

    let counter = Rc::clone(&evaluations);
    let recorder = trace.clone();
    world
        .shared_examples("a stack", &["depth"], move |g, args: &SharedArgs| {
            counter.set(counter.get() + 1);
            let depth = args.get("depth").cloned().unwrap_or(Value::Int(0));
            let recorder = recorder.clone();
            g.it("pushes", (), move |_: &mut Context<'_>| {
                recorder.push(format!("push {depth}"))
            })?;
            Ok(())
        })
        .unwrap();

    let mut included = Vec::new();
    world
        .describe("vec", (), |g| {
            included = include_twice(g)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(evaluations.get(), 1);
    assert_eq!(included[0], included[1]);

    world
        .describe("deque", (), |g| {
            g.include_examples("a stack", vec![Value::from(5)])?;
            Ok(())
        })
        .unwrap();
    assert_eq!(evaluations.get(), 2);

    assert!(world.run(NoReporter));
    assert_eq!(trace.take(), ["push 2", "push 5"]);

    let tree = world.tree();
    let nested = tree.metadata(included[0]).unwrap();
    assert_eq!(nested.full_description(), "vec behaves like a stack");
}

#[test]
fn group_scoped_definitions_shadow_global_ones() {
    let trace = Trace::default();
    let (world, _) = world(Configuration::new());

    let global = trace.clone();
    world
        .shared_examples("greeting", &[], move |g, _| {
            g.it("greets", (), global.hook("global"))?;
            Ok(())
        })
        .unwrap();

    world
        .describe("outer", (), |g| {
            let local = trace.clone();
            g.shared_examples("greeting", &[], move |g, _| {
                g.it("greets", (), local.hook("local"))?;
                Ok(())
            })?;
            g.describe("inner", (), |g| {
                g.include_examples("greeting", vec![])?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
    world
        .describe("elsewhere", (), |g| {
            g.include_examples("greeting", vec![])?;
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(trace.take(), ["local", "global"]);
}

#[test]
fn customization_runs_in_the_nested_group() {
    let trace = Trace::default();
    let (world, _) = world(Configuration::new());

    let shared = trace.clone();
    world
        .shared_examples("a resource", &[], move |g, _| {
            let shared = shared.clone();
            g.it("is ready", (), move |ctx: &mut Context<'_>| {
                let name: &String = ctx.get("name").expect("customization ran first");
                shared.push(format!("{name} is ready"));
            })?;
            Ok(())
        })
        .unwrap();

    let mut nested = None;
    world
        .describe("resources", (), |g| {
            nested = Some(g.it_behaves_like_with("a resource", vec![], |g| {
                g.before("each", |ctx: &mut Context<'_>| {
                    ctx.set("name", String::from("printer"))
                })
            })?);
            Ok(())
        })
        .unwrap();

    assert!(world.run(NoReporter));
    assert_eq!(trace.take(), ["printer is ready"]);
    assert_eq!(world.tree().children(nested.unwrap()).len(), 1);
}

#[test]
fn missing_and_misdeclared_shared_groups_fail_definitions() {
    let (world, _) = world(Configuration::new());

    assert_eq!(
        world.describe("group", (), |g| {
            g.it_behaves_like("nothing", vec![])?;
            Ok(())
        }),
        Err(DefinitionError::SharedGroupNotFound {
            name: "nothing".into()
        })
    );

    world.shared_examples("twice", &[], |_, _| Ok(())).unwrap();
    assert_eq!(
        world.shared_examples("twice", &[], |_, _| Ok(())),
        Err(DefinitionError::DuplicateSharedGroup {
            name: "twice".into()
        })
    );
}
