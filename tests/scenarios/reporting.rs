use std::thread;

use kispec::{
    Configuration, Context,
    filter::FilterManager,
    reporter::{ChannelReporter, Notification, RecordingReporter},
    tags,
};
use pretty_assertions::assert_eq;

use crate::lib::world;

#[test]
fn notifications_arrive_in_run_order() {
    let filter = FilterManager::new().with_exclude("broken", true);
    let (world, _) = world(Configuration::new().with_filter(filter));
    world
        .describe("calculator", (), |g| {
            g.it("adds", (), |_| {})?;
            g.it("divides by zero", tags!(broken), |_| {})?;
            g.describe("memory", (), |g| {
                g.it("recalls", (), |_: &mut Context<'_>| Err::<(), _>("forgot"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    let mut reporter = RecordingReporter::new();
    assert!(!world.run(&mut reporter));
    assert_eq!(
        reporter.summaries(),
        [
            "message: Run options: exclude {broken: true}",
            "group started: calculator",
            "case started: calculator adds",
            "case finished: calculator adds (Passed)",
            "group started: calculator memory",
            "case started: calculator memory recalls",
            "case finished: calculator memory recalls (Failed)",
            "group finished: calculator memory",
            "group finished: calculator",
        ]
    );
}

#[test]
fn channel_reporter_feeds_another_thread() {
    let (world, _) = world(Configuration::new());
    world
        .describe("group", (), |g| {
            g.it("one", (), |_| {})?;
            g.it("two", (), |_| {})?;
            Ok(())
        })
        .unwrap();

    let (reporter, receiver) = ChannelReporter::unbounded();
    let consumer = thread::spawn(move || {
        receiver
            .iter()
            .filter(|notification| matches!(notification, Notification::CaseFinished { .. }))
            .map(|notification| notification.summary())
            .collect::<Vec<_>>()
    });

    assert!(world.run(reporter));
    let finished = consumer.join().expect("consumer does not panic");
    assert_eq!(
        finished,
        [
            "case finished: group one (Passed)",
            "case finished: group two (Passed)"
        ]
    );
}
