use strand::time;
use strand::{
    Arg, Args, Co, Config, Deferred, Error, EventLoop, Launch, Outcome, Promise, Runner, Suspension,
    Value,
};

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Runs `routine` through `runner` to completion, capturing the outcome.
fn block_on_with(runner: &Runner, routine: strand::RoutineFn, args: impl Into<Args>) -> Outcome {
    let result: Rc<RefCell<Option<Outcome>>> = Rc::default();
    let sink = result.clone();

    let event_loop = EventLoop::new();
    event_loop
        .block_on(|| {
            runner.run_with(routine, args, move |outcome: Outcome| {
                *sink.borrow_mut() = Some(outcome);
            })
        })
        .expect("loop ran")
        .expect("routine started");

    result.take().unwrap_or(Err(Error::Incomplete))
}

fn continuation_position() -> strand::RoutineFn {
    strand::routine(|_co: Co, args: Args| async move {
        let position = (0..args.len())
            .find(|i| matches!(args.get(*i), Some(Arg::Next(_))))
            .map(|i| i as i64)
            .unwrap_or(-1);
        Ok::<_, Error>(position)
    })
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert!(config.future_constructor().is_some());
    assert!(!config.prepend_continuation());
    assert!(config.custom_yieldable().is_none());
    assert!(!config.raw_mode());
}

#[test]
fn test_continuation_appended_by_default() {
    let runner = Runner::default();

    assert_eq!(
        block_on_with(&runner, continuation_position(), ["a", "b"]),
        Ok(Value::from(2))
    );
}

#[test]
fn test_prepend_continuation() {
    let runner = Runner::new(Config::builder().prepend_continuation(true).build());

    assert_eq!(
        block_on_with(&runner, continuation_position(), ["a", "b"]),
        Ok(Value::from(0))
    );
}

#[test]
fn test_raw_mode_resumes_with_argument_list() {
    let runner = Runner::new(Config::builder().raw_mode(true).build());

    let routine = strand::routine(|co: Co, _args: Args| async move {
        let values = co
            .suspend(Suspension::thunk(|next| {
                next.call(None, vec![Value::from(1), Value::from(2)])
            }))
            .await?;

        let failure = co
            .suspend(Promise::rejected(Error::msg("boom")))
            .await?;

        Ok::<_, Error>(Value::List(vec![values, failure]))
    });

    let expected = Value::List(vec![
        Value::from(vec![Value::Null, Value::from(1), Value::from(2)]),
        Value::from(vec!["boom"]),
    ]);
    assert_eq!(block_on_with(&runner, routine, ()), Ok(expected));
}

#[test]
fn test_raw_mode_still_reports_terminal_errors() {
    let runner = Runner::new(Config::builder().raw_mode(true).build());

    let routine = strand::routine(|_co: Co, _args: Args| async move {
        Err::<Value, _>(Error::msg("terminal"))
    });

    assert_eq!(
        block_on_with(&runner, routine, ()),
        Err(Error::msg("terminal"))
    );
}

#[test]
fn test_nested_routines_share_the_config() {
    let runner = Runner::new(Config::builder().prepend_continuation(true).build());

    let outer = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(continuation_position()).await
    });

    assert_eq!(block_on_with(&runner, outer, ()), Ok(Value::from(0)));
}

#[test]
fn test_custom_yieldable_handles_lists_of_promises() {
    let runner = Runner::new(
        Config::builder()
            .custom_yieldable(|payload, next| {
                let promises = payload.downcast::<Vec<Promise>>()?;

                for promise in promises.iter() {
                    let slot = next.push();
                    let failed = slot.clone();
                    promise.on_settle(
                        Box::new(move |v| slot.resolve(v)),
                        Box::new(move |e| failed.reject(e.unwrap_or(Error::Rejected))),
                    );
                }

                if let Suspension::Thunk(wait) = next.all() {
                    wait(next);
                }
                Ok(())
            })
            .build(),
    );

    let routine = strand::routine(|co: Co, _args: Args| async move {
        let batch = vec![time::sleep(Duration::from_millis(2)), Promise::resolved(7)];
        co.suspend(Suspension::other(batch)).await
    });

    assert_eq!(
        block_on_with(&runner, routine, ()),
        Ok(Value::from(vec![Value::Null, Value::from(7)]))
    );
}

#[test]
fn test_custom_yieldable_sees_plain_values() {
    let runner = Runner::new(
        Config::builder()
            .custom_yieldable(|payload, next| match payload.downcast::<Value>() {
                Ok(value) if value.as_str() == Some("tick") => {
                    next.resolve("tock");
                    Ok(())
                }
                Ok(value) => Err(value as Box<dyn Any>),
                Err(other) => Err(other),
            })
            .build(),
    );

    let routine = strand::routine(|co: Co, _args: Args| async move {
        let answer = co.suspend("tick").await?;
        Ok::<_, Error>(Value::List(vec![answer, Value::from("plain")]))
    });

    assert_eq!(
        block_on_with(&runner, routine, ()),
        Ok(Value::from(vec!["tock", "plain"]))
    );
}

#[test]
fn test_without_futures_detaches_successful_runs() {
    let runner = Runner::new(Config::builder().without_futures().build());
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(time::sleep(Duration::from_millis(1))).await?;
        Ok::<_, Error>(1)
    });

    let event_loop = EventLoop::new();
    let launch = event_loop
        .enter(|| runner.run(routine, ()))
        .expect("routine started");

    assert!(matches!(launch, Launch::Detached));
    assert_eq!(event_loop.run(), Ok(()));
    assert!(event_loop.is_idle());
}

#[test]
fn test_without_futures_throws_synchronously() {
    let runner = Runner::new(Config::builder().without_futures().build());
    let routine =
        strand::routine(|_co: Co, _args: Args| async move { Err::<Value, _>(Error::msg("sync")) });

    let event_loop = EventLoop::new();
    let err = event_loop
        .enter(|| runner.run(routine, ()))
        .unwrap_err();

    assert_eq!(err, Error::Unobserved(Box::new(Error::msg("sync"))));
}

#[test]
fn test_without_futures_surfaces_async_failure_from_loop() {
    let runner = Runner::new(Config::builder().without_futures().build());
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(time::sleep(Duration::from_millis(1))).await?;
        Err::<Value, _>(Error::msg("async"))
    });

    let event_loop = EventLoop::new();
    event_loop
        .enter(|| runner.run(routine, ()))
        .expect("no failure before the first suspension");

    let err = event_loop.run().unwrap_err();
    assert!(matches!(err, Error::Unobserved(_)));
    assert_eq!(err.payload(), Some(&Value::from("async")));
}

#[test]
fn test_without_futures_callback_still_observes() {
    let runner = Runner::new(Config::builder().without_futures().build());
    let routine =
        strand::routine(|_co: Co, _args: Args| async move { Err::<Value, _>(Error::msg("seen")) });

    assert_eq!(
        block_on_with(&runner, routine, ()),
        Err(Error::msg("seen"))
    );
}

thread_local! {
    static BUILT: Cell<usize> = const { Cell::new(0) };
}

fn counting_factory() -> (Promise, Deferred) {
    BUILT.with(|built| built.set(built.get() + 1));
    Promise::pending()
}

#[test]
fn test_custom_future_constructor() {
    let runner = Runner::new(
        Config::builder()
            .future_constructor(counting_factory)
            .build(),
    );
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(Promise::resolved("built")).await
    });

    let event_loop = EventLoop::new();
    let launch = event_loop
        .block_on(|| runner.run(routine, ()))
        .expect("loop ran")
        .expect("routine started");

    assert_eq!(BUILT.with(Cell::get), 1);
    assert_eq!(
        launch.promise().and_then(Promise::peek),
        Some(Ok(Value::from("built")))
    );
}
