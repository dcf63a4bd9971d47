use strand::stream::{Disposer, OnError, OnNext, Subject, Subscribable};
use strand::time;
use strand::{Args, Co, Error, Promise, Resume, Routine, Step, Suspension, Value};

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

#[test]
fn test_sync_return_completes_with_value() {
    let routine = strand::routine(|_co: Co, _args: Args| async move { Ok::<_, Error>(42) });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::from(42)));
}

#[test]
fn test_arguments_are_passed_in_order() {
    let routine = strand::routine(|_co: Co, args: Args| async move {
        let sum: i64 = args.values().filter_map(Value::as_int).sum();
        Ok::<_, Error>(sum)
    });

    assert_eq!(strand::block_on(routine, [1, 2, 3]), Ok(Value::from(6)));
}

#[test]
fn test_promise_value_resumes_routine() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        let a = co.suspend(Promise::resolved(20)).await?.expect_int()?;
        let b = co.suspend(Promise::resolved(22)).await?.expect_int()?;
        Ok::<_, Error>(a + b)
    });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::from(42)));
}

#[test]
fn test_rejection_is_injected_and_recoverable() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        match co.suspend(Promise::rejected(Error::msg("nope"))).await {
            Ok(_) => Ok::<_, Error>("unexpected".to_string()),
            Err(err) => Ok(format!("recovered from {err}")),
        }
    });

    assert_eq!(
        strand::block_on(routine, ()),
        Ok(Value::from("recovered from nope"))
    );
}

#[test]
fn test_unrecovered_error_fails_the_run() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(Promise::rejected(Error::msg("boom"))).await?;
        Ok::<_, Error>("unreachable")
    });

    assert_eq!(strand::block_on(routine, ()), Err(Error::msg("boom")));
}

#[test]
fn test_reject_without_reason_is_an_error() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(Promise::rejected_empty()).await
    });

    assert_eq!(strand::block_on(routine, ()), Err(Error::Rejected));
}

#[test]
fn test_raised_error_before_first_suspension() {
    let routine =
        strand::routine(|_co: Co, _args: Args| async move { Err::<Value, _>(Error::raise(7)) });

    let outcome = strand::block_on(routine, ());
    assert_eq!(outcome, Err(Error::raise(7)));
    assert_eq!(outcome.unwrap_err().payload(), Some(&Value::from(7)));
}

#[test]
fn test_final_suspension_is_resolved_once_more() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(Promise::resolved(1)).await?;
        Ok::<_, Error>(time::sleep(Duration::from_millis(1)))
    });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::Null));

    let routine =
        strand::routine(|_co: Co, _args: Args| async move { Ok::<_, Error>(Promise::resolved("late")) });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::from("late")));
}

#[test]
fn test_nested_routine_feeds_outer_continuation() {
    let inner = strand::routine(|co: Co, _args: Args| async move {
        let v = co.suspend(Promise::resolved(10)).await?.expect_int()?;
        Ok::<_, Error>(v * 2)
    });

    let outer = strand::routine(move |co: Co, _args: Args| {
        let inner = inner.clone();
        async move {
            let a = co.suspend(&inner).await?.expect_int()?;
            let b = co.suspend(inner).await?.expect_int()?;
            Ok::<_, Error>(a + b)
        }
    });

    assert_eq!(strand::block_on(outer, ()), Ok(Value::from(40)));
}

#[test]
fn test_nested_routine_failure_is_injected() {
    let failing =
        strand::routine(|_co: Co, _args: Args| async move { Err::<Value, _>(Error::msg("inner")) });

    let outer = strand::routine(move |co: Co, _args: Args| {
        let failing = failing.clone();
        async move {
            let err = co.suspend(failing).await.unwrap_err();
            Ok::<_, Error>(format!("caught {err}"))
        }
    });

    assert_eq!(strand::block_on(outer, ()), Ok(Value::from("caught inner")));
}

#[test]
fn test_thunk_receives_the_continuation() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(Suspension::thunk(|next| next.resolve("from thunk")))
            .await
    });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::from("from thunk")));
}

#[test]
fn test_stream_first_value_wins_and_disposes() {
    let subject = Subject::new();
    let probe = subject.clone();

    let routine = strand::routine(move |co: Co, _args: Args| {
        let subject = subject.clone();
        async move {
            let emitter = subject.clone();
            time::set_timeout(Duration::from_millis(1), move || {
                emitter.emit(1);
                emitter.emit(2);
            })?;

            co.suspend(Suspension::stream(subject)).await
        }
    });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::from(1)));
    assert_eq!(probe.subscriber_count(), 0);
}

#[test]
fn test_stream_failure_is_injected() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        let subject = Subject::new();
        let emitter = subject.clone();
        time::set_timeout(Duration::ZERO, move || emitter.fail(Error::msg("closed")))?;

        co.suspend(Suspension::stream(subject)).await
    });

    assert_eq!(strand::block_on(routine, ()), Err(Error::msg("closed")));
}

/// Emits from inside `subscribe` and records whether it got disposed.
struct Eager {
    disposed: Rc<Cell<bool>>,
}

impl Subscribable for Eager {
    fn subscribe(self: Box<Self>, mut on_next: OnNext, _on_error: OnError) -> Disposer {
        on_next(Value::from("eager"));
        on_next(Value::from("ignored"));

        let disposed = self.disposed;
        Disposer::new(move || disposed.set(true))
    }
}

#[test]
fn test_stream_emitting_during_subscribe() {
    let disposed = Rc::new(Cell::new(false));
    let flag = disposed.clone();

    let routine = strand::routine(move |co: Co, _args: Args| {
        let disposed = flag.clone();
        async move { co.suspend(Suspension::stream(Eager { disposed })).await }
    });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::from("eager")));
    assert!(disposed.get());
}

#[test]
fn test_rust_future_as_suspension() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        let promise = time::sleep(Duration::from_millis(1));
        co.suspend(Suspension::future(async move {
            promise.await?;
            Ok::<_, Error>(Value::from("slept"))
        }))
        .await
    });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::from("slept")));
}

#[test]
fn test_awaiting_outside_suspend_stalls() {
    let routine = strand::routine(|_co: Co, _args: Args| async move {
        let (promise, _deferred) = Promise::pending();
        promise.await
    });

    assert_eq!(strand::block_on(routine, ()), Err(Error::Stalled));
}

#[test]
fn test_unrecognized_final_value_completes_immediately() {
    let routine =
        strand::routine(|_co: Co, _args: Args| async move { Ok::<_, Error>(Suspension::other(5u8)) });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::Null));
}

#[test]
fn test_unrecognized_value_waits_for_continuation() {
    let routine = strand::routine(|co: Co, args: Args| async move {
        let next = args.next().expect("continuation attached");
        time::set_timeout(Duration::ZERO, move || next.resolve("manual"))?;

        co.suspend(Value::from("ignored")).await
    });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::from("manual")));
}

#[test]
fn test_routine_that_never_resumes_is_incomplete() {
    let routine = strand::routine(|co: Co, _args: Args| async move { co.wait().await });

    assert_eq!(strand::block_on(routine, ()), Err(Error::Incomplete));
}

/// Counts down through resolved promises.
struct Countdown {
    left: i64,
}

impl Routine for Countdown {
    fn resume(&mut self, input: Resume) -> Step {
        match input {
            Resume::Throw(err) => Step::Raise(err),
            _ if self.left == 0 => Step::done("liftoff"),
            _ => {
                self.left -= 1;
                Step::Yield(Promise::resolved(self.left).into())
            }
        }
    }
}

#[test]
fn test_hand_written_state_machine() {
    assert_eq!(
        strand::block_on(Countdown { left: 3 }, ()),
        Ok(Value::from("liftoff"))
    );
}
